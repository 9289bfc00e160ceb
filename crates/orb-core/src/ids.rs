//! Identifier types for loaded modules.

use std::fmt;

/// Identifies a loaded module.
///
/// Every registry entry, implementation class and live object is owned by the
/// module that introduced it, so unload can find what to tear down.
///
/// # Example
///
/// ```
/// use orb_core::ModuleId;
///
/// let id = ModuleId::new(7);
/// assert_eq!(id.index(), 7);
/// assert!(ModuleId::BUILTIN.is_builtin());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u32);

impl ModuleId {
    /// Types the runtime registers for itself (`orb.Exception`, ...).
    pub const BUILTIN: ModuleId = ModuleId(0);

    /// Types registered directly by the embedding application.
    pub const HOST: ModuleId = ModuleId(1);

    /// First id handed out to loaded modules.
    pub const FIRST_LOADED: u32 = 2;

    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_builtin(self) -> bool {
        self.0 == Self::BUILTIN.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ModuleId::BUILTIN => write!(f, "module_builtin"),
            ModuleId::HOST => write!(f, "module_host"),
            _ => write!(f, "module_{}", self.0),
        }
    }
}

impl From<u32> for ModuleId {
    fn from(index: u32) -> Self {
        Self::new(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(ModuleId::BUILTIN.to_string(), "module_builtin");
        assert_eq!(ModuleId::HOST.to_string(), "module_host");
        assert_eq!(ModuleId::new(5).to_string(), "module_5");
    }

    #[test]
    fn ordering() {
        assert!(ModuleId::BUILTIN < ModuleId::HOST);
        assert!(ModuleId::HOST < ModuleId::new(ModuleId::FIRST_LOADED));
    }
}
