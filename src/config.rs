//! Runtime configuration.

use bitflags::bitflags;

use orb_core::QualifiedName;
use orb_registry::builtins;

bitflags! {
    /// Behaviour switches for a [`Runtime`](crate::Runtime).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RuntimeFlags: u8 {
        /// Exceptions a method does not declare are replaced by the fallback type.
        const STRICT_RAISES = 1 << 0;
        /// Panics in native code become typed exceptions instead of unwinding.
        const CATCH_PANICS = 1 << 1;
        /// Cross-type references are checked when a module loads.
        const VALIDATE_ON_LOAD = 1 << 2;
    }
}

/// Configuration for a [`Runtime`](crate::Runtime).
///
/// ```
/// use orb::RuntimeConfig;
///
/// let config = RuntimeConfig::default()
///     .strict_raises(true)
///     .default_constructor("create");
/// assert!(config.is_strict_raises());
/// assert!(config.is_catch_panics());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    fallback_exception: QualifiedName,
    default_constructor: String,
    flags: RuntimeFlags,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            fallback_exception: QualifiedName::from(builtins::RUNTIME_ERROR),
            default_constructor: "create".to_string(),
            flags: RuntimeFlags::CATCH_PANICS | RuntimeFlags::VALIDATE_ON_LOAD,
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exception type used when a native failure matches nothing registered.
    ///
    /// Must be registered as an exception before it is raised; otherwise the
    /// built-in `orb.RuntimeError` is used.
    pub fn fallback_exception(mut self, name: impl Into<QualifiedName>) -> Self {
        self.fallback_exception = name.into();
        self
    }

    /// Constructor name services without declared constructors answer to.
    pub fn default_constructor(mut self, name: impl Into<String>) -> Self {
        self.default_constructor = name.into();
        self
    }

    pub fn strict_raises(self, enabled: bool) -> Self {
        self.with_flag(RuntimeFlags::STRICT_RAISES, enabled)
    }

    pub fn catch_panics(self, enabled: bool) -> Self {
        self.with_flag(RuntimeFlags::CATCH_PANICS, enabled)
    }

    pub fn validate_on_load(self, enabled: bool) -> Self {
        self.with_flag(RuntimeFlags::VALIDATE_ON_LOAD, enabled)
    }

    fn with_flag(mut self, flag: RuntimeFlags, enabled: bool) -> Self {
        self.flags.set(flag, enabled);
        self
    }

    pub fn fallback_exception_name(&self) -> &QualifiedName {
        &self.fallback_exception
    }

    pub fn default_constructor_name(&self) -> &str {
        &self.default_constructor
    }

    pub fn flags(&self) -> RuntimeFlags {
        self.flags
    }

    pub fn is_strict_raises(&self) -> bool {
        self.flags.contains(RuntimeFlags::STRICT_RAISES)
    }

    pub fn is_catch_panics(&self) -> bool {
        self.flags.contains(RuntimeFlags::CATCH_PANICS)
    }

    pub fn is_validate_on_load(&self) -> bool {
        self.flags.contains(RuntimeFlags::VALIDATE_ON_LOAD)
    }
}
