//! Module entry points.
//!
//! A component module exports one [`ModuleEntryPoint`] static named
//! `ORB_MODULE_ENTRY`, usually through [`export_module!`](crate::export_module).
//! The host passes it to [`Runtime::load_module`](crate::Runtime::load_module).

use std::fmt;

use orb_core::OrbError;

use super::Module;

/// Version of the entry point layout. Bumped on incompatible changes.
pub const ABI_VERSION: u32 = 1;

/// What a module exports for the loader.
#[derive(Clone, Copy)]
pub struct ModuleEntryPoint {
    pub abi_version: u32,
    pub name: &'static str,
    /// Builds the module description. Called once per load.
    pub describe: fn() -> Result<Module, OrbError>,
    /// Called after the module has been unloaded.
    pub teardown: Option<fn()>,
}

impl fmt::Debug for ModuleEntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleEntryPoint")
            .field("abi_version", &self.abi_version)
            .field("name", &self.name)
            .field("teardown", &self.teardown.is_some())
            .finish_non_exhaustive()
    }
}

/// Export a module entry point as `ORB_MODULE_ENTRY`.
///
/// ```ignore
/// fn describe() -> Result<orb::Module, orb::OrbError> {
///     let mut module = orb::Module::new("demo.counter");
///     module.interface("XCounter").method("long increment()")?.build();
///     Ok(module)
/// }
///
/// orb::export_module!("demo.counter", describe);
/// ```
#[macro_export]
macro_rules! export_module {
    ($name:expr, $describe:path) => {
        #[unsafe(no_mangle)]
        pub static ORB_MODULE_ENTRY: $crate::ModuleEntryPoint = $crate::ModuleEntryPoint {
            abi_version: $crate::ABI_VERSION,
            name: $name,
            describe: $describe,
            teardown: None,
        };
    };
    ($name:expr, $describe:path, teardown = $teardown:path) => {
        #[unsafe(no_mangle)]
        pub static ORB_MODULE_ENTRY: $crate::ModuleEntryPoint = $crate::ModuleEntryPoint {
            abi_version: $crate::ABI_VERSION,
            name: $name,
            describe: $describe,
            teardown: Some($teardown),
        };
    };
}
