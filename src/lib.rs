//! orb: an in-process component object broker.
//!
//! Components describe their types to a [`Runtime`], which then:
//!
//! - keeps them in a namespaced type registry ([`registry`])
//! - dispatches calls through per-interface slot tables ([`DispatchTable`])
//! - owns component objects on an atomically reference-counted heap
//! - creates service instances through bound factories, singletons included
//! - turns native failures into typed exceptions ([`TypedException`])
//! - exports the whole type space as a binding tree ([`BindingExport`])
//! - loads and unloads component [`Module`]s
//!
//! See [`Runtime`] for a complete example.

pub mod abi;
mod config;
mod dispatch;
mod exception;
mod factory;
pub mod module;
mod runtime;

pub use orb_core as core;
pub use orb_registry as registry;

pub use abi::{AbiStatus, ForeignComponent, RawComponent, RawComponentVTable};
pub use config::{RuntimeConfig, RuntimeFlags};
pub use dispatch::{DispatchSlot, DispatchTable};
pub use module::{ABI_VERSION, Module, ModuleEntryPoint};
pub use runtime::Runtime;

pub use orb_core::{
    ConstantValue, ModuleId, ObjectHandle, OrbError, QualifiedName, TypeDescriptor,
    TypedException, Value,
};
pub use orb_registry::{BindingExport, BindingLeaf};

pub mod prelude {
    pub use crate::core::{
        CallContext, ComponentClass, FromValue, IntoValue, NativeError, NewInstance,
        RaisedException, StructValue,
    };
    pub use crate::{
        Module, ModuleEntryPoint, ObjectHandle, OrbError, QualifiedName, Runtime, RuntimeConfig,
        TypedException, Value,
    };
}
