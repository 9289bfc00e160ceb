//! Interface proxy/stub layer.
//!
//! [`DispatchTable`] turns an interface descriptor into an ordered slot list;
//! `Runtime::invoke` turns a generic call (slot index and argument list) into
//! a native call and back.

mod invoke;
mod marshal;
mod table;

pub(crate) use marshal::Marshaller;
pub(crate) use table::DispatchCache;
pub use table::{DispatchSlot, DispatchTable};
