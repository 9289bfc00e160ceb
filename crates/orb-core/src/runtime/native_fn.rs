//! Native function storage and callable traits.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::native_error::NativeError;
use crate::TypeHash;

use super::CallContext;

/// Type-erased native method.
///
/// The callable is shared behind an `Arc` so classes and dispatch caches can
/// hold the same implementation.
pub struct NativeFn {
    /// Method identity (`TypeHash::from_method` of the declaring interface).
    pub id: TypeHash,
    inner: Arc<dyn NativeCallable + Send + Sync>,
}

impl NativeFn {
    pub fn new<F>(id: TypeHash, f: F) -> Self
    where
        F: NativeCallable + Send + Sync + 'static,
    {
        Self {
            id,
            inner: Arc::new(f),
        }
    }

    /// Call this native function with the given context.
    pub fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), NativeError> {
        self.inner.call(ctx)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Clone for NativeFn {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Trait for callable native functions.
///
/// The call receives a [`CallContext`] giving access to `this`, the argument
/// slots (including out parameters) and the return slot.
pub trait NativeCallable {
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), NativeError>;
}

impl<F> NativeCallable for F
where
    F: Fn(&mut CallContext<'_>) -> Result<(), NativeError>,
{
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), NativeError> {
        (self)(ctx)
    }
}

/// A freshly constructed native instance, not yet on the heap.
pub struct NewInstance {
    /// Name of the registered implementation class.
    pub implementation: String,
    pub value: Box<dyn Any + Send + Sync>,
}

impl NewInstance {
    pub fn new<T: Any + Send + Sync>(implementation: impl Into<String>, value: T) -> Self {
        Self {
            implementation: implementation.into(),
            value: Box::new(value),
        }
    }
}

impl fmt::Debug for NewInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewInstance")
            .field("implementation", &self.implementation)
            .finish_non_exhaustive()
    }
}

type FactoryCallable = dyn Fn(&mut CallContext<'_>) -> Result<NewInstance, NativeError> + Send + Sync;

/// Type-erased service constructor.
///
/// The factory only builds the instance; the runtime allocates it on the heap
/// under the implementation's class.
#[derive(Clone)]
pub struct NativeFactory {
    inner: Arc<FactoryCallable>,
}

impl NativeFactory {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<NewInstance, NativeError> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    pub fn call(&self, ctx: &mut CallContext<'_>) -> Result<NewInstance, NativeError> {
        (self.inner)(ctx)
    }
}

impl fmt::Debug for NativeFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFactory").finish_non_exhaustive()
    }
}
