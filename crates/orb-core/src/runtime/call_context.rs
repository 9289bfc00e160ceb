//! Call context bridging the dispatch layer and native Rust functions.

use std::any::Any;
use std::fmt;

use crate::convert::{FromValue, IntoValue};
use crate::native_error::NativeError;

use super::{ObjectData, ObjectHandle, ObjectHeap, Value};

/// Context for native method and constructor calls.
///
/// Argument slots are in declaration order. `in` and `inout` slots hold the
/// caller's values; `out` slots start as the parameter type's default. Out
/// values are written with [`set_out`](Self::set_out) and copied back to the
/// caller after a successful call.
///
/// ```ignore
/// let count: i32 = ctx.arg(1)?;
/// ctx.set_out(0, vec![0i8; count as usize])?;
/// ctx.set_return(count);
/// ```
pub struct CallContext<'a> {
    this: Option<(ObjectHandle, &'a ObjectData)>,
    args: &'a mut [Value],
    return_slot: &'a mut Value,
    heap: &'a ObjectHeap,
}

impl<'a> CallContext<'a> {
    /// Context without a receiver (constructors).
    pub fn new(args: &'a mut [Value], return_slot: &'a mut Value, heap: &'a ObjectHeap) -> Self {
        Self {
            this: None,
            args,
            return_slot,
            heap,
        }
    }

    /// Context for a method call on `data`.
    pub fn for_method(
        handle: ObjectHandle,
        data: &'a ObjectData,
        args: &'a mut [Value],
        return_slot: &'a mut Value,
        heap: &'a ObjectHeap,
    ) -> Self {
        Self {
            this: Some((handle, data)),
            args,
            return_slot,
            heap,
        }
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Get a raw reference to an argument slot.
    pub fn arg_slot(&self, index: usize) -> Result<&Value, NativeError> {
        self.args
            .get(index)
            .ok_or(NativeError::ArgumentIndexOutOfBounds {
                index,
                count: self.args.len(),
            })
    }

    /// Get a mutable reference to an argument slot.
    pub fn arg_slot_mut(&mut self, index: usize) -> Result<&mut Value, NativeError> {
        let count = self.args.len();
        self.args
            .get_mut(index)
            .ok_or(NativeError::ArgumentIndexOutOfBounds { index, count })
    }

    /// Get a typed argument value.
    pub fn arg<T: FromValue>(&self, index: usize) -> Result<T, NativeError> {
        let slot = self.arg_slot(index)?;
        T::from_value(slot).map_err(NativeError::Conversion)
    }

    /// Arguments from `start` on, for trailing rest parameters.
    pub fn rest(&self, start: usize) -> &[Value] {
        self.args.get(start..).unwrap_or(&[])
    }

    /// Write an `out`/`inout` parameter.
    pub fn set_out<T: IntoValue>(&mut self, index: usize, value: T) -> Result<(), NativeError> {
        *self.arg_slot_mut(index)? = value.into_value();
        Ok(())
    }

    pub fn set_return<T: IntoValue>(&mut self, value: T) {
        *self.return_slot = value.into_value();
    }

    /// Get the receiver's native instance.
    pub fn this<T: Any>(&self) -> Result<&'a T, NativeError> {
        let (_, data) = self
            .this
            .ok_or_else(|| NativeError::invalid_this("no receiver for this call"))?;
        data.downcast_ref::<T>().ok_or_else(|| {
            NativeError::invalid_this(format!(
                "{} is not a {}",
                data.class().name(),
                std::any::type_name::<T>()
            ))
        })
    }

    /// Handle the receiver was called through.
    pub fn this_handle(&self) -> Option<ObjectHandle> {
        self.this.map(|(h, _)| h)
    }

    /// The object heap, for acquiring, releasing or querying other objects.
    pub fn heap(&self) -> &'a ObjectHeap {
        self.heap
    }
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("this", &self.this_handle())
            .field("arg_count", &self.arg_count())
            .finish()
    }
}
