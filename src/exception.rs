//! Native failures to typed exceptions.
//!
//! Everything that goes wrong inside native code reaches the caller as a
//! [`TypedException`]: a raised exception whose type is registered keeps its
//! type, a Rust error matched by a registered mapper takes the mapper's
//! exception, and anything else (including panics) becomes the configured
//! fallback type. Fields are filled along the exception's base chain, so
//! every field the type declares is present.

use std::any::Any;
use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

use orb_core::{
    NativeError, ObjectHeap, QualifiedName, RaisedException, TypeDescriptor, TypedException, Value,
};
use orb_registry::{TypeRegistry, builtins};

use crate::dispatch::Marshaller;

type ErrorMapper =
    Arc<dyn Fn(&(dyn Error + Send + Sync + 'static)) -> Option<RaisedException> + Send + Sync>;

/// Converts [`NativeError`]s into [`TypedException`]s.
#[derive(Default)]
pub struct ExceptionMarshaller {
    mappers: RwLock<Vec<ErrorMapper>>,
}

impl ExceptionMarshaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map native errors of type `E` to a registered exception.
    ///
    /// Mappers are tried in registration order against errors native code
    /// returns as [`NativeError::Custom`].
    pub fn register_mapper<E, F>(&self, map: F)
    where
        E: Error + 'static,
        F: Fn(&E) -> RaisedException + Send + Sync + 'static,
    {
        self.mappers
            .write()
            .push(Arc::new(move |err: &(dyn Error + Send + Sync + 'static)| {
                err.downcast_ref::<E>().map(&map)
            }));
    }

    /// Run native code, turning a panic into [`NativeError::Panic`] when
    /// `catch_panics` is set.
    pub fn run<T>(
        catch_panics: bool,
        call: impl FnOnce() -> Result<T, NativeError>,
    ) -> Result<T, NativeError> {
        if !catch_panics {
            return call();
        }
        match panic::catch_unwind(AssertUnwindSafe(call)) {
            Ok(result) => result,
            Err(payload) => Err(NativeError::Panic {
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    /// The raised exception a native error stands for, before type resolution.
    pub fn raised_for(&self, err: NativeError) -> RaisedException {
        match err {
            NativeError::Raise(raised) => raised,
            NativeError::Custom(inner) => {
                let mappers = self.mappers.read();
                mappers
                    .iter()
                    .find_map(|map| map(inner.as_ref()))
                    .unwrap_or_else(|| {
                        RaisedException::new(builtins::RUNTIME_ERROR, inner.to_string())
                    })
            }
            other => RaisedException::new(builtins::RUNTIME_ERROR, other.to_string()),
        }
    }

    /// Resolve a raised exception against the registry.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn resolve(
        &self,
        registry: &TypeRegistry,
        heap: &ObjectHeap,
        fallback: &QualifiedName,
        raised: RaisedException,
    ) -> TypedException {
        let type_name = if is_exception(registry, &raised.type_name) {
            raised.type_name.clone()
        } else {
            if raised.type_name.to_string() != builtins::RUNTIME_ERROR {
                log::debug!(
                    "{} is not a registered exception, using {fallback}",
                    raised.type_name
                );
            }
            fallback_type(registry, fallback)
        };
        build(registry, heap, type_name, raised)
    }

    /// Replace `exception` with the fallback type, keeping its message.
    pub fn to_fallback(
        &self,
        registry: &TypeRegistry,
        heap: &ObjectHeap,
        fallback: &QualifiedName,
        exception: TypedException,
    ) -> TypedException {
        let raised = RaisedException::new(
            exception.type_name.clone(),
            format!("undeclared {}: {}", exception.type_name, exception.message),
        );
        build(registry, heap, fallback_type(registry, fallback), raised)
    }
}

impl std::fmt::Debug for ExceptionMarshaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExceptionMarshaller")
            .field("mappers", &self.mappers.read().len())
            .finish()
    }
}

fn is_exception(registry: &TypeRegistry, name: &QualifiedName) -> bool {
    registry.get(name).is_some_and(TypeDescriptor::is_exception)
}

fn fallback_type(registry: &TypeRegistry, fallback: &QualifiedName) -> QualifiedName {
    if is_exception(registry, fallback) {
        fallback.clone()
    } else {
        QualifiedName::from(builtins::RUNTIME_ERROR)
    }
}

fn build(
    registry: &TypeRegistry,
    heap: &ObjectHeap,
    type_name: QualifiedName,
    raised: RaisedException,
) -> TypedException {
    let marshaller = Marshaller::new(registry, heap);
    let mut fields = Vec::new();
    for (field, ty) in marshaller.fields_of(&type_name) {
        let given = raised.fields.iter().find(|(n, _)| *n == field).map(|(_, v)| v);
        let value = match given {
            Some(v) => v.clone(),
            None if field == builtins::MESSAGE_FIELD => Value::String(raised.message.clone()),
            None => marshaller.default_value(&ty),
        };
        fields.push((field, value));
    }
    TypedException {
        type_name,
        message: raised.message,
        fields,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "native code panicked".to_string()
    }
}
