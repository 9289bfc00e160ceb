//! Service/factory resolver.
//!
//! `create_instance` looks the service up in the registry, picks the
//! constructor matching the requested name and the supplied arguments, and
//! runs the factory a module bound for it. What the factory returns is put on
//! the heap under its implementation class.
//!
//! # Singletons
//!
//! Each singleton service has one lazily initialised slot. Concurrent first
//! calls construct exactly once: one caller runs the factory while the others
//! wait for it and then share the result. A failed construction leaves the
//! slot empty, so a later call tries again. The slot owns one count on the
//! instance; every `create_instance` call acquires another for its caller.
//! Slots are torn down when the module that provides the implementation
//! unloads.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use orb_core::{
    CallContext, ConstructorEntry, DispatchError, FactoryError, ModuleId, NativeFactory,
    ObjectHandle, OrbError, QualifiedName, RegistrationError, TypeDescriptor, Value,
};

use crate::Runtime;
use crate::dispatch::Marshaller;
use crate::exception::ExceptionMarshaller;

#[derive(Debug, Clone)]
struct BoundFactory {
    factory: NativeFactory,
    module: ModuleId,
}

#[derive(Debug, Default)]
struct SingletonSlot {
    cell: OnceCell<ObjectHandle>,
}

/// Factory bindings and singleton slots.
#[derive(Debug, Default)]
pub(crate) struct FactoryResolver {
    bindings: RwLock<FxHashMap<(QualifiedName, String), BoundFactory>>,
    singletons: Mutex<FxHashMap<QualifiedName, Arc<SingletonSlot>>>,
}

impl FactoryResolver {
    pub(crate) fn bind(
        &self,
        service: QualifiedName,
        constructor: String,
        factory: NativeFactory,
        module: ModuleId,
    ) -> Result<(), RegistrationError> {
        let mut bindings = self.bindings.write();
        let key = (service, constructor);
        if bindings.contains_key(&key) {
            return Err(RegistrationError::DuplicateType {
                name: format!("{}.{}", key.0, key.1),
            });
        }
        log::debug!("bound factory {}.{} ({module})", key.0, key.1);
        bindings.insert(key, BoundFactory { factory, module });
        Ok(())
    }

    /// Drop every factory `module` bound. Returns how many were removed.
    pub(crate) fn unbind_module(&self, module: ModuleId) -> usize {
        let mut bindings = self.bindings.write();
        let before = bindings.len();
        bindings.retain(|_, bound| bound.module != module);
        before - bindings.len()
    }

    fn factory(&self, service: &QualifiedName, constructor: &str) -> Option<NativeFactory> {
        self.bindings
            .read()
            .get(&(service.clone(), constructor.to_string()))
            .map(|bound| bound.factory.clone())
    }

    fn slot(&self, service: &QualifiedName) -> Arc<SingletonSlot> {
        let mut singletons = self.singletons.lock();
        Arc::clone(singletons.entry(service.clone()).or_default())
    }

    /// Initialised singleton instances.
    pub(crate) fn singletons(&self) -> Vec<(QualifiedName, ObjectHandle)> {
        self.singletons
            .lock()
            .iter()
            .filter_map(|(name, slot)| slot.cell.get().map(|h| (name.clone(), *h)))
            .collect()
    }

    /// Empty a singleton slot, returning the handle it owned.
    pub(crate) fn take_singleton(&self, service: &QualifiedName) -> Option<ObjectHandle> {
        let slot = self.singletons.lock().remove(service)?;
        slot.cell.get().copied()
    }
}

/// Pick the constructor for `name` accepting `args`.
///
/// A service declaring no constructors has an implicit `default_name`
/// constructor taking any arguments.
fn select_constructor(
    service: &QualifiedName,
    constructors: &[ConstructorEntry],
    name: &str,
    default_name: &str,
    args: &[Value],
    marshaller: &Marshaller<'_, '_>,
) -> Result<ConstructorEntry, FactoryError> {
    if constructors.is_empty() && name == default_name {
        return Ok(ConstructorEntry::new(default_name).with_rest("arguments"));
    }
    constructors
        .iter()
        .filter(|c| c.name == name && c.accepts_arity(args.len()))
        .find(|c| {
            c.params
                .iter()
                .zip(args)
                .all(|(p, v)| marshaller.conforms(&p.ty, v))
        })
        .cloned()
        .ok_or_else(|| FactoryError::NoMatchingConstructor {
            service: service.to_string(),
            constructor: name.to_string(),
            arity: args.len(),
        })
}

impl Runtime {
    /// Create an instance of a service through one of its constructors.
    ///
    /// For singletons the same object is returned to every caller. Either way
    /// the returned handle holds one count owned by the caller.
    ///
    /// An unload of the providing module waits for calls already in progress
    /// here. Factories must not unload modules themselves.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn create_instance(
        &self,
        service: &QualifiedName,
        constructor: &str,
        args: &[Value],
    ) -> Result<ObjectHandle, OrbError> {
        let _creating = self.lifecycle.read_recursive();
        let (interface, singleton, ctor) = {
            let registry = self.registry.read();
            let desc = registry
                .get(service)
                .filter(|d| d.is_instantiable())
                .ok_or_else(|| FactoryError::UnknownService(service.to_string()))?;
            let svc = desc
                .as_service()
                .ok_or_else(|| FactoryError::UnknownService(service.to_string()))?;
            let marshaller = Marshaller::new(&registry, &self.heap);
            let ctor = select_constructor(
                service,
                &svc.constructors,
                constructor,
                self.config.default_constructor_name(),
                args,
                &marshaller,
            )?;
            let singleton = matches!(desc, TypeDescriptor::Singleton(_));
            (svc.interface.clone(), singleton, ctor)
        };

        let factory = self.factories.factory(service, &ctor.name).ok_or_else(|| {
            FactoryError::FactoryNotBound {
                service: service.to_string(),
            }
        })?;

        if !singleton {
            return self.construct(service, interface.as_ref(), &ctor, &factory, args);
        }

        let slot = self.factories.slot(service);
        let handle = *slot
            .cell
            .get_or_try_init(|| self.construct(service, interface.as_ref(), &ctor, &factory, args))?;
        self.heap.acquire(handle)?;
        Ok(handle)
    }

    /// Create using the configured default constructor name.
    pub fn create_default(&self, service: &QualifiedName) -> Result<ObjectHandle, OrbError> {
        let name = self.config.default_constructor_name().to_string();
        self.create_instance(service, &name, &[])
    }

    fn construct(
        &self,
        service: &QualifiedName,
        interface: Option<&QualifiedName>,
        ctor: &ConstructorEntry,
        factory: &NativeFactory,
        args: &[Value],
    ) -> Result<ObjectHandle, OrbError> {
        let _pins = {
            let registry = self.registry.read();
            Marshaller::new(&registry, &self.heap).pin_objects(args)?
        };

        log::trace!("constructing {service} via {}", ctor.name);
        let mut call_args = args.to_vec();
        let mut ret = Value::Void;
        let instance = ExceptionMarshaller::run(self.config.is_catch_panics(), || {
            let mut ctx = CallContext::new(&mut call_args, &mut ret, &self.heap);
            factory.call(&mut ctx)
        })
        .map_err(|err| {
            let exception = self.typed_exception(err);
            self.check_declared(&ctor.name, &ctor.raises, exception)
        })?;

        let binding = self
            .class_binding(&instance.implementation)
            .ok_or_else(|| FactoryError::UnknownImplementation(instance.implementation.clone()))?;

        let typed_to = match interface {
            Some(name) => {
                let hash = name.to_type_hash();
                if !binding.interfaces.contains(&hash) {
                    return Err(DispatchError::InterfaceNotImplemented {
                        interface: name.to_string(),
                    }
                    .into());
                }
                hash
            }
            None => binding.primary,
        };
        Ok(self.allocate(&binding, instance, typed_to))
    }

    /// Handles currently held by singleton slots whose object belongs to `module`.
    pub(crate) fn singletons_of(&self, module: ModuleId) -> Vec<(QualifiedName, ObjectHandle)> {
        self.factories
            .singletons()
            .into_iter()
            .filter(|(_, handle)| {
                self.heap
                    .get(*handle)
                    .is_ok_and(|data| data.module() == module)
            })
            .collect()
    }

    /// The singleton instance of `service`, if constructed. Does not acquire.
    pub fn singleton_instance(&self, service: &QualifiedName) -> Option<ObjectHandle> {
        self.factories
            .singletons()
            .into_iter()
            .find(|(name, _)| name == service)
            .map(|(_, handle)| handle)
    }
}
