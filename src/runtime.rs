//! The runtime facade.
//!
//! A [`Runtime`] owns everything the broker needs:
//!
//! - the type registry, behind a read/write lock (writers only during
//!   register, load and unload)
//! - the object heap
//! - the dispatch-table cache
//! - the exception marshaller
//! - the factory resolver and its singleton slots
//! - the implementation classes and loaded-module table
//!
//! It is `Send + Sync`; share it with `Arc`.
//!
//! # Example
//!
//! ```
//! use orb::{Runtime, Value};
//! use orb::core::{ComponentClass, InterfaceEntry, MethodSignature, NewInstance, PrimitiveKind};
//!
//! let runtime = Runtime::new();
//! runtime
//!     .register(
//!         InterfaceEntry::new("demo.XAnswer")
//!             .with_base("orb.XInterface")
//!             .with_method(MethodSignature::new("get", PrimitiveKind::Long.into()))
//!             .into(),
//!     )
//!     .unwrap();
//! runtime
//!     .register_class(ComponentClass::new("demo.Answer").implements("demo.XAnswer").method(
//!         "get",
//!         |ctx| {
//!             ctx.set_return(*ctx.this::<i32>()?);
//!             Ok(())
//!         },
//!     ))
//!     .unwrap();
//!
//! let obj = runtime.create_object(NewInstance::new("demo.Answer", 42i32)).unwrap();
//! let result = runtime
//!     .invoke_by_name(obj, &"demo.XAnswer".into(), "get", &mut Vec::new())
//!     .unwrap();
//! assert_eq!(result, Value::Long(42));
//! runtime.release(obj).unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use rustc_hash::{FxHashMap, FxHashSet};

use orb_core::{
    ComponentClass, ConstantValue, DispatchError, FactoryError, ModuleId, NativeError,
    NewInstance, ObjectData, ObjectHandle, ObjectHeap, OrbError, QualifiedName, RaisedException,
    RegistrationError, TypeDescriptor, TypeHash, TypedException,
};
use orb_registry::{BindingExport, TypeRegistry, builtins};

use crate::config::RuntimeConfig;
use crate::dispatch::{DispatchCache, DispatchTable};
use crate::exception::ExceptionMarshaller;
use crate::factory::FactoryResolver;
use crate::module::ModuleTable;

/// An implementation class as the runtime knows it.
#[derive(Debug, Clone)]
pub(crate) struct ClassBinding {
    pub(crate) class: Arc<ComponentClass>,
    pub(crate) module: ModuleId,
    /// Every interface the class implements, bases included.
    pub(crate) interfaces: Arc<FxHashSet<TypeHash>>,
    /// Interface new objects of the class are typed to.
    pub(crate) primary: TypeHash,
}

/// Component object runtime.
pub struct Runtime {
    pub(crate) config: RuntimeConfig,
    pub(crate) registry: RwLock<TypeRegistry>,
    pub(crate) heap: ObjectHeap,
    pub(crate) dispatch: DispatchCache,
    pub(crate) exceptions: ExceptionMarshaller,
    pub(crate) factories: FactoryResolver,
    pub(crate) classes: RwLock<FxHashMap<String, ClassBinding>>,
    pub(crate) modules: Mutex<ModuleTable>,
    /// Held shared while objects are being created, exclusively by unload.
    pub(crate) lifecycle: RwLock<()>,
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            config,
            registry: RwLock::new(TypeRegistry::with_builtins()),
            heap: ObjectHeap::new(),
            dispatch: DispatchCache::default(),
            exceptions: ExceptionMarshaller::new(),
            factories: FactoryResolver::default(),
            classes: RwLock::new(FxHashMap::default()),
            modules: Mutex::new(ModuleTable::default()),
            lifecycle: RwLock::new(()),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    // ==========================================================================
    // Types
    // ==========================================================================

    /// Read access to the registry. Do not hold the guard across native calls.
    pub fn registry(&self) -> RwLockReadGuard<'_, TypeRegistry> {
        self.registry.read()
    }

    /// Register a type on behalf of the embedding application.
    pub fn register(&self, desc: TypeDescriptor) -> Result<Arc<TypeDescriptor>, OrbError> {
        Ok(self.registry.write().register(desc, ModuleId::HOST)?)
    }

    pub fn resolve(&self, name: &QualifiedName) -> Result<Arc<TypeDescriptor>, OrbError> {
        Ok(self.registry.read().resolve(name)?)
    }

    pub fn resolve_constant(&self, name: &QualifiedName) -> Result<ConstantValue, OrbError> {
        Ok(self.registry.read().resolve_constant(name)?)
    }

    /// Project the registry into a binding tree.
    pub fn export_bindings(&self) -> BindingExport {
        BindingExport::from_registry(&self.registry.read())
    }

    /// The dispatch table for `interface`, built on first use.
    pub fn dispatch_table(&self, interface: &QualifiedName) -> Result<Arc<DispatchTable>, OrbError> {
        let registry = self.registry.read();
        self.dispatch.get_or_build(&registry, interface)
    }

    // ==========================================================================
    // Implementations
    // ==========================================================================

    /// Register an implementation class on behalf of the embedding application.
    pub fn register_class(&self, class: ComponentClass) -> Result<(), OrbError> {
        let binding = self.bind_class(class, ModuleId::HOST)?;
        self.insert_class(binding)
    }

    pub(crate) fn bind_class(
        &self,
        class: ComponentClass,
        module: ModuleId,
    ) -> Result<ClassBinding, OrbError> {
        let registry = self.registry.read();
        let mut interfaces = FxHashSet::default();
        interfaces.insert(TypeHash::from_name(builtins::BASE_INTERFACE));
        for iface in class.interfaces() {
            for name in registry.interface_closure(iface)? {
                interfaces.insert(name.to_type_hash());
            }
        }
        let primary = class
            .interfaces()
            .first()
            .map(QualifiedName::to_type_hash)
            .unwrap_or_else(|| TypeHash::from_name(builtins::BASE_INTERFACE));
        Ok(ClassBinding {
            class: Arc::new(class),
            module,
            interfaces: Arc::new(interfaces),
            primary,
        })
    }

    pub(crate) fn insert_class(&self, binding: ClassBinding) -> Result<(), OrbError> {
        let mut classes = self.classes.write();
        let name = binding.class.name().to_string();
        if classes.contains_key(&name) {
            return Err(RegistrationError::DuplicateType { name }.into());
        }
        log::debug!("bound implementation {name} ({})", binding.module);
        classes.insert(name, binding);
        Ok(())
    }

    pub(crate) fn class_binding(&self, implementation: &str) -> Option<ClassBinding> {
        self.classes.read().get(implementation).cloned()
    }

    /// Put a native instance on the heap under its implementation class.
    ///
    /// The returned handle holds one count and is typed to the class's first
    /// declared interface.
    pub fn create_object(&self, instance: NewInstance) -> Result<ObjectHandle, OrbError> {
        let _creating = self.lifecycle.read_recursive();
        let binding = self
            .class_binding(&instance.implementation)
            .ok_or_else(|| FactoryError::UnknownImplementation(instance.implementation.clone()))?;
        Ok(self.allocate(&binding, instance, binding.primary))
    }

    pub(crate) fn allocate(
        &self,
        binding: &ClassBinding,
        instance: NewInstance,
        interface: TypeHash,
    ) -> ObjectHandle {
        let data = ObjectData::new(
            instance.value,
            Arc::clone(&binding.class),
            binding.module,
            Arc::clone(&binding.interfaces),
        );
        self.heap.allocate(data, interface)
    }

    // ==========================================================================
    // Objects
    // ==========================================================================

    pub fn heap(&self) -> &ObjectHeap {
        &self.heap
    }

    /// Increment an object's count. Returns the new count.
    pub fn acquire(&self, handle: ObjectHandle) -> Result<u32, OrbError> {
        Ok(self.heap.acquire(handle)?)
    }

    /// Decrement an object's count, destroying it at zero. Returns the new count.
    pub fn release(&self, handle: ObjectHandle) -> Result<u32, OrbError> {
        Ok(self.heap.release(handle)?)
    }

    pub fn ref_count(&self, handle: ObjectHandle) -> Option<u32> {
        self.heap.ref_count(handle)
    }

    /// Ask an object for another interface.
    ///
    /// `Ok(None)` means the object does not support it. On success the
    /// returned handle holds its own count.
    pub fn query_interface(
        &self,
        handle: ObjectHandle,
        interface: &QualifiedName,
    ) -> Result<Option<ObjectHandle>, OrbError> {
        let hash = {
            let registry = self.registry.read();
            let desc = registry.resolve(interface)?;
            if !desc.is_interface() {
                return Err(DispatchError::NotAnInterface(interface.to_string()).into());
            }
            desc.type_hash()
        };
        Ok(self.heap.query_interface(handle, hash)?)
    }

    // ==========================================================================
    // Exceptions
    // ==========================================================================

    /// Run native code and convert any failure into a typed exception.
    pub fn catch_native<T>(
        &self,
        call: impl FnOnce() -> Result<T, NativeError>,
    ) -> Result<T, TypedException> {
        ExceptionMarshaller::run(self.config.is_catch_panics(), call)
            .map_err(|err| self.typed_exception(err))
    }

    pub(crate) fn typed_exception(&self, err: NativeError) -> TypedException {
        let raised = self.exceptions.raised_for(err);
        self.resolve_raised(raised)
    }

    pub(crate) fn resolve_raised(&self, raised: RaisedException) -> TypedException {
        let registry = self.registry.read();
        self.exceptions.resolve(
            &registry,
            &self.heap,
            self.config.fallback_exception_name(),
            raised,
        )
    }

    /// Map native errors of type `E` to a registered exception.
    pub fn register_error_mapper<E, F>(&self, map: F)
    where
        E: std::error::Error + 'static,
        F: Fn(&E) -> RaisedException + Send + Sync + 'static,
    {
        self.exceptions.register_mapper(map);
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("types", &self.registry.read().len())
            .field("heap", &self.heap)
            .field("dispatch_tables", &self.dispatch.len())
            .field("classes", &self.classes.read().len())
            .finish_non_exhaustive()
    }
}
