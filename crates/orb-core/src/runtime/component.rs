//! Implementation classes.
//!
//! A [`ComponentClass`] is what a module registers for each implementation:
//! the interfaces it implements and the native code behind their methods.
//! Methods are looked up by name, with per-interface overrides for the case
//! where two implemented interfaces declare the same name differently.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::native_error::NativeError;
use crate::{QualifiedName, TypeHash};

use super::{CallContext, NativeFn};

/// Answers `query_interface` for interfaces outside the class's static set.
pub type QueryHook = Arc<dyn Fn(&(dyn Any + Send + Sync), TypeHash) -> bool + Send + Sync>;

/// A native implementation of one or more interfaces.
///
/// # Example
///
/// ```
/// use orb_core::runtime::ComponentClass;
///
/// struct Counter(std::sync::atomic::AtomicI32);
///
/// let class = ComponentClass::new("test.CounterImpl")
///     .implements("test.XCounter")
///     .method("increment", |ctx| {
///         let this = ctx.this::<Counter>()?;
///         let n = this.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
///         ctx.set_return(n);
///         Ok(())
///     });
/// assert!(class.find_method(&"test.XCounter".into(), "increment").is_some());
/// ```
pub struct ComponentClass {
    name: String,
    interfaces: Vec<QualifiedName>,
    methods: FxHashMap<String, NativeFn>,
    overrides: FxHashMap<(QualifiedName, String), NativeFn>,
    query_hook: Option<QueryHook>,
}

impl ComponentClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interfaces: Vec::new(),
            methods: FxHashMap::default(),
            overrides: FxHashMap::default(),
            query_hook: None,
        }
    }

    /// Declare a directly implemented interface. Its bases are implied.
    pub fn implements(mut self, interface: impl Into<QualifiedName>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Bind a method by name for every implemented interface.
    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        let name = name.into();
        let id = TypeHash::from_method(TypeHash::from_name(&self.name), &name);
        self.methods.insert(name, NativeFn::new(id, f));
        self
    }

    /// Bind a method for one interface only.
    pub fn method_for<F>(mut self, interface: impl Into<QualifiedName>, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        let interface = interface.into();
        let name = name.into();
        let id = TypeHash::from_method(interface.to_type_hash(), &name);
        self.overrides.insert((interface, name), NativeFn::new(id, f));
        self
    }

    /// Install a dynamic `query_interface` hook.
    pub fn with_query_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&(dyn Any + Send + Sync), TypeHash) -> bool + Send + Sync + 'static,
    {
        self.query_hook = Some(Arc::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directly implemented interfaces.
    pub fn interfaces(&self) -> &[QualifiedName] {
        &self.interfaces
    }

    pub fn query_hook(&self) -> Option<&QueryHook> {
        self.query_hook.as_ref()
    }

    /// Native code for `name` as declared by `interface`.
    pub fn find_method(&self, interface: &QualifiedName, name: &str) -> Option<&NativeFn> {
        self.overrides
            .get(&(interface.clone(), name.to_string()))
            .or_else(|| self.methods.get(name))
    }
}

impl fmt::Debug for ComponentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentClass")
            .field("name", &self.name)
            .field("interfaces", &self.interfaces)
            .field("methods", &self.methods.len())
            .field("overrides", &self.overrides.len())
            .finish()
    }
}
