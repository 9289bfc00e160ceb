//! Module description builder.
//!
//! A [`Module`] collects everything a component module contributes: its type
//! descriptors, implementation classes, factories and an optional teardown
//! hook. Names without a `.` are placed in the module's namespace.
//!
//! # Example
//!
//! ```
//! use orb::Module;
//! use orb::core::{ComponentClass, NewInstance};
//!
//! # fn main() -> Result<(), orb::OrbError> {
//! let mut module = Module::new("demo.shapes");
//! module
//!     .interface("XShape")
//!     .base("orb.XInterface")
//!     .method("double area()")?
//!     .attribute("readonly string Name")?
//!     .build();
//! module
//!     .service("Circle")
//!     .implementing("XShape")
//!     .constructor("create(double radius)")?
//!     .build();
//! module.class(ComponentClass::new("demo.shapes.CircleImpl").implements("demo.shapes.XShape"));
//! module.factory("Circle", "create", |ctx| {
//!     let radius: f64 = ctx.arg(0)?;
//!     Ok(NewInstance::new("demo.shapes.CircleImpl", radius))
//! });
//! assert_eq!(module.types().len(), 2);
//! # Ok(())
//! # }
//! ```

use std::fmt;

use orb_core::{
    CallContext, ComponentClass, ConstantValue, ConstantsEntry, EnumEntry, InterfaceEntry,
    NativeError, NativeFactory, NewInstance, QualifiedName, RegistrationError, ServiceEntry,
    StructEntry, TypeDescriptor, TypedefEntry,
};

use super::decl;

type Teardown = Box<dyn FnOnce() + Send>;

/// A factory bound to `(service, constructor)`.
#[derive(Debug)]
pub(crate) struct FactoryBinding {
    pub(crate) service: QualifiedName,
    pub(crate) constructor: String,
    pub(crate) factory: NativeFactory,
}

/// Everything one component module provides.
pub struct Module {
    name: QualifiedName,
    namespace: Vec<String>,
    types: Vec<TypeDescriptor>,
    classes: Vec<ComponentClass>,
    factories: Vec<FactoryBinding>,
    teardown: Option<Teardown>,
}

impl Module {
    /// Create an empty module. Its dotted name is also its namespace.
    pub fn new(name: impl Into<QualifiedName>) -> Self {
        let name = name.into();
        let namespace = name.segments().map(str::to_string).collect();
        Self {
            name,
            namespace,
            types: Vec::new(),
            classes: Vec::new(),
            factories: Vec::new(),
            teardown: None,
        }
    }

    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    pub fn types(&self) -> &[TypeDescriptor] {
        &self.types
    }

    pub fn classes(&self) -> &[ComponentClass] {
        &self.classes
    }

    /// Qualify `name` against the module namespace unless it is already dotted.
    pub fn qualify(&self, name: &str) -> QualifiedName {
        if name.contains('.') {
            QualifiedName::from_qualified_string(name)
        } else {
            QualifiedName::new(name, self.namespace.clone())
        }
    }

    // ==========================================================================
    // Types
    // ==========================================================================

    /// Add a fully built descriptor.
    pub fn add_type(&mut self, desc: TypeDescriptor) -> &mut Self {
        self.types.push(desc);
        self
    }

    pub fn interface(&mut self, name: &str) -> InterfaceBuilder<'_> {
        let entry = InterfaceEntry::new(self.qualify(name));
        InterfaceBuilder {
            module: self,
            entry,
        }
    }

    pub fn structure(&mut self, name: &str) -> StructBuilder<'_> {
        let entry = StructEntry::new(self.qualify(name));
        StructBuilder {
            module: self,
            entry,
            exception: false,
        }
    }

    /// An exception type. Without an explicit base it derives from `orb.Exception`.
    pub fn exception(&mut self, name: &str) -> StructBuilder<'_> {
        let entry = StructEntry::new(self.qualify(name)).with_base("orb.Exception");
        StructBuilder {
            module: self,
            entry,
            exception: true,
        }
    }

    pub fn enumeration(&mut self, name: &str) -> EnumBuilder<'_> {
        let entry = EnumEntry::new(self.qualify(name));
        EnumBuilder {
            module: self,
            entry,
        }
    }

    pub fn constants(&mut self, name: &str) -> ConstantsBuilder<'_> {
        let entry = ConstantsEntry::new(self.qualify(name));
        ConstantsBuilder {
            module: self,
            entry,
        }
    }

    /// `typedef <target> <name>`.
    pub fn typedef(&mut self, name: &str, target: &str) -> Result<&mut Self, RegistrationError> {
        let target = decl::parse_type(target, &self.namespace)?;
        let entry = TypedefEntry::new(self.qualify(name), target);
        Ok(self.add_type(TypeDescriptor::Typedef(entry)))
    }

    pub fn service(&mut self, name: &str) -> ServiceBuilder<'_> {
        let entry = ServiceEntry::new(self.qualify(name));
        ServiceBuilder {
            module: self,
            entry,
            singleton: false,
        }
    }

    pub fn singleton(&mut self, name: &str) -> ServiceBuilder<'_> {
        let entry = ServiceEntry::new(self.qualify(name));
        ServiceBuilder {
            module: self,
            entry,
            singleton: true,
        }
    }

    // ==========================================================================
    // Implementations
    // ==========================================================================

    pub fn class(&mut self, class: ComponentClass) -> &mut Self {
        self.classes.push(class);
        self
    }

    /// Bind the factory for one constructor of `service`.
    pub fn factory<F>(&mut self, service: &str, constructor: &str, f: F) -> &mut Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<NewInstance, NativeError> + Send + Sync + 'static,
    {
        let service = self.qualify(service);
        self.factories.push(FactoryBinding {
            service,
            constructor: constructor.to_string(),
            factory: NativeFactory::new(f),
        });
        self
    }

    /// Run `f` once after the module has been unloaded.
    pub fn with_teardown<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.teardown = Some(Box::new(f));
        self
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        QualifiedName,
        Vec<TypeDescriptor>,
        Vec<ComponentClass>,
        Vec<FactoryBinding>,
        Option<Teardown>,
    ) {
        (
            self.name,
            self.types,
            self.classes,
            self.factories,
            self.teardown,
        )
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("types", &self.types.len())
            .field("classes", &self.classes.len())
            .field("factories", &self.factories.len())
            .field("teardown", &self.teardown.is_some())
            .finish()
    }
}

// ==========================================================================
// Type builders
// ==========================================================================

pub struct InterfaceBuilder<'m> {
    module: &'m mut Module,
    entry: InterfaceEntry,
}

impl InterfaceBuilder<'_> {
    pub fn base(mut self, base: &str) -> Self {
        self.entry = self.entry.with_base(self.module.qualify(base));
        self
    }

    /// Add a method from its declaration, e.g. `"long add([in] long a, [in] long b)"`.
    pub fn method(mut self, decl: &str) -> Result<Self, RegistrationError> {
        let method = decl::parse_method(decl, &self.module.namespace)?;
        self.entry = self.entry.with_method(method);
        Ok(self)
    }

    /// Add an attribute from its declaration, e.g. `"readonly string Name"`.
    pub fn attribute(mut self, decl: &str) -> Result<Self, RegistrationError> {
        let attribute = decl::parse_attribute(decl, &self.module.namespace)?;
        self.entry = self.entry.with_attribute(attribute);
        Ok(self)
    }

    pub fn build(self) {
        self.module.types.push(TypeDescriptor::Interface(self.entry));
    }
}

/// Builds a struct or an exception.
pub struct StructBuilder<'m> {
    module: &'m mut Module,
    entry: StructEntry,
    exception: bool,
}

impl StructBuilder<'_> {
    pub fn base(mut self, base: &str) -> Self {
        self.entry.base = Some(self.module.qualify(base));
        self
    }

    /// Add a field from its declaration, e.g. `"long X"`.
    pub fn field(mut self, decl: &str) -> Result<Self, RegistrationError> {
        let (name, ty) = decl::parse_field(decl, &self.module.namespace)?;
        self.entry = self.entry.with_field(name, ty);
        Ok(self)
    }

    pub fn build(self) {
        let desc = if self.exception {
            TypeDescriptor::Exception(self.entry)
        } else {
            TypeDescriptor::Struct(self.entry)
        };
        self.module.types.push(desc);
    }
}

pub struct EnumBuilder<'m> {
    module: &'m mut Module,
    entry: EnumEntry,
}

impl EnumBuilder<'_> {
    pub fn value(mut self, name: &str, value: i32) -> Self {
        self.entry = self.entry.with_value(name, value);
        self
    }

    pub fn build(self) {
        self.module.types.push(TypeDescriptor::Enum(self.entry));
    }
}

pub struct ConstantsBuilder<'m> {
    module: &'m mut Module,
    entry: ConstantsEntry,
}

impl ConstantsBuilder<'_> {
    pub fn constant(mut self, name: &str, value: ConstantValue) -> Self {
        self.entry = self.entry.with_constant(name, value);
        self
    }

    pub fn build(self) {
        self.module.types.push(TypeDescriptor::Constants(self.entry));
    }
}

/// Builds a service or a singleton.
pub struct ServiceBuilder<'m> {
    module: &'m mut Module,
    entry: ServiceEntry,
    singleton: bool,
}

impl ServiceBuilder<'_> {
    pub fn implementing(mut self, interface: &str) -> Self {
        self.entry = self.entry.implementing(self.module.qualify(interface));
        self
    }

    /// Add a constructor from its declaration, e.g. `"createWithName(string name)"`.
    pub fn constructor(mut self, decl: &str) -> Result<Self, RegistrationError> {
        let ctor = decl::parse_constructor(decl, &self.module.namespace)?;
        self.entry = self.entry.with_constructor(ctor);
        Ok(self)
    }

    pub fn build(self) {
        let desc = if self.singleton {
            TypeDescriptor::Singleton(self.entry)
        } else {
            TypeDescriptor::Service(self.entry)
        };
        self.module.types.push(desc);
    }
}
