//! Module loading and unloading.
//!
//! Loading a [`Module`] registers its types under a fresh [`ModuleId`],
//! validates them, then binds its implementation classes and factories. Any
//! failure rolls the whole load back. Unloading is refused while objects the
//! module allocated are still alive; otherwise it releases the module's
//! singletons, removes everything it contributed, invalidates dispatch tables
//! that referenced removed types and finally runs the module's teardown hook.

mod builder;
pub mod decl;
mod entry;

pub use builder::{
    ConstantsBuilder, EnumBuilder, InterfaceBuilder, Module, ServiceBuilder, StructBuilder,
};
pub use entry::{ABI_VERSION, ModuleEntryPoint};

use std::collections::BTreeMap;
use std::fmt;

use orb_core::{
    FactoryError, ModuleEntry, ModuleError, ModuleId, OrbError, QualifiedName, RegistrationError,
    TypeDescriptor, TypeKind,
};

use crate::Runtime;

struct LoadedModule {
    name: QualifiedName,
    types: Vec<QualifiedName>,
    classes: Vec<String>,
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("name", &self.name)
            .field("types", &self.types)
            .field("classes", &self.classes)
            .finish_non_exhaustive()
    }
}

/// Loaded modules by id.
#[derive(Debug, Default)]
pub(crate) struct ModuleTable {
    next: u32,
    loaded: BTreeMap<ModuleId, LoadedModule>,
}

impl ModuleTable {
    fn next_id(&mut self) -> ModuleId {
        let index = self.next.max(ModuleId::FIRST_LOADED);
        self.next = index + 1;
        ModuleId::new(index)
    }

    fn find(&self, name: &QualifiedName) -> Option<ModuleId> {
        self.loaded
            .iter()
            .find(|(_, m)| &m.name == name)
            .map(|(id, _)| *id)
    }
}

impl Runtime {
    // ==========================================================================
    // Loading
    // ==========================================================================

    /// Load a module described by its entry point.
    pub fn load_module(&self, entry: &ModuleEntryPoint) -> Result<ModuleId, OrbError> {
        if entry.abi_version != ABI_VERSION {
            return Err(ModuleError::IncompatibleAbi {
                module: entry.name.to_string(),
                found: entry.abi_version,
                expected: ABI_VERSION,
            }
            .into());
        }
        let mut module = (entry.describe)()?;
        if module.name().to_string() != entry.name {
            return Err(RegistrationError::invalid_type(
                entry.name,
                format!("entry point describes module '{}'", module.name()),
            )
            .into());
        }
        if let Some(teardown) = entry.teardown {
            module.with_teardown(teardown);
        }
        self.load(module)
    }

    /// Load a module, all or nothing.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn load(&self, module: Module) -> Result<ModuleId, OrbError> {
        let (name, mut types, classes, factories, teardown) = module.into_parts();
        let mut modules = self.modules.lock();
        if modules.find(&name).is_some() {
            return Err(ModuleError::AlreadyLoaded(name.to_string()).into());
        }
        let id = modules.next_id();

        types.insert(0, TypeDescriptor::Module(ModuleEntry::new(name.clone())));
        let type_names: Vec<QualifiedName> = types.iter().map(|t| t.name().clone()).collect();
        {
            let mut registry = self.registry.write();
            registry.register_all(types, id)?;
            if self.config.is_validate_on_load() {
                if let Err(e) = registry.validate(&type_names) {
                    registry.unregister_module(id);
                    log::warn!("module {name} failed validation: {e}");
                    return Err(e.into());
                }
            }
        }

        let mut class_names = Vec::with_capacity(classes.len());
        let bound = classes.into_iter().try_for_each(|class| {
            let binding = self.bind_class(class, id)?;
            class_names.push(binding.class.name().to_string());
            self.insert_class(binding)
        });
        let bound = bound.and_then(|()| {
            factories.into_iter().try_for_each(|f| {
                self.check_service(&f.service)?;
                self.factories
                    .bind(f.service, f.constructor, f.factory, id)
                    .map_err(OrbError::from)
            })
        });
        if let Err(e) = bound {
            self.remove_contributions(id);
            log::warn!("loading module {name} failed: {e}");
            return Err(e);
        }

        log::info!(
            "loaded module {name} as {id}: {} types, {} classes",
            type_names.len(),
            class_names.len()
        );
        modules.loaded.insert(
            id,
            LoadedModule {
                name,
                types: type_names,
                classes: class_names,
                teardown,
            },
        );
        Ok(id)
    }

    fn check_service(&self, service: &QualifiedName) -> Result<(), OrbError> {
        match self.registry.read().get(service).map(TypeDescriptor::kind) {
            Some(TypeKind::Service | TypeKind::Singleton) => Ok(()),
            _ => Err(FactoryError::UnknownService(service.to_string()).into()),
        }
    }

    // ==========================================================================
    // Unloading
    // ==========================================================================

    /// Unload a module.
    ///
    /// Fails with `ModuleBusy` while objects allocated under the module are
    /// alive. Singleton instances referenced only by their slot do not count.
    ///
    /// Waits for object creations in progress on other threads, and blocks new
    /// ones until the module's classes and factories are gone.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn unload(&self, id: ModuleId) -> Result<(), OrbError> {
        let gate = self.lifecycle.write();
        let mut modules = self.modules.lock();
        let Some(name) = modules.loaded.get(&id).map(|m| m.name.clone()) else {
            return Err(ModuleError::UnknownModule(id.to_string()).into());
        };

        let singletons = self.singletons_of(id);
        let held_by_slot = singletons
            .iter()
            .filter(|(_, handle)| self.heap.ref_count(*handle) == Some(1))
            .count();
        let live = self.heap.live_count_for(id).saturating_sub(held_by_slot);
        if live > 0 {
            log::debug!("refusing to unload {name}: {live} live objects");
            return Err(ModuleError::ModuleBusy {
                module: name.to_string(),
                live,
            }
            .into());
        }

        for (service, _) in &singletons {
            if let Some(handle) = self.factories.take_singleton(service) {
                if let Err(e) = self.heap.release(handle) {
                    log::error!("releasing singleton {service} of {name}: {e}");
                }
            }
        }

        let removed = self.remove_contributions(id);
        for service in &removed {
            let Some(handle) = self.factories.take_singleton(service) else {
                continue;
            };
            if self.heap.is_alive(handle) {
                if let Err(e) = self.heap.release(handle) {
                    log::error!("releasing singleton {service} of {name}: {e}");
                }
            }
        }
        let teardown = modules.loaded.remove(&id).and_then(|m| m.teardown);
        drop(modules);
        drop(gate);

        log::info!("unloaded module {name} ({id}), removed {} types", removed.len());
        if let Some(teardown) = teardown {
            teardown();
        }
        Ok(())
    }

    /// Drop factories, classes and types `id` contributed. Returns the removed type names.
    fn remove_contributions(&self, id: ModuleId) -> Vec<QualifiedName> {
        self.factories.unbind_module(id);
        self.classes.write().retain(|_, binding| binding.module != id);
        let removed = self.registry.write().unregister_module(id);
        let stale = self.dispatch.invalidate(&removed);
        if stale > 0 {
            log::debug!("invalidated {stale} dispatch tables");
        }
        removed
    }

    // ==========================================================================
    // Queries
    // ==========================================================================

    /// Loaded modules in load order.
    pub fn loaded_modules(&self) -> Vec<(ModuleId, QualifiedName)> {
        self.modules
            .lock()
            .loaded
            .iter()
            .map(|(id, m)| (*id, m.name.clone()))
            .collect()
    }

    pub fn module_id(&self, name: &QualifiedName) -> Option<ModuleId> {
        self.modules.lock().find(name)
    }

    /// Types a loaded module declared.
    pub fn module_types(&self, id: ModuleId) -> Option<Vec<QualifiedName>> {
        self.modules.lock().loaded.get(&id).map(|m| m.types.clone())
    }
}
