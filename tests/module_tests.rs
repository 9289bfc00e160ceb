//! Loading and unloading modules.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use common::*;
use orb::core::{ComponentClass, FactoryError, ModuleError, NewInstance, RegistrationError};
use parking_lot::Mutex;
use orb::{
    ABI_VERSION, Module, ModuleEntryPoint, OrbError, QualifiedName, Runtime, RuntimeConfig, Value,
};

fn name(s: &str) -> QualifiedName {
    QualifiedName::from(s)
}

#[test]
fn load_registers_and_reports() {
    let fx = load_shapes();
    assert_eq!(fx.runtime.module_id(&name(MODULE)), Some(fx.module));
    assert_eq!(fx.runtime.loaded_modules(), vec![(fx.module, name(MODULE))]);
    let types = fx.runtime.module_types(fx.module).unwrap();
    assert!(types.contains(&name(XSHAPE)));
    assert!(types.contains(&name(MODULE)));
}

#[test]
fn loading_twice_is_rejected() {
    let fx = load_shapes();
    let again = shapes_module(&fx.counters).unwrap();
    let err = fx.runtime.load(again).unwrap_err();
    assert!(matches!(
        err,
        OrbError::Module(ModuleError::AlreadyLoaded(_))
    ));
}

#[test]
fn validation_failure_rolls_back() {
    let runtime = Runtime::new();
    let before = runtime.registry().len();

    let mut module = Module::new("test.broken");
    module
        .interface("XBroken")
        .base("orb.XInterface")
        .method("Missing get()")
        .unwrap()
        .build();
    let err = runtime.load(module).unwrap_err();
    assert!(matches!(
        err,
        OrbError::Registration(RegistrationError::UnknownType(_))
    ));
    assert_eq!(runtime.registry().len(), before);
    assert!(runtime.loaded_modules().is_empty());
}

#[test]
fn validation_can_be_deferred() {
    let runtime = Runtime::with_config(RuntimeConfig::default().validate_on_load(false));
    let mut module = Module::new("test.lazy");
    module
        .interface("XLazy")
        .base("orb.XInterface")
        .method("Later get()")
        .unwrap()
        .build();
    runtime.load(module).unwrap();
    assert!(runtime.registry().validate_all().is_err());
}

#[test]
fn binding_failure_rolls_back() {
    let runtime = Runtime::new();
    let mut module = Module::new("test.partial");
    module.interface("XThing").base("orb.XInterface").build();
    module.class(ComponentClass::new("test.partial.Thing").implements("test.partial.XThing"));
    module.factory("NoSuchService", "create", |_| unreachable!());
    let err = runtime.load(module).unwrap_err();
    assert!(matches!(
        err,
        OrbError::Factory(FactoryError::UnknownService(_))
    ));

    assert!(runtime.resolve(&name("test.partial.XThing")).is_err());
    // The class binding was rolled back too, so a clean reload succeeds.
    let mut module = Module::new("test.partial");
    module.interface("XThing").base("orb.XInterface").build();
    module.class(ComponentClass::new("test.partial.Thing").implements("test.partial.XThing"));
    runtime.load(module).unwrap();
}

#[test]
fn unload_waits_for_live_objects() {
    let fx = load_shapes();
    let circle = fx
        .runtime
        .create_instance(&name(CIRCLE), "create", &[Value::Double(1.0)])
        .unwrap();

    let err = fx.runtime.unload(fx.module).unwrap_err();
    assert!(matches!(
        err,
        OrbError::Module(ModuleError::ModuleBusy { live: 1, .. })
    ));
    assert!(fx.runtime.resolve(&name(XSHAPE)).is_ok());

    fx.runtime.release(circle).unwrap();
    fx.runtime.unload(fx.module).unwrap();
    assert!(fx.runtime.resolve(&name(XSHAPE)).is_err());
    assert!(fx.runtime.loaded_modules().is_empty());

    let err = fx.runtime.unload(fx.module).unwrap_err();
    assert!(matches!(
        err,
        OrbError::Module(ModuleError::UnknownModule(_))
    ));
}

#[test]
fn unload_releases_idle_singletons() {
    let fx = load_shapes();
    let registry = fx.runtime.create_default(&name(REGISTRY)).unwrap();

    assert!(fx.runtime.unload(fx.module).is_err());
    fx.runtime.release(registry).unwrap();
    assert_eq!(fx.counters.drops(), 0);

    fx.runtime.unload(fx.module).unwrap();
    assert_eq!(fx.counters.drops(), 1);
    assert_eq!(fx.runtime.heap().live_count(), 0);
    assert!(fx.runtime.singleton_instance(&name(REGISTRY)).is_none());
}

#[test]
fn unload_waits_for_construction_in_progress() {
    let (entered_tx, entered_rx) = mpsc::channel::<()>();
    let (proceed_tx, proceed_rx) = mpsc::channel::<()>();
    let proceed_rx = Mutex::new(proceed_rx);

    let mut module = Module::new("test.gate");
    module.interface("XThing").base("orb.XInterface").build();
    module.service("Slow").implementing("XThing").build();
    module.class(ComponentClass::new("test.gate.Thing").implements("test.gate.XThing"));
    module.factory("Slow", "create", move |_ctx| {
        let _ = entered_tx.send(());
        let _ = proceed_rx.lock().recv();
        Ok(NewInstance::new("test.gate.Thing", ()))
    });
    let runtime = Arc::new(Runtime::new());
    let id = runtime.load(module).unwrap();

    let creator = {
        let runtime = Arc::clone(&runtime);
        thread::spawn(move || runtime.create_default(&name("test.gate.Slow")))
    };
    entered_rx.recv().unwrap();

    let unloader = {
        let runtime = Arc::clone(&runtime);
        thread::spawn(move || runtime.unload(id))
    };
    thread::sleep(Duration::from_millis(50));
    assert!(!unloader.is_finished());
    proceed_tx.send(()).unwrap();

    let thing = creator.join().unwrap().unwrap();
    let err = unloader.join().unwrap().unwrap_err();
    assert!(matches!(
        err,
        OrbError::Module(ModuleError::ModuleBusy { live: 1, .. })
    ));
    assert!(runtime.resolve(&name("test.gate.XThing")).is_ok());

    runtime.release(thing).unwrap();
    runtime.unload(id).unwrap();
    assert!(runtime.create_default(&name("test.gate.Slow")).is_err());
}

#[test]
fn over_released_singleton_does_not_survive_reload() {
    let fx = load_shapes();
    let registry = fx.runtime.create_default(&name(REGISTRY)).unwrap();
    fx.runtime.release(registry).unwrap();
    fx.runtime.release(registry).unwrap();
    assert_eq!(fx.counters.drops(), 1);

    fx.runtime.unload(fx.module).unwrap();
    assert!(fx.runtime.loaded_modules().is_empty());
    assert!(fx.runtime.singleton_instance(&name(REGISTRY)).is_none());

    fx.runtime.load(shapes_module(&fx.counters).unwrap()).unwrap();
    let again = fx.runtime.create_default(&name(REGISTRY)).unwrap();
    assert_eq!(fx.runtime.ref_count(again), Some(2));
    assert_eq!(fx.counters.constructions(), 2);
    fx.runtime.release(again).unwrap();
}

#[test]
fn modules_can_be_reloaded() {
    let fx = load_shapes();
    fx.runtime.unload(fx.module).unwrap();
    let id = fx.runtime.load(shapes_module(&fx.counters).unwrap()).unwrap();
    assert_ne!(id, fx.module);

    let circle = fx
        .runtime
        .create_instance(&name(CIRCLE), "create", &[Value::Double(1.0)])
        .unwrap();
    fx.runtime.release(circle).unwrap();
}

static TEARDOWNS: AtomicUsize = AtomicUsize::new(0);

fn describe_counter() -> Result<Module, OrbError> {
    let mut module = Module::new("test.exported");
    module
        .interface("XTicker")
        .base("orb.XInterface")
        .method("long tick()")?
        .build();
    module.service("Ticker").implementing("XTicker").build();
    Ok(module)
}

fn teardown_counter() {
    TEARDOWNS.fetch_add(1, Ordering::SeqCst);
}

orb::export_module!("test.exported", describe_counter, teardown = teardown_counter);

#[test]
fn exported_entry_point_loads_and_tears_down() {
    let runtime = Runtime::new();
    assert_eq!(ORB_MODULE_ENTRY.abi_version, ABI_VERSION);
    let id = runtime.load_module(&ORB_MODULE_ENTRY).unwrap();
    assert!(runtime.resolve(&name("test.exported.XTicker")).is_ok());

    runtime.unload(id).unwrap();
    assert_eq!(TEARDOWNS.load(Ordering::SeqCst), 1);
}

#[test]
fn entry_points_are_checked() {
    let runtime = Runtime::new();
    let stale = ModuleEntryPoint {
        abi_version: ABI_VERSION + 1,
        ..ORB_MODULE_ENTRY
    };
    assert!(matches!(
        runtime.load_module(&stale).unwrap_err(),
        OrbError::Module(ModuleError::IncompatibleAbi { .. })
    ));

    let misnamed = ModuleEntryPoint {
        name: "test.other",
        ..ORB_MODULE_ENTRY
    };
    assert!(runtime.load_module(&misnamed).unwrap_err().is_registration());
    assert!(runtime.loaded_modules().is_empty());
}
