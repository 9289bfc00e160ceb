//! Service instantiation and singletons.

mod common;

use std::sync::Arc;
use std::thread;

use common::*;
use orb::core::FactoryError;
use orb::{OrbError, QualifiedName, Value};

fn name(s: &str) -> QualifiedName {
    QualifiedName::from(s)
}

#[test]
fn constructors_are_selected_by_name() {
    let fx = load_shapes();
    let named = fx
        .runtime
        .create_instance(
            &name(CIRCLE),
            "createNamed",
            &[Value::String("disc".into()), Value::Double(3.0)],
        )
        .unwrap();
    let title = fx
        .runtime
        .invoke_by_name(named, &name(XSHAPE), "getName", &mut [])
        .unwrap();
    assert_eq!(title, Value::String("disc".into()));
    assert_eq!(named.interface, name(XSHAPE).to_type_hash());
    fx.runtime.release(named).unwrap();
}

#[test]
fn mismatched_arguments_allocate_nothing() {
    let fx = load_shapes();
    let err = fx
        .runtime
        .create_instance(&name(CIRCLE), "create", &[Value::String("big".into())])
        .unwrap_err();
    assert!(matches!(
        err,
        OrbError::Factory(FactoryError::NoMatchingConstructor { arity: 1, .. })
    ));

    let err = fx
        .runtime
        .create_instance(&name("test.shapes.Square"), "create", &[])
        .unwrap_err();
    assert!(matches!(
        err,
        OrbError::Factory(FactoryError::UnknownService(_))
    ));

    let err = fx
        .runtime
        .create_instance(&name(XSHAPE), "create", &[])
        .unwrap_err();
    assert!(matches!(
        err,
        OrbError::Factory(FactoryError::UnknownService(_))
    ));
    assert_eq!(fx.runtime.heap().live_count(), 0);
}

#[test]
fn services_without_constructors_take_any_arguments() {
    let fx = load_shapes();
    let fresh = fx.runtime.create_default(&name(COUNTER)).unwrap();
    let seeded = fx
        .runtime
        .create_instance(
            &name(COUNTER),
            "create",
            &[Value::Long(41), Value::String("ignored".into())],
        )
        .unwrap();

    let one = fx
        .runtime
        .invoke_by_name(fresh, &name(XCOUNTER), "increment", &mut [])
        .unwrap();
    let answer = fx
        .runtime
        .invoke_by_name(seeded, &name(XCOUNTER), "increment", &mut [])
        .unwrap();
    assert_eq!(one, Value::Long(1));
    assert_eq!(answer, Value::Long(42));

    let err = fx
        .runtime
        .create_instance(&name(COUNTER), "createSpecial", &[])
        .unwrap_err();
    assert!(matches!(
        err,
        OrbError::Factory(FactoryError::NoMatchingConstructor { .. })
    ));
    fx.runtime.release(fresh).unwrap();
    fx.runtime.release(seeded).unwrap();
}

#[test]
fn factory_failures_become_exceptions() {
    let fx = load_shapes();
    let err = fx
        .runtime
        .create_instance(&name(COUNTER), "create", &[Value::Double(1.5)])
        .unwrap_err();
    let exception = err.as_exception().expect("typed exception");
    assert!(exception.is("orb.RuntimeError"));
    assert!(exception.message.contains("must be a long"));
    assert_eq!(fx.runtime.heap().live_count(), 0);
}

#[test]
fn singleton_is_constructed_once_under_contention() {
    const THREADS: usize = 8;

    let fx = load_shapes();
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let runtime = Arc::clone(&fx.runtime);
            thread::spawn(move || runtime.create_default(&name(REGISTRY)).unwrap())
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect();

    assert_eq!(fx.counters.constructions(), 1);
    assert!(handles.iter().all(|h| h.same_object(&handles[0])));
    // One count per caller plus the slot's own.
    assert_eq!(fx.runtime.ref_count(handles[0]), Some(THREADS as u32 + 1));
    assert_eq!(fx.runtime.singleton_instance(&name(REGISTRY)), Some(handles[0]));

    for handle in handles {
        fx.runtime.release(handle).unwrap();
    }
    assert_eq!(fx.counters.drops(), 0);
}

#[test]
fn singleton_state_is_shared() {
    let fx = load_shapes();
    let a = fx.runtime.create_default(&name(REGISTRY)).unwrap();
    let b = fx.runtime.create_default(&name(REGISTRY)).unwrap();
    fx.runtime
        .invoke_by_name(a, &name(XCOUNTER), "increment", &mut [])
        .unwrap();
    let seen = fx
        .runtime
        .invoke_by_name(b, &name(XCOUNTER), "increment", &mut [])
        .unwrap();
    assert_eq!(seen, Value::Long(2));
    fx.runtime.release(a).unwrap();
    fx.runtime.release(b).unwrap();
}
