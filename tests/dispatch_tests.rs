//! Calls through dispatch tables.

mod common;

use std::f64::consts::PI;

use common::*;
use orb::core::{DispatchError, InterfaceEntry, MethodSignature, PrimitiveKind};
use orb::{OrbError, QualifiedName, Value};

fn name(s: &str) -> QualifiedName {
    QualifiedName::from(s)
}

#[test]
fn table_lists_own_members_then_inherited() {
    let fx = load_shapes();
    let table = fx.runtime.dispatch_table(&name(XSHAPE)).unwrap();
    assert_eq!(table.method_names(), vec!["area", "scale", "getName"]);
    assert_eq!(table.index_of("getName"), Some(2));
    assert!(table.depends_on(&name("orb.XInterface")));
}

#[test]
fn tables_are_cached() {
    let fx = load_shapes();
    let a = fx.runtime.dispatch_table(&name(XSHAPE)).unwrap();
    let b = fx.runtime.dispatch_table(&name(XSHAPE)).unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
}

#[test]
fn invoke_by_slot_and_name() {
    let fx = load_shapes();
    let circle = fx
        .runtime
        .create_instance(&name(CIRCLE), "create", &[Value::Double(2.0)])
        .unwrap();
    let table = fx.runtime.dispatch_table(&name(XSHAPE)).unwrap();

    let area = fx.runtime.invoke(&table, circle, 0, &mut []).unwrap();
    assert_eq!(area, Value::Double(PI * 4.0));

    fx.runtime
        .invoke_by_name(circle, &name(XSHAPE), "scale", &mut [Value::Double(0.5)])
        .unwrap();
    let area = fx
        .runtime
        .invoke_by_name(circle, &name(XSHAPE), "area", &mut [])
        .unwrap();
    assert_eq!(area, Value::Double(PI));

    let title = fx
        .runtime
        .invoke_by_name(circle, &name(XSHAPE), "getName", &mut [])
        .unwrap();
    assert_eq!(title, Value::String("circle".into()));
    fx.runtime.release(circle).unwrap();
}

#[test]
fn out_and_inout_values_are_written_back() {
    let fx = load_shapes();
    let counter = fx
        .runtime
        .create_instance(&name(COUNTER), "create", &[Value::Long(10)])
        .unwrap();

    let mut args = [Value::Long(5), Value::Void];
    fx.runtime
        .invoke_by_name(counter, &name(XCOUNTER), "add", &mut args)
        .unwrap();
    assert_eq!(args[1], Value::Long(15));

    let mut args = [Value::String("abc".into())];
    fx.runtime
        .invoke_by_name(counter, &name(XCOUNTER), "reverse", &mut args)
        .unwrap();
    assert_eq!(args[0], Value::String("cba".into()));
    fx.runtime.release(counter).unwrap();
}

#[test]
fn argument_checks_run_before_native_code() {
    let fx = load_shapes();
    let circle = fx
        .runtime
        .create_instance(&name(CIRCLE), "create", &[Value::Double(1.0)])
        .unwrap();

    let err = fx
        .runtime
        .invoke_by_name(circle, &name(XSHAPE), "scale", &mut [])
        .unwrap_err();
    assert!(matches!(
        err,
        OrbError::Dispatch(DispatchError::ArityMismatch {
            expected: 1,
            actual: 0,
            ..
        })
    ));

    let err = fx
        .runtime
        .invoke_by_name(circle, &name(XSHAPE), "scale", &mut [Value::Long(2)])
        .unwrap_err();
    assert!(matches!(
        err,
        OrbError::Dispatch(DispatchError::ArgumentMismatch { index: 0, .. })
    ));

    let area = fx
        .runtime
        .invoke_by_name(circle, &name(XSHAPE), "area", &mut [])
        .unwrap();
    assert_eq!(area, Value::Double(PI));
    fx.runtime.release(circle).unwrap();
}

#[test]
fn calling_an_unimplemented_interface_fails() {
    let fx = load_shapes();
    let circle = fx
        .runtime
        .create_instance(&name(CIRCLE), "create", &[Value::Double(1.0)])
        .unwrap();
    let err = fx
        .runtime
        .invoke_by_name(circle, &name(XCOUNTER), "increment", &mut [])
        .unwrap_err();
    assert!(matches!(
        err,
        OrbError::Dispatch(DispatchError::InterfaceNotImplemented { .. })
    ));

    let err = fx
        .runtime
        .invoke_by_name(circle, &name(XSHAPE), "perimeter", &mut [])
        .unwrap_err();
    assert!(matches!(
        err,
        OrbError::Dispatch(DispatchError::UnknownMethod { .. })
    ));

    let table = fx.runtime.dispatch_table(&name(XSHAPE)).unwrap();
    let err = fx.runtime.invoke(&table, circle, 99, &mut []).unwrap_err();
    assert!(matches!(
        err,
        OrbError::Dispatch(DispatchError::SlotOutOfRange { index: 99, .. })
    ));
    fx.runtime.release(circle).unwrap();
}

#[test]
fn interfaces_registered_after_binding_are_not_implemented() {
    let fx = load_shapes();
    fx.runtime
        .register(
            InterfaceEntry::new("test.shapes.XShape2")
                .with_base(XSHAPE)
                .with_method(MethodSignature::new("volume", PrimitiveKind::Double.into()))
                .into(),
        )
        .unwrap();
    let circle = fx
        .runtime
        .create_instance(&name(CIRCLE), "create", &[Value::Double(1.0)])
        .unwrap();
    // CircleImpl does not implement XShape2.
    let err = fx
        .runtime
        .invoke_by_name(circle, &name("test.shapes.XShape2"), "volume", &mut [])
        .unwrap_err();
    assert!(matches!(
        err,
        OrbError::Dispatch(DispatchError::InterfaceNotImplemented { .. })
    ));
    fx.runtime.release(circle).unwrap();
}

#[test]
fn unloading_invalidates_cached_tables() {
    let fx = load_shapes();
    let table = fx.runtime.dispatch_table(&name(XSHAPE)).unwrap();
    assert!(table.is_valid());
    fx.runtime.unload(fx.module).unwrap();
    assert!(!table.is_valid());

    let err = fx
        .runtime
        .invoke(&table, orb::ObjectHandle::new(0, 0, table.type_hash()), 0, &mut [])
        .unwrap_err();
    assert!(matches!(
        err,
        OrbError::Dispatch(DispatchError::StaleTable { .. })
    ));
    assert!(fx.runtime.dispatch_table(&name(XSHAPE)).is_err());
}
