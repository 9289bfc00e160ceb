//! Registry behavior as seen through a loaded module.

mod common;

use common::*;
use orb::core::entries::TypeKind;
use orb::core::{
    ConstantValue, InterfaceEntry, MethodSignature, PrimitiveKind, RegistrationError, StructEntry,
    TypeRef,
};
use orb::{OrbError, QualifiedName, Runtime};

fn name(s: &str) -> QualifiedName {
    QualifiedName::from(s)
}

#[test]
fn loaded_types_resolve_by_name_and_hash() {
    let fx = load_shapes();
    let desc = fx.runtime.resolve(&name(XSHAPE)).unwrap();
    assert_eq!(desc.kind(), TypeKind::Interface);

    let registry = fx.runtime.registry();
    let by_hash = registry.resolve_hash(desc.type_hash()).unwrap();
    assert_eq!(by_hash.name(), desc.name());
    assert_eq!(
        registry.get(&name(MODULE)).map(|d| d.kind()),
        Some(TypeKind::Module)
    );
    assert_eq!(
        registry.get(&name(REGISTRY)).map(|d| d.kind()),
        Some(TypeKind::Singleton)
    );
}

#[test]
fn constants_keep_their_width() {
    let fx = load_shapes();
    assert_eq!(
        fx.runtime
            .resolve_constant(&name("test.shapes.Limits.MAX_SIZE"))
            .unwrap(),
        ConstantValue::Long(100)
    );
    let mask = fx
        .runtime
        .resolve_constant(&name("test.shapes.Limits.MASK"))
        .unwrap();
    assert_eq!(mask.as_u64(), Some(0x8000_0000_0000_0000));
    assert_eq!(mask.as_i64(), None);
    assert_eq!(
        fx.runtime
            .resolve_constant(&name("test.shapes.Color.GREEN"))
            .unwrap(),
        ConstantValue::Long(1)
    );
}

#[test]
fn unknown_lookups_are_registration_errors() {
    let fx = load_shapes();
    let err = fx
        .runtime
        .resolve_constant(&name("test.shapes.Limits.MIN_SIZE"))
        .unwrap_err();
    assert!(matches!(
        err,
        OrbError::Registration(RegistrationError::UnknownConstant { .. })
    ));
    let err = fx.runtime.resolve(&name("test.shapes.Nowhere")).unwrap_err();
    assert!(err.is_registration());
}

#[test]
fn exception_chain_is_rooted_at_base_exception() {
    let fx = load_shapes();
    let registry = fx.runtime.registry();
    let chain: Vec<String> = registry
        .exception_chain(&name(SHAPE_ERROR))
        .unwrap()
        .iter()
        .map(|d| d.name().to_string())
        .collect();
    assert_eq!(chain, vec!["orb.Exception", SHAPE_ERROR]);
    assert!(registry.is_exception_subtype(&name(SHAPE_ERROR), &name("orb.Exception")));
    assert!(!registry.is_exception_subtype(&name(SHAPE_ERROR), &name("orb.RuntimeError")));
}

#[test]
fn identical_reregistration_is_accepted_and_conflicts_are_not() {
    let runtime = Runtime::new();
    let point = || {
        StructEntry::new("test.Point")
            .with_field("X", PrimitiveKind::Long.into())
            .with_field("Y", PrimitiveKind::Long.into())
    };
    runtime.register(point().into()).unwrap();
    runtime.register(point().into()).unwrap();

    let conflicting = StructEntry::new("test.Point").with_field("X", PrimitiveKind::Double.into());
    let err = runtime.register(conflicting.into()).unwrap_err();
    assert!(matches!(
        err,
        OrbError::Registration(RegistrationError::DuplicateType { .. })
    ));
    let kept = runtime.resolve(&name("test.Point")).unwrap();
    assert_eq!(kept.as_struct().unwrap().fields.len(), 2);
}

#[test]
fn host_registrations_survive_module_unload() {
    let fx = load_shapes();
    fx.runtime
        .register(
            InterfaceEntry::new("host.XListener")
                .with_base("orb.XInterface")
                .with_method(
                    MethodSignature::new("notify", TypeRef::VOID)
                        .param("shape", TypeRef::named(XSHAPE)),
                )
                .into(),
        )
        .unwrap();
    fx.runtime.unload(fx.module).unwrap();

    assert!(fx.runtime.resolve(&name("host.XListener")).is_ok());
    assert!(fx.runtime.resolve(&name(XSHAPE)).is_err());
}
