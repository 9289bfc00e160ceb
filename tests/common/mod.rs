//! Shared fixture: a small "test.shapes" module.
#![allow(dead_code)]

use std::f64::consts::PI;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::time::Duration;

use orb::core::{ComponentClass, ConstantValue, NativeError, NewInstance, RaisedException};
use orb::{Module, ModuleId, OrbError, Runtime, RuntimeConfig};
use parking_lot::Mutex;

pub const MODULE: &str = "test.shapes";
pub const XSHAPE: &str = "test.shapes.XShape";
pub const XCOUNTER: &str = "test.shapes.XCounter";
pub const CIRCLE: &str = "test.shapes.Circle";
pub const COUNTER: &str = "test.shapes.Counter";
pub const REGISTRY: &str = "test.shapes.theRegistry";
pub const SHAPE_ERROR: &str = "test.shapes.ShapeError";

/// Counts drops of the instance it is embedded in.
pub struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct CircleImpl {
    pub radius: Mutex<f64>,
    pub name: String,
    _drops: DropCounter,
}

pub struct CounterImpl {
    pub value: AtomicI32,
    _drops: DropCounter,
}

#[derive(Debug, thiserror::Error)]
#[error("disk full on {0}")]
pub struct DiskFull(pub String);

#[derive(Default, Clone)]
pub struct Counters {
    pub drops: Arc<AtomicUsize>,
    pub constructions: Arc<AtomicUsize>,
}

impl Counters {
    pub fn drops(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }

    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }
}

pub struct Fixture {
    pub runtime: Arc<Runtime>,
    pub module: ModuleId,
    pub counters: Counters,
}

pub fn shapes_module(counters: &Counters) -> Result<Module, OrbError> {
    let mut module = Module::new(MODULE);

    module
        .interface("XShape")
        .base("orb.XInterface")
        .method("double area()")?
        .method("void scale([in] double factor)")?
        .attribute("readonly string Name")?
        .build();
    module
        .interface("XCounter")
        .base("orb.XInterface")
        .method("long increment()")?
        .method("void add([in] long amount, [out] long total)")?
        .method("void reverse([inout] string text)")?
        .method("long fail([in] string how) raises (ShapeError)")?
        .build();
    module.exception("ShapeError").field("long Code")?.build();
    module.exception("OtherError").build();
    module.structure("Point").field("long X")?.field("long Y")?.build();
    module.enumeration("Color").value("RED", 0).value("GREEN", 1).build();
    module
        .constants("Limits")
        .constant("MAX_SIZE", ConstantValue::Long(100))
        .constant("MASK", ConstantValue::UnsignedHyper(0x8000_0000_0000_0000))
        .build();
    module
        .service("Circle")
        .implementing("XShape")
        .constructor("create(double radius)")?
        .constructor("createNamed(string name, double radius)")?
        .build();
    module.service("Counter").implementing("XCounter").build();
    module.singleton("theRegistry").implementing("XCounter").build();

    module.class(circle_class());
    module.class(counter_class());

    let drops = Arc::clone(&counters.drops);
    module.factory("Circle", "create", move |ctx| {
        let radius: f64 = ctx.arg(0)?;
        Ok(NewInstance::new(
            "test.shapes.CircleImpl",
            new_circle("circle", radius, &drops),
        ))
    });
    let drops = Arc::clone(&counters.drops);
    module.factory("Circle", "createNamed", move |ctx| {
        let name: String = ctx.arg(0)?;
        let radius: f64 = ctx.arg(1)?;
        Ok(NewInstance::new(
            "test.shapes.CircleImpl",
            new_circle(&name, radius, &drops),
        ))
    });
    let drops = Arc::clone(&counters.drops);
    module.factory("Counter", "create", move |ctx| {
        let start = match ctx.rest(0).first() {
            Some(orb::Value::Long(n)) => *n,
            Some(_) => return Err(NativeError::other("Counter start must be a long")),
            None => 0,
        };
        Ok(NewInstance::new(
            "test.shapes.CounterImpl",
            new_counter(start, &drops),
        ))
    });
    let drops = Arc::clone(&counters.drops);
    let constructions = Arc::clone(&counters.constructions);
    module.factory("theRegistry", "create", move |_ctx| {
        constructions.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        Ok(NewInstance::new(
            "test.shapes.CounterImpl",
            new_counter(0, &drops),
        ))
    });

    Ok(module)
}

fn new_circle(name: &str, radius: f64, drops: &Arc<AtomicUsize>) -> CircleImpl {
    CircleImpl {
        radius: Mutex::new(radius),
        name: name.to_string(),
        _drops: DropCounter(Arc::clone(drops)),
    }
}

fn new_counter(start: i32, drops: &Arc<AtomicUsize>) -> CounterImpl {
    CounterImpl {
        value: AtomicI32::new(start),
        _drops: DropCounter(Arc::clone(drops)),
    }
}

fn circle_class() -> ComponentClass {
    ComponentClass::new("test.shapes.CircleImpl")
        .implements(XSHAPE)
        .method("area", |ctx| {
            let r = *ctx.this::<CircleImpl>()?.radius.lock();
            ctx.set_return(PI * r * r);
            Ok(())
        })
        .method("scale", |ctx| {
            let factor: f64 = ctx.arg(0)?;
            *ctx.this::<CircleImpl>()?.radius.lock() *= factor;
            Ok(())
        })
        .method("getName", |ctx| {
            let name = ctx.this::<CircleImpl>()?.name.clone();
            ctx.set_return(name);
            Ok(())
        })
}

fn counter_class() -> ComponentClass {
    ComponentClass::new("test.shapes.CounterImpl")
        .implements(XCOUNTER)
        .method("increment", |ctx| {
            let n = ctx.this::<CounterImpl>()?.value.fetch_add(1, Ordering::SeqCst) + 1;
            ctx.set_return(n);
            Ok(())
        })
        .method("add", |ctx| {
            let amount: i32 = ctx.arg(0)?;
            let total = ctx.this::<CounterImpl>()?.value.fetch_add(amount, Ordering::SeqCst) + amount;
            ctx.set_out(1, total)
        })
        .method("reverse", |ctx| {
            let text: String = ctx.arg(0)?;
            ctx.set_out(0, text.chars().rev().collect::<String>())
        })
        .method("fail", |ctx| {
            let how: String = ctx.arg(0)?;
            match how.as_str() {
                "declared" => Err(NativeError::Raise(
                    RaisedException::new(SHAPE_ERROR, "bad shape")
                        .with_field("Code", orb::Value::Long(7)),
                )),
                "undeclared" => Err(NativeError::raise("test.shapes.OtherError", "other")),
                "unregistered" => Err(NativeError::raise("test.shapes.Missing", "lost")),
                "custom" => Err(NativeError::custom(DiskFull("/tmp".into()))),
                "panic" => panic!("counter exploded"),
                _ => {
                    ctx.set_return(0i32);
                    Ok(())
                }
            }
        })
}

pub fn load_shapes() -> Fixture {
    load_shapes_with(RuntimeConfig::default())
}

pub fn load_shapes_with(config: RuntimeConfig) -> Fixture {
    let runtime = Arc::new(Runtime::with_config(config));
    let counters = Counters::default();
    let module = runtime
        .load(shapes_module(&counters).expect("describe shapes"))
        .expect("load shapes");
    Fixture {
        runtime,
        module,
        counters,
    }
}
