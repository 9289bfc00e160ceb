//! Native call infrastructure and the object heap.
//!
//! ## Key Types
//!
//! - [`Value`]: Generic argument/result representation
//! - [`NativeFn`] / [`NativeFactory`]: Type-erased native methods and constructors
//! - [`ComponentClass`]: A native implementation of interfaces
//! - [`CallContext`]: Bridge between the dispatch layer and Rust code
//! - [`ObjectHeap`]: Atomically reference-counted generational arena

mod call_context;
mod component;
mod native_fn;
mod object_heap;
mod value;

pub use call_context::CallContext;
pub use component::{ComponentClass, QueryHook};
pub use native_fn::{NativeCallable, NativeFactory, NativeFn, NewInstance};
pub use object_heap::{HeapPin, ObjectData, ObjectHandle, ObjectHeap};
pub use value::{StructValue, Value};

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rustc_hash::FxHashSet;

    use super::*;
    use crate::error::ObjectError;
    use crate::native_error::NativeError;
    use crate::{ModuleId, TypeHash};

    struct Tracked(Arc<AtomicUsize>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn iface(name: &str) -> TypeHash {
        TypeHash::from_name(name)
    }

    fn object(drops: &Arc<AtomicUsize>, module: ModuleId) -> ObjectData {
        let class = Arc::new(ComponentClass::new("test.TrackedImpl").implements("test.XTracked"));
        let set: FxHashSet<TypeHash> = [iface("test.XTracked"), iface("orb.XInterface")]
            .into_iter()
            .collect();
        ObjectData::new(Box::new(Tracked(Arc::clone(drops))), class, module, Arc::new(set))
    }

    #[test]
    fn allocate_starts_at_one() {
        let heap = ObjectHeap::new();
        let drops = Arc::new(AtomicUsize::new(0));
        let h = heap.allocate(object(&drops, ModuleId::HOST), iface("test.XTracked"));
        assert_eq!(heap.ref_count(h), Some(1));
        assert_eq!(heap.live_count_for(ModuleId::HOST), 1);
    }

    #[test]
    fn destroyed_exactly_once_at_zero() {
        let heap = ObjectHeap::new();
        let drops = Arc::new(AtomicUsize::new(0));
        let h = heap.allocate(object(&drops, ModuleId::HOST), iface("test.XTracked"));

        assert_eq!(heap.acquire(h), Ok(2));
        assert_eq!(heap.release(h), Ok(1));
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        assert_eq!(heap.release(h), Ok(0));
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        assert_eq!(
            heap.release(h),
            Err(ObjectError::UseAfterFree {
                index: h.index,
                generation: h.generation
            })
        );
        assert!(heap.acquire(h).is_err());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert_eq!(heap.live_count(), 0);
    }

    #[test]
    fn recycled_slot_rejects_old_generation() {
        let heap = ObjectHeap::new();
        let drops = Arc::new(AtomicUsize::new(0));
        let old = heap.allocate(object(&drops, ModuleId::HOST), iface("test.XTracked"));
        heap.release(old).ok();

        let new = heap.allocate(object(&drops, ModuleId::HOST), iface("test.XTracked"));
        assert_eq!(new.index, old.index);
        assert_ne!(new.generation, old.generation);
        assert!(heap.get(old).is_err());
        assert!(heap.get(new).is_ok());
    }

    #[test]
    fn invalid_index() {
        let heap = ObjectHeap::new();
        let bogus = ObjectHandle::new(42, 0, TypeHash::EMPTY);
        assert_eq!(heap.acquire(bogus), Err(ObjectError::InvalidHandle { index: 42 }));
    }

    #[test]
    fn query_interface_outcomes() {
        let heap = ObjectHeap::new();
        let drops = Arc::new(AtomicUsize::new(0));
        let h = heap.allocate(object(&drops, ModuleId::HOST), iface("test.XTracked"));

        let base = heap.query_interface(h, iface("orb.XInterface")).ok().flatten();
        assert_eq!(base.map(|b| b.interface), Some(iface("orb.XInterface")));
        assert_eq!(heap.ref_count(h), Some(2));

        assert_eq!(heap.query_interface(h, iface("test.XOther")), Ok(None));
        assert_eq!(heap.ref_count(h), Some(2));
    }

    #[test]
    fn pin_releases_on_drop() {
        let heap = ObjectHeap::new();
        let drops = Arc::new(AtomicUsize::new(0));
        let h = heap.allocate(object(&drops, ModuleId::HOST), iface("test.XTracked"));
        {
            let pin = heap.pin(h);
            assert!(pin.is_ok());
            assert_eq!(heap.ref_count(h), Some(2));
        }
        assert_eq!(heap.ref_count(h), Some(1));
    }

    #[test]
    fn call_context_this_and_out() {
        let heap = ObjectHeap::new();
        let drops = Arc::new(AtomicUsize::new(0));
        let h = heap.allocate(object(&drops, ModuleId::HOST), iface("test.XTracked"));
        let data = heap.get(h).unwrap();

        let mut args = vec![Value::Long(2), Value::Void];
        let mut ret = Value::Void;
        let mut ctx = CallContext::for_method(h, &data, &mut args, &mut ret, &heap);

        assert!(ctx.this::<Tracked>().is_ok());
        assert!(matches!(ctx.this::<String>(), Err(NativeError::InvalidThis { .. })));
        let n: i32 = ctx.arg(0).unwrap();
        ctx.set_out(1, n * 10).unwrap();
        ctx.set_return(true);
        assert!(matches!(
            ctx.arg::<i32>(5),
            Err(NativeError::ArgumentIndexOutOfBounds { index: 5, count: 2 })
        ));
        drop(ctx);

        assert_eq!(args[1], Value::Long(20));
        assert_eq!(ret, Value::Bool(true));
    }

    #[test]
    fn class_overrides_win() {
        let class = ComponentClass::new("test.Impl")
            .method("name", |ctx| {
                ctx.set_return("plain");
                Ok(())
            })
            .method_for("test.XSpecial", "name", |ctx| {
                ctx.set_return("special");
                Ok(())
            });
        let plain = class.find_method(&"test.XPlain".into(), "name").map(|f| f.id);
        let special = class.find_method(&"test.XSpecial".into(), "name").map(|f| f.id);
        assert!(plain.is_some());
        assert_ne!(plain, special);
    }
}
