//! Generational, atomically reference-counted object heap.
//!
//! Every slot packs its generation and reference count into one `AtomicU64`
//! (`generation << 32 | count`). Acquire and release are compare-and-swap
//! loops on that word, so a stale handle is detected in the same atomic step
//! that would otherwise change the count, and exactly one releaser observes
//! the transition to zero. That releaser takes the object out of the slot,
//! drops it (running the instance's destructor) and recycles the index under
//! the next generation.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::ObjectError;
use crate::{ModuleId, TypeHash};

use super::ComponentClass;

#[inline]
const fn pack(generation: u32, count: u32) -> u64 {
    ((generation as u64) << 32) | count as u64
}

#[inline]
const fn unpack(state: u64) -> (u32, u32) {
    ((state >> 32) as u32, state as u32)
}

/// Handle to a heap-allocated object, typed to one of its interfaces.
///
/// Copying a handle does not change the object's count; ownership of a count
/// is a convention between the caller and `acquire`/`release`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    /// Index into the heap's slots.
    pub index: u32,
    /// Generation for use-after-free detection.
    pub generation: u32,
    /// Interface this handle is typed to.
    pub interface: TypeHash,
}

impl ObjectHandle {
    pub fn new(index: u32, generation: u32, interface: TypeHash) -> Self {
        Self {
            index,
            generation,
            interface,
        }
    }

    /// Whether two handles name the same object, whatever interface they are typed to.
    pub fn same_object(&self, other: &ObjectHandle) -> bool {
        self.index == other.index && self.generation == other.generation
    }

    /// The same object typed to another interface.
    pub fn retyped(self, interface: TypeHash) -> Self {
        Self { interface, ..self }
    }
}

/// A live object: the native instance plus what the runtime knows about it.
pub struct ObjectData {
    instance: Box<dyn Any + Send + Sync>,
    class: Arc<ComponentClass>,
    module: ModuleId,
    interfaces: Arc<FxHashSet<TypeHash>>,
}

impl ObjectData {
    /// `interfaces` is the transitive set of interfaces the class implements.
    pub fn new(
        instance: Box<dyn Any + Send + Sync>,
        class: Arc<ComponentClass>,
        module: ModuleId,
        interfaces: Arc<FxHashSet<TypeHash>>,
    ) -> Self {
        Self {
            instance,
            class,
            module,
            interfaces,
        }
    }

    pub fn class(&self) -> &Arc<ComponentClass> {
        &self.class
    }

    /// Module the object is accounted to.
    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn instance(&self) -> &(dyn Any + Send + Sync) {
        self.instance.as_ref()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.instance.downcast_ref::<T>()
    }

    /// Whether the object implements `interface`, asking the class's query
    /// hook for interfaces outside the static set.
    pub fn supports(&self, interface: TypeHash) -> bool {
        self.interfaces.contains(&interface)
            || self
                .class
                .query_hook()
                .is_some_and(|hook| hook(self.instance(), interface))
    }
}

impl fmt::Debug for ObjectData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectData")
            .field("class", &self.class.name())
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

struct HeapSlot {
    state: AtomicU64,
    /// The object together with the generation it was allocated under.
    object: Mutex<Option<(u32, Arc<ObjectData>)>>,
}

/// Heap storage for component objects.
///
/// All operations take `&self`; the heap is shared between threads.
pub struct ObjectHeap {
    slots: RwLock<Vec<Arc<HeapSlot>>>,
    free_list: Mutex<Vec<u32>>,
    live: Mutex<FxHashMap<ModuleId, usize>>,
}

impl ObjectHeap {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
            free_list: Mutex::new(Vec::new()),
            live: Mutex::new(FxHashMap::default()),
        }
    }

    fn slot(&self, index: u32) -> Result<Arc<HeapSlot>, ObjectError> {
        self.slots
            .read()
            .get(index as usize)
            .cloned()
            .ok_or(ObjectError::InvalidHandle { index })
    }

    /// Allocate an object with a count of one, typed to `interface`.
    pub fn allocate(&self, data: ObjectData, interface: TypeHash) -> ObjectHandle {
        let module = data.module;
        let data = Arc::new(data);
        *self.live.lock().entry(module).or_insert(0) += 1;

        let free = self.free_list.lock().pop();
        let recycled =
            free.and_then(|index| self.slots.read().get(index as usize).cloned().map(|s| (index, s)));

        let handle = match recycled {
            Some((index, slot)) => {
                let (generation, _) = unpack(slot.state.load(Ordering::Acquire));
                *slot.object.lock() = Some((generation, data));
                slot.state.store(pack(generation, 1), Ordering::Release);
                ObjectHandle::new(index, generation, interface)
            }
            None => {
                let mut slots = self.slots.write();
                let index = slots.len() as u32;
                slots.push(Arc::new(HeapSlot {
                    state: AtomicU64::new(pack(0, 1)),
                    object: Mutex::new(Some((0, data))),
                }));
                ObjectHandle::new(index, 0, interface)
            }
        };
        log::trace!("allocated object {}.{}", handle.index, handle.generation);
        handle
    }

    /// Increment the count. Returns the new count.
    pub fn acquire(&self, handle: ObjectHandle) -> Result<u32, ObjectError> {
        let slot = self.slot(handle.index)?;
        let mut current = slot.state.load(Ordering::Acquire);
        loop {
            let (generation, count) = unpack(current);
            if generation != handle.generation || count == 0 {
                log::error!(
                    "acquire on destroyed object {}.{}",
                    handle.index,
                    handle.generation
                );
                return Err(use_after_free(handle));
            }
            match slot.state.compare_exchange_weak(
                current,
                pack(generation, count + 1),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(count + 1),
                Err(actual) => current = actual,
            }
        }
    }

    /// Decrement the count, destroying the object at zero. Returns the new count.
    pub fn release(&self, handle: ObjectHandle) -> Result<u32, ObjectError> {
        let slot = self.slot(handle.index)?;
        let mut current = slot.state.load(Ordering::Acquire);
        loop {
            let (generation, count) = unpack(current);
            if generation != handle.generation || count == 0 {
                log::error!(
                    "release on destroyed object {}.{}",
                    handle.index,
                    handle.generation
                );
                return Err(use_after_free(handle));
            }
            let next = if count == 1 {
                pack(generation.wrapping_add(1), 0)
            } else {
                pack(generation, count - 1)
            };
            match slot
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) if count == 1 => {
                    self.destroy(handle.index, &slot);
                    return Ok(0);
                }
                Ok(_) => return Ok(count - 1),
                Err(actual) => current = actual,
            }
        }
    }

    /// Runs once per object, on the thread that won the transition to zero.
    fn destroy(&self, index: u32, slot: &HeapSlot) {
        let taken = slot.object.lock().take();
        if let Some((generation, data)) = taken {
            let module = data.module;
            drop(data);
            let mut live = self.live.lock();
            if let Some(n) = live.get_mut(&module) {
                *n = n.saturating_sub(1);
                if *n == 0 {
                    live.remove(&module);
                }
            }
            log::trace!("destroyed object {index}.{generation}");
        }
        self.free_list.lock().push(index);
    }

    /// Borrow the object's data. The returned `Arc` keeps the instance alive
    /// but does not hold a count.
    pub fn get(&self, handle: ObjectHandle) -> Result<Arc<ObjectData>, ObjectError> {
        let slot = self.slot(handle.index)?;
        let (generation, count) = unpack(slot.state.load(Ordering::Acquire));
        if generation != handle.generation || count == 0 {
            return Err(use_after_free(handle));
        }
        match slot.object.lock().as_ref() {
            Some((g, data)) if *g == handle.generation => Ok(Arc::clone(data)),
            _ => Err(use_after_free(handle)),
        }
    }

    /// Current count, `None` once destroyed.
    pub fn ref_count(&self, handle: ObjectHandle) -> Option<u32> {
        let slot = self.slot(handle.index).ok()?;
        let (generation, count) = unpack(slot.state.load(Ordering::Acquire));
        (generation == handle.generation && count > 0).then_some(count)
    }

    pub fn is_alive(&self, handle: ObjectHandle) -> bool {
        self.ref_count(handle).is_some()
    }

    /// Ask for another interface of the object.
    ///
    /// `Ok(None)` means the object does not support the interface. On success
    /// the count is incremented and the handle is typed to `interface`.
    pub fn query_interface(
        &self,
        handle: ObjectHandle,
        interface: TypeHash,
    ) -> Result<Option<ObjectHandle>, ObjectError> {
        let data = self.get(handle)?;
        if !data.supports(interface) {
            return Ok(None);
        }
        self.acquire(handle)?;
        Ok(Some(handle.retyped(interface)))
    }

    /// Hold a count for the lifetime of the returned guard.
    pub fn pin(&self, handle: ObjectHandle) -> Result<HeapPin<'_>, ObjectError> {
        self.acquire(handle)?;
        Ok(HeapPin { heap: self, handle })
    }

    /// Number of live objects.
    pub fn live_count(&self) -> usize {
        self.live.lock().values().sum()
    }

    /// Number of live objects accounted to `module`.
    pub fn live_count_for(&self, module: ModuleId) -> usize {
        self.live.lock().get(&module).copied().unwrap_or(0)
    }
}

fn use_after_free(handle: ObjectHandle) -> ObjectError {
    ObjectError::UseAfterFree {
        index: handle.index,
        generation: handle.generation,
    }
}

impl Default for ObjectHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHeap")
            .field("slot_count", &self.slots.read().len())
            .field("free_count", &self.free_list.lock().len())
            .field("live", &self.live_count())
            .finish()
    }
}

/// Keeps an object alive; releases its count on drop.
pub struct HeapPin<'h> {
    heap: &'h ObjectHeap,
    handle: ObjectHandle,
}

impl HeapPin<'_> {
    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }
}

impl Drop for HeapPin<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.heap.release(self.handle) {
            log::error!("releasing pinned object: {e}");
        }
    }
}

impl fmt::Debug for HeapPin<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HeapPin").field(&self.handle).finish()
    }
}
