//! C-ABI bridge for components living outside Rust.
//!
//! Every raw component starts with a pointer to a [`RawComponentVTable`]
//! holding its `acquire`, `release` and `query_interface` entry points.
//! Foreign components are adopted into the heap as [`ForeignComponent`]
//! instances; runtime objects are handed out as raw components whose
//! trampolines forward to the heap.
//!
//! Interface ids crossing the boundary are [`TypeHash`] values.

use std::any::Any;
use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use num_enum::{IntoPrimitive, TryFromPrimitive};

use orb_core::{NewInstance, ObjectError, ObjectHandle, OrbError, TypeHash};

use crate::Runtime;

/// Status codes returned across the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum AbiStatus {
    Ok = 0,
    /// The component does not implement the requested interface.
    NotSupported = 1,
    UseAfterFree = -1,
    InvalidHandle = -2,
    NullPointer = -3,
}

impl From<ObjectError> for AbiStatus {
    fn from(err: ObjectError) -> Self {
        match err {
            ObjectError::UseAfterFree { .. } => AbiStatus::UseAfterFree,
            ObjectError::InvalidHandle { .. } => AbiStatus::InvalidHandle,
        }
    }
}

/// Reference-counting entry points of a raw component.
#[repr(C)]
pub struct RawComponentVTable {
    /// Returns the new count.
    pub acquire: unsafe extern "C" fn(*mut RawComponent) -> u32,
    /// Returns the new count. The component may be freed at zero.
    pub release: unsafe extern "C" fn(*mut RawComponent) -> u32,
    /// Writes an acquired component typed to the interface, or null.
    pub query_interface: unsafe extern "C" fn(*mut RawComponent, u64, *mut *mut RawComponent) -> i32,
}

/// Common prefix of every raw component.
#[repr(C)]
pub struct RawComponent {
    pub vtable: *const RawComponentVTable,
}

// ==========================================================================
// Foreign components
// ==========================================================================

/// A counted reference to a component implemented outside Rust.
///
/// Dropping it releases the count it owns.
pub struct ForeignComponent {
    raw: NonNull<RawComponent>,
}

// The vtable contract requires the entry points to be callable from any thread.
unsafe impl Send for ForeignComponent {}
unsafe impl Sync for ForeignComponent {}

impl ForeignComponent {
    /// Take ownership of one count on `raw`. Returns `None` for null.
    ///
    /// # Safety
    ///
    /// `raw` must point to a live component with a valid vtable, and the
    /// caller must own the count being transferred.
    pub unsafe fn adopt(raw: *mut RawComponent) -> Option<Self> {
        NonNull::new(raw).map(|raw| Self { raw })
    }

    pub fn as_ptr(&self) -> *mut RawComponent {
        self.raw.as_ptr()
    }

    fn vtable(&self) -> &RawComponentVTable {
        // SAFETY: adopt's contract keeps the component and its vtable alive
        // while we hold a count.
        unsafe { &*self.raw.as_ref().vtable }
    }

    /// Ask the component for another interface.
    pub fn query_interface(&self, interface: TypeHash) -> Result<Option<ForeignComponent>, AbiStatus> {
        let mut out: *mut RawComponent = ptr::null_mut();
        // SAFETY: see `vtable`.
        let code = unsafe { (self.vtable().query_interface)(self.as_ptr(), interface.0, &mut out) };
        match AbiStatus::try_from(code) {
            // SAFETY: a successful query hands us an acquired component.
            Ok(AbiStatus::Ok) => Ok(unsafe { ForeignComponent::adopt(out) }),
            Ok(AbiStatus::NotSupported) => Ok(None),
            Ok(status) => Err(status),
            Err(_) => {
                log::warn!("foreign query_interface returned unknown status {code}");
                Err(AbiStatus::InvalidHandle)
            }
        }
    }

    pub fn supports(&self, interface: TypeHash) -> bool {
        matches!(self.query_interface(interface), Ok(Some(_)))
    }
}

impl Clone for ForeignComponent {
    fn clone(&self) -> Self {
        // SAFETY: see `vtable`.
        unsafe { (self.vtable().acquire)(self.as_ptr()) };
        Self { raw: self.raw }
    }
}

impl Drop for ForeignComponent {
    fn drop(&mut self) {
        // SAFETY: we own one count.
        unsafe { (self.vtable().release)(self.as_ptr()) };
    }
}

impl fmt::Debug for ForeignComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ForeignComponent").field(&self.raw).finish()
    }
}

/// Query hook forwarding `query_interface` to a wrapped [`ForeignComponent`].
///
/// Install it with `ComponentClass::with_query_hook` on the class foreign
/// components are adopted under.
pub fn foreign_query_hook(instance: &(dyn Any + Send + Sync), interface: TypeHash) -> bool {
    instance
        .downcast_ref::<ForeignComponent>()
        .is_some_and(|component| component.supports(interface))
}

impl Runtime {
    /// Put a foreign component on the heap under `implementation`.
    pub fn adopt_foreign(
        &self,
        component: ForeignComponent,
        implementation: &str,
    ) -> Result<ObjectHandle, OrbError> {
        self.create_object(NewInstance::new(implementation, component))
    }

    /// Hand out a raw component for `handle`.
    ///
    /// The raw component holds one heap count of its own, released when its
    /// last raw reference is released.
    pub fn export_raw(self: &Arc<Self>, handle: ObjectHandle) -> Result<*mut RawComponent, OrbError> {
        self.heap.acquire(handle)?;
        Ok(RawObject::boxed(Arc::clone(self), handle))
    }
}

// ==========================================================================
// Exported objects
// ==========================================================================

#[repr(C)]
struct RawObject {
    base: RawComponent,
    runtime: Arc<Runtime>,
    handle: ObjectHandle,
    local: AtomicU32,
}

static EXPORTED_VTABLE: RawComponentVTable = RawComponentVTable {
    acquire: exported_acquire,
    release: exported_release,
    query_interface: exported_query_interface,
};

impl RawObject {
    /// The caller has already acquired `handle` for the new raw object.
    fn boxed(runtime: Arc<Runtime>, handle: ObjectHandle) -> *mut RawComponent {
        let object = Box::new(RawObject {
            base: RawComponent {
                vtable: &EXPORTED_VTABLE,
            },
            runtime,
            handle,
            local: AtomicU32::new(1),
        });
        Box::into_raw(object).cast()
    }
}

unsafe extern "C" fn exported_acquire(this: *mut RawComponent) -> u32 {
    // SAFETY: only components built by `RawObject::boxed` use this vtable.
    match unsafe { this.cast::<RawObject>().as_ref() } {
        Some(object) => object.local.fetch_add(1, Ordering::AcqRel) + 1,
        None => 0,
    }
}

unsafe extern "C" fn exported_release(this: *mut RawComponent) -> u32 {
    let object = this.cast::<RawObject>();
    // SAFETY: see `exported_acquire`.
    let Some(raw) = (unsafe { object.as_ref() }) else {
        return 0;
    };
    let previous = raw
        .local
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    match previous {
        Ok(1) => {
            // SAFETY: the count reached zero; nobody else can reach the box.
            let owned = unsafe { Box::from_raw(object) };
            if let Err(e) = owned.runtime.heap.release(owned.handle) {
                log::error!("releasing exported object: {e}");
            }
            0
        }
        Ok(n) => n - 1,
        Err(_) => {
            log::error!("release on exported object with no references");
            0
        }
    }
}

unsafe extern "C" fn exported_query_interface(
    this: *mut RawComponent,
    interface: u64,
    out: *mut *mut RawComponent,
) -> i32 {
    // SAFETY: see `exported_acquire`.
    let Some(object) = (unsafe { this.cast::<RawObject>().as_ref() }) else {
        return AbiStatus::NullPointer.into();
    };
    if out.is_null() {
        return AbiStatus::NullPointer.into();
    }
    let (status, result) = match object
        .runtime
        .heap
        .query_interface(object.handle, TypeHash(interface))
    {
        Ok(Some(typed)) => (
            AbiStatus::Ok,
            RawObject::boxed(Arc::clone(&object.runtime), typed),
        ),
        Ok(None) => (AbiStatus::NotSupported, ptr::null_mut()),
        Err(e) => (AbiStatus::from(e), ptr::null_mut()),
    };
    // SAFETY: checked non-null above; the caller provides the out slot.
    unsafe { out.write(result) };
    status.into()
}
