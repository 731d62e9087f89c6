//! Memory resources: the allocation strategies behind a [`StorageHandle`]
//!
//! [`MemoryResource`] is the type-erased capability every strategy
//! implements. Containers never see the concrete type; they hold a
//! [`StorageHandle`] and dispatch through `&dyn MemoryResource`.
//!
//! [`StorageHandle`]: crate::StorageHandle

mod default;
mod monotonic;
mod null;
mod static_buffer;

pub use default::{DefaultResource, default_resource};
pub use monotonic::{ArenaStats, MonotonicResource};
pub use null::{NullResource, null_resource};
pub use static_buffer::StaticResource;

use std::alloc::Layout;
use std::ptr::NonNull;

use crate::error::AllocationFailure;

/// Allocation capability decoupled from any element type.
///
/// # Contract
///
/// - [`allocate`](Self::allocate) returns a block of at least
///   `layout.size()` bytes aligned to `layout.align()`, or an
///   [`AllocationFailure`]. It never hands out an invalid pointer.
/// - [`deallocate`](Self::deallocate) releases a block obtained from the
///   same instance. Foreign blocks and double frees are undefined behaviour.
/// - [`trivially_deallocates`](Self::trivially_deallocates) is a property
///   of the concrete type, not of an instance. When it is `true`,
///   `deallocate` does nothing and callers may skip it.
///
/// Implementations that mutate internal state on `allocate` must protect
/// that state themselves; the `Sync` bound makes this a compile-time
/// requirement rather than a convention.
pub trait MemoryResource: Send + Sync {
    /// Obtain a block satisfying `layout`
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] when the request cannot be met.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocationFailure>;

    /// Return a block to the resource
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this same instance with
    /// the same `layout`, and must not have been deallocated already.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Whether `other` is interchangeable with `self`: memory allocated by
    /// one may be deallocated by the other.
    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        std::ptr::addr_eq(self, other)
    }

    /// Whether `deallocate` is a no-op for this resource type.
    ///
    /// Captured by [`StorageHandle`](crate::StorageHandle) when the concrete
    /// type is still known, so checking it later costs no dynamic dispatch.
    fn trivially_deallocates() -> bool
    where
        Self: Sized,
    {
        false
    }
}

/// Round `addr` up to the next multiple of `align` (a power of two).
///
/// Returns `None` on overflow.
#[inline]
pub(crate) fn align_up(addr: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two());
    Some(addr.checked_add(align - 1)? & !(align - 1))
}

/// A non-null pointer aligned to `layout.align()` that must not be
/// dereferenced. Used to serve zero-sized requests without touching memory.
#[inline]
pub(crate) fn dangling_for(layout: Layout) -> NonNull<u8> {
    // An alignment is never zero
    NonNull::new(std::ptr::without_provenance_mut(layout.align())).unwrap_or(NonNull::dangling())
}
