//! Storage handles: one type for borrowed and shared resource lifetimes
//!
//! A [`StorageHandle`] is what containers actually hold. It is either a
//! plain reference to a resource the caller keeps alive, or a reference
//! counted pointer produced by [`make_counted_resource`]. Copies are O(1)
//! and never allocate, so a handle can be propagated to every node of a
//! value tree.

mod allocator;
mod counted;

pub use allocator::ResourceAllocator;
pub use counted::{CountedResource, make_counted_resource, make_counted_resource_with};

use std::alloc::Layout;
use std::fmt;
use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::error::AllocationFailure;
use crate::resource::{DefaultResource, MemoryResource, default_resource};

#[derive(Clone)]
enum Ownership<'r> {
    Borrowed(&'r dyn MemoryResource),
    Shared(Arc<dyn MemoryResource + 'r>),
}

/// Smart handle over a [`MemoryResource`].
///
/// - **Borrowed** handles are a plain reference; the lifetime `'r` makes the
///   borrow checker hold the caller to keeping the resource alive.
/// - **Shared** handles own the resource through an atomic reference count;
///   the resource is dropped when the last handle goes away.
///
/// Either way the handle always refers to a valid resource, and
/// [`is_trivially_deallocatable`](Self::is_trivially_deallocatable) answers
/// from a flag captured while the concrete type was still known.
///
/// ```
/// # use pjson_rs_storage::{MonotonicResource, StorageHandle, make_counted_resource};
/// let default = StorageHandle::default();
/// assert!(!default.is_trivially_deallocatable());
///
/// let arena = MonotonicResource::new();
/// let borrowed = StorageHandle::borrowed(&arena);
/// assert!(borrowed.is_trivially_deallocatable());
/// assert!(!borrowed.is_shared());
///
/// let shared = make_counted_resource(MonotonicResource::new());
/// let copy = shared.clone();
/// assert_eq!(shared.use_count(), Some(2));
/// assert_eq!(shared, copy);
/// ```
#[derive(Clone)]
pub struct StorageHandle<'r> {
    ownership: Ownership<'r>,
    trivial: bool,
}

impl StorageHandle<'static> {
    /// Borrowed handle to the process-wide [`DefaultResource`]
    pub fn new() -> Self {
        Self::borrowed(default_resource())
    }
}

impl Default for StorageHandle<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> StorageHandle<'r> {
    /// Borrowed handle to `resource`
    pub fn borrowed<R: MemoryResource + 'r>(resource: &'r R) -> Self {
        Self {
            ownership: Ownership::Borrowed(resource),
            trivial: R::trivially_deallocates(),
        }
    }

    /// Shared handle taking over an already counted resource
    pub(crate) fn shared<R: MemoryResource + 'r>(resource: Arc<R>) -> Self {
        Self {
            ownership: Ownership::Shared(resource),
            trivial: R::trivially_deallocates(),
        }
    }

    /// The type-erased resource behind the handle
    #[inline]
    pub fn resource(&self) -> &dyn MemoryResource {
        match &self.ownership {
            Ownership::Borrowed(resource) => *resource,
            Ownership::Shared(resource) => resource.as_ref(),
        }
    }

    /// Whether the resource's `deallocate` is a no-op. No dynamic dispatch.
    #[inline]
    pub fn is_trivially_deallocatable(&self) -> bool {
        self.trivial
    }

    /// Whether the handle shares ownership of its resource
    #[inline]
    pub fn is_shared(&self) -> bool {
        matches!(self.ownership, Ownership::Shared(_))
    }

    /// Element teardown may be skipped entirely: nothing is freed per
    /// element and no reference count needs releasing.
    #[inline]
    pub fn is_not_shared_and_deallocate_is_trivial(&self) -> bool {
        self.trivial && !self.is_shared()
    }

    /// Number of shared handles to the resource; `None` when borrowed
    pub fn use_count(&self) -> Option<usize> {
        match &self.ownership {
            Ownership::Borrowed(_) => None,
            Ownership::Shared(resource) => Some(Arc::strong_count(resource)),
        }
    }

    /// Whether both handles refer to interchangeable resources, regardless
    /// of ownership mode
    pub fn is_equal(&self, other: &StorageHandle<'_>) -> bool {
        let (a, b) = (self.resource(), other.resource());
        std::ptr::addr_eq(a, b) || a.is_equal(b)
    }

    /// Whether the handle refers to the process-wide default resource
    pub fn is_default(&self) -> bool {
        std::ptr::addr_eq(self.resource(), default_resource() as *const DefaultResource)
    }

    /// Allocate from the underlying resource
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] when the resource refuses the request.
    #[inline]
    pub fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocationFailure> {
        self.resource().allocate(layout)
    }

    /// Return a block to the underlying resource
    ///
    /// # Safety
    ///
    /// Same contract as [`MemoryResource::deallocate`].
    #[inline]
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded to the caller
        unsafe { self.resource().deallocate(ptr, layout) }
    }

    /// Allocator adapter over a copy of this handle
    pub fn allocator(&self) -> ResourceAllocator<'r> {
        ResourceAllocator::new(self.clone())
    }
}

impl<'r> Deref for StorageHandle<'r> {
    type Target = dyn MemoryResource + 'r;

    fn deref(&self) -> &Self::Target {
        match &self.ownership {
            Ownership::Borrowed(resource) => *resource,
            Ownership::Shared(resource) => resource.as_ref(),
        }
    }
}

impl<'r, R: MemoryResource + 'r> From<&'r R> for StorageHandle<'r> {
    fn from(resource: &'r R) -> Self {
        Self::borrowed(resource)
    }
}

impl PartialEq<StorageHandle<'_>> for StorageHandle<'_> {
    fn eq(&self, other: &StorageHandle<'_>) -> bool {
        self.is_equal(other)
    }
}

impl fmt::Debug for StorageHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.is_shared() { "shared" } else { "borrowed" };
        f.debug_struct("StorageHandle")
            .field("mode", &mode)
            .field("resource", &std::ptr::from_ref(self.resource()).cast::<()>())
            .field("trivial", &self.trivial)
            .field("use_count", &self.use_count())
            .finish()
    }
}
