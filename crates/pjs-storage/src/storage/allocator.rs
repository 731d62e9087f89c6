//! Standard-allocator glue over a storage handle
//!
//! [`ResourceAllocator`] lets allocator-aware collections from
//! `allocator-api2` draw their memory from a [`StorageHandle`]. The value
//! containers in this crate are built this way: the allocator embedded in
//! each container *is* the handle that container propagates to its children.

use std::alloc::Layout;
use std::fmt;
use std::ptr::NonNull;

use allocator_api2::alloc::{AllocError, Allocator};

use super::StorageHandle;
use crate::resource::dangling_for;

/// `allocator_api2::alloc::Allocator` implementation over a [`StorageHandle`]
///
/// - zero-sized layouts never reach the resource;
/// - `deallocate` is skipped entirely when the handle is trivially
///   deallocatable, using the cached flag.
///
/// ```
/// # use allocator_api2::vec::Vec;
/// # use pjson_rs_storage::{MonotonicResource, StorageHandle};
/// let arena = MonotonicResource::new();
/// let storage = StorageHandle::borrowed(&arena);
/// let mut numbers = Vec::new_in(storage.allocator());
/// numbers.push(1u32);
/// assert_eq!(numbers.allocator().storage(), &storage);
/// ```
#[derive(Clone, PartialEq)]
pub struct ResourceAllocator<'r> {
    storage: StorageHandle<'r>,
}

impl<'r> ResourceAllocator<'r> {
    /// Adapter drawing from `storage`
    pub fn new(storage: StorageHandle<'r>) -> Self {
        Self { storage }
    }

    /// The handle behind this allocator
    pub fn storage(&self) -> &StorageHandle<'r> {
        &self.storage
    }

    /// Unwrap into the handle
    pub fn into_storage(self) -> StorageHandle<'r> {
        self.storage
    }
}

impl Default for ResourceAllocator<'static> {
    fn default() -> Self {
        Self::new(StorageHandle::default())
    }
}

impl<'r> From<StorageHandle<'r>> for ResourceAllocator<'r> {
    fn from(storage: StorageHandle<'r>) -> Self {
        Self::new(storage)
    }
}

impl<'r> From<ResourceAllocator<'r>> for StorageHandle<'r> {
    fn from(allocator: ResourceAllocator<'r>) -> Self {
        allocator.storage
    }
}

// SAFETY: blocks stay valid until deallocated through an equal allocator or
// until the resource goes away, which the handle's lifetime (or reference
// count) rules out while any clone of this allocator exists. Clones share the
// same resource.
unsafe impl Allocator for ResourceAllocator<'_> {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        if layout.size() == 0 {
            return Ok(NonNull::slice_from_raw_parts(dangling_for(layout), 0));
        }
        let ptr = self.storage.allocate(layout)?;
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 || self.storage.is_trivially_deallocatable() {
            return;
        }
        // SAFETY: `ptr` was allocated by this allocator with `layout`
        unsafe { self.storage.deallocate(ptr, layout) }
    }
}

impl fmt::Debug for ResourceAllocator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceAllocator").field(&self.storage).finish()
    }
}
