//! Heap-backed resource shared by the whole process

use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::NonNull;

use super::{MemoryResource, dangling_for};
use crate::error::AllocationFailure;

static DEFAULT_RESOURCE: DefaultResource = DefaultResource { name: "default" };

/// The process-wide heap resource.
///
/// Forwards to the global allocator. There is exactly one instance, reached
/// through [`default_resource`]; it lives for the whole program and has
/// nothing to tear down, so no initialization or destruction order applies.
/// Thread safety is that of the global allocator.
pub struct DefaultResource {
    // Non-zero size gives the singleton an address of its own
    name: &'static str,
}

/// The process-wide [`DefaultResource`]
#[inline]
pub fn default_resource() -> &'static DefaultResource {
    &DEFAULT_RESOURCE
}

impl MemoryResource for DefaultResource {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocationFailure> {
        if layout.size() == 0 {
            return Ok(dangling_for(layout));
        }
        // SAFETY: the layout has a non-zero size
        let ptr = unsafe { alloc::alloc(layout) };
        NonNull::new(ptr).ok_or_else(|| AllocationFailure::new(layout))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        // SAFETY: the caller guarantees `ptr` came from `allocate` with this layout
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

impl fmt::Debug for DefaultResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultResource")
            .field("name", &self.name)
            .finish()
    }
}
