//! Resource that refuses every allocation

use std::alloc::Layout;
use std::fmt;
use std::ptr::NonNull;

use tracing::trace;

use super::MemoryResource;
use crate::error::AllocationFailure;

static NULL_RESOURCE: NullResource = NullResource { name: "null" };

/// A resource whose `allocate` always fails.
///
/// Configure a consumer with it to prove, by construction, that a code path
/// performs no dynamic allocation: any attempt becomes an
/// [`AllocationFailure`] instead of a silent heap call.
pub struct NullResource {
    name: &'static str,
}

/// The process-wide [`NullResource`]
#[inline]
pub fn null_resource() -> &'static NullResource {
    &NULL_RESOURCE
}

impl MemoryResource for NullResource {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocationFailure> {
        trace!(size = layout.size(), align = layout.align(), "null resource refused allocation");
        Err(AllocationFailure::new(layout))
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {
        debug_assert!(false, "null resource never hands out memory");
    }

    fn trivially_deallocates() -> bool {
        true
    }
}

impl fmt::Debug for NullResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NullResource")
            .field("name", &self.name)
            .finish()
    }
}
