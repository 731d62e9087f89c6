//! Bump allocation inside one caller-owned buffer

use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use super::{MemoryResource, align_up};
use crate::error::AllocationFailure;

/// Fixed-buffer resource that never touches the heap.
///
/// Allocation bumps an atomic cursor through the borrowed buffer. There is no
/// growth path: once the buffer is exhausted every request fails, which makes
/// this the resource of choice when a bounded input must be processed with
/// zero dynamic allocation.
///
/// ```
/// # use pjson_rs_storage::{StaticResource, StorageHandle, parse};
/// let mut buffer = [0u8; 1024];
/// let resource = StaticResource::new(&mut buffer);
/// let value = parse(r#"{"id": 7, "tags": ["a", "b"]}"#, StorageHandle::borrowed(&resource))?;
/// assert_eq!(value.as_object().unwrap().len(), 2);
/// assert!(resource.used() > 0);
/// # Ok::<(), pjson_rs_storage::Error>(())
/// ```
pub struct StaticResource<'a> {
    base: NonNull<u8>,
    capacity: usize,
    cursor: AtomicUsize,
    _buffer: PhantomData<&'a mut [u8]>,
}

// SAFETY: the buffer is exclusively borrowed for 'a and only reached through
// disjoint ranges handed out by the atomic cursor.
unsafe impl Send for StaticResource<'_> {}
unsafe impl Sync for StaticResource<'_> {}

impl<'a> StaticResource<'a> {
    /// Serve allocations from `buffer`
    pub fn new(buffer: &'a mut [u8]) -> Self {
        let capacity = buffer.len();
        // A slice pointer is never null, even for an empty slice
        let base = NonNull::from(buffer).cast::<u8>();
        Self {
            base,
            capacity,
            cursor: AtomicUsize::new(0),
            _buffer: PhantomData,
        }
    }

    /// Size of the underlying buffer in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes consumed so far, alignment padding included
    pub fn used(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Bytes still available before alignment padding
    pub fn remaining(&self) -> usize {
        self.capacity - self.used()
    }

    /// Make the whole buffer available again.
    ///
    /// Taking `&mut self` guarantees no handle or container still refers to
    /// memory handed out before.
    pub fn release(&mut self) {
        *self.cursor.get_mut() = 0;
    }
}

impl MemoryResource for StaticResource<'_> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocationFailure> {
        let base = self.base.as_ptr() as usize;
        let mut current = self.cursor.load(Ordering::Acquire);
        loop {
            let start = base
                .checked_add(current)
                .and_then(|addr| align_up(addr, layout.align()))
                .map(|addr| addr - base);
            let end = start.and_then(|start| start.checked_add(layout.size()));
            let (start, end) = match (start, end) {
                (Some(start), Some(end)) if end <= self.capacity => (start, end),
                _ => {
                    debug!(
                        size = layout.size(),
                        align = layout.align(),
                        used = current,
                        capacity = self.capacity,
                        "static buffer exhausted"
                    );
                    return Err(AllocationFailure::new(layout));
                }
            };

            match self.cursor.compare_exchange_weak(
                current,
                end,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                // SAFETY: start <= end <= capacity, so the offset stays inside the buffer
                Ok(_) => return Ok(unsafe { self.base.add(start) }),
                Err(observed) => current = observed,
            }
        }
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {}

    fn trivially_deallocates() -> bool {
        true
    }
}

impl fmt::Debug for StaticResource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticResource")
            .field("capacity", &self.capacity)
            .field("used", &self.used())
            .finish()
    }
}
