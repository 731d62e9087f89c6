//! Factory for reference counted resources

use std::alloc::Layout;
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use tracing::trace;

use super::StorageHandle;
use crate::error::AllocationFailure;
use crate::resource::MemoryResource;

/// Heap envelope pairing a resource with its atomic reference count.
///
/// Only [`make_counted_resource`] creates one; it is the sole way a
/// [`StorageHandle`] ends up in shared mode. The count itself lives in the
/// same heap block as the resource.
pub struct CountedResource<R> {
    inner: R,
}

impl<R: MemoryResource> CountedResource<R> {
    /// The wrapped resource
    pub fn get(&self) -> &R {
        &self.inner
    }
}

impl<R: MemoryResource> MemoryResource for CountedResource<R> {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocationFailure> {
        self.inner.allocate(layout)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded to the caller
        unsafe { self.inner.deallocate(ptr, layout) }
    }

    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        std::ptr::addr_eq(self, other) || self.inner.is_equal(other)
    }

    fn trivially_deallocates() -> bool {
        R::trivially_deallocates()
    }
}

impl<R> Drop for CountedResource<R> {
    fn drop(&mut self) {
        trace!(
            resource = std::any::type_name::<R>(),
            "last storage handle dropped, releasing counted resource"
        );
    }
}

impl<R: fmt::Debug> fmt::Debug for CountedResource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CountedResource").field(&self.inner).finish()
    }
}

/// Move `resource` into a counted heap block and return a shared handle.
///
/// Copies of the returned handle share one reference count; the resource is
/// dropped exactly once, when the last copy goes away.
///
/// ```
/// # use pjson_rs_storage::{MonotonicResource, make_counted_resource, parse};
/// let storage = make_counted_resource(MonotonicResource::new());
/// let value = parse(r#"{"a": [1, 2]}"#, storage.clone())?;
/// drop(storage);
/// // The arena stays alive as long as the tree refers to it
/// assert_eq!(value.as_object().unwrap().len(), 1);
/// # Ok::<(), pjson_rs_storage::Error>(())
/// ```
pub fn make_counted_resource<'r, R>(resource: R) -> StorageHandle<'r>
where
    R: MemoryResource + 'r,
{
    StorageHandle::shared(Arc::new(CountedResource { inner: resource }))
}

/// Like [`make_counted_resource`], constructing the resource in place
pub fn make_counted_resource_with<'r, R, F>(init: F) -> StorageHandle<'r>
where
    R: MemoryResource + 'r,
    F: FnOnce() -> R,
{
    make_counted_resource(init())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{MonotonicResource, NullResource, default_resource};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct DropCounter<'a> {
        drops: &'a AtomicUsize,
    }

    impl MemoryResource for DropCounter<'_> {
        fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocationFailure> {
            default_resource().allocate(layout)
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            unsafe { default_resource().deallocate(ptr, layout) }
        }
    }

    impl Drop for DropCounter<'_> {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_counted_resource_freed_once() {
        let drops = AtomicUsize::new(0);
        let handle = make_counted_resource(DropCounter { drops: &drops });
        let copies: Vec<_> = (0..5).map(|_| handle.clone()).collect();
        assert_eq!(handle.use_count(), Some(6));

        drop(handle);
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        for (i, copy) in copies.into_iter().enumerate() {
            assert_eq!(copy.use_count(), Some(5 - i));
            drop(copy);
        }
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_counted_resource_keeps_flag() {
        let handle = make_counted_resource(MonotonicResource::new());
        assert!(handle.is_shared());
        assert!(handle.is_trivially_deallocatable());
        assert!(!handle.is_not_shared_and_deallocate_is_trivial());

        let drops = AtomicUsize::new(0);
        let handle = make_counted_resource_with(|| DropCounter { drops: &drops });
        assert!(!handle.is_trivially_deallocatable());
    }

    #[test]
    fn test_counted_resource_trivial_flag_follows_inner() {
        assert!(CountedResource::<MonotonicResource<'static>>::trivially_deallocates());
        assert!(CountedResource::<NullResource>::trivially_deallocates());
    }

    #[test]
    fn test_counted_resource_shared_across_threads() {
        let handle = make_counted_resource(MonotonicResource::new());
        let layout = Layout::from_size_align(16, 8).unwrap();

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let handle = handle.clone();
                std::thread::spawn(move || handle.allocate(layout).is_ok())
            })
            .collect();
        for worker in workers {
            assert!(worker.join().unwrap());
        }
        assert_eq!(handle.use_count(), Some(1));
    }

    #[test]
    fn test_counted_resource_debug() {
        let wrapped = CountedResource {
            inner: MonotonicResource::new(),
        };
        assert!(format!("{wrapped:?}").starts_with("CountedResource"));
        assert_eq!(wrapped.get().stats().blocks, 0);
    }
}
