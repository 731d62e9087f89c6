//! Property-based tests for resource and handle invariants
//!
//! Uses proptest to check allocation and ownership guarantees across
//! arbitrary request sequences, buffer sizes and drop orders.

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use pjson_rs_storage::{
    AllocationFailure, ArenaConfig, MemoryResource, MonotonicResource, StaticResource,
    StorageHandle, default_resource, make_counted_resource, parse,
};
use proptest::prelude::*;

/// Resource counting its own destruction
struct DropCounting<'a> {
    drops: &'a AtomicUsize,
}

impl MemoryResource for DropCounting<'_> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocationFailure> {
        default_resource().allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { default_resource().deallocate(ptr, layout) }
    }
}

impl Drop for DropCounting<'_> {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

fn request() -> impl Strategy<Value = (usize, usize)> {
    (1usize..512, 0u32..7).prop_map(|(size, shift)| (size, 1usize << shift))
}

fn json_leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("null".to_string()),
        any::<bool>().prop_map(|b| b.to_string()),
        any::<i64>().prop_map(|n| n.to_string()),
        "[a-z]{0,12}".prop_map(|s| format!("\"{s}\"")),
    ]
}

fn json_document() -> impl Strategy<Value = String> {
    json_leaf().prop_recursive(6, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6)
                .prop_map(|items| format!("[{}]", items.join(","))),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..6).prop_map(|entries| {
                let body: Vec<_> = entries
                    .into_iter()
                    .map(|(key, value)| format!("\"{key}\":{value}"))
                    .collect();
                format!("{{{}}}", body.join(","))
            }),
        ]
    })
}

proptest! {
    /// Monotonic blocks never overlap and honour every alignment
    #[test]
    fn monotonic_blocks_disjoint_and_aligned(
        requests in prop::collection::vec(request(), 1..200),
        initial in 16usize..4096,
    ) {
        let config = ArenaConfig::default()
            .with_initial_block_size(initial)
            .with_max_block_size(1 << 16);
        let arena = MonotonicResource::with_config(config).unwrap();

        let mut blocks = Vec::new();
        for &(size, align) in &requests {
            let ptr = arena.allocate(Layout::from_size_align(size, align).unwrap()).unwrap();
            let addr = ptr.as_ptr() as usize;
            prop_assert_eq!(addr % align, 0);
            blocks.push((addr, addr + size));
        }

        blocks.sort_unstable();
        for pair in blocks.windows(2) {
            prop_assert!(pair[0].1 <= pair[1].0);
        }
        let requested: usize = requests.iter().map(|&(size, _)| size).sum();
        prop_assert_eq!(arena.stats().allocated_bytes, requested);
    }

    /// A static resource never grants more than its buffer and fails
    /// exactly when a request no longer fits
    #[test]
    fn static_grants_bounded_by_buffer(
        capacity in 0usize..2048,
        requests in prop::collection::vec(request(), 1..100),
    ) {
        let mut buffer = vec![0u8; capacity];
        let base = buffer.as_ptr() as usize;
        let resource = StaticResource::new(&mut buffer);

        let mut granted = 0;
        for &(size, align) in &requests {
            let used = resource.used();
            match resource.allocate(Layout::from_size_align(size, align).unwrap()) {
                Ok(ptr) => {
                    let addr = ptr.as_ptr() as usize;
                    prop_assert_eq!(addr % align, 0);
                    prop_assert!(addr + size <= base + capacity);
                    granted += size;
                }
                Err(err) => {
                    prop_assert_eq!(err.size, size);
                    // Only an overflowing request may fail
                    let start = (base + used).next_multiple_of(align);
                    prop_assert!(start + size > base + capacity);
                    prop_assert_eq!(resource.used(), used);
                }
            }
        }
        prop_assert!(granted <= capacity);
        prop_assert!(resource.used() <= capacity);
    }

    /// N copies and N + 1 drops in any order free the resource exactly once,
    /// after the last drop
    #[test]
    fn shared_handle_freed_once_in_any_order(
        order in (1usize..24).prop_flat_map(|n| Just((0..=n).collect::<Vec<_>>()).prop_shuffle()),
    ) {
        let drops = AtomicUsize::new(0);
        let original = make_counted_resource(DropCounting { drops: &drops });
        let mut handles: Vec<Option<StorageHandle<'_>>> =
            (1..order.len()).map(|_| Some(original.clone())).collect();
        handles.insert(0, Some(original));

        for (dropped, &index) in order.iter().enumerate() {
            prop_assert_eq!(drops.load(Ordering::SeqCst), 0);
            handles[index].take();
            let remaining = order.len() - dropped - 1;
            if let Some(survivor) = handles.iter().flatten().next() {
                prop_assert_eq!(survivor.use_count(), Some(remaining));
            }
        }
        prop_assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    /// Every parsed node reports the handle the parser was given
    #[test]
    fn parsed_trees_share_one_resource(document in json_document()) {
        let arena = MonotonicResource::new();
        let storage = StorageHandle::borrowed(&arena);
        let value = parse(&document, storage.clone()).unwrap();

        let mut pending = vec![&value];
        while let Some(node) = pending.pop() {
            prop_assert_eq!(node.storage(), &storage);
            if let Some(array) = node.as_array() {
                pending.extend(array.iter());
            } else if let Some(object) = node.as_object() {
                pending.extend(object.values());
            }
        }
    }
}
