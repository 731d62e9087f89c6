//! Arena resource for build-once value trees
//!
//! Parsing produces each container exactly once, never grows it afterwards
//! and frees the whole tree at once. A bump allocator exploits that pattern:
//! every request carves the next aligned bytes out of the current region and
//! `deallocate` does nothing. Memory goes back upstream only when the arena
//! is released or dropped.

use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;
use std::mem::{align_of, size_of};
use std::ptr::NonNull;

use parking_lot::Mutex;
use tracing::debug;

use super::{MemoryResource, align_up, dangling_for};
use crate::config::ArenaConfig;
use crate::error::{AllocationFailure, Result};
use crate::storage::StorageHandle;

/// Bookkeeping stored at the start of every upstream block, forming an
/// intrusive list so that acquiring a block costs exactly one upstream call.
struct BlockHeader {
    next: Option<NonNull<BlockHeader>>,
    layout: Layout,
}

const HEADER_SIZE: usize = size_of::<BlockHeader>();
const HEADER_ALIGN: usize = align_of::<BlockHeader>();

/// Usage counters of a [`MonotonicResource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArenaStats {
    /// Blocks currently held from upstream
    pub blocks: usize,
    /// Bytes obtained from upstream, headers included
    pub reserved_bytes: usize,
    /// Bytes handed to callers, padding excluded
    pub allocated_bytes: usize,
    /// Size of the caller-supplied initial buffer
    pub buffer_bytes: usize,
    /// Size the next upstream block will have (at least)
    pub next_block_size: usize,
}

struct ArenaState {
    region: NonNull<u8>,
    offset: usize,
    len: usize,
    head: Option<NonNull<BlockHeader>>,
    next_block_size: usize,
    blocks: usize,
    reserved_bytes: usize,
    allocated_bytes: usize,
}

// SAFETY: the raw pointers refer to memory owned by the arena (upstream
// blocks or the exclusively borrowed initial buffer), never to thread-local data.
unsafe impl Send for ArenaState {}

impl ArenaState {
    /// Carve `layout` out of the current region
    fn bump(&mut self, layout: Layout) -> Option<NonNull<u8>> {
        let addr = (self.region.as_ptr() as usize).checked_add(self.offset)?;
        let start = self.offset + (align_up(addr, layout.align())? - addr);
        let end = start.checked_add(layout.size())?;
        if end > self.len {
            return None;
        }
        self.offset = end;
        self.allocated_bytes += layout.size();
        // SAFETY: start <= end <= len, inside the current region
        Some(unsafe { self.region.add(start) })
    }
}

/// Arena (bump) resource with trivial deallocation.
///
/// Requests are served from an optional caller-supplied buffer first, then
/// from blocks obtained from an upstream [`StorageHandle`] (the default
/// resource unless configured otherwise). Block sizes follow
/// [`ArenaConfig`]; a request larger than the next block gets a block of
/// its own size.
///
/// ```
/// # use pjson_rs_storage::{MonotonicResource, StorageHandle, parse};
/// let arena = MonotonicResource::new();
/// let value = parse("[1, 2, 3]", StorageHandle::borrowed(&arena))?;
/// assert_eq!(value.as_array().unwrap().len(), 3);
/// assert_eq!(arena.stats().blocks, 1);
/// # Ok::<(), pjson_rs_storage::Error>(())
/// ```
pub struct MonotonicResource<'a> {
    state: Mutex<ArenaState>,
    buffer: Option<(NonNull<u8>, usize)>,
    upstream: StorageHandle<'a>,
    config: ArenaConfig,
    _buffer: PhantomData<&'a mut [u8]>,
}

// SAFETY: `buffer` points into a slice exclusively borrowed for 'a; all access
// to it goes through `state`, which is behind a mutex.
unsafe impl Send for MonotonicResource<'_> {}
unsafe impl Sync for MonotonicResource<'_> {}

impl MonotonicResource<'static> {
    /// Arena with the default block policy, backed by the default resource
    pub fn new() -> Self {
        Self::build(None, StorageHandle::default(), ArenaConfig::default())
    }

    /// Arena whose first upstream block holds `bytes`
    pub fn with_capacity(bytes: usize) -> Self {
        let defaults = ArenaConfig::default();
        let config = defaults
            .with_initial_block_size(bytes.max(1))
            .with_max_block_size(defaults.max_block_size.max(bytes));
        Self::build(None, StorageHandle::default(), config)
    }

    /// Arena with a custom block policy
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if the
    /// policy does not validate.
    pub fn with_config(config: ArenaConfig) -> Result<Self> {
        Self::from_parts(None, StorageHandle::default(), config)
    }
}

impl Default for MonotonicResource<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> MonotonicResource<'a> {
    /// Arena that uses `buffer` before asking the default resource for more
    pub fn with_buffer(buffer: &'a mut [u8]) -> Self {
        Self::build(Some(buffer), StorageHandle::default(), ArenaConfig::default())
    }

    /// Arena that obtains its blocks from `upstream`
    pub fn with_upstream(upstream: StorageHandle<'a>) -> Self {
        Self::build(None, upstream, ArenaConfig::default())
    }

    /// Arena from every optional part
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if the
    /// policy does not validate.
    pub fn from_parts(
        buffer: Option<&'a mut [u8]>,
        upstream: StorageHandle<'a>,
        config: ArenaConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(buffer, upstream, config))
    }

    fn build(
        buffer: Option<&'a mut [u8]>,
        upstream: StorageHandle<'a>,
        config: ArenaConfig,
    ) -> Self {
        let buffer = buffer.map(|buf| {
            let len = buf.len();
            (NonNull::from(buf).cast::<u8>(), len)
        });
        Self {
            state: Mutex::new(Self::initial_state(buffer, &config)),
            buffer,
            upstream,
            config,
            _buffer: PhantomData,
        }
    }

    fn initial_state(buffer: Option<(NonNull<u8>, usize)>, config: &ArenaConfig) -> ArenaState {
        let (region, len) = buffer.unwrap_or((NonNull::dangling(), 0));
        ArenaState {
            region,
            offset: 0,
            len,
            head: None,
            next_block_size: config.initial_block_size,
            blocks: 0,
            reserved_bytes: 0,
            allocated_bytes: 0,
        }
    }

    /// The resource upstream blocks come from
    pub fn upstream(&self) -> &StorageHandle<'a> {
        &self.upstream
    }

    /// The block policy in effect
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Current usage counters
    pub fn stats(&self) -> ArenaStats {
        let state = self.state.lock();
        ArenaStats {
            blocks: state.blocks,
            reserved_bytes: state.reserved_bytes,
            allocated_bytes: state.allocated_bytes,
            buffer_bytes: self.buffer.map_or(0, |(_, len)| len),
            next_block_size: state.next_block_size,
        }
    }

    /// Return every upstream block and start over from the initial buffer.
    ///
    /// Taking `&mut self` guarantees nothing still refers to arena memory.
    pub fn release(&mut self) {
        let state = self.state.get_mut();
        let mut head = state.head.take();
        let released = state.blocks;

        while let Some(block) = head {
            // SAFETY: every header was written by `grow` and is still owned by the arena
            let BlockHeader { next, layout } = unsafe { block.as_ptr().read() };
            if !self.upstream.is_trivially_deallocatable() {
                // SAFETY: the block came from `upstream.allocate(layout)`
                unsafe { self.upstream.deallocate(block.cast(), layout) };
            }
            head = next;
        }

        if released > 0 {
            debug!(
                blocks = released,
                reserved_bytes = state.reserved_bytes,
                "monotonic arena released upstream blocks"
            );
        }
        *state = Self::initial_state(self.buffer, &self.config);
    }

    /// Obtain a new upstream block able to hold `layout` and make it current
    fn grow(
        &self,
        state: &mut ArenaState,
        layout: Layout,
    ) -> std::result::Result<(), AllocationFailure> {
        let padding = layout.align().saturating_sub(1);
        let needed = HEADER_SIZE
            .checked_add(padding)
            .and_then(|n| n.checked_add(layout.size()))
            .ok_or_else(|| AllocationFailure::new(layout))?;
        let block_size = state.next_block_size.max(needed);
        let block_layout = Layout::from_size_align(block_size, layout.align().max(HEADER_ALIGN))
            .map_err(|_| AllocationFailure::new(layout))?;

        let block = self.upstream.allocate(block_layout)?;
        let header = block.cast::<BlockHeader>();
        // SAFETY: the block is at least HEADER_SIZE bytes and aligned for BlockHeader
        unsafe {
            header.as_ptr().write(BlockHeader {
                next: state.head,
                layout: block_layout,
            });
        }

        state.head = Some(header);
        // SAFETY: HEADER_SIZE <= block_size
        state.region = unsafe { block.add(HEADER_SIZE) };
        state.offset = 0;
        state.len = block_size - HEADER_SIZE;
        state.blocks += 1;
        state.reserved_bytes += block_size;
        // Growth follows the policy size, not an oversized block
        state.next_block_size = self.config.next_block_size(state.next_block_size, 0);

        debug!(
            block_size,
            blocks = state.blocks,
            next_block_size = state.next_block_size,
            "monotonic arena acquired upstream block"
        );
        Ok(())
    }
}

impl MemoryResource for MonotonicResource<'_> {
    fn allocate(&self, layout: Layout) -> std::result::Result<NonNull<u8>, AllocationFailure> {
        if layout.size() == 0 {
            return Ok(dangling_for(layout));
        }
        let mut state = self.state.lock();
        if let Some(ptr) = state.bump(layout) {
            return Ok(ptr);
        }
        self.grow(&mut state, layout)?;
        // A fresh block always has room for the request that caused it
        state.bump(layout).ok_or_else(|| AllocationFailure::new(layout))
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {}

    fn trivially_deallocates() -> bool {
        true
    }
}

impl Drop for MonotonicResource<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for MonotonicResource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonotonicResource")
            .field("stats", &self.stats())
            .field("config", &self.config)
            .field("upstream", &self.upstream)
            .finish()
    }
}
