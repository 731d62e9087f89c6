//! # PJS Storage
//!
//! Polymorphic memory resources for JSON value trees.
//!
//! A [`MemoryResource`] is a type-erased allocation strategy. A
//! [`StorageHandle`] refers to one, either borrowed from the caller or
//! reference counted, and every container of a value tree carries a copy of
//! the handle it was built with. Swapping the resource changes where a
//! whole tree lives without touching container types.
//!
//! Strategies provided:
//!
//! - [`DefaultResource`]: the global heap;
//! - [`MonotonicResource`]: a growing arena that frees only on release;
//! - [`StaticResource`]: a bump allocator over a caller buffer, never
//!   touching the heap;
//! - [`NullResource`]: refuses every request.
//!
//! ```
//! use pjson_rs_storage::{MonotonicResource, StorageHandle, parse};
//!
//! let arena = MonotonicResource::new();
//! let value = parse(r#"{"a": [1, 2, 3]}"#, StorageHandle::borrowed(&arena))?;
//! assert!(value.storage().is_trivially_deallocatable());
//! assert_eq!(value.as_object().unwrap().len(), 1);
//! # Ok::<(), pjson_rs_storage::Error>(())
//! ```

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod config;
pub mod error;
pub mod parser;
pub mod resource;
pub mod storage;
pub mod value;

pub use config::{ArenaConfig, ParserConfig};
pub use error::{AllocationFailure, Error, Result};
pub use parser::{Parser, parse, parse_with_config};
pub use resource::{
    ArenaStats, DefaultResource, MemoryResource, MonotonicResource, NullResource, StaticResource,
    default_resource, null_resource,
};
pub use storage::{
    CountedResource, ResourceAllocator, StorageHandle, make_counted_resource,
    make_counted_resource_with,
};
pub use value::{Array, ChildMut, JsonString, Kind, Object, ObjectIter, Value};

/// Common imports for building and parsing value trees
pub mod prelude {
    pub use crate::{
        Array, ChildMut, Error, JsonString, Kind, MemoryResource, MonotonicResource, Object,
        Parser, Result, StaticResource, StorageHandle, Value, make_counted_resource, parse,
    };
}
