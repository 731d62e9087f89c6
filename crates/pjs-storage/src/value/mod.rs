//! Resource-aware JSON value tree
//!
//! Every node of a [`Value`] tree allocates from the resource of the handle
//! it was built with, and children always share their parent's resource:
//! inserting a value that lives elsewhere copies it in. When that resource
//! deallocates trivially and is not shared, containers skip per-element
//! teardown altogether and leave the memory to the resource.
//!
//! ```
//! # use pjson_rs_storage::{Array, MonotonicResource, StorageHandle, Value};
//! let arena = MonotonicResource::new();
//! let storage = StorageHandle::borrowed(&arena);
//!
//! let mut array = Array::new_in(storage.clone());
//! array.push(Value::from_i64(1, storage.clone()))?;
//! array.push(Value::string_in("two", StorageHandle::default())?)?;
//!
//! // The foreign string was copied into the arena
//! assert_eq!(array[1].storage(), &storage);
//! # Ok::<(), pjson_rs_storage::AllocationFailure>(())
//! ```

mod array;
mod child;
mod object;
mod ser;
mod string;

pub use array::Array;
pub use child::ChildMut;
pub use object::{Iter as ObjectIter, Object};
pub use string::JsonString;

use std::fmt;

use allocator_api2::vec::Vec;

use crate::error::AllocationFailure;
use crate::storage::{ResourceAllocator, StorageHandle};

/// Vector drawing from a storage handle
pub(crate) type StorageVec<'r, T> = Vec<T, ResourceAllocator<'r>>;

/// Grow `vec` to hold `additional` more elements, amortized
pub(crate) fn try_reserve<T>(
    vec: &mut StorageVec<'_, T>,
    additional: usize,
) -> Result<(), AllocationFailure> {
    vec.try_reserve(additional)
        .map_err(|_| AllocationFailure::for_array::<T>(vec.len().saturating_add(additional)))
}

/// Grow `vec` to hold exactly `additional` more elements
pub(crate) fn try_reserve_exact<T>(
    vec: &mut StorageVec<'_, T>,
    additional: usize,
) -> Result<(), AllocationFailure> {
    vec.try_reserve_exact(additional)
        .map_err(|_| AllocationFailure::for_array::<T>(vec.len().saturating_add(additional)))
}

/// Whether a child built on `child` may be moved under a parent built on
/// `parent` without copying
fn same_storage(child: &StorageHandle<'_>, parent: &StorageHandle<'_>) -> bool {
    child.is_shared() == parent.is_shared() && child.is_equal(parent)
}

/// Kind of a JSON value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// `null`
    Null,
    /// `true` or `false`
    Bool,
    /// Signed integer
    Int64,
    /// Unsigned integer
    Uint64,
    /// Floating point number
    Double,
    /// String
    String,
    /// Array
    Array,
    /// Object
    Object,
}

#[derive(Debug, Clone, Copy)]
enum Scalar {
    Null,
    Bool(bool),
    Int64(i64),
    Uint64(u64),
    Double(f64),
}

enum Inner<'r> {
    Scalar(Scalar, StorageHandle<'r>),
    String(JsonString<'r>),
    Array(Array<'r>),
    Object(Object<'r>),
}

/// A JSON value bound to a storage handle.
///
/// Scalars carry the handle so their descendants-to-be (after conversion to
/// a container) and any copies land in the same resource. Containers hold
/// it inside their allocator.
pub struct Value<'r> {
    inner: Inner<'r>,
}

impl<'r> Value<'r> {
    fn scalar(scalar: Scalar, storage: StorageHandle<'r>) -> Self {
        Self {
            inner: Inner::Scalar(scalar, storage),
        }
    }

    /// `null`
    pub fn null(storage: StorageHandle<'r>) -> Self {
        Self::scalar(Scalar::Null, storage)
    }

    /// Boolean value
    pub fn from_bool(value: bool, storage: StorageHandle<'r>) -> Self {
        Self::scalar(Scalar::Bool(value), storage)
    }

    /// Signed integer value
    pub fn from_i64(value: i64, storage: StorageHandle<'r>) -> Self {
        Self::scalar(Scalar::Int64(value), storage)
    }

    /// Unsigned integer value. Values that fit `i64` are still reported as
    /// [`Kind::Uint64`].
    pub fn from_u64(value: u64, storage: StorageHandle<'r>) -> Self {
        Self::scalar(Scalar::Uint64(value), storage)
    }

    /// Floating point value
    pub fn from_f64(value: f64, storage: StorageHandle<'r>) -> Self {
        Self::scalar(Scalar::Double(value), storage)
    }

    /// String value copied into `storage`
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] if the resource refuses the block.
    pub fn string_in(s: &str, storage: StorageHandle<'r>) -> Result<Self, AllocationFailure> {
        JsonString::from_str_in(s, storage).map(Self::from)
    }

    /// Empty array; allocates nothing
    pub fn array_in(storage: StorageHandle<'r>) -> Self {
        Array::new_in(storage).into()
    }

    /// Empty object; allocates nothing
    pub fn object_in(storage: StorageHandle<'r>) -> Self {
        Object::new_in(storage).into()
    }

    /// The kind of this value
    pub fn kind(&self) -> Kind {
        match &self.inner {
            Inner::Scalar(Scalar::Null, _) => Kind::Null,
            Inner::Scalar(Scalar::Bool(_), _) => Kind::Bool,
            Inner::Scalar(Scalar::Int64(_), _) => Kind::Int64,
            Inner::Scalar(Scalar::Uint64(_), _) => Kind::Uint64,
            Inner::Scalar(Scalar::Double(_), _) => Kind::Double,
            Inner::String(_) => Kind::String,
            Inner::Array(_) => Kind::Array,
            Inner::Object(_) => Kind::Object,
        }
    }

    /// The handle this value and all its descendants allocate from
    pub fn storage(&self) -> &StorageHandle<'r> {
        match &self.inner {
            Inner::Scalar(_, storage) => storage,
            Inner::String(s) => s.storage(),
            Inner::Array(a) => a.storage(),
            Inner::Object(o) => o.storage(),
        }
    }

    /// Whether this is `null`
    pub fn is_null(&self) -> bool {
        matches!(self.inner, Inner::Scalar(Scalar::Null, _))
    }

    /// Whether this is any of the number kinds
    pub fn is_number(&self) -> bool {
        matches!(self.kind(), Kind::Int64 | Kind::Uint64 | Kind::Double)
    }

    /// Whether this is a string
    pub fn is_string(&self) -> bool {
        matches!(self.inner, Inner::String(_))
    }

    /// Whether this is an array
    pub fn is_array(&self) -> bool {
        matches!(self.inner, Inner::Array(_))
    }

    /// Whether this is an object
    pub fn is_object(&self) -> bool {
        matches!(self.inner, Inner::Object(_))
    }

    /// Boolean value, if this is one
    pub fn as_bool(&self) -> Option<bool> {
        match self.inner {
            Inner::Scalar(Scalar::Bool(b), _) => Some(b),
            _ => None,
        }
    }

    /// Integer value if it fits `i64`, whichever integer kind it is stored as
    pub fn as_i64(&self) -> Option<i64> {
        match self.inner {
            Inner::Scalar(Scalar::Int64(n), _) => Some(n),
            Inner::Scalar(Scalar::Uint64(n), _) => i64::try_from(n).ok(),
            _ => None,
        }
    }

    /// Integer value if it fits `u64`, whichever integer kind it is stored as
    pub fn as_u64(&self) -> Option<u64> {
        match self.inner {
            Inner::Scalar(Scalar::Uint64(n), _) => Some(n),
            Inner::Scalar(Scalar::Int64(n), _) => u64::try_from(n).ok(),
            _ => None,
        }
    }

    /// Any number converted to `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self.inner {
            Inner::Scalar(Scalar::Double(n), _) => Some(n),
            Inner::Scalar(Scalar::Int64(n), _) => Some(n as f64),
            Inner::Scalar(Scalar::Uint64(n), _) => Some(n as f64),
            _ => None,
        }
    }

    /// String contents, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match &self.inner {
            Inner::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The string, if this is one
    pub fn as_string(&self) -> Option<&JsonString<'r>> {
        match &self.inner {
            Inner::String(s) => Some(s),
            _ => None,
        }
    }

    /// Mutable access to the string, if this is one. Children of a
    /// container are reached through [`ChildMut`] instead.
    pub fn as_string_mut(&mut self) -> Option<&mut JsonString<'r>> {
        match &mut self.inner {
            Inner::String(s) => Some(s),
            _ => None,
        }
    }

    /// The array, if this is one
    pub fn as_array(&self) -> Option<&Array<'r>> {
        match &self.inner {
            Inner::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Mutable access to the array, if this is one. Children of a
    /// container are reached through [`ChildMut`] instead.
    pub fn as_array_mut(&mut self) -> Option<&mut Array<'r>> {
        match &mut self.inner {
            Inner::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The object, if this is one
    pub fn as_object(&self) -> Option<&Object<'r>> {
        match &self.inner {
            Inner::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Mutable access to the object, if this is one. Children of a
    /// container are reached through [`ChildMut`] instead.
    pub fn as_object_mut(&mut self) -> Option<&mut Object<'r>> {
        match &mut self.inner {
            Inner::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Deep copy of the whole tree into `storage`
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] on the first block the target resource
    /// refuses; the partial copy is dropped.
    pub fn clone_in<'s>(&self, storage: StorageHandle<'s>) -> Result<Value<'s>, AllocationFailure> {
        Ok(match &self.inner {
            Inner::Scalar(scalar, _) => Value::scalar(*scalar, storage),
            Inner::String(s) => s.clone_in(storage)?.into(),
            Inner::Array(a) => a.clone_in(storage)?.into(),
            Inner::Object(o) => o.clone_in(storage)?.into(),
        })
    }

    /// Deep copy into this value's own resource
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] if the resource runs out.
    pub fn try_clone(&self) -> Result<Self, AllocationFailure> {
        self.clone_in(self.storage().clone())
    }

    /// Rebind to `storage` for insertion under a parent, copying only when
    /// the resources differ
    pub(crate) fn adopt(self, storage: &StorageHandle<'r>) -> Result<Self, AllocationFailure> {
        if same_storage(self.storage(), storage) {
            Ok(self)
        } else {
            self.clone_in(storage.clone())
        }
    }
}

impl<'r> From<JsonString<'r>> for Value<'r> {
    fn from(s: JsonString<'r>) -> Self {
        Self {
            inner: Inner::String(s),
        }
    }
}

impl<'r> From<Array<'r>> for Value<'r> {
    fn from(a: Array<'r>) -> Self {
        Self {
            inner: Inner::Array(a),
        }
    }
}

impl<'r> From<Object<'r>> for Value<'r> {
    fn from(o: Object<'r>) -> Self {
        Self {
            inner: Inner::Object(o),
        }
    }
}

impl PartialEq<Value<'_>> for Value<'_> {
    /// Structural equality; storage is not compared. Integers compare by
    /// numeric value across `Int64` and `Uint64`.
    fn eq(&self, other: &Value<'_>) -> bool {
        match (&self.inner, &other.inner) {
            (Inner::Scalar(a, _), Inner::Scalar(b, _)) => match (a, b) {
                (Scalar::Null, Scalar::Null) => true,
                (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
                (Scalar::Double(a), Scalar::Double(b)) => a == b,
                (Scalar::Int64(_) | Scalar::Uint64(_), Scalar::Int64(_) | Scalar::Uint64(_)) => {
                    match (self.as_i64(), other.as_i64()) {
                        (Some(a), Some(b)) => a == b,
                        (None, None) => self.as_u64() == other.as_u64(),
                        _ => false,
                    }
                }
                _ => false,
            },
            (Inner::String(a), Inner::String(b)) => a == b,
            (Inner::Array(a), Inner::Array(b)) => a == b,
            (Inner::Object(a), Inner::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Scalar(Scalar::Null, _) => f.write_str("Null"),
            Inner::Scalar(Scalar::Bool(b), _) => write!(f, "Bool({b})"),
            Inner::Scalar(Scalar::Int64(n), _) => write!(f, "Int64({n})"),
            Inner::Scalar(Scalar::Uint64(n), _) => write!(f, "Uint64({n})"),
            Inner::Scalar(Scalar::Double(n), _) => write!(f, "Double({n:?})"),
            Inner::String(s) => write!(f, "String({s:?})"),
            Inner::Array(a) => fmt::Debug::fmt(a, f),
            Inner::Object(o) => fmt::Debug::fmt(o, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{MonotonicResource, StaticResource, null_resource};
    use crate::storage::make_counted_resource;

    #[test]
    fn test_scalar_kinds() {
        let storage = StorageHandle::default();
        assert_eq!(Value::null(storage.clone()).kind(), Kind::Null);
        assert_eq!(Value::from_bool(true, storage.clone()).kind(), Kind::Bool);
        assert_eq!(Value::from_i64(-1, storage.clone()).kind(), Kind::Int64);
        assert_eq!(Value::from_u64(u64::MAX, storage.clone()).kind(), Kind::Uint64);
        assert_eq!(Value::from_f64(0.5, storage.clone()).kind(), Kind::Double);
        assert!(Value::null(storage).is_null());
    }

    #[test]
    fn test_scalars_never_allocate() {
        let storage = StorageHandle::borrowed(null_resource());
        let v = Value::from_f64(1.5, storage.clone());
        assert_eq!(v.as_f64(), Some(1.5));
        assert_eq!(v.storage(), &storage);
        assert!(Value::array_in(storage.clone()).as_array().unwrap().is_empty());
        assert!(Value::object_in(storage).as_object().unwrap().is_empty());
    }

    #[test]
    fn test_integer_accessors_convert_within_range() {
        let storage = StorageHandle::default();
        let small = Value::from_u64(7, storage.clone());
        assert_eq!(small.as_i64(), Some(7));
        let big = Value::from_u64(u64::MAX, storage.clone());
        assert_eq!(big.as_i64(), None);
        let negative = Value::from_i64(-3, storage);
        assert_eq!(negative.as_u64(), None);
        assert_eq!(negative.as_f64(), Some(-3.0));
    }

    #[test]
    fn test_integer_equality_across_kinds() {
        let storage = StorageHandle::default();
        assert_eq!(Value::from_i64(5, storage.clone()), Value::from_u64(5, storage.clone()));
        assert_ne!(
            Value::from_i64(-1, storage.clone()),
            Value::from_u64(u64::MAX, storage.clone())
        );
        assert_ne!(Value::from_i64(1, storage.clone()), Value::from_f64(1.0, storage));
    }

    #[test]
    fn test_clone_in_moves_whole_tree() {
        let mut array = Array::new_in(StorageHandle::default());
        array.push(Value::string_in("a", StorageHandle::default()).unwrap()).unwrap();
        let mut inner = Object::new_in(StorageHandle::default());
        inner.insert("k", Value::from_bool(false, StorageHandle::default())).unwrap();
        array.push(inner.into()).unwrap();
        let original = Value::from(array);

        let arena = MonotonicResource::new();
        let target = StorageHandle::borrowed(&arena);
        let copy = original.clone_in(target.clone()).unwrap();

        assert_eq!(copy, original);
        let copied = copy.as_array().unwrap();
        assert_eq!(copied.storage(), &target);
        assert_eq!(copied[0].storage(), &target);
        assert_eq!(copied[1].as_object().unwrap().get("k").unwrap().storage(), &target);
    }

    #[test]
    fn test_clone_in_failure_reports_allocation() {
        let original = Value::string_in("payload", StorageHandle::default()).unwrap();
        let mut buffer = [0u8; 3];
        let resource = StaticResource::new(&mut buffer);
        let err = original.clone_in(StorageHandle::borrowed(&resource)).unwrap_err();
        assert_eq!(err.size, 7);
    }

    #[test]
    fn test_try_clone_same_resource() {
        let storage = make_counted_resource(MonotonicResource::new());
        let original = Value::string_in("x", storage.clone()).unwrap();
        let copy = original.try_clone().unwrap();
        assert_eq!(copy.storage(), &storage);
        assert_eq!(storage.use_count(), Some(3));
    }

    #[test]
    fn test_adopt_copies_across_ownership_modes() {
        let shared = make_counted_resource(MonotonicResource::new());
        let borrowed = StorageHandle::default();
        let v = Value::from_i64(1, shared.clone());
        let adopted = v.adopt(&borrowed).unwrap();
        assert!(adopted.storage().is_default());
        assert_eq!(shared.use_count(), Some(1));
    }

    #[test]
    fn test_debug_output() {
        let storage = StorageHandle::default();
        assert_eq!(format!("{:?}", Value::from_i64(3, storage.clone())), "Int64(3)");
        assert_eq!(format!("{:?}", Value::string_in("s", storage).unwrap()), "String(\"s\")");
    }
}
