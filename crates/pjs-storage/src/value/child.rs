//! Mutable access to values owned by a container

use std::fmt;
use std::ops::Deref;

use super::{Array, JsonString, Object, Value};
use crate::error::AllocationFailure;

/// Mutable view of something stored inside an [`Array`] or [`Object`].
///
/// Reads go through `Deref`. Writes are limited to operations that keep the
/// child on its parent's storage: a replacement is copied into that storage
/// first, and nested containers are reached through further `ChildMut`s, so
/// no child can be swapped for one built on another resource.
///
/// ```
/// # use pjson_rs_storage::{MonotonicResource, StorageHandle, Value, parse};
/// let arena = MonotonicResource::new();
/// let storage = StorageHandle::borrowed(&arena);
/// let mut root = parse(r#"{"tags": ["a"], "n": 1}"#, storage.clone())?;
/// let object = root.as_object_mut().unwrap();
///
/// let mut n = object.get_mut("n").unwrap();
/// n.set(Value::string_in("one", StorageHandle::default())?)?;
/// assert_eq!(n.storage(), &storage);
///
/// object
///     .get_mut("tags")
///     .unwrap()
///     .as_array_mut()
///     .unwrap()
///     .push(Value::from_bool(true, StorageHandle::default()))?;
/// assert_eq!(object.get("tags").unwrap().as_array().unwrap()[1].storage(), &storage);
/// # Ok::<(), pjson_rs_storage::Error>(())
/// ```
pub struct ChildMut<'a, T> {
    target: &'a mut T,
}

impl<'a, T> ChildMut<'a, T> {
    pub(crate) fn new(target: &'a mut T) -> Self {
        Self { target }
    }
}

impl<T> Deref for ChildMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.target
    }
}

impl<T: fmt::Debug> fmt::Debug for ChildMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.target, f)
    }
}

impl<'r> ChildMut<'_, Value<'r>> {
    /// Replace the value, returning the previous one. A replacement built
    /// on a different resource is deep-copied into the parent's resource.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] if the copy is refused; the old value
    /// stays in place.
    pub fn set(&mut self, value: Value<'r>) -> Result<Value<'r>, AllocationFailure> {
        let value = value.adopt(self.target.storage())?;
        Ok(std::mem::replace(self.target, value))
    }

    /// The string, if this is one
    pub fn as_string_mut(&mut self) -> Option<ChildMut<'_, JsonString<'r>>> {
        self.target.as_string_mut().map(ChildMut::new)
    }

    /// The array, if this is one
    pub fn as_array_mut(&mut self) -> Option<ChildMut<'_, Array<'r>>> {
        self.target.as_array_mut().map(ChildMut::new)
    }

    /// The object, if this is one
    pub fn as_object_mut(&mut self) -> Option<ChildMut<'_, Object<'r>>> {
        self.target.as_object_mut().map(ChildMut::new)
    }
}

impl<'r> ChildMut<'_, Array<'r>> {
    /// See [`Array::push`]
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] if growth or the copy is refused.
    pub fn push(&mut self, value: Value<'r>) -> Result<(), AllocationFailure> {
        self.target.push(value)
    }

    /// See [`Array::set`]
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] if the copy is refused.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(&mut self, index: usize, value: Value<'r>) -> Result<Value<'r>, AllocationFailure> {
        self.target.set(index, value)
    }

    /// Remove and return the last element
    pub fn pop(&mut self) -> Option<Value<'r>> {
        self.target.pop()
    }

    /// Mutable view of the element at `index`
    pub fn get_mut(&mut self, index: usize) -> Option<ChildMut<'_, Value<'r>>> {
        self.target.get_mut(index)
    }

    /// Drop all elements
    pub fn clear(&mut self) {
        self.target.clear();
    }
}

impl<'r> ChildMut<'_, Object<'r>> {
    /// See [`Object::insert`]
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] if the key, growth or the copy is
    /// refused.
    pub fn insert(
        &mut self,
        key: &str,
        value: Value<'r>,
    ) -> Result<Option<Value<'r>>, AllocationFailure> {
        self.target.insert(key, value)
    }

    /// Remove `key`, preserving the order of the remaining entries
    pub fn remove(&mut self, key: &str) -> Option<Value<'r>> {
        self.target.remove(key)
    }

    /// Mutable view of the value under `key`
    pub fn get_mut(&mut self, key: &str) -> Option<ChildMut<'_, Value<'r>>> {
        self.target.get_mut(key)
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.target.clear();
    }
}

impl ChildMut<'_, JsonString<'_>> {
    /// Append `s`
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] if growth is refused.
    pub fn push_str(&mut self, s: &str) -> Result<(), AllocationFailure> {
        self.target.push_str(s)
    }

    /// Append one character
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] if growth is refused.
    pub fn push(&mut self, c: char) -> Result<(), AllocationFailure> {
        self.target.push(c)
    }
}
