//! JSON object stored in a memory resource

use std::fmt;

use super::{ChildMut, JsonString, StorageVec, Value, try_reserve, try_reserve_exact};
use crate::error::AllocationFailure;
use crate::storage::StorageHandle;

struct Entry<'r> {
    key: JsonString<'r>,
    value: Value<'r>,
}

/// Insertion-ordered map from string keys to values sharing one storage
/// handle. Keys are unique; lookups are linear.
pub struct Object<'r> {
    entries: StorageVec<'r, Entry<'r>>,
}

impl<'r> Object<'r> {
    /// Empty object; allocates nothing
    pub fn new_in(storage: StorageHandle<'r>) -> Self {
        Self {
            entries: StorageVec::new_in(storage.into()),
        }
    }

    /// Empty object with room for exactly `capacity` entries
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] if the resource refuses the block.
    pub fn with_capacity_in(
        capacity: usize,
        storage: StorageHandle<'r>,
    ) -> Result<Self, AllocationFailure> {
        let mut object = Self::new_in(storage);
        try_reserve_exact(&mut object.entries, capacity)?;
        Ok(object)
    }

    /// Build from a known number of pairs with a single exact allocation.
    /// For duplicate keys the last value wins and keeps the first position.
    pub(crate) fn from_pairs_in<I>(
        pairs: I,
        storage: StorageHandle<'r>,
    ) -> Result<Self, AllocationFailure>
    where
        I: ExactSizeIterator<Item = (JsonString<'r>, Value<'r>)>,
    {
        let mut object = Self::with_capacity_in(pairs.len(), storage)?;
        for (key, value) in pairs {
            let value = value.adopt(object.storage())?;
            if let Some(index) = object.position(&key) {
                object.entries[index].value = value;
                continue;
            }
            let key = if super::same_storage(key.storage(), object.storage()) {
                key
            } else {
                key.clone_in(object.storage().clone())?
            };
            object.entries.push(Entry { key, value });
        }
        Ok(object)
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.key == key)
    }

    /// Insert `value` under `key`, returning the value it replaces.
    ///
    /// A replaced key keeps its position. A value built on a different
    /// resource is deep-copied into this object's resource first.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] if the key, growth or the copy is
    /// refused; the object is left unchanged.
    pub fn insert(
        &mut self,
        key: &str,
        value: Value<'r>,
    ) -> Result<Option<Value<'r>>, AllocationFailure> {
        let value = value.adopt(self.storage())?;
        if let Some(index) = self.position(key) {
            return Ok(Some(std::mem::replace(&mut self.entries[index].value, value)));
        }
        try_reserve(&mut self.entries, 1)?;
        let key = JsonString::from_str_in(key, self.storage().clone())?;
        self.entries.push(Entry { key, value });
        Ok(None)
    }

    /// Remove `key`, preserving the order of the remaining entries
    pub fn remove(&mut self, key: &str) -> Option<Value<'r>> {
        let index = self.position(key)?;
        Some(self.entries.remove(index).value)
    }

    /// Value stored under `key`
    pub fn get(&self, key: &str) -> Option<&Value<'r>> {
        self.position(key).map(|index| &self.entries[index].value)
    }

    /// Mutable view of the value under `key`; see [`ChildMut`]
    pub fn get_mut(&mut self, key: &str) -> Option<ChildMut<'_, Value<'r>>> {
        let index = self.position(key)?;
        Some(ChildMut::new(&mut self.entries[index].value))
    }

    /// Whether `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the object has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in insertion order
    pub fn iter(&self) -> Iter<'_, 'r> {
        Iter {
            inner: self.entries.iter(),
        }
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    /// Values in insertion order
    pub fn values(&self) -> impl Iterator<Item = &Value<'r>> + '_ {
        self.entries.iter().map(|entry| &entry.value)
    }

    /// Drop all entries, keeping the allocation
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The handle this object, its keys and its values allocate from
    pub fn storage(&self) -> &StorageHandle<'r> {
        self.entries.allocator().storage()
    }

    /// Deep copy into `storage`
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] on the first refused block.
    pub fn clone_in<'s>(
        &self,
        storage: StorageHandle<'s>,
    ) -> Result<Object<'s>, AllocationFailure> {
        let mut copy = Object::with_capacity_in(self.len(), storage)?;
        for entry in self.entries.iter() {
            let key = entry.key.clone_in(copy.storage().clone())?;
            let value = entry.value.clone_in(copy.storage().clone())?;
            copy.entries.push(Entry { key, value });
        }
        Ok(copy)
    }

    /// Deep copy into the same resource
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] if the resource runs out.
    pub fn try_clone(&self) -> Result<Self, AllocationFailure> {
        self.clone_in(self.storage().clone())
    }
}

impl Drop for Object<'_> {
    fn drop(&mut self) {
        if self.storage().is_not_shared_and_deallocate_is_trivial() {
            // SAFETY: 0 <= capacity. Skipped keys and values own nothing
            // outside the resource and hold no reference counts.
            unsafe { self.entries.set_len(0) };
        }
    }
}

/// Iterator over the entries of an [`Object`]
pub struct Iter<'a, 'r> {
    inner: std::slice::Iter<'a, Entry<'r>>,
}

impl<'a, 'r> Iterator for Iter<'a, 'r> {
    type Item = (&'a str, &'a Value<'r>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|entry| (entry.key.as_str(), &entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_, '_> {}

impl<'a, 'r> IntoIterator for &'a Object<'r> {
    type Item = (&'a str, &'a Value<'r>);
    type IntoIter = Iter<'a, 'r>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl PartialEq<Object<'_>> for Object<'_> {
    /// Map equality; entry order is ignored
    fn eq(&self, other: &Object<'_>) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|v| v == value))
    }
}

impl fmt::Debug for Object<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
