//! JSON array stored in a memory resource

use std::fmt;
use std::ops::Index;

use super::{ChildMut, StorageVec, Value, try_reserve, try_reserve_exact};
use crate::error::AllocationFailure;
use crate::storage::StorageHandle;

/// Ordered sequence of values sharing one storage handle
pub struct Array<'r> {
    items: StorageVec<'r, Value<'r>>,
}

impl<'r> Array<'r> {
    /// Empty array; allocates nothing
    pub fn new_in(storage: StorageHandle<'r>) -> Self {
        Self {
            items: StorageVec::new_in(storage.into()),
        }
    }

    /// Empty array with room for exactly `capacity` elements
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] if the resource refuses the block.
    pub fn with_capacity_in(
        capacity: usize,
        storage: StorageHandle<'r>,
    ) -> Result<Self, AllocationFailure> {
        let mut array = Self::new_in(storage);
        try_reserve_exact(&mut array.items, capacity)?;
        Ok(array)
    }

    /// Build from a known number of values with a single exact allocation
    pub(crate) fn from_values_in<I>(
        values: I,
        storage: StorageHandle<'r>,
    ) -> Result<Self, AllocationFailure>
    where
        I: ExactSizeIterator<Item = Value<'r>>,
    {
        let mut array = Self::with_capacity_in(values.len(), storage)?;
        for value in values {
            let value = value.adopt(array.storage())?;
            array.items.push(value);
        }
        Ok(array)
    }

    /// Append `value`. A value built on a different resource is deep-copied
    /// into this array's resource first.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] if growth or the copy is refused; the
    /// array is left unchanged.
    pub fn push(&mut self, value: Value<'r>) -> Result<(), AllocationFailure> {
        let value = value.adopt(self.storage())?;
        try_reserve(&mut self.items, 1)?;
        self.items.push(value);
        Ok(())
    }

    /// Remove and return the last element
    pub fn pop(&mut self) -> Option<Value<'r>> {
        self.items.pop()
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<&Value<'r>> {
        self.items.get(index)
    }

    /// Replace the element at `index`, returning the previous one. A value
    /// built on a different resource is deep-copied in first.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] if the copy is refused; the element
    /// stays in place.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(&mut self, index: usize, value: Value<'r>) -> Result<Value<'r>, AllocationFailure> {
        let len = self.len();
        assert!(index < len, "index {index} out of bounds for array of length {len}");
        let value = value.adopt(self.storage())?;
        Ok(std::mem::replace(&mut self.items[index], value))
    }

    /// Mutable view of an element; see [`ChildMut`]
    pub fn get_mut(&mut self, index: usize) -> Option<ChildMut<'_, Value<'r>>> {
        self.items.get_mut(index).map(ChildMut::new)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the array has no elements
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over the elements in order
    pub fn iter(&self) -> std::slice::Iter<'_, Value<'r>> {
        self.items.iter()
    }

    /// The elements as a slice
    pub fn as_slice(&self) -> &[Value<'r>] {
        &self.items
    }

    /// Drop all elements, keeping the allocation
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// The handle this array and its elements allocate from
    pub fn storage(&self) -> &StorageHandle<'r> {
        self.items.allocator().storage()
    }

    /// Deep copy into `storage`
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] on the first refused block.
    pub fn clone_in<'s>(
        &self,
        storage: StorageHandle<'s>,
    ) -> Result<Array<'s>, AllocationFailure> {
        let mut copy = Array::with_capacity_in(self.len(), storage)?;
        for value in self.iter() {
            let value = value.clone_in(copy.storage().clone())?;
            copy.items.push(value);
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

impl Drop for Array<'_> {
    fn drop(&mut self) {
        if self.storage().is_not_shared_and_deallocate_is_trivial() {
            // SAFETY: 0 <= capacity. Skipped elements own nothing outside the
            // resource and hold no reference counts; the resource reclaims
            // their memory in bulk.
            unsafe { self.items.set_len(0) };
        }
    }
}

impl<'r> Index<usize> for Array<'r> {
    type Output = Value<'r>;

    fn index(&self, index: usize) -> &Value<'r> {
        &self.items[index]
    }
}

impl<'a, 'r> IntoIterator for &'a Array<'r> {
    type Item = &'a Value<'r>;
    type IntoIter = std::slice::Iter<'a, Value<'r>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl PartialEq<Array<'_>> for Array<'_> {
    fn eq(&self, other: &Array<'_>) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl fmt::Debug for Array<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
