//! UTF-8 string stored in a memory resource

use std::fmt;
use std::ops::Deref;

use super::{StorageVec, try_reserve, try_reserve_exact};
use crate::error::AllocationFailure;
use crate::storage::StorageHandle;

/// Owned UTF-8 string whose bytes live in the resource of its handle
pub struct JsonString<'r> {
    bytes: StorageVec<'r, u8>,
}

impl<'r> JsonString<'r> {
    /// Empty string; allocates nothing
    pub fn new_in(storage: StorageHandle<'r>) -> Self {
        Self {
            bytes: StorageVec::new_in(storage.into()),
        }
    }

    /// Copy `s` into a single exact-size allocation
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] if the resource refuses the block.
    pub fn from_str_in(s: &str, storage: StorageHandle<'r>) -> Result<Self, AllocationFailure> {
        let mut string = Self::new_in(storage);
        try_reserve_exact(&mut string.bytes, s.len())?;
        string.bytes.extend_from_slice(s.as_bytes());
        Ok(string)
    }

    /// Append `s`, growing the allocation geometrically
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] if growth is refused; the string is left
    /// unchanged.
    pub fn push_str(&mut self, s: &str) -> Result<(), AllocationFailure> {
        try_reserve(&mut self.bytes, s.len())?;
        self.bytes.extend_from_slice(s.as_bytes());
        Ok(())
    }

    /// Append one character
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] if growth is refused.
    pub fn push(&mut self, c: char) -> Result<(), AllocationFailure> {
        self.push_str(c.encode_utf8(&mut [0; 4]))
    }

    /// The string contents
    pub fn as_str(&self) -> &str {
        // SAFETY: bytes are only ever appended from `&str` values
        unsafe { std::str::from_utf8_unchecked(&self.bytes) }
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the string is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The handle this string allocates from
    pub fn storage(&self) -> &StorageHandle<'r> {
        self.bytes.allocator().storage()
    }

    /// Copy into `storage`
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] if the target resource refuses the block.
    pub fn clone_in<'s>(
        &self,
        storage: StorageHandle<'s>,
    ) -> Result<JsonString<'s>, AllocationFailure> {
        JsonString::from_str_in(self.as_str(), storage)
    }

    /// Copy into the same resource
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] if the resource refuses the block.
    pub fn try_clone(&self) -> Result<Self, AllocationFailure> {
        self.clone_in(self.storage().clone())
    }
}

impl Deref for JsonString<'_> {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for JsonString<'_> {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<JsonString<'_>> for JsonString<'_> {
    fn eq(&self, other: &JsonString<'_>) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for JsonString<'_> {}

impl PartialEq<str> for JsonString<'_> {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for JsonString<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Debug for JsonString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for JsonString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{MonotonicResource, StaticResource, null_resource};

    #[test]
    fn test_string_from_str() {
        let s = JsonString::from_str_in("héllo", StorageHandle::default()).unwrap();
        assert_eq!(s, "héllo");
        assert_eq!(s.len(), 6);
        assert!(s.storage().is_default());
    }

    #[test]
    fn test_empty_string_needs_no_allocation() {
        let storage = StorageHandle::borrowed(null_resource());
        let s = JsonString::from_str_in("", storage.clone()).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.storage(), &storage);
    }

    #[test]
    fn test_string_null_resource_fails() {
        let storage = StorageHandle::borrowed(null_resource());
        let err = JsonString::from_str_in("x", storage).unwrap_err();
        assert_eq!(err.size, 1);
    }

    #[test]
    fn test_string_push() {
        let arena = MonotonicResource::new();
        let mut s = JsonString::new_in(StorageHandle::borrowed(&arena));
        s.push_str("ab").unwrap();
        s.push('✓').unwrap();
        assert_eq!(s.as_str(), "ab✓");
    }

    #[test]
    fn test_push_failure_leaves_string_unchanged() {
        let mut buffer = [0u8; 4];
        let resource = StaticResource::new(&mut buffer);
        let mut s = JsonString::from_str_in("abcd", StorageHandle::borrowed(&resource)).unwrap();
        assert!(s.push_str("e").is_err());
        assert_eq!(s, "abcd");
    }

    #[test]
    fn test_clone_in_other_resource() {
        let arena = MonotonicResource::new();
        let original = JsonString::from_str_in("copy me", StorageHandle::default()).unwrap();
        let copy = original.clone_in(StorageHandle::borrowed(&arena)).unwrap();
        assert_eq!(copy, original);
        assert!(copy.storage().is_trivially_deallocatable());
        assert!(arena.stats().allocated_bytes >= 7);
    }

    #[test]
    fn test_display_and_debug() {
        let s = JsonString::from_str_in("a\"b", StorageHandle::default()).unwrap();
        assert_eq!(format!("{s}"), "a\"b");
        assert_eq!(format!("{s:?}"), "\"a\\\"b\"");
    }
}
