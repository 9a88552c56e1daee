//! Key-value storage trait.

use crate::StoreError;

/// Durable get/put by string key. Values are opaque byte blobs.
///
/// `put` must be durable when it returns `Ok`: callers rely on the order of
/// their writes to decide what is committed.
pub trait KeyValueStore: Send + Sync {
    /// Retrieve a value. Missing keys are `StoreError::NotFound`.
    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Store (or overwrite) a value.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Remove a key. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Check if a key exists.
    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Retrieve a value, mapping a missing key to `None`.
    fn get_opt(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match self.get(key) {
            Ok(v) => Ok(Some(v)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
