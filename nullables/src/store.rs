//! Nullable store: thread-safe in-memory key-value storage for testing.

use starreg_store::{KeyValueStore, StoreError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// An in-memory `KeyValueStore`.
///
/// Can simulate an unreachable backend, either entirely or for writes to
/// one key, and counts `put` calls so tests can assert on write traffic.
pub struct NullStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    unavailable: AtomicBool,
    failing_put_key: Mutex<Option<String>>,
    puts: AtomicUsize,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
            failing_put_key: Mutex::new(None),
            puts: AtomicUsize::new(0),
        }
    }

    /// Make every operation fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make `put` fail for one key only (e.g. the chain index).
    pub fn fail_puts_to(&self, key: Option<&str>) {
        *lock(&self.failing_put_key) = key.map(str::to_string);
    }

    /// Write bytes directly, bypassing outage simulation (to seed or tamper).
    pub fn put_raw(&self, key: &str, value: &[u8]) {
        lock(&self.entries).insert(key.to_string(), value.to_vec());
    }

    /// Read bytes directly, bypassing outage simulation.
    pub fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
        lock(&self.entries).get(key).cloned()
    }

    /// Number of successful `put` calls so far.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("null store offline".into()));
        }
        Ok(())
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl KeyValueStore for NullStore {
    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.check_available()?;
        lock(&self.entries)
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.check_available()?;
        if lock(&self.failing_put_key).as_deref() == Some(key) {
            return Err(StoreError::Unavailable(format!("write to '{key}' refused")));
        }
        lock(&self.entries).insert(key.to_string(), value.to_vec());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_available()?;
        lock(&self.entries).remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_round_trip() {
        let store = NullStore::new();
        store.put("chain", b"[]").unwrap();
        assert_eq!(store.get("chain").unwrap(), b"[]");
        assert_eq!(store.put_count(), 1);
    }

    #[test]
    fn missing_key_is_not_found() {
        let store = NullStore::new();
        assert!(store.get("queue").unwrap_err().is_not_found());
        assert!(!store.exists("queue").unwrap());
    }

    #[test]
    fn offline_store_refuses_everything() {
        let store = NullStore::new();
        store.put_raw("chain", b"[]");
        store.set_unavailable(true);
        assert!(matches!(store.get("chain"), Err(StoreError::Unavailable(_))));
        assert!(matches!(store.put("k", b"v"), Err(StoreError::Unavailable(_))));
        store.set_unavailable(false);
        assert!(store.get("chain").is_ok());
    }

    #[test]
    fn targeted_put_failure_leaves_other_keys_writable() {
        let store = NullStore::new();
        store.fail_puts_to(Some("chain"));
        assert!(store.put("chain", b"[]").is_err());
        assert!(store.put("abc", b"{}").is_ok());
        assert!(store.get_raw("chain").is_none());
    }
}
