//! LMDB implementation of KeyValueStore.

use std::sync::Arc;

use heed::types::{Bytes, Str};
use heed::{Database, Env};

use starreg_store::{KeyValueStore, StoreError};

use crate::LmdbError;

/// Cheap to clone: every clone shares the same environment.
#[derive(Clone)]
pub struct LmdbKvStore {
    pub(crate) env: Arc<Env>,
    pub(crate) kv_db: Database<Str, Bytes>,
}

impl KeyValueStore for LmdbKvStore {
    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .kv_db
            .get(&rtxn, key)
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(key.to_string()))?;
        Ok(val.to_vec())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.kv_db
            .put(&mut wtxn, key, value)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.kv_db
            .delete(&mut wtxn, key)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("temp dir");
        let env = LmdbEnvironment::open(dir.path(), 4, 16 * 1024 * 1024).expect("open env");
        (dir, env)
    }

    #[test]
    fn put_then_get() {
        let (_dir, env) = temp_env();
        let store = env.kv_store();
        store.put("chain", b"[]").unwrap();
        assert_eq!(store.get("chain").unwrap(), b"[]");
    }

    #[test]
    fn missing_key_is_not_found() {
        let (_dir, env) = temp_env();
        let err = env.kv_store().get("queue").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn put_overwrites() {
        let (_dir, env) = temp_env();
        let store = env.kv_store();
        store.put("k", b"one").unwrap();
        store.put("k", b"two").unwrap();
        assert_eq!(store.get("k").unwrap(), b"two");
    }

    #[test]
    fn delete_missing_key_is_ok() {
        let (_dir, env) = temp_env();
        let store = env.kv_store();
        store.delete("absent").unwrap();
        store.put("k", b"v").unwrap();
        store.delete("k").unwrap();
        assert!(!store.exists("k").unwrap());
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), 4, 16 * 1024 * 1024).unwrap();
            env.kv_store().put("chain", b"[\"ab\"]").unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), 4, 16 * 1024 * 1024).unwrap();
        assert_eq!(env.kv_store().get("chain").unwrap(), b"[\"ab\"]");
    }
}
