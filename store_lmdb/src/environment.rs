//! LMDB environment setup.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};

use crate::kv::LmdbKvStore;
use crate::LmdbError;

/// Name of the single database holding every registry key.
pub(crate) const KV_DB_NAME: &str = "kv";

/// Wraps the LMDB environment and its database handle.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    kv_db: Database<Str, Bytes>,
    path: PathBuf,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given directory.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per process per directory;
        // the node never opens the same path twice concurrently.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };
        let mut wtxn = env.write_txn()?;
        let kv_db: Database<Str, Bytes> = env.create_database(&mut wtxn, Some(KV_DB_NAME))?;
        wtxn.commit()?;
        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(Self {
            env: Arc::new(env),
            kv_db,
            path: path.to_path_buf(),
        })
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A key-value store handle sharing this environment.
    pub fn kv_store(&self) -> LmdbKvStore {
        LmdbKvStore {
            env: Arc::clone(&self.env),
            kv_db: self.kv_db,
        }
    }
}
