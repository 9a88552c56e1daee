//! LMDB database integrity checks.
//!
//! Run on startup to detect corruption early, before the node begins
//! serving requests.

use std::path::Path;

use heed::types::{Bytes, Str};
use starreg_store::{CHAIN_KEY, QUEUE_KEY};

use crate::environment::KV_DB_NAME;
use crate::{LmdbEnvironment, LmdbError};

/// Summary of an integrity check run.
#[derive(Debug)]
pub struct IntegrityReport {
    pub total_entries: u64,
    pub has_chain: bool,
    pub has_queue: bool,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check the registry database on startup.
///
/// Read failures are recorded in the report rather than causing a hard error.
/// Block bodies without a chain index mean the index write was lost.
pub fn check_integrity(env: &LmdbEnvironment) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport {
        total_entries: 0,
        has_chain: false,
        has_queue: false,
        errors: Vec::new(),
    };

    let rtxn = env.env().read_txn()?;
    let db = match env
        .env()
        .open_database::<Str, Bytes>(&rtxn, Some(KV_DB_NAME))
    {
        Ok(Some(db)) => db,
        Ok(None) => {
            report
                .errors
                .push(format!("database '{}' is missing", KV_DB_NAME));
            return Ok(report);
        }
        Err(e) => {
            report
                .errors
                .push(format!("failed to open database '{}': {}", KV_DB_NAME, e));
            return Ok(report);
        }
    };

    match db.len(&rtxn) {
        Ok(count) => report.total_entries = count,
        Err(e) => report
            .errors
            .push(format!("failed to count entries in '{}': {}", KV_DB_NAME, e)),
    }
    report.has_chain = matches!(db.get(&rtxn, CHAIN_KEY), Ok(Some(_)));
    report.has_queue = matches!(db.get(&rtxn, QUEUE_KEY), Ok(Some(_)));

    let other_entries = report
        .total_entries
        .saturating_sub(u64::from(report.has_chain) + u64::from(report.has_queue));
    if !report.has_chain && other_entries > 0 {
        report.errors.push(format!(
            "{} block bodies present but no chain index",
            other_entries
        ));
    }

    Ok(report)
}

/// Check if the LMDB data directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent) directory. Returns an error
/// if the directory exists but `data.mdb` is missing, which suggests
/// corruption or misconfiguration.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}
