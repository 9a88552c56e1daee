//! The verification queue: one live challenge per address.
//!
//! The whole map is persisted as a single collection under [`QUEUE_KEY`].
//! Every mutation is written through before it becomes visible; a failed
//! write leaves the in-memory map as it was.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use starreg_crypto::SignatureVerifier;
use starreg_store::{KeyValueStore, QUEUE_KEY};
use starreg_types::{Clock, Timestamp, WalletAddress};
use tracing::{debug, info, warn};

use crate::codec::{decode_queue, encode_queue};
use crate::error::VerificationError;
use crate::record::VerificationRecord;

pub const DEFAULT_VALIDATION_WINDOW_MS: u64 = 300_000;
pub const DEFAULT_PROTOCOL_TAG: &str = "starRegistry";

/// Whether an authorization must still be inside its window when it is used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryPolicy {
    /// The window is checked when the signature is submitted only.
    #[default]
    AtSubmission,
    /// The window is checked again when the authorization is used.
    AtSubmissionAndWrite,
}

#[derive(Clone, Debug)]
pub struct QueueConfig {
    pub validation_window_ms: u64,
    pub protocol_tag: String,
    pub expiry_policy: ExpiryPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            validation_window_ms: DEFAULT_VALIDATION_WINDOW_MS,
            protocol_tag: DEFAULT_PROTOCOL_TAG.to_string(),
            expiry_policy: ExpiryPolicy::default(),
        }
    }
}

/// A non-fatal problem recorded while handling a signature submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionIssue {
    /// The window had elapsed; `overdue_ms` past the deadline.
    Expired { overdue_ms: u64 },
    /// The verifier could not process the inputs.
    VerifierFailed(String),
}

impl fmt::Display for SubmissionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired { overdue_ms } => {
                write!(f, "validation window expired {} ms ago", overdue_ms)
            }
            Self::VerifierFailed(reason) => write!(f, "signature verification failed: {}", reason),
        }
    }
}

/// Outcome of [`VerificationQueue::submit_signature`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionReport {
    /// Empty on full success.
    pub issues: Vec<SubmissionIssue>,
    pub record: VerificationRecord,
}

impl SubmissionReport {
    pub fn is_valid(&self) -> bool {
        self.record.signature_valid == Some(true)
    }
}

/// Result of [`VerificationQueue::issue_or_refresh`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Challenge {
    pub record: VerificationRecord,
    /// `false` when the live record was handed back unchanged.
    pub fresh: bool,
}

#[derive(Default)]
struct QueueState {
    loaded: bool,
    records: HashMap<WalletAddress, VerificationRecord>,
}

pub struct VerificationQueue {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    verifier: Arc<dyn SignatureVerifier>,
    config: QueueConfig,
    state: Mutex<QueueState>,
}

impl VerificationQueue {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        verifier: Arc<dyn SignatureVerifier>,
        config: QueueConfig,
    ) -> Self {
        Self {
            store,
            clock,
            verifier,
            config,
            state: Mutex::new(QueueState::default()),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Load the persisted collection, or persist an empty one.
    ///
    /// Idempotent. Every other operation calls this first.
    pub fn init(&self) -> Result<(), VerificationError> {
        let mut state = self.lock();
        self.load(&mut state)
    }

    /// Return the live challenge for `address`, or issue a new one if there
    /// is none or the existing one has expired.
    pub fn issue_or_refresh(
        &self,
        address: &WalletAddress,
    ) -> Result<Challenge, VerificationError> {
        let mut state = self.lock();
        self.load(&mut state)?;
        let now = self.clock.now();

        if let Some(existing) = state.records.get(address) {
            if !existing.is_expired(now) {
                debug!(address = %address, "reusing live challenge");
                return Ok(Challenge {
                    record: existing.clone(),
                    fresh: false,
                });
            }
        }

        let record = VerificationRecord::issue(
            address.clone(),
            now,
            self.config.validation_window_ms,
            &self.config.protocol_tag,
        );
        self.write_through(&mut state, |records| {
            records.insert(address.clone(), record.clone());
        })?;
        info!(address = %address, timestamp = %now, "challenge issued");
        Ok(Challenge {
            record,
            fresh: true,
        })
    }

    /// Record a signature against the challenge for `address`.
    ///
    /// `Ok(None)` if there is no challenge. Expiry and verifier failures are
    /// reported as issues; the signature counts as valid only if the
    /// verifier accepts it inside the window.
    pub fn submit_signature(
        &self,
        address: &WalletAddress,
        signature: &str,
    ) -> Result<Option<SubmissionReport>, VerificationError> {
        let mut state = self.lock();
        self.load(&mut state)?;
        let Some(existing) = state.records.get(address) else {
            debug!(address = %address, "signature for unknown challenge");
            return Ok(None);
        };

        let now = self.clock.now();
        let mut issues = Vec::new();
        let remaining = existing.remaining_window_ms(now);
        if remaining < 0 {
            warn!(address = %address, overdue_ms = -remaining, "signature submitted after window");
            issues.push(SubmissionIssue::Expired {
                overdue_ms: remaining.unsigned_abs(),
            });
        }

        let verified = match self.verifier.verify(&existing.message, address, signature) {
            Ok(verified) => verified,
            Err(e) => {
                warn!(address = %address, error = %e, "verifier rejected inputs");
                issues.push(SubmissionIssue::VerifierFailed(e.to_string()));
                false
            }
        };

        let mut record = existing.clone();
        record.signature = Some(signature.to_string());
        record.signature_valid = Some(verified && remaining >= 0);

        self.write_through(&mut state, |records| {
            records.insert(address.clone(), record.clone());
        })?;
        if record.signature_valid == Some(true) {
            info!(address = %address, "signature accepted");
        } else {
            info!(address = %address, issues = issues.len(), "signature rejected");
        }
        Ok(Some(SubmissionReport { issues, record }))
    }

    /// Whether `address` holds an unused, valid authorization.
    ///
    /// Under [`ExpiryPolicy::AtSubmissionAndWrite`] the window must also
    /// still be open.
    pub fn is_authorized(&self, address: &WalletAddress) -> Result<bool, VerificationError> {
        Ok(self.authorization(address)?.is_some())
    }

    /// The request timestamp of the record that authorizes `address`, if
    /// any. Pass it to [`consume`](Self::consume) to spend that record.
    pub fn authorization(
        &self,
        address: &WalletAddress,
    ) -> Result<Option<Timestamp>, VerificationError> {
        let mut state = self.lock();
        self.load(&mut state)?;
        let Some(record) = state.records.get(address) else {
            return Ok(None);
        };
        let signed = record.signature_valid == Some(true);
        let authorized = match self.config.expiry_policy {
            ExpiryPolicy::AtSubmission => signed,
            ExpiryPolicy::AtSubmissionAndWrite => signed && !record.is_expired(self.clock.now()),
        };
        Ok(authorized.then_some(record.request_timestamp))
    }

    /// Invalidate the challenge for `address` issued at `issued_at`.
    ///
    /// A no-op if the record is gone or has been reissued since: a newer
    /// challenge belongs to a later request and is left in place.
    pub fn consume(
        &self,
        address: &WalletAddress,
        issued_at: Timestamp,
    ) -> Result<(), VerificationError> {
        let mut state = self.lock();
        self.load(&mut state)?;
        match state.records.get(address) {
            Some(record) if record.request_timestamp == issued_at => {}
            Some(record) => {
                debug!(
                    address = %address,
                    issued_at = %issued_at,
                    current = %record.request_timestamp,
                    "challenge reissued; nothing to consume"
                );
                return Ok(());
            }
            None => return Ok(()),
        }
        self.write_through(&mut state, |records| {
            records.remove(address);
        })?;
        info!(address = %address, "authorization consumed");
        Ok(())
    }

    pub fn get(
        &self,
        address: &WalletAddress,
    ) -> Result<Option<VerificationRecord>, VerificationError> {
        let mut state = self.lock();
        self.load(&mut state)?;
        Ok(state.records.get(address).cloned())
    }

    pub fn len(&self) -> Result<usize, VerificationError> {
        let mut state = self.lock();
        self.load(&mut state)?;
        Ok(state.records.len())
    }

    pub fn is_empty(&self) -> Result<bool, VerificationError> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load(&self, state: &mut QueueState) -> Result<(), VerificationError> {
        if state.loaded {
            return Ok(());
        }
        match self.store.get_opt(QUEUE_KEY)? {
            Some(bytes) => {
                let decoded = decode_queue(&bytes);
                state.records = decoded
                    .records
                    .into_iter()
                    .map(|r| (r.address.clone(), r))
                    .collect();
                info!(records = state.records.len(), "verification queue loaded");
            }
            None => {
                self.store.put(QUEUE_KEY, &encode_queue(std::iter::empty()))?;
                info!("verification queue created");
            }
        }
        state.loaded = true;
        Ok(())
    }

    /// Apply `mutate` to a copy, persist it, then publish it.
    fn write_through(
        &self,
        state: &mut QueueState,
        mutate: impl FnOnce(&mut HashMap<WalletAddress, VerificationRecord>),
    ) -> Result<(), VerificationError> {
        let mut next = state.records.clone();
        mutate(&mut next);
        let mut ordered: Vec<&VerificationRecord> = next.values().collect();
        ordered.sort_by(|a, b| a.address.cmp(&b.address));
        self.store.put(QUEUE_KEY, &encode_queue(ordered))?;
        state.records = next;
        Ok(())
    }
}
