//! The star registry: challenge protocol in front of the ledger.
//!
//! A write for an address goes through only while the address holds a valid,
//! unused authorization. Check, append and consume run under one gate lock,
//! so two writes for the same address cannot both spend one authorization.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use starreg_crypto::SignatureVerifier;
use starreg_ledger::{Block, BlockCandidate, ChainReport, Ledger, Star};
use starreg_store::KeyValueStore;
use starreg_store_lmdb::LmdbEnvironment;
use starreg_types::{BlockHash, Clock, WalletAddress};
use starreg_verification::{SubmissionReport, VerificationQueue, VerificationRecord};
use tracing::{info, warn};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::metrics::NodeMetrics;
use crate::tracing_spans::{append_span, challenge_span, validate_span};

/// Named LMDB databases the registry opens.
const MAX_DBS: u32 = 4;

pub struct StarRegistry {
    ledger: Ledger,
    queue: VerificationQueue,
    metrics: Arc<NodeMetrics>,
    gate: Mutex<()>,
}

impl StarRegistry {
    /// Build a registry over `store` and initialize both components.
    pub fn open(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        verifier: Arc<dyn SignatureVerifier>,
        config: &NodeConfig,
        metrics: Arc<NodeMetrics>,
    ) -> Result<Self, NodeError> {
        let ledger = Ledger::new(store.clone(), clock.clone());
        let queue = VerificationQueue::new(store, clock, verifier, config.queue_config());
        let registry = Self::new(ledger, queue, metrics);
        registry.init()?;
        Ok(registry)
    }

    pub fn new(ledger: Ledger, queue: VerificationQueue, metrics: Arc<NodeMetrics>) -> Self {
        Self {
            ledger,
            queue,
            metrics,
            gate: Mutex::new(()),
        }
    }

    /// Load or bootstrap the ledger and the queue. Idempotent.
    pub fn init(&self) -> Result<(), NodeError> {
        self.ledger.init()?;
        self.queue.init()?;
        let height = self.ledger.height()?;
        self.metrics.chain_height.set(height as i64);
        info!(height, "registry ready");
        Ok(())
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn queue(&self) -> &VerificationQueue {
        &self.queue
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    /// Issue a challenge for `address`, or return the live one.
    pub fn request_validation(
        &self,
        address: &WalletAddress,
    ) -> Result<VerificationRecord, NodeError> {
        let _span = challenge_span(address.as_str(), "request").entered();
        let challenge = self.queue.issue_or_refresh(address)?;
        if challenge.fresh {
            self.metrics.challenges_issued.inc();
        }
        Ok(challenge.record)
    }

    /// Submit a signature over the challenge message. `None` if no
    /// challenge exists for `address`.
    pub fn validate_signature(
        &self,
        address: &WalletAddress,
        signature: &str,
    ) -> Result<Option<SubmissionReport>, NodeError> {
        let _span = challenge_span(address.as_str(), "submit").entered();
        let report = self.queue.submit_signature(address, signature)?;
        if let Some(report) = &report {
            if report.is_valid() {
                self.metrics.signatures_accepted.inc();
            } else {
                self.metrics.signatures_rejected.inc();
            }
        }
        Ok(report)
    }

    /// Append a star for `address`, spending its authorization.
    ///
    /// Fails with [`NodeError::NotAuthorized`] and appends nothing unless the
    /// address holds a valid, unused authorization. That authorization is
    /// consumed before the block is returned; if consuming fails after the
    /// append has committed, the block is still returned.
    pub fn register_star(&self, address: WalletAddress, star: Star) -> Result<Block, NodeError> {
        let _span = append_span(address.as_str()).entered();
        let started = Instant::now();
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(issued_at) = self.queue.authorization(&address)? else {
            self.metrics.writes_rejected.inc();
            warn!(address = %address, "write refused: no valid authorization");
            return Err(NodeError::NotAuthorized(address));
        };

        let block = self.ledger.append(BlockCandidate {
            address: address.clone(),
            star,
        })?;

        // Only the record checked above is spent; a challenge reissued while
        // the append ran stays live.
        if let Err(e) = self.queue.consume(&address, issued_at) {
            warn!(
                address = %address,
                height = block.height,
                error = %e,
                "block committed but authorization was not consumed"
            );
        }

        self.metrics.blocks_appended.inc();
        self.metrics.chain_height.set(block.height as i64);
        self.metrics
            .append_time_ms
            .observe(started.elapsed().as_secs_f64() * 1_000.0);
        Ok(block)
    }

    /// Milliseconds left on `record`'s window at the current time.
    pub fn remaining_window_ms(&self, record: &VerificationRecord) -> i64 {
        record.remaining_window_ms(self.queue.now())
    }

    pub fn height(&self) -> Result<u64, NodeError> {
        Ok(self.ledger.height()?)
    }

    pub fn block_by_height(&self, height: i64) -> Result<Block, NodeError> {
        Ok(self.ledger.get_by_height(height)?)
    }

    pub fn block_by_hash(&self, hash: &BlockHash) -> Result<Block, NodeError> {
        Ok(self.ledger.get_by_hash(hash)?)
    }

    /// Every block owned by `address`, in chain order.
    pub fn blocks_by_address(&self, address: &WalletAddress) -> Result<Vec<Block>, NodeError> {
        let blocks = self
            .ledger
            .get_by_address(address.clone())?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(blocks)
    }

    pub fn validate_chain(&self) -> Result<ChainReport, NodeError> {
        let _span = validate_span().entered();
        Ok(self.ledger.validate_chain()?)
    }
}

/// Open the LMDB environment under `config.data_dir`.
pub fn open_environment(config: &NodeConfig) -> Result<LmdbEnvironment, NodeError> {
    Ok(LmdbEnvironment::open(
        &config.data_dir,
        MAX_DBS,
        config.map_size_bytes(),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use starreg_ledger::LedgerError;
    use starreg_nullables::{NullClock, NullStore, NullVerifier};
    use starreg_store::{StoreError, CHAIN_KEY, QUEUE_KEY};
    use starreg_verification::ExpiryPolicy;

    struct Harness {
        store: Arc<NullStore>,
        clock: Arc<NullClock>,
        verifier: Arc<NullVerifier>,
        registry: StarRegistry,
    }

    fn harness_with(config: NodeConfig) -> Harness {
        let store = Arc::new(NullStore::new());
        let clock = Arc::new(NullClock::new(1_532_296_090_000));
        let verifier = Arc::new(NullVerifier::new());
        let registry = StarRegistry::open(
            store.clone(),
            clock.clone(),
            verifier.clone(),
            &config,
            Arc::new(NodeMetrics::new().unwrap()),
        )
        .unwrap();
        Harness {
            store,
            clock,
            verifier,
            registry,
        }
    }

    fn harness() -> Harness {
        harness_with(NodeConfig::default())
    }

    fn star(story: &str) -> Star {
        Star::new("16h 29m 1.0s", "-26° 29' 24.9", story)
    }

    fn authorize(h: &Harness, address: &str) {
        h.verifier.accept(address, "sig");
        let addr = WalletAddress::new(address);
        h.registry.request_validation(&addr).unwrap();
        let report = h.registry.validate_signature(&addr, "sig").unwrap().unwrap();
        assert!(report.is_valid());
    }

    #[test]
    fn full_flow_appends_once_per_authorization() {
        let h = harness();
        let addr = WalletAddress::new("addr1");
        let record = h.registry.request_validation(&addr).unwrap();
        assert_eq!(record.validation_window_ms, 300_000);
        assert_eq!(record.message, "addr1:1532296090000:starRegistry");

        authorize(&h, "addr1");
        let block = h.registry.register_star(addr.clone(), star("one")).unwrap();
        assert_eq!(block.height, 1);

        let second = h.registry.register_star(addr.clone(), star("two"));
        assert!(matches!(second, Err(NodeError::NotAuthorized(a)) if a == addr));
        assert_eq!(h.registry.height().unwrap(), 1);
        assert_eq!(h.registry.metrics().blocks_appended.get(), 1);
        assert_eq!(h.registry.metrics().writes_rejected.get(), 1);
        assert_eq!(h.registry.metrics().chain_height.get(), 1);
    }

    #[test]
    fn unsigned_challenge_does_not_authorize() {
        let h = harness();
        let addr = WalletAddress::new("addr1");
        h.registry.request_validation(&addr).unwrap();
        assert!(matches!(
            h.registry.register_star(addr, star("x")),
            Err(NodeError::NotAuthorized(_))
        ));
        assert_eq!(h.registry.height().unwrap(), 0);
    }

    #[test]
    fn invalid_signature_does_not_authorize() {
        let h = harness();
        let addr = WalletAddress::new("addr1");
        h.registry.request_validation(&addr).unwrap();
        let report = h.registry.validate_signature(&addr, "wrong").unwrap().unwrap();
        assert!(!report.is_valid());
        assert_eq!(h.registry.metrics().signatures_rejected.get(), 1);
        assert!(h.registry.register_star(addr, star("x")).is_err());
    }

    #[test]
    fn reissue_after_consumption_allows_another_write() {
        let h = harness();
        let addr = WalletAddress::new("addr1");
        authorize(&h, "addr1");
        h.registry.register_star(addr.clone(), star("one")).unwrap();
        authorize(&h, "addr1");
        let block = h.registry.register_star(addr.clone(), star("two")).unwrap();
        assert_eq!(block.height, 2);
        assert_eq!(h.registry.blocks_by_address(&addr).unwrap().len(), 2);
    }

    #[test]
    fn default_policy_allows_write_after_window() {
        let h = harness();
        authorize(&h, "addr1");
        h.clock.advance(600_000);
        assert!(h
            .registry
            .register_star(WalletAddress::new("addr1"), star("late"))
            .is_ok());
    }

    #[test]
    fn write_policy_refuses_write_after_window() {
        let h = harness_with(NodeConfig {
            expiry_policy: ExpiryPolicy::AtSubmissionAndWrite,
            ..NodeConfig::default()
        });
        authorize(&h, "addr1");
        h.clock.advance(300_001);
        assert!(matches!(
            h.registry
                .register_star(WalletAddress::new("addr1"), star("late")),
            Err(NodeError::NotAuthorized(_))
        ));
    }

    #[test]
    fn failed_consume_still_returns_block() {
        let h = harness();
        let addr = WalletAddress::new("addr1");
        authorize(&h, "addr1");
        h.store.fail_puts_to(Some(QUEUE_KEY));
        let block = h.registry.register_star(addr.clone(), star("one")).unwrap();
        assert_eq!(block.height, 1);
        assert_eq!(h.registry.block_by_height(1).unwrap(), block);
    }

    #[test]
    fn storage_outage_propagates() {
        let h = harness();
        authorize(&h, "addr1");
        h.store.set_unavailable(true);
        assert!(matches!(
            h.registry
                .register_star(WalletAddress::new("addr1"), star("x")),
            Err(NodeError::Ledger(LedgerError::StorageUnavailable(_)))
        ));
        assert_eq!(h.registry.height().unwrap(), 0);
    }

    #[test]
    fn reads_pass_through() {
        let h = harness();
        authorize(&h, "addr1");
        let block = h
            .registry
            .register_star(WalletAddress::new("addr1"), star("one"))
            .unwrap();
        assert_eq!(h.registry.block_by_hash(&block.hash).unwrap(), block);
        assert!(matches!(
            h.registry.block_by_height(5),
            Err(NodeError::Ledger(LedgerError::InvalidHeight { .. }))
        ));
        assert!(h.registry.validate_chain().unwrap().is_valid());
    }

    #[test]
    fn repeated_requests_count_one_challenge() {
        let h = harness();
        let addr = WalletAddress::new("addr1");
        h.registry.request_validation(&addr).unwrap();
        h.clock.advance(1_000);
        h.registry.request_validation(&addr).unwrap();
        assert_eq!(h.registry.metrics().challenges_issued.get(), 1);
        h.clock.advance(300_000);
        h.registry.request_validation(&addr).unwrap();
        assert_eq!(h.registry.metrics().challenges_issued.get(), 2);
    }

    /// Runs a callback once, from inside the first write to the chain index.
    struct InterleavingStore {
        inner: NullStore,
        on_chain_put: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    }

    impl KeyValueStore for InterleavingStore {
        fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
            self.inner.get(key)
        }

        fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
            if key == CHAIN_KEY {
                let hook = self
                    .on_chain_put
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                if let Some(hook) = hook {
                    hook();
                }
            }
            self.inner.put(key, value)
        }

        fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.inner.delete(key)
        }
    }

    #[test]
    fn challenge_reissued_during_append_survives() {
        let store = Arc::new(InterleavingStore {
            inner: NullStore::new(),
            on_chain_put: Mutex::new(None),
        });
        let clock = Arc::new(NullClock::new(1_000_000));
        let verifier = Arc::new(NullVerifier::new());
        verifier.accept("addr1", "sig");
        let registry = Arc::new(
            StarRegistry::open(
                store.clone(),
                clock.clone(),
                verifier,
                &NodeConfig::default(),
                Arc::new(NodeMetrics::new().unwrap()),
            )
            .unwrap(),
        );
        let addr = WalletAddress::new("addr1");
        registry.request_validation(&addr).unwrap();
        assert!(registry.validate_signature(&addr, "sig").unwrap().unwrap().is_valid());

        // Expired but still authorized under the default policy, so a
        // request arriving mid-append replaces the record.
        clock.advance(300_001);
        let reissued = Arc::new(Mutex::new(None));
        {
            let registry = registry.clone();
            let addr = addr.clone();
            let reissued = reissued.clone();
            *store.on_chain_put.lock().unwrap() = Some(Box::new(move || {
                let record = registry.request_validation(&addr).unwrap();
                *reissued.lock().unwrap() = Some(record);
            }));
        }

        let block = registry.register_star(addr.clone(), star("one")).unwrap();
        assert_eq!(block.height, 1);

        let reissued = reissued.lock().unwrap().clone().expect("hook ran");
        assert_eq!(reissued.message, "addr1:1300001:starRegistry");
        assert_eq!(registry.queue().get(&addr).unwrap(), Some(reissued));
        let report = registry.validate_signature(&addr, "sig").unwrap();
        assert!(report.is_some_and(|r| r.is_valid()));
        assert!(registry.register_star(addr, star("two")).is_ok());
    }

    #[test]
    fn concurrent_writes_spend_one_authorization_once() {
        let h = harness();
        authorize(&h, "addr1");
        let results: Vec<bool> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let registry = &h.registry;
                    s.spawn(move || {
                        registry
                            .register_star(WalletAddress::new("addr1"), star(&format!("{i}")))
                            .is_ok()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(results.iter().filter(|ok| **ok).count(), 1);
        assert_eq!(h.registry.height().unwrap(), 1);
    }
}
