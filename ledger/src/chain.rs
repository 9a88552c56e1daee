//! The ledger: an append-only, hash-linked chain of star blocks.
//!
//! The chain index (list of block hashes under [`CHAIN_KEY`]) is the single
//! source of truth for what is committed. Bodies are stored under their hex
//! hash. Append writes the body first and the index second, so a crash
//! between the two leaves an unreferenced body that is not part of the chain.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use starreg_store::{KeyValueStore, StoreError, CHAIN_KEY};
use starreg_types::{BlockHash, Clock, WalletAddress};
use tracing::{debug, info, warn};

use crate::block::{Block, BlockCandidate};
use crate::codec::{self, CodecError};
use crate::error::LedgerError;
use crate::genesis::create_genesis_block;
use crate::validation::{ChainReport, DefectKind};

/// Summary statistics for the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerSummary {
    pub height: u64,
    pub tip: BlockHash,
}

pub struct Ledger {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    /// In-memory copy of the committed index. `None` until initialized.
    chain: RwLock<Option<Vec<BlockHash>>>,
    /// Serializes init and append: height assignment plus both writes.
    append_lock: Mutex<()>,
}

impl Ledger {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            chain: RwLock::new(None),
            append_lock: Mutex::new(()),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.chain
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Load the persisted chain, or bootstrap a new one with a genesis block.
    ///
    /// Idempotent: a second call after success does no I/O.
    pub fn init(&self) -> Result<(), LedgerError> {
        let _guard = self.lock_appends();
        self.init_locked()
    }

    /// Assign height, time, predecessor and hash to `candidate` and commit it.
    ///
    /// Initializes the ledger first if needed.
    pub fn append(&self, candidate: BlockCandidate) -> Result<Block, LedgerError> {
        let _guard = self.lock_appends();
        self.init_locked()?;

        let mut hashes = self.snapshot()?;
        let mut block = Block {
            hash: BlockHash::ZERO,
            height: hashes.len() as u64,
            address: candidate.address,
            time: self.clock.now(),
            previous_block_hash: hashes.last().copied(),
            star: candidate.star,
        };
        block.hash = codec::compute_hash(&block);

        hashes.push(block.hash);
        self.commit(&block, &hashes)?;
        info!(height = block.height, hash = %block.hash, address = %block.address, "block appended");
        Ok(block)
    }

    /// Index of the last committed block.
    pub fn height(&self) -> Result<u64, LedgerError> {
        let chain = self.read_chain();
        let hashes = chain.as_ref().ok_or(LedgerError::Uninitialized)?;
        Ok(hashes.len().saturating_sub(1) as u64)
    }

    pub fn summary(&self) -> Result<LedgerSummary, LedgerError> {
        let chain = self.read_chain();
        let hashes = chain.as_ref().ok_or(LedgerError::Uninitialized)?;
        let tip = hashes.last().copied().ok_or(LedgerError::Uninitialized)?;
        Ok(LedgerSummary {
            height: hashes.len() as u64 - 1,
            tip,
        })
    }

    pub fn get_by_height(&self, height: i64) -> Result<Block, LedgerError> {
        let hash = {
            let chain = self.read_chain();
            let hashes = chain.as_ref().ok_or(LedgerError::Uninitialized)?;
            let len = hashes.len() as u64;
            usize::try_from(height)
                .ok()
                .and_then(|h| hashes.get(h).copied())
                .ok_or(LedgerError::InvalidHeight { height, len })?
        };
        debug!(height, hash = %hash, "block lookup by height");
        self.load_block(&hash)
    }

    pub fn get_by_hash(&self, hash: &BlockHash) -> Result<Block, LedgerError> {
        debug!(hash = %hash, "block lookup by hash");
        self.load_block(hash)
    }

    /// Lazily scan the committed chain for blocks owned by `address`.
    ///
    /// The scan covers the chain as of this call; blocks appended while
    /// iterating are not visited. Calling again restarts the scan.
    pub fn get_by_address(
        &self,
        address: WalletAddress,
    ) -> Result<impl Iterator<Item = Result<Block, LedgerError>> + '_, LedgerError> {
        let hashes = self.snapshot()?;
        debug!(address = %address, blocks = hashes.len(), "scanning chain by address");
        Ok(hashes
            .into_iter()
            .filter_map(move |hash| match self.load_block(&hash) {
                Ok(block) if block.address == address => Some(Ok(block)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            }))
    }

    /// Recompute the digest of the block at `height` and compare it with the
    /// stored one. A body that cannot be decoded is reported as invalid.
    pub fn validate_block(&self, height: u64) -> Result<bool, LedgerError> {
        let height = i64::try_from(height).unwrap_or(i64::MAX);
        match self.get_by_height(height) {
            Ok(block) => Ok(codec::compute_hash(&block) == block.hash),
            Err(LedgerError::Codec(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Check every committed block and every link, collecting all defects.
    pub fn validate_chain(&self) -> Result<ChainReport, LedgerError> {
        let hashes = self.snapshot()?;
        let mut report = ChainReport::default();
        let mut previous: Option<Block> = None;

        for (index, hash) in hashes.iter().enumerate() {
            let height = index as u64;
            report.blocks_checked += 1;

            let block = match self.load_block(hash) {
                Ok(block) => block,
                Err(LedgerError::NotFound(_) | LedgerError::Codec(_)) => {
                    report.push(height, DefectKind::Unreadable);
                    previous = None;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if codec::compute_hash(&block) != block.hash || block.hash != *hash {
                report.push(height, DefectKind::HashMismatch);
            }
            if block.height != height {
                report.push(height, DefectKind::HeightMismatch);
            }
            if height == 0 && block.previous_block_hash.is_some() {
                report.push(height, DefectKind::GenesisHasParent);
            }
            if let Some(prev) = &previous {
                if block.previous_block_hash != Some(prev.hash) {
                    report.push(height - 1, DefectKind::BrokenLink);
                }
            }
            previous = Some(block);
        }

        if report.is_valid() {
            debug!(blocks = report.blocks_checked, "chain intact");
        } else {
            warn!(
                blocks = report.blocks_checked,
                defects = report.defects.len(),
                "chain validation found defects"
            );
        }
        Ok(report)
    }

    /// Copy of the committed hash list.
    pub fn snapshot(&self) -> Result<Vec<BlockHash>, LedgerError> {
        self.read_chain().clone().ok_or(LedgerError::Uninitialized)
    }

    fn read_chain(&self) -> std::sync::RwLockReadGuard<'_, Option<Vec<BlockHash>>> {
        self.chain.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_appends(&self) -> MutexGuard<'_, ()> {
        self.append_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Caller holds `append_lock`.
    fn init_locked(&self) -> Result<(), LedgerError> {
        if self.is_initialized() {
            return Ok(());
        }

        let hashes = match self.store.get_opt(CHAIN_KEY)? {
            Some(bytes) => {
                let decoded = codec::decode_chain(&bytes).ok_or_else(|| {
                    LedgerError::MalformedPersistedState(
                        "chain index is neither a hash list nor a single hash".into(),
                    )
                })?;
                if decoded.degraded {
                    warn!(
                        hash = %decoded.hashes[0],
                        "chain index is not a list; reading it as a single-block chain"
                    );
                }
                decoded.hashes
            }
            None => Vec::new(),
        };

        if hashes.is_empty() {
            let genesis = create_genesis_block(self.clock.now());
            self.commit(&genesis, &[genesis.hash])?;
            info!(hash = %genesis.hash, "genesis block created");
        } else {
            info!(height = hashes.len() - 1, "chain loaded");
            *self.chain.write().unwrap_or_else(PoisonError::into_inner) = Some(hashes);
        }
        Ok(())
    }

    /// Persist body then index, then publish the new index in memory.
    /// Caller holds `append_lock`.
    fn commit(&self, block: &Block, hashes: &[BlockHash]) -> Result<(), LedgerError> {
        self.store
            .put(&block.hash.to_hex(), &codec::encode_block(block))?;
        self.store.put(CHAIN_KEY, &codec::encode_chain(hashes))?;
        *self.chain.write().unwrap_or_else(PoisonError::into_inner) = Some(hashes.to_vec());
        Ok(())
    }

    fn load_block(&self, hash: &BlockHash) -> Result<Block, LedgerError> {
        let bytes = match self.store.get(&hash.to_hex()) {
            Ok(bytes) => bytes,
            Err(StoreError::NotFound(_)) => return Err(LedgerError::NotFound(*hash)),
            Err(e) => return Err(e.into()),
        };
        codec::decode_block(&bytes).map_err(|e: CodecError| {
            warn!(hash = %hash, error = %e, "stored block body is undecodable");
            LedgerError::Codec(e)
        })
    }
}
