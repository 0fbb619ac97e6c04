//! Proof-of-work hash oracle boundary and memoisation.
//!
//! The memory-hard yespower hash is supplied by the caller through
//! [`PowHasher`]. Two caches sit in front of it:
//! - [`SealedHeader`] computes the hash at most once per header value.
//! - [`PowHashCache`] is a bounded LRU shared between validation threads,
//!   keyed by block hash.
//!
//! Neither cache is a global. A hash that changes for a known block is
//! reported as [`ConsensusError::PowHashMismatch`].

use crate::block::{BlockHeader, Hash256, HEADER_SIZE};
use crate::{ConsensusError, ConsensusResult};
use lru::LruCache;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use tracing::{trace, warn};

/// Default number of PoW hashes kept by [`PowHashCache`].
pub const DEFAULT_POW_CACHE_SIZE: usize = 10_000;

/// yespower parameters, passed to the oracle unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YespowerParams {
    /// Work factor (N).
    pub n: u32,
    /// Block-mixing factor (r).
    pub r: u32,
    /// Optional personalization string.
    pub personalization: Option<String>,
}

impl YespowerParams {
    pub fn new(n: u32, r: u32, personalization: Option<String>) -> Self {
        Self {
            n,
            r,
            personalization,
        }
    }

    /// Personalization as bytes, empty when unset.
    pub fn personalization_bytes(&self) -> &[u8] {
        self.personalization.as_deref().map(str::as_bytes).unwrap_or(&[])
    }
}

/// External proof-of-work hash function.
///
/// Implementations must be deterministic: the same header bytes and
/// parameters always give the same digest.
pub trait PowHasher: Send + Sync {
    /// Hash a serialized header.
    fn pow_hash(
        &self,
        header: &[u8; HEADER_SIZE],
        params: &YespowerParams,
    ) -> ConsensusResult<Hash256>;
}

/// A header with its identity fixed and its PoW hash computed on demand.
#[derive(Debug, Clone)]
pub struct SealedHeader {
    header: BlockHeader,
    block_hash: Hash256,
    pow_hash: OnceCell<Hash256>,
}

impl SealedHeader {
    /// Seal a header, computing its block hash.
    pub fn seal(header: BlockHeader) -> Self {
        let block_hash = header.block_hash();
        Self {
            header,
            block_hash,
            pow_hash: OnceCell::new(),
        }
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn block_hash(&self) -> Hash256 {
        self.block_hash
    }

    /// PoW hash if it has been computed already.
    pub fn cached_pow_hash(&self) -> Option<Hash256> {
        self.pow_hash.get().copied()
    }

    /// PoW hash, calling `hasher` only the first time.
    ///
    /// A failed computation is not memoised.
    pub fn pow_hash(
        &self,
        hasher: &dyn PowHasher,
        params: &YespowerParams,
    ) -> ConsensusResult<Hash256> {
        self.pow_hash
            .get_or_try_init(|| hasher.pow_hash(&self.header.serialize(), params))
            .copied()
    }

    /// PoW hash through a shared cache, memoised on this header as well.
    pub fn pow_hash_cached(
        &self,
        cache: &PowHashCache,
        hasher: &dyn PowHasher,
        params: &YespowerParams,
    ) -> ConsensusResult<Hash256> {
        self.pow_hash
            .get_or_try_init(|| cache.get_or_compute(&self.header, self.block_hash, hasher, params))
            .copied()
    }

    pub fn into_header(self) -> BlockHeader {
        self.header
    }
}

/// Bounded PoW hash cache keyed by block hash.
///
/// The lock is never held while the oracle runs, so two threads may hash
/// the same header concurrently; the second insert is checked against the
/// first.
pub struct PowHashCache {
    entries: Mutex<LruCache<Hash256, Hash256>>,
}

impl Default for PowHashCache {
    fn default() -> Self {
        Self::new(DEFAULT_POW_CACHE_SIZE)
    }
}

impl PowHashCache {
    /// Create a cache holding up to `capacity` hashes (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Cached PoW hash for `block_hash`.
    pub fn get(&self, block_hash: &Hash256) -> Option<Hash256> {
        self.entries.lock().get(block_hash).copied()
    }

    /// Record a PoW hash.
    ///
    /// Fails if a different hash is already cached for the block.
    pub fn insert(&self, block_hash: Hash256, pow_hash: Hash256) -> ConsensusResult<()> {
        let mut entries = self.entries.lock();
        match entries.get(&block_hash).copied() {
            Some(cached) if cached != pow_hash => {
                drop(entries);
                warn!(
                    block = %block_hash,
                    cached = %cached,
                    computed = %pow_hash,
                    "PoW hash changed for known block"
                );
                Err(ConsensusError::PowHashMismatch {
                    block_hash: block_hash.to_hex(),
                    cached: cached.to_hex(),
                    computed: pow_hash.to_hex(),
                })
            }
            Some(_) => Ok(()),
            None => {
                entries.put(block_hash, pow_hash);
                Ok(())
            }
        }
    }

    /// Cached PoW hash, or compute and record it.
    pub fn get_or_compute(
        &self,
        header: &BlockHeader,
        block_hash: Hash256,
        hasher: &dyn PowHasher,
        params: &YespowerParams,
    ) -> ConsensusResult<Hash256> {
        if let Some(hit) = self.get(&block_hash) {
            trace!(block = %block_hash, "PoW hash cache hit");
            return Ok(hit);
        }

        let computed = hasher.pow_hash(&header.serialize(), params)?;
        self.insert(block_hash, computed)?;
        Ok(computed)
    }

    /// Forget a block's hash.
    pub fn remove(&self, block_hash: &Hash256) -> Option<Hash256> {
        self.entries.lock().pop(block_hash)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }
}
