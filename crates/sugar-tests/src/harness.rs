//! Test harness for integration tests.
//!
//! Provides policy fixtures and a scripted PoW oracle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use sugar_consensus::{
    ConsensusError, ConsensusResult, Hash256, PowHasher, PowPolicy, RetargetAlgorithm,
    YespowerParams, HEADER_SIZE,
};

/// Mainnet rules with LWMA-3 as the active algorithm.
pub fn lwma_policy() -> PowPolicy {
    PowPolicy {
        algorithm: RetargetAlgorithm::Lwma3,
        ..PowPolicy::mainnet()
    }
}

/// Mainnet rules with the fixed-window average as the active algorithm.
pub fn fixed_window_policy() -> PowPolicy {
    PowPolicy {
        algorithm: RetargetAlgorithm::FixedWindow,
        ..PowPolicy::mainnet()
    }
}

#[derive(Debug, Clone)]
enum Digest {
    /// Always the same hash.
    Fixed(Hash256),
    /// sha256d of the header bytes and personalization.
    Sha256d,
    /// Always fails.
    Broken,
}

/// PoW oracle stand-in that counts its calls.
#[derive(Debug)]
pub struct MockPowHasher {
    digest: Digest,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockPowHasher {
    fn with_digest(digest: Digest) -> Self {
        Self {
            digest,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Oracle returning `hash` for every header.
    pub fn returning(hash: Hash256) -> Self {
        Self::with_digest(Digest::Fixed(hash))
    }

    /// Deterministic oracle: distinct headers get distinct digests.
    pub fn sha256d() -> Self {
        Self::with_digest(Digest::Sha256d)
    }

    /// Oracle that always fails.
    pub fn broken() -> Self {
        Self::with_digest(Digest::Broken)
    }

    /// Sleep this long in every call, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of hashes computed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PowHasher for MockPowHasher {
    fn pow_hash(
        &self,
        header: &[u8; HEADER_SIZE],
        params: &YespowerParams,
    ) -> ConsensusResult<Hash256> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        match &self.digest {
            Digest::Fixed(hash) => Ok(*hash),
            Digest::Sha256d => {
                let mut data = header.to_vec();
                data.extend_from_slice(params.personalization_bytes());
                Ok(Hash256::sha256d(&data))
            }
            Digest::Broken => Err(ConsensusError::PowHasher("mock oracle failure".into())),
        }
    }
}
