//! Error types for consensus computations.

use crate::policy::PolicyError;
use thiserror::Error;

/// Consensus errors.
///
/// Malformed compact bits and hashes above target are not errors; those are
/// reported as flags or `false` by the codec and the verifier.
#[derive(Error, Debug)]
pub enum ConsensusError {
    /// The chain view could not supply an ancestor the caller guaranteed.
    #[error("Missing ancestor at height {height}")]
    MissingAncestor { height: u32 },

    /// Invalid block header encoding.
    #[error("Invalid block header: {0}")]
    InvalidHeader(String),

    /// The PoW oracle returned a different hash for an already known header.
    #[error("PoW hash changed for block {block_hash}: cached {cached}, computed {computed}")]
    PowHashMismatch {
        block_hash: String,
        cached: String,
        computed: String,
    },

    /// The PoW oracle failed to produce a hash.
    #[error("PoW hasher failed: {0}")]
    PowHasher(String),

    /// Invalid consensus policy.
    #[error(transparent)]
    InvalidPolicy(#[from] PolicyError),
}

/// Result type for consensus operations.
pub type ConsensusResult<T> = Result<T, ConsensusError>;
