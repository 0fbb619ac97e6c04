//! # sugar-consensus
//!
//! Proof-of-work consensus rules for the Sugarchain node.
//!
//! This crate provides:
//! - Compact target ("nBits") encoding and decoding
//! - Difficulty retargeting (Dark Gravity Wave, LWMA-3, fixed-window
//!   DigiShield and the classic periodic retarget)
//! - Proof-of-Work verification against a claimed compact target
//! - Chain-work accounting and a read-only chain ancestor view
//!
//! ## Determinism
//!
//! Every retarget function is a pure computation over a chain snapshot and a
//! [`PowPolicy`]. All arithmetic runs on a fixed-width 256-bit integer with
//! wrapping products and truncating division, never floating point.
//!
//! ## Proof-of-Work hash
//!
//! Blocks are mined with a memory-hard yespower variant. The hash itself is
//! an external oracle ([`PowHasher`]); this crate only carries its parameters
//! and memoises its results.

mod arith;
pub mod block;
mod chain_view;
mod compact;
mod difficulty;
mod error;
mod header_chain;
mod policy;
mod pow;
mod pow_hash;
pub mod retarget;
mod work;

pub use arith::{U256Ext, U256};
pub use block::{BlockHeader, Hash256, HEADER_SIZE};
pub use chain_view::{HeaderView, MEDIAN_TIME_SPAN};
pub use compact::{decode_compact_bits, encode_compact_bits, CompactTarget};
pub use difficulty::{next_work_required, DifficultyAdjustment};
pub use error::{ConsensusError, ConsensusResult};
pub use header_chain::{ChainCursor, HeaderChain, IndexedHeader};
pub use policy::{
    AlgorithmActivation, Network, PolicyError, PowPolicy, PowPolicyConfig, RetargetAlgorithm,
};
pub use pow::{check_header_pow, check_header_pow_cached, check_proof_of_work};
pub use pow_hash::{
    PowHashCache, PowHasher, SealedHeader, YespowerParams, DEFAULT_POW_CACHE_SIZE,
};
pub use work::{block_proof, block_proof_equivalent_time, difficulty};

/// Sugarchain network constants shared by all presets.
pub mod params {
    /// Target block interval in seconds (120x faster than Bitcoin).
    pub const TARGET_SPACING_SECS: i64 = 5;

    /// Classic retarget timespan (two weeks).
    pub const TARGET_TIMESPAN_SECS: i64 = 14 * 24 * 60 * 60;

    /// Blocks examined by Dark Gravity Wave and LWMA-3.
    pub const AVERAGING_WINDOW: u32 = 200;

    /// Blocks examined by the fixed-window average (2550 s at 5 s spacing).
    pub const FIXED_WINDOW_AVERAGING_WINDOW: u32 = 510;

    /// Fixed-window damping: maximum percentage the target may loosen.
    pub const MAX_ADJUST_DOWN_PERCENT: i64 = 32;

    /// Fixed-window damping: maximum percentage the target may tighten.
    pub const MAX_ADJUST_UP_PERCENT: i64 = 16;

    /// Dark Gravity Wave: candidate this far past the tip may use `pow_limit`.
    pub const MIN_DIFFICULTY_RESET_SECS: i64 = 2 * 60 * 60;

    /// yespower work factor (N).
    pub const YESPOWER_N: u32 = 2048;

    /// yespower block-mixing factor (r).
    pub const YESPOWER_R: u32 = 32;

    /// yespower personalization string.
    pub const YESPOWER_PERSONALIZATION: &str =
        "Sugarchain: Decentralized Cryptocurrency for one-CPU-one-vote";
}
