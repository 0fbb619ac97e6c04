//! Difficulty retargeting algorithms.
//!
//! Each algorithm maps a chain tip (plus the candidate block's timestamp,
//! where the min-difficulty rules need it) and a [`PowPolicy`] to the
//! compact target of the next block. All of them:
//! - return `pow_limit` when there is not enough history,
//! - never return a target above `pow_limit`,
//! - use 256-bit register arithmetic only.
//!
//! [`crate::next_work_required`] selects between them.

mod classic;
mod dgw;
mod fixed_window;
mod lwma;

pub use classic::classic_retarget;
pub use dgw::dark_gravity_wave;
pub use fixed_window::{calculate_fixed_window, fixed_window};
pub use lwma::lwma3;

use crate::arith::U256;
use crate::chain_view::HeaderView;
use crate::compact::decode_compact_bits;
use crate::policy::PowPolicy;
use crate::{ConsensusError, ConsensusResult};
use tracing::error;

/// Parent of a header the caller guaranteed is not genesis.
pub(crate) fn parent_of<H: HeaderView>(header: &H) -> ConsensusResult<H> {
    header
        .parent()
        .ok_or_else(|| missing_ancestor(header.height().saturating_sub(1)))
}

/// Ancestor the caller guaranteed exists.
pub(crate) fn ancestor_of<H: HeaderView>(header: &H, height: u32) -> ConsensusResult<H> {
    header
        .ancestor(height)
        .ok_or_else(|| missing_ancestor(height))
}

/// Contract violation by the chain view.
fn missing_ancestor(height: u32) -> ConsensusError {
    error!(height, "Chain view is missing a guaranteed ancestor");
    ConsensusError::MissingAncestor { height }
}

/// Decoded target of a stored header. Flags are ignored; stored headers
/// passed validation.
pub(crate) fn target_of<H: HeaderView>(header: &H) -> U256 {
    decode_compact_bits(header.bits()).target
}

/// Cap a computed target at the network limit.
pub(crate) fn cap_at_limit(target: U256, policy: &PowPolicy) -> U256 {
    if target > policy.pow_limit {
        policy.pow_limit
    } else {
        target
    }
}
