//! Bitcoin-style periodic retarget.
//!
//! Difficulty only changes once every `target_timespan / target_spacing`
//! blocks. Kept so chains that started on it can be replayed.

use super::{ancestor_of, cap_at_limit, target_of};
use crate::arith::{timespan, U256Ext};
use crate::chain_view::HeaderView;
use crate::compact::encode_compact_bits;
use crate::policy::PowPolicy;
use crate::ConsensusResult;
use tracing::debug;

/// Next compact target under the periodic retarget.
pub fn classic_retarget<H: HeaderView>(
    tip: Option<&H>,
    candidate_time: Option<i64>,
    policy: &PowPolicy,
) -> ConsensusResult<u32> {
    let limit_bits = policy.pow_limit_bits();
    let tip = match tip {
        Some(tip) => tip,
        None => return Ok(limit_bits),
    };

    let interval = policy.difficulty_adjustment_interval().max(1);
    let next_height = i64::from(tip.height()) + 1;

    if next_height % interval != 0 {
        if !policy.allow_min_difficulty_blocks {
            return Ok(tip.bits());
        }

        // A block more than two spacings late may use the minimum difficulty.
        if let Some(time) = candidate_time {
            if time > tip.time() + 2 * policy.target_spacing {
                return Ok(limit_bits);
            }
        }

        // Otherwise return the last bits not set by that rule.
        let mut cursor = tip.clone();
        while cursor.bits() == limit_bits && i64::from(cursor.height()) % interval != 0 {
            match cursor.parent() {
                Some(parent) => cursor = parent,
                None => break,
            }
        }
        return Ok(cursor.bits());
    }

    let first_height = (next_height - interval) as u32;
    let first = ancestor_of(tip, first_height)?;

    if policy.no_retargeting {
        return Ok(tip.bits());
    }

    let target_timespan = policy.target_timespan;
    let actual_timespan =
        (tip.time() - first.time()).clamp(target_timespan / 4, target_timespan * 4);

    let next = target_of(tip).wrapping_mul(timespan(actual_timespan)) / timespan(target_timespan);
    let bits = encode_compact_bits(&cap_at_limit(next, policy));

    debug!(
        height = next_height,
        actual_timespan,
        target_timespan,
        bits,
        "Periodic retarget"
    );

    Ok(bits)
}
