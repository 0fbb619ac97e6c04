//! Fixed-window average (DigiShield).
//!
//! The plain mean of the last N targets, scaled by the window's median-time
//! span after quarter damping and percentage clamps.

use super::{cap_at_limit, parent_of, target_of};
use crate::arith::{timespan, U256Ext, U256};
use crate::chain_view::HeaderView;
use crate::compact::encode_compact_bits;
use crate::policy::PowPolicy;
use crate::ConsensusResult;
use tracing::{debug, trace};

/// Next compact target under the fixed-window average.
pub fn fixed_window<H: HeaderView>(
    tip: Option<&H>,
    candidate_time: Option<i64>,
    policy: &PowPolicy,
) -> ConsensusResult<u32> {
    let limit_bits = policy.pow_limit_bits();
    let tip = match tip {
        Some(tip) => tip,
        None => return Ok(limit_bits),
    };

    // Idle-chain escape. Compared against the tip height because this
    // computes the work for the block after it.
    if policy.allow_min_difficulty_blocks {
        if let (Some(after), Some(time)) = (policy.min_difficulty_after_height, candidate_time) {
            if tip.height() >= after && time > tip.time() + 6 * policy.target_spacing {
                return Ok(limit_bits);
            }
        }
    }

    let window = policy.fixed_window_averaging_window;
    if tip.height() < window {
        return Ok(limit_bits);
    }

    // `first` ends on the block preceding the window.
    let mut first = tip.clone();
    let mut total = U256::zero();
    for _ in 0..window {
        total = total.wrapping_add(target_of(&first));
        first = parent_of(&first)?;
    }
    let average = total / U256::from(window);

    if policy.no_retargeting && policy.allow_min_difficulty_blocks {
        trace!(height = tip.height() + 1, bits = tip.bits(), "Retargeting disabled");
        return Ok(tip.bits());
    }

    Ok(calculate_fixed_window(
        average,
        tip.median_time_past(),
        first.median_time_past(),
        policy,
    ))
}

/// Scale `average` by the damped, clamped window timespan.
///
/// # Arguments
/// * `average` - Mean target of the window
/// * `last_time` - Median time past of the tip
/// * `first_time` - Median time past of the block preceding the window
pub fn calculate_fixed_window(
    average: U256,
    last_time: i64,
    first_time: i64,
    policy: &PowPolicy,
) -> u32 {
    let window_timespan = policy.fixed_window_timespan();

    let raw_timespan = last_time - first_time;
    let mut actual_timespan = window_timespan + (raw_timespan - window_timespan) / 4;
    if actual_timespan < policy.min_actual_timespan() {
        actual_timespan = policy.min_actual_timespan();
    }
    if actual_timespan > policy.max_actual_timespan() {
        actual_timespan = policy.max_actual_timespan();
    }

    // Divide first: a limit-sized average times the timespan would not fit.
    let next = (average / timespan(window_timespan)).wrapping_mul(timespan(actual_timespan));
    let bits = encode_compact_bits(&cap_at_limit(next, policy));

    debug!(
        raw_timespan,
        actual_timespan,
        window_timespan,
        average_bits = encode_compact_bits(&average),
        bits,
        "Fixed-window retarget"
    );

    bits
}
