//! Dark Gravity Wave.
//!
//! A moving average of the last N targets, weighted towards recent blocks,
//! scaled by how long those N blocks actually took.

use super::{cap_at_limit, parent_of, target_of};
use crate::arith::{timespan, U256Ext, U256};
use crate::chain_view::HeaderView;
use crate::compact::encode_compact_bits;
use crate::params::MIN_DIFFICULTY_RESET_SECS;
use crate::policy::PowPolicy;
use crate::ConsensusResult;
use tracing::debug;

/// Next compact target under Dark Gravity Wave.
///
/// # Arguments
/// * `tip` - Last block of the chain, `None` before genesis
/// * `candidate_time` - Timestamp of the block being built or checked, if known
/// * `policy` - Network constants
pub fn dark_gravity_wave<H: HeaderView>(
    tip: Option<&H>,
    candidate_time: Option<i64>,
    policy: &PowPolicy,
) -> ConsensusResult<u32> {
    let window = policy.averaging_window;
    let limit_bits = policy.pow_limit_bits();

    let tip = match tip {
        Some(tip) if tip.height() >= window => tip,
        _ => return Ok(limit_bits),
    };

    if policy.allow_min_difficulty_blocks {
        if let Some(time) = candidate_time {
            if time > tip.time() + MIN_DIFFICULTY_RESET_SECS {
                return Ok(limit_bits);
            }
            if time > tip.time() + 4 * policy.target_spacing {
                // Saturates at the limit rather than wrapping. Only a limit
                // above 2^256 / 10 can tell the two apart.
                let (eased, overflow) = target_of(tip).overflowing_mul(U256::from(10u64));
                if overflow || eased > policy.pow_limit {
                    return Ok(limit_bits);
                }
                return Ok(encode_compact_bits(&eased));
            }
        }
    }

    let mut oldest = tip.clone();
    let mut average = U256::zero();
    for count in 1..=window {
        let target = target_of(&oldest);
        average = if count == 1 {
            target
        } else {
            let count = U256::from(count);
            average.wrapping_mul(count).wrapping_add(target) / (count + U256::one())
        };

        if count != window {
            oldest = parent_of(&oldest)?;
        }
    }

    // `PowPolicy::validate` keeps `average * 3 * N * T` inside 256 bits.
    let target_timespan = policy.averaging_window_timespan();
    let actual_timespan = (tip.time() - oldest.time()).clamp(target_timespan / 3, target_timespan * 3);

    let next = average.wrapping_mul(timespan(actual_timespan)) / timespan(target_timespan);
    let bits = encode_compact_bits(&cap_at_limit(next, policy));

    debug!(
        height = tip.height() + 1,
        actual_timespan,
        target_timespan,
        bits,
        "Dark Gravity Wave retarget"
    );

    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header_chain::{ChainCursor, HeaderChain};

    const GENESIS_TIME: i64 = 1_541_009_400;

    fn next(chain: &HeaderChain, policy: &PowPolicy) -> u32 {
        dark_gravity_wave(chain.tip().as_ref(), None, policy).unwrap()
    }

    /// Genesis plus 200 blocks at exactly the target spacing.
    fn filled_chain(policy: &PowPolicy) -> HeaderChain {
        let mut chain = HeaderChain::new();
        chain.push(GENESIS_TIME, policy.pow_limit_bits());
        for _ in 1..=200 {
            let bits = next(&chain, policy);
            assert_eq!(bits, policy.pow_limit_bits());
            let time = chain.tip().unwrap().time() + policy.target_spacing;
            chain.push(time, bits);
        }
        chain
    }

    #[test]
    fn test_no_tip_is_pow_limit() {
        let policy = PowPolicy::mainnet();
        let bits = dark_gravity_wave::<ChainCursor>(None, None, &policy).unwrap();
        assert_eq!(bits, 0x1f07_ffff);
    }

    #[test]
    fn test_short_history_is_pow_limit() {
        let policy = PowPolicy::mainnet();
        let mut chain = HeaderChain::new();
        // Zero intervals would tighten the target if the window were used.
        for _ in 0..200 {
            chain.push(GENESIS_TIME, 0x1f00_ffff);
            assert_eq!(next(&chain, &policy), 0x1f07_ffff);
        }
        chain.push(GENESIS_TIME, 0x1f00_ffff);
        assert_ne!(next(&chain, &policy), 0x1f07_ffff);
    }

    #[test]
    fn test_reference_sequence() {
        let policy = PowPolicy::mainnet();
        let mut chain = filled_chain(&policy);

        // Weighted-average truncation and the 199-interval span trim the
        // first full-window result slightly.
        let after_fill = next(&chain, &policy);
        assert_eq!(after_fill, 0x1f07_f5c1);

        // A block with zero interval tightens the target.
        let tip_time = chain.tip().unwrap().time();
        chain.push(tip_time, after_fill);
        let tightened = next(&chain, &policy);
        assert_eq!(tightened, 0x1f07_eb6a);
        assert_eq!(tightened, 520_612_714);

        // A long gap restores the limit exactly.
        chain.push(tip_time + 100 * policy.target_spacing, tightened);
        assert_eq!(next(&chain, &policy), 0x1f07_ffff);
    }

    #[test]
    fn test_min_difficulty_escapes() {
        let mut policy = PowPolicy::mainnet();
        policy.allow_min_difficulty_blocks = true;
        let mut chain = HeaderChain::new();
        for i in 0..=200 {
            chain.push(GENESIS_TIME + i, 0x1f00_7fff);
        }
        let tip = chain.tip().unwrap();
        let tip_time = tip.time();

        let normal = dark_gravity_wave(Some(&tip), Some(tip_time + 5), &policy).unwrap();
        assert_eq!(normal, dark_gravity_wave(Some(&tip), None, &policy).unwrap());

        let eased = dark_gravity_wave(Some(&tip), Some(tip_time + 21), &policy).unwrap();
        assert_eq!(eased, 0x1f04_fff6, "tip target times ten");

        let reset = dark_gravity_wave(Some(&tip), Some(tip_time + 7201), &policy).unwrap();
        assert_eq!(reset, policy.pow_limit_bits());
    }

    #[test]
    fn test_min_difficulty_ignored_without_flag() {
        let policy = PowPolicy::mainnet();
        let chain = filled_chain(&policy);
        let tip = chain.tip().unwrap();
        let late = dark_gravity_wave(Some(&tip), Some(tip.time() + 100_000), &policy).unwrap();
        assert_eq!(late, dark_gravity_wave(Some(&tip), None, &policy).unwrap());
    }

    #[test]
    fn test_tenfold_ease_saturates_at_limit() {
        let mut policy = PowPolicy::mainnet();
        policy.allow_min_difficulty_blocks = true;
        let window = |bits: u32| {
            let mut chain = HeaderChain::new();
            for i in 0..=200 {
                chain.push(GENESIS_TIME + i, bits);
            }
            chain
        };

        // Ten times 0x1f010000 is above the mainnet limit.
        let chain = window(0x1f01_0000);
        let tip = chain.tip().unwrap();
        let eased = dark_gravity_wave(Some(&tip), Some(tip.time() + 21), &policy).unwrap();
        assert_eq!(eased, 0x1f07_ffff);

        // With the widest possible limit the product leaves 256 bits. A
        // wrapping register would give 0x2100fff6.
        policy.pow_limit = U256::MAX;
        let chain = window(0x2100_ffff);
        let tip = chain.tip().unwrap();
        let eased = dark_gravity_wave(Some(&tip), Some(tip.time() + 21), &policy).unwrap();
        assert_eq!(eased, policy.pow_limit_bits());
        assert_eq!(eased, 0x2100_ffff);
    }
}
