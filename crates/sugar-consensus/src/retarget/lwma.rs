//! LWMA-3: linearly weighted moving average of solve times.

use super::{cap_at_limit, parent_of, target_of};
use crate::arith::{U256Ext, U256};
use crate::chain_view::HeaderView;
use crate::compact::encode_compact_bits;
use crate::policy::PowPolicy;
use crate::ConsensusResult;
use tracing::debug;

/// Next compact target under LWMA-3.
///
/// Solve times are weighted by their position in the window (newest
/// heaviest). Each block's effective timestamp is forced past its
/// predecessor's and each solve time is capped at `6 * T`.
pub fn lwma3<H: HeaderView>(tip: Option<&H>, policy: &PowPolicy) -> ConsensusResult<u32> {
    let n = policy.averaging_window;
    let spacing = policy.target_spacing;

    let tip = match tip {
        Some(tip) if tip.height() >= n => tip,
        _ => return Ok(policy.pow_limit_bits()),
    };

    // Window oldest-first, preceded by the block whose time anchors the
    // first solve time.
    let mut window = Vec::with_capacity(n as usize);
    let mut cursor = tip.clone();
    for _ in 0..n {
        let parent = parent_of(&cursor)?;
        window.push(cursor);
        cursor = parent;
    }
    window.reverse();
    let mut previous_time = cursor.time();

    let n_wide = i64::from(n);
    let k = n_wide * (n_wide + 1) * spacing / 2;
    let divisor = U256::from(k as u64) * U256::from(n);

    let mut weighted_time: i64 = 0;
    let mut sum_target = U256::zero();
    for (j, block) in (1i64..).zip(window.iter()) {
        let this_time = if block.time() > previous_time {
            block.time()
        } else {
            previous_time + 1
        };
        let solvetime = (this_time - previous_time).min(6 * spacing);
        previous_time = this_time;

        weighted_time += solvetime * j;
        sum_target = sum_target.wrapping_add(target_of(block) / divisor);
    }

    let next = U256::from(weighted_time as u64).wrapping_mul(sum_target);
    let bits = encode_compact_bits(&cap_at_limit(next, policy));

    debug!(
        height = tip.height() + 1,
        weighted_time,
        bits,
        "LWMA-3 retarget"
    );

    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header_chain::{ChainCursor, HeaderChain};

    const GENESIS_TIME: i64 = 1_541_009_400;

    fn steady_chain(blocks: i64, policy: &PowPolicy) -> HeaderChain {
        let mut chain = HeaderChain::new();
        for i in 0..blocks {
            chain.push(GENESIS_TIME + i * policy.target_spacing, 0x1f07_ffff);
        }
        chain
    }

    fn next(chain: &HeaderChain, policy: &PowPolicy) -> u32 {
        lwma3(chain.tip().as_ref(), policy).unwrap()
    }

    #[test]
    fn test_short_history_is_pow_limit() {
        let policy = PowPolicy::mainnet();
        assert_eq!(lwma3::<ChainCursor>(None, &policy).unwrap(), 0x1f07_ffff);

        let chain = steady_chain(200, &policy);
        assert_eq!(chain.tip().unwrap().height(), 199);
        assert_eq!(next(&chain, &policy), 0x1f07_ffff);
    }

    #[test]
    fn test_steady_chain() {
        // (N * 4) + 5 blocks at exactly T: truncation costs one mantissa unit.
        let policy = PowPolicy::mainnet();
        let chain = steady_chain(805, &policy);
        assert_eq!(next(&chain, &policy), 0x1f07_fffe);
    }

    #[test]
    fn test_slow_block_capped_at_limit() {
        let policy = PowPolicy::mainnet();
        let mut chain = steady_chain(201, &policy);
        let tip_time = chain.tip().unwrap().time();
        chain.push(tip_time + 60 * policy.target_spacing, 0x1f07_ffff);
        assert_eq!(next(&chain, &policy), 0x1f07_ffff);
    }

    #[test]
    fn test_zero_interval_window() {
        let policy = PowPolicy::mainnet();
        let mut chain = steady_chain(201, &policy);
        let tip_time = chain.tip().unwrap().time();
        for _ in 0..200 {
            chain.push(tip_time, 0x1f07_ffff);
        }
        // Every solve time is forced to one second.
        assert_eq!(next(&chain, &policy), 0x1f01_9999);
    }

    #[test]
    fn test_backwards_timestamp() {
        let policy = PowPolicy::mainnet();
        let mut chain = steady_chain(201, &policy);
        let tip_time = chain.tip().unwrap().time();
        chain.push(tip_time - 100, 0x1f07_ffff);
        assert_eq!(next(&chain, &policy), 0x1f07_efb1);
    }

    #[test]
    fn test_deterministic() {
        let policy = PowPolicy::mainnet();
        let mut chain = steady_chain(300, &policy);
        let tip_time = chain.tip().unwrap().time();
        chain.push(tip_time + 2, 0x1f07_0000);
        assert_eq!(next(&chain, &policy), next(&chain, &policy));
    }
}
