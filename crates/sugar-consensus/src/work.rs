//! Chain work and display difficulty.

use crate::arith::U256;
use crate::chain_view::HeaderView;
use crate::compact::decode_compact_bits;
use crate::policy::PowPolicy;

/// Expected number of hashes to find a block at `bits`.
///
/// Computed as `2^256 / (target + 1)` without leaving 256 bits:
/// `(!target / (target + 1)) + 1`. Invalid targets contribute no work.
pub fn block_proof(bits: u32) -> U256 {
    let decoded = decode_compact_bits(bits);
    if !decoded.is_valid_target() {
        return U256::zero();
    }
    let target = decoded.target;
    // target + 1 cannot overflow: a compact target is at most 0x7fffff << 248.
    (!target / (target + U256::one())) + U256::one()
}

/// Seconds it would take to produce the work between `from` and `to` at
/// `tip`'s difficulty and the target spacing.
///
/// Negative when `from` has more work than `to`. Saturates at `±i64::MAX`.
pub fn block_proof_equivalent_time<H: HeaderView>(
    to: &H,
    from: &H,
    tip: &H,
    policy: &PowPolicy,
) -> i64 {
    let (delta, sign) = if to.chain_work() > from.chain_work() {
        (to.chain_work() - from.chain_work(), 1i64)
    } else {
        (from.chain_work() - to.chain_work(), -1i64)
    };

    let proof = block_proof(tip.bits());
    if proof.is_zero() {
        return sign * i64::MAX;
    }

    let spacing = U256::from(policy.target_spacing.max(0) as u64);
    let (scaled, overflow) = delta.overflowing_mul(spacing);
    if overflow {
        return sign * i64::MAX;
    }
    let quotient = scaled / proof;
    if quotient.bits() > 63 {
        return sign * i64::MAX;
    }
    sign * quotient.low_u64() as i64
}

/// Display difficulty relative to Bitcoin's `0x1d00ffff`.
///
/// Floating point; never used by consensus.
pub fn difficulty(bits: u32) -> f64 {
    let mantissa = bits & 0x00ff_ffff;
    if mantissa == 0 {
        return 0.0;
    }

    let mut shift = (bits >> 24) & 0xff;
    let mut diff = f64::from(0x0000_ffffu32) / f64::from(mantissa);
    while shift < 29 {
        diff *= 256.0;
        shift += 1;
    }
    while shift > 29 {
        diff /= 256.0;
        shift -= 1;
    }
    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header_chain::HeaderChain;

    #[test]
    fn test_block_proof_values() {
        // 0x207fffff: target 2^255 - 2^232, a bit under two hashes per block.
        assert_eq!(block_proof(0x207f_ffff), U256::from(2u64));
        // 0x1d00ffff: Bitcoin genesis work.
        assert_eq!(block_proof(0x1d00_ffff), U256::from(0x0001_0001_0001u64));
    }

    #[test]
    fn test_block_proof_invalid_bits() {
        assert!(block_proof(0).is_zero());
        assert!(block_proof(0x0492_3456).is_zero(), "negative");
        assert!(block_proof(0xff12_3456).is_zero(), "overflow");
    }

    #[test]
    fn test_block_proof_grows_with_difficulty() {
        assert!(block_proof(0x1f00_ffff) > block_proof(0x1f07_ffff));
        assert!(block_proof(0x1e07_ffff) > block_proof(0x1f07_ffff));
    }

    #[test]
    fn test_equivalent_time_matches_timestamps() {
        let policy = PowPolicy::mainnet();
        let mut chain = HeaderChain::new();
        for i in 0..500i64 {
            chain.push(1_269_211_443 + i * 5, 0x207f_ffff);
        }

        let pairs = [(0u32, 499u32, 250u32), (499, 0, 10), (123, 456, 499), (77, 77, 0)];
        for (a, b, c) in pairs {
            let p1 = chain.at(a).unwrap();
            let p2 = chain.at(b).unwrap();
            let p3 = chain.at(c).unwrap();
            let tdiff = block_proof_equivalent_time(&p1, &p2, &p3, &policy);
            assert_eq!(tdiff, p1.time() - p2.time(), "pair ({a}, {b})");
        }
    }

    #[test]
    fn test_equivalent_time_saturates() {
        let policy = PowPolicy::mainnet();
        let mut chain = HeaderChain::new();
        chain.push(0, 0x0300_ffff);
        chain.push(5, 0x0300_ffff);
        chain.push(10, 0x207f_ffff);

        let easy_tip = chain.at(2).unwrap();
        let hard_to = chain.at(1).unwrap();
        let genesis = chain.at(0).unwrap();
        let t = block_proof_equivalent_time(&hard_to, &genesis, &easy_tip, &policy);
        assert_eq!(t, i64::MAX);
        let t = block_proof_equivalent_time(&genesis, &hard_to, &easy_tip, &policy);
        assert_eq!(t, -i64::MAX);
    }

    #[test]
    fn test_difficulty_display() {
        assert_eq!(difficulty(0x1d00_ffff), 1.0);
        assert!((difficulty(0x1f07_ffff) - 1.907_323_166_912_278e-6).abs() < 1e-18);
        assert_eq!(difficulty(0x1f00_0000), 0.0);
        assert!(difficulty(0x1e07_ffff) > difficulty(0x1f07_ffff));
    }
}
