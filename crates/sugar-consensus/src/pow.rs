//! Proof-of-Work verification.

use crate::arith::U256;
use crate::compact::decode_compact_bits;
use crate::policy::PowPolicy;
use crate::pow_hash::{PowHashCache, PowHasher, SealedHeader};
use crate::ConsensusResult;
use tracing::trace;

/// Check a PoW hash against claimed compact bits.
///
/// Fails when the bits are negative, zero, overflowing or easier than
/// `pow_limit`, or when the hash is above the target. A hash equal to the
/// target passes.
pub fn check_proof_of_work(hash: U256, bits: u32, policy: &PowPolicy) -> bool {
    let decoded = decode_compact_bits(bits);

    if decoded.negative || decoded.target.is_zero() || decoded.overflow {
        return false;
    }
    if decoded.target > policy.pow_limit {
        return false;
    }

    hash <= decoded.target
}

/// Hash a sealed header with the policy's yespower parameters and check it.
///
/// Errors only if the oracle fails; an insufficient hash is `Ok(false)`.
pub fn check_header_pow(
    header: &SealedHeader,
    hasher: &dyn PowHasher,
    policy: &PowPolicy,
) -> ConsensusResult<bool> {
    let pow_hash = header.pow_hash(hasher, &policy.yespower)?;
    let valid = check_proof_of_work(pow_hash.to_u256(), header.header().bits, policy);
    trace!(block = %header.block_hash(), pow_hash = %pow_hash, valid, "Checked PoW");
    Ok(valid)
}

/// [`check_header_pow`] through a shared hash cache.
pub fn check_header_pow_cached(
    header: &SealedHeader,
    cache: &PowHashCache,
    hasher: &dyn PowHasher,
    policy: &PowPolicy,
) -> ConsensusResult<bool> {
    let pow_hash = header.pow_hash_cached(cache, hasher, &policy.yespower)?;
    Ok(check_proof_of_work(pow_hash.to_u256(), header.header().bits, policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockHeader, Hash256, HEADER_SIZE};
    use crate::pow_hash::YespowerParams;
    use crate::ConsensusError;

    /// Oracle returning a fixed digest.
    struct FixedHasher(Hash256);

    impl PowHasher for FixedHasher {
        fn pow_hash(&self, _: &[u8; HEADER_SIZE], params: &YespowerParams) -> ConsensusResult<Hash256> {
            if params.n == 0 {
                return Err(ConsensusError::PowHasher("invalid N".into()));
            }
            Ok(self.0)
        }
    }

    fn sealed(bits: u32) -> SealedHeader {
        SealedHeader::seal(BlockHeader {
            version: 1,
            prev_block_hash: Hash256::zero(),
            merkle_root: Hash256::zero(),
            time: 1_541_009_400,
            bits,
            nonce: 0,
        })
    }

    #[test]
    fn test_hash_equal_to_target_passes() {
        let policy = PowPolicy::mainnet();
        let target = decode_compact_bits(0x1f07_ffff).target;
        assert!(check_proof_of_work(target, 0x1f07_ffff, &policy));
        assert!(check_proof_of_work(U256::zero(), 0x1f07_ffff, &policy));
        assert!(!check_proof_of_work(target + U256::one(), 0x1f07_ffff, &policy));
    }

    #[test]
    fn test_invalid_bits_fail() {
        let policy = PowPolicy::regtest();
        // Negative mantissa fails whatever the hash.
        assert!(!check_proof_of_work(U256::zero(), 0x0492_3456, &policy));
        assert!(!check_proof_of_work(U256::zero(), 0x1f80_0001, &policy));
        // Zero target.
        assert!(!check_proof_of_work(U256::zero(), 0x1f00_0000, &policy));
        assert!(!check_proof_of_work(U256::zero(), 0, &policy));
        // Overflow.
        assert!(!check_proof_of_work(U256::zero(), 0xff12_3456, &policy));
    }

    #[test]
    fn test_target_above_limit_fails() {
        let policy = PowPolicy::mainnet();
        assert!(!check_proof_of_work(U256::zero(), 0x2000_8080, &policy));
        assert!(!check_proof_of_work(U256::zero(), 0x1f08_0000, &policy));
        assert!(check_proof_of_work(U256::zero(), 0x1f07_ffff, &PowPolicy::testnet()));
    }

    #[test]
    fn test_check_header_pow() {
        let policy = PowPolicy::mainnet();
        let target = decode_compact_bits(0x1f07_ffff).target;

        let good = FixedHasher(Hash256::from_u256(&target));
        assert!(check_header_pow(&sealed(0x1f07_ffff), &good, &policy).unwrap());

        let bad = FixedHasher(Hash256::from_u256(&(target + U256::one())));
        assert!(!check_header_pow(&sealed(0x1f07_ffff), &bad, &policy).unwrap());

        let mut broken = policy.clone();
        broken.yespower.n = 0;
        assert!(check_header_pow(&sealed(0x1f07_ffff), &good, &broken).is_err());
    }

    #[test]
    fn test_check_header_pow_cached() {
        let policy = PowPolicy::mainnet();
        let cache = PowHashCache::new(8);
        let low = FixedHasher(Hash256::zero());
        assert!(check_header_pow_cached(&sealed(0x1f07_ffff), &cache, &low, &policy).unwrap());

        // A fresh seal of the same block is served from the cache.
        let high = FixedHasher(Hash256::from_u256(&U256::MAX));
        assert!(check_header_pow_cached(&sealed(0x1f07_ffff), &cache, &high, &policy).unwrap());
    }

    /// Records a different hash for the block while "hashing", like a
    /// concurrent validator would.
    struct RacingHasher<'a> {
        cache: &'a PowHashCache,
        block: Hash256,
    }

    impl PowHasher for RacingHasher<'_> {
        fn pow_hash(&self, _: &[u8; HEADER_SIZE], _: &YespowerParams) -> ConsensusResult<Hash256> {
            self.cache
                .insert(self.block, Hash256::from_u256(&U256::from(2u64)))?;
            Ok(Hash256::zero())
        }
    }

    #[test]
    fn test_check_header_pow_cached_reports_mismatch() {
        let policy = PowPolicy::mainnet();
        let cache = PowHashCache::new(8);
        let header = sealed(0x1f07_ffff);
        let hasher = RacingHasher {
            cache: &cache,
            block: header.block_hash(),
        };

        let err = check_header_pow_cached(&header, &cache, &hasher, &policy).unwrap_err();
        assert!(matches!(err, ConsensusError::PowHashMismatch { .. }));
        assert_eq!(header.cached_pow_hash(), None);
    }
}
