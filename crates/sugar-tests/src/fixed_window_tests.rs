//! Fixed-window (DigiShield) scenario tests.

use crate::generators::*;
use crate::harness::fixed_window_policy;
use sugar_consensus::retarget::{calculate_fixed_window, fixed_window};
use sugar_consensus::{decode_compact_bits, HeaderView, PowPolicy, U256Ext, U256};

const T: i64 = 5;

#[test]
fn test_reference_vectors() {
    let policy = PowPolicy::testnet();
    let average = U256::from_hex(&format!("0030245099{}", "19".repeat(27))).unwrap();

    assert_eq!(
        calculate_fixed_window(average, 1_547_848_604, 1_547_846_198, &policy),
        523_204_179
    );
    assert_eq!(
        calculate_fixed_window(policy.pow_limit, 1_547_848_604 + 100_000, 1_547_846_198, &policy),
        536_903_808
    );
}

#[test]
fn test_mined_steady_chain() {
    let mut builder = ChainBuilder::new(fixed_window_policy());
    builder.mine(599, T);
    assert_eq!(builder.next_bits(), 0x1f07_ffee);
}

#[test]
fn test_fast_blocks_tighten() {
    let mut builder = ChainBuilder::new(fixed_window_policy());
    builder.mine(599, T);
    builder.mine(100, 1);
    assert_eq!(builder.next_bits(), 0x1f07_ac6f);
}

#[test]
fn test_testnet_recovers_to_limit() {
    // 510 limit-sized targets fill the register exactly, so any wrap in the
    // window sum or the scaling would show up here.
    let policy = PowPolicy::testnet();
    let limit = policy.pow_limit_bits();
    let mut builder = ChainBuilder::new(policy);

    builder.mine(600, T);
    let steady = builder.next_bits();
    assert_eq!(steady, 0x2000_807e);

    // A slow block never tightens the target.
    builder.mine(1, 100 * T);
    let mut previous = decode_compact_bits(builder.next_bits()).target;
    assert!(previous >= decode_compact_bits(steady).target);

    for _ in 0..1000 {
        builder.mine(1, 2 * T);
        let target = decode_compact_bits(builder.next_bits()).target;
        assert!(target >= previous, "slow blocks loosen monotonically");
        previous = target;
    }
    assert_eq!(builder.next_bits(), limit);
}

#[test]
fn test_outlier_tip_stamp_is_ignored() {
    // The window is timed by median time past, so a single wild timestamp
    // at the tip does not move it.
    let policy = fixed_window_policy();
    let base = uniform_chain(700, T, 0x1f07_0000);
    let tip_time = base.tip().unwrap().time();

    let mut honest = base.clone();
    honest.push(tip_time + T, 0x1f07_0000);
    let mut outlier = base;
    outlier.push(tip_time + 1_000_000, 0x1f07_0000);

    let expected = fixed_window(honest.tip().as_ref(), None, &policy).unwrap();
    assert_ne!(expected, policy.pow_limit_bits());
    assert_eq!(fixed_window(outlier.tip().as_ref(), None, &policy).unwrap(), expected);
}

#[test]
fn test_idle_chain_escape() {
    let policy = PowPolicy {
        allow_min_difficulty_blocks: true,
        min_difficulty_after_height: Some(300),
        ..PowPolicy::testnet()
    };
    let limit = policy.pow_limit_bits();

    let mut builder = ChainBuilder::new(policy);
    builder.mine(599, 1);
    let tip_time = builder.tip_time();
    assert_ne!(builder.next_bits(), limit);
    assert_ne!(builder.next_bits_at(Some(tip_time + 6 * T)), limit);
    assert_eq!(builder.next_bits_at(Some(tip_time + 6 * T + 1)), limit);

    // A late block mined at the limit is accepted and the window moves on.
    builder.mine(1, 6 * T + 1);
    assert_eq!(builder.tip_bits(), limit);
    assert_ne!(builder.next_bits(), limit);
}
