//! Test data generators for integration tests.
//!
//! Provides header chains built either blindly (fixed times and bits) or by
//! an honest miner that always claims the bits the policy requires.

use sugar_consensus::{
    BlockHeader, DifficultyAdjustment, Hash256, HeaderChain, HeaderView, PowPolicy,
};

/// Timestamp of every generated genesis block.
pub const GENESIS_TIME: i64 = 1_541_009_400;

/// Builds a chain block by block under one policy.
///
/// Mined blocks claim exactly the bits returned by the work dispatcher for
/// their timestamp, like an honest miner.
#[derive(Debug, Clone)]
pub struct ChainBuilder {
    chain: HeaderChain,
    policy: PowPolicy,
}

impl ChainBuilder {
    /// Chain holding only a genesis block at the policy limit.
    pub fn new(policy: PowPolicy) -> Self {
        let mut chain = HeaderChain::new();
        chain.push(GENESIS_TIME, policy.pow_limit_bits());
        Self { chain, policy }
    }

    pub fn policy(&self) -> &PowPolicy {
        &self.policy
    }

    pub fn chain(&self) -> &HeaderChain {
        &self.chain
    }

    pub fn into_chain(self) -> HeaderChain {
        self.chain
    }

    pub fn tip_height(&self) -> u32 {
        self.tip_view().height()
    }

    pub fn tip_time(&self) -> i64 {
        self.tip_view().time()
    }

    pub fn tip_bits(&self) -> u32 {
        self.tip_view().bits()
    }

    fn tip_view(&self) -> sugar_consensus::ChainCursor<'_> {
        self.chain.tip().expect("builder chain always has genesis")
    }

    /// Bits required of the next block, ignoring its timestamp.
    pub fn next_bits(&self) -> u32 {
        self.next_bits_at(None)
    }

    /// Bits required of a next block stamped `time`.
    pub fn next_bits_at(&self, time: Option<i64>) -> u32 {
        DifficultyAdjustment::new(&self.policy)
            .next_work_at(Some(&self.tip_view()), time)
            .expect("generated chains have every ancestor")
    }

    /// Mine `count` blocks `spacing` seconds apart.
    pub fn mine(&mut self, count: usize, spacing: i64) -> &mut Self {
        self.mine_with_deltas(std::iter::repeat(spacing).take(count))
    }

    /// Mine one block per time delta.
    pub fn mine_with_deltas(&mut self, deltas: impl IntoIterator<Item = i64>) -> &mut Self {
        for delta in deltas {
            let time = self.tip_time() + delta;
            let bits = self.next_bits_at(Some(time));
            self.chain.push(time, bits);
        }
        self
    }

    /// Append a block with arbitrary bits, `delta` seconds after the tip.
    pub fn push_raw(&mut self, delta: i64, bits: u32) -> &mut Self {
        let time = self.tip_time() + delta;
        self.chain.push(time, bits);
        self
    }
}

/// `count` headers from genesis at a fixed spacing and constant bits.
pub fn uniform_chain(count: usize, spacing: i64, bits: u32) -> HeaderChain {
    let mut chain = HeaderChain::new();
    for i in 0..count {
        chain.push(GENESIS_TIME + i as i64 * spacing, bits);
    }
    chain
}

/// Chain from genesis with the given time deltas and constant bits.
///
/// The genesis block is at [`GENESIS_TIME`]; `deltas` follow it.
pub fn chain_from_deltas(deltas: &[i64], bits: u32) -> HeaderChain {
    let mut chain = HeaderChain::new();
    let mut time = GENESIS_TIME;
    chain.push(time, bits);
    for delta in deltas {
        time += delta;
        chain.push(time, bits);
    }
    chain
}

/// Block header at `time` claiming `bits`.
pub fn test_header(time: u32, bits: u32, nonce: u32) -> BlockHeader {
    BlockHeader {
        version: 0x2000_0000,
        prev_block_hash: Hash256::sha256d(b"parent"),
        merkle_root: Hash256::sha256d(b"merkle"),
        time,
        bits,
        nonce,
    }
}
