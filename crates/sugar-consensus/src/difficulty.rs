//! Work dispatcher.
//!
//! Picks the retarget algorithm in force for the next block and handles the
//! cases shared by all of them: an empty chain gets `pow_limit`, and the
//! moving-average algorithms keep the tip's bits when retargeting is off.

use crate::block::BlockHeader;
use crate::chain_view::HeaderView;
use crate::policy::{PowPolicy, RetargetAlgorithm};
use crate::retarget::{classic_retarget, dark_gravity_wave, fixed_window, lwma3};
use crate::ConsensusResult;
use tracing::debug;

/// Difficulty calculator bound to one policy.
#[derive(Debug, Clone, Copy)]
pub struct DifficultyAdjustment<'a> {
    policy: &'a PowPolicy,
}

impl<'a> DifficultyAdjustment<'a> {
    pub fn new(policy: &'a PowPolicy) -> Self {
        Self { policy }
    }

    /// Bind to `policy` after checking it with [`PowPolicy::validate`].
    ///
    /// Use this for policies that did not come from a preset or
    /// [`PowPolicy::from_config`].
    pub fn checked(policy: &'a PowPolicy) -> ConsensusResult<Self> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &'a PowPolicy {
        self.policy
    }

    /// Compact target required of the block after `tip`.
    ///
    /// # Arguments
    /// * `tip` - Last block of the chain, `None` when building genesis
    /// * `candidate` - The block being built or checked; only its time is used
    pub fn next_work_required<H: HeaderView>(
        &self,
        tip: Option<&H>,
        candidate: Option<&BlockHeader>,
    ) -> ConsensusResult<u32> {
        self.next_work_at(tip, candidate.map(BlockHeader::block_time))
    }

    /// Like [`Self::next_work_required`], taking the candidate's timestamp.
    pub fn next_work_at<H: HeaderView>(
        &self,
        tip: Option<&H>,
        candidate_time: Option<i64>,
    ) -> ConsensusResult<u32> {
        let policy = self.policy;
        let tip = match tip {
            Some(tip) => tip,
            None => return Ok(policy.pow_limit_bits()),
        };

        let next_height = tip.height().saturating_add(1);
        let algorithm = policy.algorithm_for_height(next_height);

        let bits = match algorithm {
            RetargetAlgorithm::FixedWindow => fixed_window(Some(tip), candidate_time, policy)?,
            RetargetAlgorithm::Classic => classic_retarget(Some(tip), candidate_time, policy)?,
            RetargetAlgorithm::DarkGravityWave | RetargetAlgorithm::Lwma3
                if policy.no_retargeting =>
            {
                tip.bits()
            }
            RetargetAlgorithm::DarkGravityWave => {
                dark_gravity_wave(Some(tip), candidate_time, policy)?
            }
            RetargetAlgorithm::Lwma3 => lwma3(Some(tip), policy)?,
        };

        debug!(
            height = next_height,
            algorithm = %algorithm,
            bits = %format!("{:#010x}", bits),
            "Next work required"
        );

        Ok(bits)
    }

    /// Whether `header` claims exactly the bits required after `tip`.
    pub fn header_bits_match<H: HeaderView>(
        &self,
        tip: Option<&H>,
        header: &BlockHeader,
    ) -> ConsensusResult<bool> {
        Ok(self.next_work_required(tip, Some(header))? == header.bits)
    }
}

/// Compact target required of the block after `tip`.
pub fn next_work_required<H: HeaderView>(
    tip: Option<&H>,
    candidate: Option<&BlockHeader>,
    policy: &PowPolicy,
) -> ConsensusResult<u32> {
    DifficultyAdjustment::new(policy).next_work_required(tip, candidate)
}
