//! Header-file replay.
//!
//! A header file is a JSON array of `{ "time": .., "bits": .. }` records
//! ordered from genesis; heights are implicit from position. `bits` may be a
//! number or a hex string such as `"0x1f07ffff"`.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use sugar_consensus::{ChainCursor, ConsensusResult, DifficultyAdjustment, HeaderChain, PowPolicy};
use tracing::{debug, info, warn};

/// One header as stored in a header file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRecord {
    pub time: i64,
    #[serde(deserialize_with = "deserialize_bits")]
    pub bits: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BitsRepr {
    Number(u32),
    Hex(String),
}

fn deserialize_bits<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match BitsRepr::deserialize(deserializer)? {
        BitsRepr::Number(bits) => Ok(bits),
        BitsRepr::Hex(s) => parse_bits(&s).map_err(serde::de::Error::custom),
    }
}

/// Parse compact bits written as hex, with or without `0x`.
pub fn parse_bits(s: &str) -> Result<u32> {
    let s = s.trim();
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u32::from_str_radix(digits, 16).with_context(|| format!("Invalid compact bits '{}'", s))
}

/// Read and parse a header file.
pub fn load_headers(path: &Path) -> Result<Vec<HeaderRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read header file {}", path.display()))?;
    let records: Vec<HeaderRecord> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse header file {}", path.display()))?;
    debug!(count = records.len(), path = %path.display(), "Loaded headers");
    Ok(records)
}

/// Index the records as a single chain.
pub fn build_chain(records: &[HeaderRecord]) -> HeaderChain {
    let mut chain = HeaderChain::new();
    for record in records {
        chain.push(record.time, record.bits);
    }
    chain
}

/// A header whose claimed bits differ from the recomputed ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    pub height: u32,
    pub expected: u32,
    pub actual: u32,
}

/// Outcome of [`replay`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Headers whose bits were recomputed (all but genesis, up to the mismatch).
    pub checked: usize,
    pub first_mismatch: Option<Mismatch>,
}

impl ReplayReport {
    pub fn is_ok(&self) -> bool {
        self.first_mismatch.is_none()
    }
}

/// Recompute the required bits of every non-genesis header and compare.
///
/// Stops at the first mismatch.
pub fn replay(chain: &HeaderChain, policy: &PowPolicy) -> ConsensusResult<ReplayReport> {
    let calc = DifficultyAdjustment::checked(policy)?;
    let mut report = ReplayReport::default();

    for header in chain.iter().skip(1) {
        let tip = chain.at(header.height - 1);
        let expected = calc.next_work_at(tip.as_ref(), Some(header.time))?;
        if expected != header.bits {
            warn!(
                height = header.height,
                expected = %format!("{:#010x}", expected),
                actual = %format!("{:#010x}", header.bits),
                "Header bits mismatch"
            );
            report.first_mismatch = Some(Mismatch {
                height: header.height,
                expected,
                actual: header.bits,
            });
            return Ok(report);
        }
        report.checked += 1;
    }

    info!(checked = report.checked, "Replay complete");
    Ok(report)
}

/// Bits required of the block after the chain's tip.
///
/// # Arguments
/// * `chain` - Headers from genesis; may be empty
/// * `candidate_time` - Timestamp of the block being built, if known
pub fn next_work(
    chain: &HeaderChain,
    candidate_time: Option<i64>,
    policy: &PowPolicy,
) -> ConsensusResult<u32> {
    let tip: Option<ChainCursor<'_>> = chain.tip();
    DifficultyAdjustment::checked(policy)?.next_work_at(tip.as_ref(), candidate_time)
}
