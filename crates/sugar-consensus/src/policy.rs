//! Network proof-of-work policy.
//!
//! A [`PowPolicy`] is the immutable set of consensus constants every retarget
//! and verification call takes by reference. There is no process-wide
//! "active network": callers pick a preset with [`PowPolicy::for_network`]
//! or build one with [`PowPolicy::from_config`] and pass it down.
//!
//! - `PowPolicy::mainnet()` / `testnet()` / `regtest()` for the fixed networks
//! - `PowPolicy::from_config()` to overlay a partial [`PowPolicyConfig`]

use crate::arith::{U256Ext, U256};
use crate::compact::encode_compact_bits;
use crate::params::{
    AVERAGING_WINDOW, FIXED_WINDOW_AVERAGING_WINDOW, MAX_ADJUST_DOWN_PERCENT, MAX_ADJUST_UP_PERCENT, TARGET_SPACING_SECS,
    TARGET_TIMESPAN_SECS, YESPOWER_N, YESPOWER_PERSONALIZATION, YESPOWER_R,
};
use crate::pow_hash::YespowerParams;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mainnet limit, compact `0x1f07ffff`.
const MAINNET_POW_LIMIT: &str = "0007ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";

/// Testnet limit, compact `0x20008080`.
const TESTNET_POW_LIMIT: &str = "0080808080808080808080808080808080808080808080808080808080808080";

/// Regtest limit, compact `0x207fffff`.
const REGTEST_POW_LIMIT: &str = "7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";

/// Named network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Main,
    Test,
    Regtest,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Main => "main",
            Network::Test => "test",
            Network::Regtest => "regtest",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Ok(Network::Main),
            "test" | "testnet" => Ok(Network::Test),
            "regtest" => Ok(Network::Regtest),
            other => Err(PolicyError {
                field: "network",
                message: format!("unknown network '{}'", other),
            }),
        }
    }
}

/// Retargeting algorithm selected by a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetargetAlgorithm {
    /// Unweighted window average with quarter damping (DigiShield).
    FixedWindow,
    /// Weighted moving average of targets.
    DarkGravityWave,
    /// Linearly weighted moving average of solve times.
    Lwma3,
    /// Bitcoin-style retarget once per adjustment interval.
    Classic,
}

impl RetargetAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetargetAlgorithm::FixedWindow => "fixed-window",
            RetargetAlgorithm::DarkGravityWave => "dark-gravity-wave",
            RetargetAlgorithm::Lwma3 => "lwma3",
            RetargetAlgorithm::Classic => "classic",
        }
    }
}

impl fmt::Display for RetargetAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetargetAlgorithm {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed-window" | "digishield" => Ok(RetargetAlgorithm::FixedWindow),
            "dark-gravity-wave" | "dgw" => Ok(RetargetAlgorithm::DarkGravityWave),
            "lwma3" | "lwma" => Ok(RetargetAlgorithm::Lwma3),
            "classic" => Ok(RetargetAlgorithm::Classic),
            other => Err(PolicyError {
                field: "algorithm",
                message: format!("unknown retarget algorithm '{}'", other),
            }),
        }
    }
}

/// Switch to `algorithm` for blocks at `height` and above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmActivation {
    /// First block height (not parent height) using the algorithm.
    pub height: u32,
    pub algorithm: RetargetAlgorithm,
}

/// Error when constructing a [`PowPolicy`] from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyError {
    /// The field that is missing or invalid.
    pub field: &'static str,
    /// Description of the error.
    pub message: String,
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PowPolicy error for '{}': {}", self.field, self.message)
    }
}

impl std::error::Error for PolicyError {}

/// Partial policy loaded from TOML/JSON.
///
/// Every field is optional; unset fields keep the network preset's value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PowPolicyConfig {
    /// Easiest allowed target, big-endian hex with optional `0x`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pow_limit: Option<String>,
    /// Desired seconds between blocks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_spacing: Option<i64>,
    /// Classic retarget timespan in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_timespan: Option<i64>,
    /// Number of headers examined by Dark Gravity Wave and LWMA-3.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub averaging_window: Option<u32>,
    /// Number of headers examined by the fixed-window average.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_window_averaging_window: Option<u32>,
    /// Fixed-window: maximum percent the target may loosen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_adjust_down: Option<i64>,
    /// Fixed-window: maximum percent the target may tighten.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_adjust_up: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_min_difficulty_blocks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_difficulty_after_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_retargeting: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<RetargetAlgorithm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pow_n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pow_r: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pow_personalization: Option<String>,
    /// Kept last so TOML output puts the array of tables after plain keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm_activations: Option<Vec<AlgorithmActivation>>,
}

/// Network-specific proof-of-work consensus constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowPolicy {
    /// Network the preset was derived from.
    pub network: Network,
    /// Easiest allowed target.
    pub pow_limit: U256,
    /// Desired seconds between blocks.
    pub target_spacing: i64,
    /// Classic retarget timespan in seconds.
    pub target_timespan: i64,
    /// Window size N for Dark Gravity Wave and LWMA-3.
    pub averaging_window: u32,
    /// Window size for the fixed-window average. Its timespan also sets
    /// the fixed-window clamps.
    pub fixed_window_averaging_window: u32,
    /// Fixed-window: maximum percent the target may loosen.
    pub max_adjust_down: i64,
    /// Fixed-window: maximum percent the target may tighten.
    pub max_adjust_up: i64,
    /// Testnet relaxation: late blocks may use an easier target.
    pub allow_min_difficulty_blocks: bool,
    /// Fixed-window idle escape applies from this tip height on.
    pub min_difficulty_after_height: Option<u32>,
    /// Regtest: keep the tip's bits.
    pub no_retargeting: bool,
    /// Algorithm used when no activation entry applies.
    pub algorithm: RetargetAlgorithm,
    /// Later algorithm switches, any order.
    pub algorithm_activations: Vec<AlgorithmActivation>,
    /// Parameters passed unchanged to the PoW hash oracle.
    pub yespower: YespowerParams,
}

impl PowPolicy {
    /// Create mainnet policy.
    pub fn mainnet() -> Self {
        Self {
            network: Network::Main,
            pow_limit: preset_limit(MAINNET_POW_LIMIT),
            target_spacing: TARGET_SPACING_SECS,
            target_timespan: TARGET_TIMESPAN_SECS,
            averaging_window: AVERAGING_WINDOW,
            fixed_window_averaging_window: FIXED_WINDOW_AVERAGING_WINDOW,
            max_adjust_down: MAX_ADJUST_DOWN_PERCENT,
            max_adjust_up: MAX_ADJUST_UP_PERCENT,
            allow_min_difficulty_blocks: false,
            min_difficulty_after_height: None,
            no_retargeting: false,
            algorithm: RetargetAlgorithm::DarkGravityWave,
            algorithm_activations: Vec::new(),
            yespower: YespowerParams::new(
                YESPOWER_N,
                YESPOWER_R,
                Some(YESPOWER_PERSONALIZATION.to_string()),
            ),
        }
    }

    /// Create testnet policy.
    ///
    /// The limit is sized so that 510 limit-sized targets just fit in 256
    /// bits. That leaves no headroom for the Dark Gravity Wave product, so
    /// testnet runs the fixed-window average.
    pub fn testnet() -> Self {
        Self {
            network: Network::Test,
            pow_limit: preset_limit(TESTNET_POW_LIMIT),
            algorithm: RetargetAlgorithm::FixedWindow,
            ..Self::mainnet()
        }
    }

    /// Create regtest policy: maximal limit, no retargeting, min-difficulty on.
    pub fn regtest() -> Self {
        Self {
            network: Network::Regtest,
            pow_limit: preset_limit(REGTEST_POW_LIMIT),
            max_adjust_down: 0,
            max_adjust_up: 0,
            allow_min_difficulty_blocks: true,
            no_retargeting: true,
            ..Self::mainnet()
        }
    }

    /// Preset for a named network.
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Main => Self::mainnet(),
            Network::Test => Self::testnet(),
            Network::Regtest => Self::regtest(),
        }
    }

    /// Overlay `config` on the preset for `network` and validate the result.
    ///
    /// Returns an error naming the offending field.
    pub fn from_config(network: Network, config: &PowPolicyConfig) -> Result<Self, PolicyError> {
        let mut policy = Self::for_network(network);

        if let Some(hex) = &config.pow_limit {
            policy.pow_limit = U256::from_hex(hex).ok_or_else(|| PolicyError {
                field: "pow_limit",
                message: format!("invalid hex string: '{}'", hex),
            })?;
        }
        if let Some(v) = config.target_spacing {
            policy.target_spacing = v;
        }
        if let Some(v) = config.target_timespan {
            policy.target_timespan = v;
        }
        if let Some(v) = config.averaging_window {
            policy.averaging_window = v;
        }
        if let Some(v) = config.fixed_window_averaging_window {
            policy.fixed_window_averaging_window = v;
        }
        if let Some(v) = config.max_adjust_down {
            policy.max_adjust_down = v;
        }
        if let Some(v) = config.max_adjust_up {
            policy.max_adjust_up = v;
        }
        if let Some(v) = config.allow_min_difficulty_blocks {
            policy.allow_min_difficulty_blocks = v;
        }
        if config.min_difficulty_after_height.is_some() {
            policy.min_difficulty_after_height = config.min_difficulty_after_height;
        }
        if let Some(v) = config.no_retargeting {
            policy.no_retargeting = v;
        }
        if let Some(v) = config.algorithm {
            policy.algorithm = v;
        }
        if let Some(v) = &config.algorithm_activations {
            policy.algorithm_activations = v.clone();
        }
        if let Some(v) = config.pow_n {
            policy.yespower.n = v;
        }
        if let Some(v) = config.pow_r {
            policy.yespower.r = v;
        }
        if let Some(v) = &config.pow_personalization {
            policy.yespower.personalization = if v.is_empty() { None } else { Some(v.clone()) };
        }

        policy.validate()?;
        Ok(policy)
    }

    /// Full config equivalent of this policy (every field set).
    pub fn to_config(&self) -> PowPolicyConfig {
        PowPolicyConfig {
            pow_limit: Some(format!("0x{}", self.pow_limit.to_hex())),
            target_spacing: Some(self.target_spacing),
            target_timespan: Some(self.target_timespan),
            averaging_window: Some(self.averaging_window),
            fixed_window_averaging_window: Some(self.fixed_window_averaging_window),
            max_adjust_down: Some(self.max_adjust_down),
            max_adjust_up: Some(self.max_adjust_up),
            allow_min_difficulty_blocks: Some(self.allow_min_difficulty_blocks),
            min_difficulty_after_height: self.min_difficulty_after_height,
            no_retargeting: Some(self.no_retargeting),
            algorithm: Some(self.algorithm),
            pow_n: Some(self.yespower.n),
            pow_r: Some(self.yespower.r),
            pow_personalization: Some(self.yespower.personalization.clone().unwrap_or_default()),
            algorithm_activations: Some(self.algorithm_activations.clone()),
        }
    }

    /// Check the invariants the retarget code relies on.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.pow_limit.is_zero() {
            return Err(PolicyError {
                field: "pow_limit",
                message: "limit cannot be zero".to_string(),
            });
        }
        if self.target_spacing <= 0 {
            return Err(PolicyError {
                field: "target_spacing",
                message: format!("must be positive, got {}", self.target_spacing),
            });
        }
        if self.averaging_window == 0 {
            return Err(PolicyError {
                field: "averaging_window",
                message: "must be at least 1".to_string(),
            });
        }
        if self.fixed_window_averaging_window == 0 {
            return Err(PolicyError {
                field: "fixed_window_averaging_window",
                message: "must be at least 1".to_string(),
            });
        }
        if !(0..100).contains(&self.max_adjust_up) {
            return Err(PolicyError {
                field: "max_adjust_up",
                message: format!("must be in 0..100, got {}", self.max_adjust_up),
            });
        }
        if self.max_adjust_down < 0 {
            return Err(PolicyError {
                field: "max_adjust_down",
                message: format!("cannot be negative, got {}", self.max_adjust_down),
            });
        }
        if self.target_timespan < self.target_spacing {
            return Err(PolicyError {
                field: "target_timespan",
                message: format!(
                    "must be at least target_spacing ({}), got {}",
                    self.target_spacing, self.target_timespan
                ),
            });
        }

        let mut heights: Vec<u32> = self.algorithm_activations.iter().map(|a| a.height).collect();
        heights.sort_unstable();
        if heights.windows(2).any(|w| w[0] == w[1]) {
            return Err(PolicyError {
                field: "algorithm_activations",
                message: "duplicate activation height".to_string(),
            });
        }

        // Regtest never retargets and runs with a limit these guards would
        // reject.
        if !self.no_retargeting {
            self.check_register_headroom()?;
        }

        Ok(())
    }

    /// Every scheduled algorithm must fit its widest intermediate value in
    /// 256 bits when all targets sit at `pow_limit`.
    fn check_register_headroom(&self) -> Result<(), PolicyError> {
        let ratio = U256::MAX / self.pow_limit;
        for algorithm in self.scheduled_algorithms() {
            let multiplier = self.register_multiplier(algorithm);
            if ratio >= multiplier {
                continue;
            }
            return Err(match algorithm {
                RetargetAlgorithm::FixedWindow => PolicyError {
                    field: "fixed_window_averaging_window",
                    message: format!(
                        "{} targets at pow_limit overflow 256 bits (max {})",
                        self.fixed_window_averaging_window, ratio
                    ),
                },
                _ => PolicyError {
                    field: "pow_limit",
                    message: format!(
                        "{} scales targets by up to {} which overflows 256 bits at this limit (max {})",
                        algorithm, multiplier, ratio
                    ),
                },
            });
        }
        Ok(())
    }

    /// Largest factor `algorithm` grows a limit-sized target by before
    /// dividing.
    fn register_multiplier(&self, algorithm: RetargetAlgorithm) -> U256 {
        let spacing = U256::from(self.target_spacing.unsigned_abs());
        let window = U256::from(self.averaging_window);
        match algorithm {
            // Sum of the window; scaling divides first.
            RetargetAlgorithm::FixedWindow => U256::from(self.fixed_window_averaging_window),
            // Clamped span of at most 3 * N * T.
            RetargetAlgorithm::DarkGravityWave => U256::from(3u64) * window * spacing,
            // Capped solve times bound the result by 6x the average.
            RetargetAlgorithm::Lwma3 => U256::from(6u64),
            // Clamped span of at most 4 * target_timespan.
            RetargetAlgorithm::Classic => {
                U256::from(4u64) * U256::from(self.target_timespan.unsigned_abs())
            }
        }
    }

    /// Base algorithm plus every activation.
    pub fn scheduled_algorithms(&self) -> impl Iterator<Item = RetargetAlgorithm> + '_ {
        std::iter::once(self.algorithm).chain(self.algorithm_activations.iter().map(|a| a.algorithm))
    }

    /// Compact encoding of `pow_limit`.
    pub fn pow_limit_bits(&self) -> u32 {
        encode_compact_bits(&self.pow_limit)
    }

    /// Seconds the Dark Gravity Wave and LWMA-3 window should span: `N * T`.
    pub fn averaging_window_timespan(&self) -> i64 {
        i64::from(self.averaging_window) * self.target_spacing
    }

    /// Seconds the fixed-window average should span.
    pub fn fixed_window_timespan(&self) -> i64 {
        i64::from(self.fixed_window_averaging_window) * self.target_spacing
    }

    /// Fixed-window lower clamp on the damped timespan.
    pub fn min_actual_timespan(&self) -> i64 {
        self.fixed_window_timespan() * (100 - self.max_adjust_up) / 100
    }

    /// Fixed-window upper clamp on the damped timespan.
    pub fn max_actual_timespan(&self) -> i64 {
        self.fixed_window_timespan() * (100 + self.max_adjust_down) / 100
    }

    /// Blocks between classic retargets.
    pub fn difficulty_adjustment_interval(&self) -> i64 {
        self.target_timespan / self.target_spacing
    }

    /// Algorithm in force for the block at `next_height`.
    ///
    /// # Arguments
    /// * `next_height` - The height of the block being validated (NOT parent height)
    pub fn algorithm_for_height(&self, next_height: u32) -> RetargetAlgorithm {
        self.algorithm_activations
            .iter()
            .filter(|a| a.height <= next_height)
            .max_by_key(|a| a.height)
            .map(|a| a.algorithm)
            .unwrap_or(self.algorithm)
    }
}

/// Parse a compiled-in limit. The constants above are valid hex.
fn preset_limit(hex: &str) -> U256 {
    U256::from_hex(hex).unwrap_or_else(U256::max_value)
}
