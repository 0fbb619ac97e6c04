//! Node configuration.

use crate::Args;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use sugar_consensus::{Network, PowPolicy, PowPolicyConfig};

/// Complete node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Network (main, test, regtest).
    pub network: Network,
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Overrides applied on top of the network's consensus preset.
    #[serde(default)]
    pub consensus: PowPolicyConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl NodeConfig {
    /// Load configuration from file and CLI args.
    ///
    /// A missing file is not an error; the network defaults are used.
    pub fn load(config_path: &Path, args: &Args) -> Result<Self> {
        let mut config = if config_path.exists() {
            let content =
                std::fs::read_to_string(config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Self::default_for_network(args.network.unwrap_or(Network::Main))
        };

        // Override with CLI args
        if let Some(network) = args.network {
            config.network = network;
        }
        if let Some(ref level) = args.log_level {
            config.log_level = level.clone();
        }

        Ok(config)
    }

    /// Create default config for a network.
    pub fn default_for_network(network: Network) -> Self {
        Self {
            network,
            log_level: default_log_level(),
            consensus: PowPolicyConfig::default(),
        }
    }

    /// Effective consensus policy: the network preset with overrides applied.
    pub fn policy(&self) -> Result<PowPolicy> {
        PowPolicy::from_config(self.network, &self.consensus)
            .with_context(|| format!("Invalid [consensus] settings for {}", self.network))
    }

    /// Same config with every consensus value spelled out.
    pub fn resolved(&self) -> Result<Self> {
        Ok(Self {
            consensus: self.policy()?.to_config(),
            ..self.clone()
        })
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
