//! Node configuration with TOML file support.

use palisade_consensus::ConsensusParams;
use palisade_types::{Amount, WalletAddress};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::NodeError;

/// Configuration for a palisade node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Seconds between block proposals.
    #[serde(default = "default_generation_interval")]
    pub generation_interval_secs: u64,

    /// Milliseconds between scheduler ticks driving the engine.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Fixed per-transaction fee, in raw units.
    #[serde(
        default = "default_transaction_price",
        deserialize_with = "deserialize_u128_from_toml"
    )]
    pub transaction_price: u128,

    /// Foundation percentage of the fee pool.
    #[serde(default = "default_foundation_fee_percent")]
    pub foundation_fee_percent: u64,

    /// Address credited with the foundation cut.
    pub foundation_address: String,

    /// Trailing window (heights) for the difficulty controller.
    #[serde(default = "default_difficulty_window")]
    pub difficulty_window: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// TOML integers are i64-backed, so serde's `deserialize_u128` is unsupported
// by the toml crate. Route the value through `u64` (the full positive range a
// TOML integer can hold) and widen it — lossless for any TOML-representable
// value, and it keeps the public field type as `u128`.
fn deserialize_u128_from_toml<'de, D>(deserializer: D) -> Result<u128, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = u64::deserialize(deserializer)?;
    Ok(value as u128)
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_generation_interval() -> u64 {
    30
}

fn default_tick_interval_ms() -> u64 {
    1_000
}

fn default_transaction_price() -> u128 {
    1
}

fn default_foundation_fee_percent() -> u64 {
    10
}

fn default_difficulty_window() -> u64 {
    1_000
}

fn default_log_format() -> String {
    "human".into()
}

fn default_log_level() -> String {
    "info".into()
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&raw).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the engine depends on.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.generation_interval_secs == 0 {
            return Err(NodeError::Config(
                "generation_interval_secs must be non-zero".into(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(NodeError::Config("tick_interval_ms must be non-zero".into()));
        }
        if self.foundation_fee_percent > 100 {
            return Err(NodeError::Config(
                "foundation_fee_percent must be at most 100".into(),
            ));
        }
        if !self.foundation_address.starts_with(WalletAddress::PREFIX) {
            return Err(NodeError::Config(format!(
                "foundation_address must start with {}",
                WalletAddress::PREFIX
            )));
        }
        Ok(())
    }

    /// Build the consensus engine parameters from this configuration.
    pub fn consensus_params(&self) -> Result<ConsensusParams, NodeError> {
        self.validate()?;
        Ok(ConsensusParams {
            generation_interval_secs: self.generation_interval_secs,
            transaction_price: Amount::new(self.transaction_price),
            foundation_fee_percent: self.foundation_fee_percent,
            foundation_address: WalletAddress::new(self.foundation_address.clone()),
            difficulty_window: self.difficulty_window,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config: NodeConfig =
            toml::from_str(r#"foundation_address = "pal_foundation""#).unwrap();
        assert_eq!(config.generation_interval_secs, 30);
        assert_eq!(config.transaction_price, 1);
        assert_eq!(config.foundation_fee_percent, 10);
        assert_eq!(config.log_format, "human");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn consensus_params_carry_config_values() {
        let config: NodeConfig = toml::from_str(
            r#"
            foundation_address = "pal_foundation"
            generation_interval_secs = 10
            transaction_price = 42
            foundation_fee_percent = 25
            "#,
        )
        .unwrap();

        let params = config.consensus_params().unwrap();
        assert_eq!(params.generation_interval_secs, 10);
        assert_eq!(params.transaction_price, Amount::new(42));
        assert_eq!(params.foundation_fee_percent, 25);
        assert_eq!(params.foundation_address.as_str(), "pal_foundation");
    }

    #[test]
    fn rejects_zero_generation_interval() {
        let config: NodeConfig = toml::from_str(
            r#"
            foundation_address = "pal_foundation"
            generation_interval_secs = 0
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_foundation_address() {
        let config: NodeConfig =
            toml::from_str(r#"foundation_address = "bad_prefix""#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_excessive_foundation_percent() {
        let config: NodeConfig = toml::from_str(
            r#"
            foundation_address = "pal_foundation"
            foundation_fee_percent = 101
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }
}
