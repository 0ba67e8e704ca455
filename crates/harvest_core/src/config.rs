//! Game constants and engine tunables.
//!
//! [`GameConstants`] describe the match and are handed over by the host.
//! [`EngineConfig`] holds the knobs of the decision engine itself and can be
//! loaded from a RON file:
//!
//! ```ron
//! (
//!     cluster_top_n: 5,
//!     cluster_stride: 3,
//!     cluster_refresh_interval: 5,
//!     proximity_multiplier: 5,
//!     destination_policy: Random,
//!     production_cutoff_turn: 220,
//!     deposit_threshold: 0.95,
//!     depleted_threshold: 0.1,
//!     move_cost_ratio: 0.1,
//!     stay_bias: 1.8,
//!     recall_congestion: 0.3,
//!     seed: 0,
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::{ratio_serde, Ratio};

/// Error type for configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found.
    #[error("Config file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Parsed values are unusable.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Fixed rules of the match, supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConstants {
    /// Board width.
    pub width: u32,
    /// Board height.
    pub height: u32,
    /// Maximum resource a cell can hold.
    pub max_cell_resource: u32,
    /// Maximum resource a unit can carry.
    pub max_carried: u32,
    /// Cost of producing a unit.
    pub unit_cost: u32,
    /// Number of turns in the match.
    pub max_turns: u32,
}

impl Default for GameConstants {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
            max_cell_resource: 1000,
            max_carried: 1000,
            unit_cost: 1000,
            max_turns: 400,
        }
    }
}

/// How a collecting unit picks among the ranked clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DestinationPolicy {
    /// Uniformly at random among the published clusters.
    #[default]
    Random,
    /// The cluster whose center is closest to the unit.
    Nearest,
}

/// Tunables of the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How many clusters are published after ranking.
    pub cluster_top_n: usize,
    /// Sampling stride between cluster centers, both axes.
    pub cluster_stride: u32,
    /// Turns between cluster recomputations. 1 recomputes every turn.
    pub cluster_refresh_interval: u32,
    /// Score multiplier for clusters near the shipyard.
    pub proximity_multiplier: u32,
    /// Cluster selection strategy.
    pub destination_policy: DestinationPolicy,
    /// Last turn on which a unit may be produced.
    pub production_cutoff_turn: u32,
    /// Cargo fraction of capacity that sends a collector home.
    #[serde(with = "ratio_serde")]
    pub deposit_threshold: Ratio,
    /// Fraction of cell capacity under which a cell is not worth holding.
    #[serde(with = "ratio_serde")]
    pub depleted_threshold: Ratio,
    /// Fraction of the current cell's resource paid to leave it.
    #[serde(with = "ratio_serde")]
    pub move_cost_ratio: Ratio,
    /// Weight applied to the current cell when ranking candidate moves.
    #[serde(with = "ratio_serde")]
    pub stay_bias: Ratio,
    /// Extra recall turns per unit.
    #[serde(with = "ratio_serde")]
    pub recall_congestion: Ratio,
    /// Seed for the default RNG.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cluster_top_n: 5,
            cluster_stride: 3,
            cluster_refresh_interval: 5,
            proximity_multiplier: 5,
            destination_policy: DestinationPolicy::Random,
            production_cutoff_turn: 220,
            deposit_threshold: Ratio::from_num(0.95),
            depleted_threshold: Ratio::from_num(0.1),
            move_cost_ratio: Ratio::from_num(0.1),
            stay_bias: Ratio::from_num(1.8),
            recall_congestion: Ratio::from_num(0.3),
            seed: 0,
        }
    }
}

impl EngineConfig {
    /// Load a config from a RON file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string and validate it.
    pub fn from_ron_str(ron: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(ron)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall the engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cluster_top_n == 0 {
            return Err(ConfigError::Invalid("cluster_top_n must be positive".into()));
        }
        if self.cluster_stride == 0 {
            return Err(ConfigError::Invalid("cluster_stride must be positive".into()));
        }
        if self.cluster_refresh_interval == 0 {
            return Err(ConfigError::Invalid(
                "cluster_refresh_interval must be positive".into(),
            ));
        }
        if self.stay_bias < Ratio::ZERO || self.move_cost_ratio < Ratio::ZERO {
            return Err(ConfigError::Invalid("ratios must not be negative".into()));
        }
        Ok(())
    }

    /// Builder-style seed override.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder-style policy override.
    pub fn with_policy(mut self, policy: DestinationPolicy) -> Self {
        self.destination_policy = policy;
        self
    }
}
