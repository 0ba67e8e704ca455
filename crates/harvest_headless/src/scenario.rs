//! Scenario loading and configuration.
//!
//! A scenario describes one match: board size and rules, where the bases
//! are, how resource is laid out and which engine tunables to use.

use std::path::Path;

use harvest_core::config::ConfigError;
use harvest_core::prelude::{Bases, EngineConfig, EngineError, GameConstants, GameMap, Position};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// No built-in scenario with that name.
    #[error("Unknown scenario preset: {0}")]
    UnknownPreset(String),
    /// Scenario values are unusable.
    #[error("Invalid scenario: {0}")]
    Invalid(String),
    /// The board could not be built.
    #[error("Failed to build board: {0}")]
    Board(#[from] EngineError),
    /// An engine config override could not be loaded.
    #[error("Failed to load engine config: {0}")]
    Config(#[from] ConfigError),
}

/// How resource is spread over the board at the start of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourcePattern {
    /// Every cell holds `amount`.
    Uniform {
        /// Resource per cell.
        amount: u32,
    },
    /// Each cell has a `density_percent` chance of holding `1..=max`.
    Scattered {
        /// Chance in percent that a cell holds anything.
        density_percent: u32,
        /// Upper bound per cell.
        max: u32,
    },
    /// `count` peaks of `peak` resource, fading linearly to zero at
    /// Manhattan distance `radius + 1`.
    Hotspots {
        /// Number of peaks.
        count: u32,
        /// Reach of each peak.
        radius: u32,
        /// Resource on a peak cell.
        peak: u32,
    },
}

impl Default for ResourcePattern {
    fn default() -> Self {
        Self::Hotspots {
            count: 6,
            radius: 4,
            peak: 900,
        }
    }
}

/// A complete match description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Board size and rules.
    pub constants: GameConstants,
    /// Seed for the resource layout and the engine RNG.
    #[serde(default)]
    pub seed: u64,
    /// Budget at turn 1.
    pub starting_budget: u32,
    /// Home base position.
    pub shipyard: (i32, i32),
    /// Extra drop points.
    #[serde(default)]
    pub dropoffs: Vec<(i32, i32)>,
    /// Resource layout.
    #[serde(default)]
    pub resources: ResourcePattern,
    /// Engine tunables for this match.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::standard()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Built-in scenario by name.
    pub fn preset(name: &str) -> Result<Self, ScenarioError> {
        match name {
            "small" => Ok(Self::small()),
            "standard" => Ok(Self::standard()),
            other => Err(ScenarioError::UnknownPreset(other.to_string())),
        }
    }

    /// A file if one is given, the named preset otherwise.
    pub fn resolve(path: Option<&Path>, preset: &str) -> Result<Self, ScenarioError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::preset(preset),
        }
    }

    /// A quick 16x16 match over 120 turns.
    #[must_use]
    pub fn small() -> Self {
        Self {
            name: "small".to_string(),
            description: "16x16 board, scattered resource, short match".to_string(),
            constants: GameConstants {
                width: 16,
                height: 16,
                max_turns: 120,
                ..GameConstants::default()
            },
            seed: 0,
            starting_budget: 4000,
            shipyard: (8, 8),
            dropoffs: Vec::new(),
            resources: ResourcePattern::Scattered {
                density_percent: 60,
                max: 800,
            },
            engine: EngineConfig {
                production_cutoff_turn: 60,
                ..EngineConfig::default()
            },
        }
    }

    /// A 32x32 match over 400 turns with one dropoff.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            name: "standard".to_string(),
            description: "32x32 board, resource hotspots, one dropoff".to_string(),
            constants: GameConstants::default(),
            seed: 0,
            starting_budget: 5000,
            shipyard: (16, 16),
            dropoffs: vec![(4, 4)],
            resources: ResourcePattern::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Builder-style seed override.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject scenarios the harness cannot run.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let GameConstants { width, height, .. } = self.constants;
        if width == 0 || height == 0 {
            return Err(ScenarioError::Invalid(format!(
                "board must not be empty, got {width}x{height}"
            )));
        }
        let inside = |(x, y): (i32, i32)| x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height;
        if !inside(self.shipyard) {
            return Err(ScenarioError::Invalid(format!(
                "shipyard {:?} is off the board",
                self.shipyard
            )));
        }
        if let Some(dropoff) = self.dropoffs.iter().find(|&&d| !inside(d)) {
            return Err(ScenarioError::Invalid(format!(
                "dropoff {dropoff:?} is off the board"
            )));
        }
        self.engine
            .validate()
            .map_err(|err| ScenarioError::Invalid(err.to_string()))
    }

    /// Our bases as engine positions.
    #[must_use]
    pub fn bases(&self) -> Bases {
        let (x, y) = self.shipyard;
        self.dropoffs
            .iter()
            .fold(Bases::new(Position::new(x, y)), |bases, &(dx, dy)| {
                bases.with_dropoff(Position::new(dx, dy))
            })
    }

    /// Lay out the starting board for `seed`.
    ///
    /// Base cells start empty.
    pub fn build_map(&self, seed: u64) -> Result<GameMap, ScenarioError> {
        let GameConstants {
            width,
            height,
            max_cell_resource,
            ..
        } = self.constants;
        let mut map = GameMap::new(width, height)?;
        let mut rng = SmallRng::seed_from_u64(seed);

        match self.resources {
            ResourcePattern::Uniform { amount } => {
                let amount = amount.min(max_cell_resource);
                for y in 0..height as i32 {
                    for x in 0..width as i32 {
                        map.set_resource(Position::new(x, y), amount);
                    }
                }
            }
            ResourcePattern::Scattered {
                density_percent,
                max,
            } => {
                let max = max.min(max_cell_resource).max(1);
                for y in 0..height as i32 {
                    for x in 0..width as i32 {
                        if rng.gen_range(0..100) < density_percent {
                            map.set_resource(Position::new(x, y), rng.gen_range(1..=max));
                        }
                    }
                }
            }
            ResourcePattern::Hotspots {
                count,
                radius,
                peak,
            } => {
                let peaks: Vec<Position> = (0..count)
                    .map(|_| {
                        Position::new(
                            rng.gen_range(0..width) as i32,
                            rng.gen_range(0..height) as i32,
                        )
                    })
                    .collect();
                let reach = u64::from(radius) + 1;
                for y in 0..height as i32 {
                    for x in 0..width as i32 {
                        let pos = Position::new(x, y);
                        let amount: u64 = peaks
                            .iter()
                            .map(|&p| u64::from(map.distance(pos, p)))
                            .filter(|&d| d < reach)
                            .map(|d| u64::from(peak) * (reach - d) / reach)
                            .sum();
                        let amount = amount.min(u64::from(max_cell_resource)) as u32;
                        map.set_resource(pos, amount);
                    }
                }
            }
        }

        for base in self.bases().iter() {
            map.set_resource(base, 0);
        }
        Ok(map)
    }
}
