//! # Harvest Core
//!
//! Per-turn decision engine for a fleet of resource-harvesting units on a
//! toroidal grid.
//!
//! This crate contains **only** the decision logic:
//! - No rendering
//! - No IO beyond loading configuration files
//! - No unseeded randomness (the RNG is injected and seedable)
//! - No floating-point math in the turn pipeline (ratios are fixed-point)
//!
//! Given the same snapshots, constants, config and seed, the engine emits the
//! same orders every time.
//!
//! ## Crate Structure
//!
//! - [`grid`] - Wrapping grid, positions, directions, occupancy
//! - [`snapshot`] - Per-turn input snapshot and output orders
//! - [`cluster`] - Cluster sampling, ranking and destination selection
//! - [`unit_state`] - Per-unit modes and the transition table
//! - [`resolver`] - Safe-move selection and deadlock breaking
//! - [`production`] - Spawn gate
//! - [`navigation`] - The turn orchestrator
//! - [`config`] - Game constants and tunables
//! - [`math`] - Fixed-point ratio helpers

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod cluster;
pub mod config;
pub mod error;
pub mod grid;
pub mod math;
pub mod navigation;
pub mod production;
pub mod resolver;
pub mod snapshot;
pub mod unit_state;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cluster::{Cluster, ClusterIndex};
    pub use crate::config::{DestinationPolicy, EngineConfig, GameConstants};
    pub use crate::error::{EngineError, Result};
    pub use crate::grid::{Cell, Direction, GameMap, Position, UnitId};
    pub use crate::math::Ratio;
    pub use crate::navigation::{GameMode, Navigator, ResourceTotals};
    pub use crate::production::ProductionPolicy;
    pub use crate::snapshot::{Bases, TurnOrders, TurnSnapshot, Unit, UnitCommand};
    pub use crate::unit_state::{Mode, UnitState, UnitStateTable};
}
