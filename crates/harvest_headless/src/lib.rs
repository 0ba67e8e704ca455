//! Headless match harness for the harvest decision engine.
//!
//! The engine only decides; something has to play the turns. This crate
//! provides a local toroidal world that applies the engine's orders, so
//! matches can be run without an external game host:
//!
//! - **Single matches**: play one scenario to its last turn
//! - **Batches**: many seeds in parallel, aggregated into a summary
//! - **Determinism checks**: the same seed must give the same final state
//!
//! # Example
//!
//! ```bash
//! # Run the small preset once
//! cargo run -p harvest_headless -- run --preset small --seed 7
//!
//! # Run 200 seeds of a scenario file
//! cargo run -p harvest_headless -- batch --scenario scenarios/standard.ron --count 200
//!
//! # Verify determinism
//! cargo run -p harvest_headless -- verify --seed 12345 --runs 5
//! ```

pub mod batch;
pub mod metrics;
pub mod runner;
pub mod scenario;
pub mod world;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchError, BatchResults};
pub use metrics::{BatchSummary, GameMetrics, MetricsCollector};
pub use runner::{run_match, MatchRunner};
pub use scenario::{ResourcePattern, Scenario, ScenarioError};
pub use world::{TurnReport, World};
