//! Match metrics.
//!
//! A [`MetricsCollector`] accumulates per-turn [`TurnReport`]s into one
//! [`GameMetrics`]; [`BatchSummary`] aggregates many matches.

use serde::{Deserialize, Serialize};

use crate::world::TurnReport;

/// Complete metrics for a single match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Unique match identifier.
    pub game_id: String,
    /// Scenario name.
    pub scenario: String,
    /// Seed used for layout and engine.
    pub seed: u64,
    /// Turns played.
    pub turns: u32,
    /// Units produced.
    pub spawned: u32,
    /// Units destroyed in collisions.
    pub lost: u32,
    /// Resource unloaded into the budget.
    pub deposited: u64,
    /// Resource taken from the board.
    pub harvested: u64,
    /// Resource burned on moves.
    pub move_cost: u64,
    /// Turn on which the engine entered recall, if it did.
    pub endgame_turn: Option<u32>,
    /// Units alive at the end.
    pub final_units: u32,
    /// Budget at the end.
    pub final_budget: u32,
    /// Final world state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl GameMetrics {
    /// Create a new metrics record.
    #[must_use]
    pub fn new(game_id: impl Into<String>, scenario: impl Into<String>, seed: u64) -> Self {
        Self {
            game_id: game_id.into(),
            scenario: scenario.into(),
            seed,
            ..Default::default()
        }
    }
}

/// Accumulates turn reports for one match.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    metrics: GameMetrics,
}

impl MetricsCollector {
    /// Start collecting for a match.
    #[must_use]
    pub fn new(game_id: impl Into<String>, scenario: impl Into<String>, seed: u64) -> Self {
        Self {
            metrics: GameMetrics::new(game_id, scenario, seed),
        }
    }

    /// Fold in one applied turn.
    pub fn record_turn(&mut self, report: &TurnReport) {
        let m = &mut self.metrics;
        m.turns += 1;
        m.lost += report.lost;
        m.deposited += report.deposited;
        m.harvested += report.harvested;
        m.move_cost += report.move_cost;
        if report.spawned {
            m.spawned += 1;
        }
    }

    /// Note the first turn the engine was in recall.
    pub fn record_endgame(&mut self, turn: u32) {
        self.metrics.endgame_turn.get_or_insert(turn);
    }

    /// Metrics so far.
    #[must_use]
    pub const fn current(&self) -> &GameMetrics {
        &self.metrics
    }

    /// Close the record with the final world figures.
    #[must_use]
    pub fn finish(mut self, final_units: u32, final_budget: u32, final_state_hash: u64) -> GameMetrics {
        self.metrics.final_units = final_units;
        self.metrics.final_budget = final_budget;
        self.metrics.final_state_hash = final_state_hash;
        self.metrics
    }
}

/// Aggregate over a batch of matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Matches played.
    pub total_games: u32,
    /// Mean resource deposited.
    pub avg_deposited: f64,
    /// Lowest resource deposited.
    pub min_deposited: u64,
    /// Highest resource deposited.
    pub max_deposited: u64,
    /// Mean final budget.
    pub avg_final_budget: f64,
    /// Mean units produced.
    pub avg_spawned: f64,
    /// Mean units lost.
    pub avg_lost: f64,
    /// Share of matches that entered recall.
    pub endgame_rate: f64,
    /// Mean turn of recall among matches that entered it.
    pub avg_endgame_turn: f64,
}

impl BatchSummary {
    /// Calculate summary from a list of match metrics.
    #[must_use]
    pub fn from_games(games: &[GameMetrics]) -> Self {
        if games.is_empty() {
            return Self::default();
        }
        let n = games.len() as f64;
        let mean = |f: fn(&GameMetrics) -> f64| games.iter().map(f).sum::<f64>() / n;

        let recalled: Vec<u32> = games.iter().filter_map(|g| g.endgame_turn).collect();
        let avg_endgame_turn = if recalled.is_empty() {
            0.0
        } else {
            recalled.iter().map(|&t| f64::from(t)).sum::<f64>() / recalled.len() as f64
        };

        Self {
            total_games: games.len() as u32,
            avg_deposited: mean(|g| g.deposited as f64),
            min_deposited: games.iter().map(|g| g.deposited).min().unwrap_or(0),
            max_deposited: games.iter().map(|g| g.deposited).max().unwrap_or(0),
            avg_final_budget: mean(|g| f64::from(g.final_budget)),
            avg_spawned: mean(|g| f64::from(g.spawned)),
            avg_lost: mean(|g| f64::from(g.lost)),
            endgame_rate: recalled.len() as f64 / n,
            avg_endgame_turn,
        }
    }
}
