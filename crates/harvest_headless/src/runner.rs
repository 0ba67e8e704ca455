//! Runs one match: world and engine in lockstep.

use harvest_core::prelude::{GameMode, Navigator};
use tracing::{debug, info};

use crate::metrics::{GameMetrics, MetricsCollector};
use crate::scenario::{Scenario, ScenarioError};
use crate::world::{TurnReport, World};

/// A match in progress.
#[derive(Debug)]
pub struct MatchRunner {
    world: World,
    navigator: Navigator,
    collector: MetricsCollector,
}

impl MatchRunner {
    /// Set up `scenario` with `seed` driving both the layout and the engine.
    pub fn new(scenario: &Scenario, seed: u64) -> Result<Self, ScenarioError> {
        scenario.validate()?;
        let map = scenario.build_map(seed)?;
        let world = World::new(
            scenario.constants,
            map,
            scenario.bases(),
            scenario.starting_budget,
        );
        let navigator = Navigator::new(scenario.constants, scenario.engine.clone().with_seed(seed));
        let collector =
            MetricsCollector::new(format!("{}_{seed}", scenario.name), scenario.name.clone(), seed);

        Ok(Self {
            world,
            navigator,
            collector,
        })
    }

    /// The simulated world.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// The engine driving the fleet.
    #[must_use]
    pub const fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Returns true once the last turn has been played.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.world.is_over()
    }

    /// Play one turn. Returns `None` once the match is over.
    pub fn step(&mut self) -> Option<TurnReport> {
        if self.is_finished() {
            return None;
        }
        let snapshot = self.world.snapshot();
        let orders = self.navigator.play_turn(&snapshot);
        if self.navigator.game_mode() == GameMode::Endgame {
            self.collector.record_endgame(snapshot.turn);
        }
        let report = self.world.apply(&orders);
        self.collector.record_turn(&report);
        Some(report)
    }

    /// Play to the end and return the metrics.
    pub fn run(mut self) -> GameMetrics {
        info!(
            game = %self.collector.current().game_id,
            turns = self.navigator.constants().max_turns,
            "Match started"
        );

        while let Some(report) = self.step() {
            if report.lost > 0 {
                debug!(turn = report.turn, lost = report.lost, "Units lost");
            }
        }

        let metrics = self.collector.finish(
            self.world.unit_count() as u32,
            self.world.budget(),
            self.world.state_hash(),
        );
        info!(
            game = %metrics.game_id,
            deposited = metrics.deposited,
            spawned = metrics.spawned,
            lost = metrics.lost,
            final_budget = metrics.final_budget,
            hash = metrics.final_state_hash,
            "Match finished"
        );
        metrics
    }
}

/// Run `scenario` with `seed` to the end.
pub fn run_match(scenario: &Scenario, seed: u64) -> Result<GameMetrics, ScenarioError> {
    Ok(MatchRunner::new(scenario, seed)?.run())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ResourcePattern;

    fn tiny() -> Scenario {
        let mut scenario = Scenario::small();
        scenario.constants.width = 10;
        scenario.constants.height = 10;
        scenario.constants.max_turns = 40;
        scenario.shipyard = (5, 5);
        scenario.resources = ResourcePattern::Uniform { amount: 400 };
        scenario
    }

    #[test]
    fn test_match_runs_to_the_last_turn() {
        let metrics = run_match(&tiny(), 3).unwrap();
        assert_eq!(metrics.turns, 40);
        assert!(metrics.spawned > 0);
        assert!(metrics.harvested > 0);
    }

    #[test]
    fn test_step_stops_after_last_turn() {
        let mut runner = MatchRunner::new(&tiny(), 1).unwrap();
        let mut played = 0;
        while runner.step().is_some() {
            played += 1;
        }
        assert_eq!(played, 40);
        assert!(runner.is_finished());
        assert!(runner.step().is_none());
    }

    #[test]
    fn test_same_seed_same_hash() {
        let a = run_match(&tiny(), 11).unwrap();
        let b = run_match(&tiny(), 11).unwrap();
        assert_eq!(a, b);
    }
}
