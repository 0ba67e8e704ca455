//! The turn orchestrator.
//!
//! A [`Navigator`] owns everything that persists between turns: the unit
//! state table, the cluster index, the engine-wide [`GameMode`] and the RNG.
//! [`Navigator::play_turn`] turns one [`TurnSnapshot`] into [`TurnOrders`].
//!
//! # Determinism
//!
//! - Units are processed in ascending id order
//! - Cluster ranking is independent of sampling order
//! - All thresholds are fixed-point
//! - The only randomness is the injected RNG
//!
//! # Example
//!
//! ```
//! use harvest_core::prelude::*;
//!
//! let constants = GameConstants { width: 8, height: 8, ..GameConstants::default() };
//! let mut map = GameMap::new(8, 8).unwrap();
//! map.set_resource(Position::new(4, 4), 800);
//!
//! let snapshot = TurnSnapshot::new(
//!     1,
//!     map,
//!     vec![Unit::new(UnitId(1), Position::new(0, 0), 0)],
//!     Bases::new(Position::new(0, 0)),
//!     0,
//! );
//!
//! let mut navigator = Navigator::new(constants, EngineConfig::default());
//! let orders = navigator.play_turn(&snapshot);
//! assert_eq!(orders.moves.len(), 1);
//! assert!(orders.moves[0].direction.is_move());
//! ```

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cluster::ClusterIndex;
use crate::config::{EngineConfig, GameConstants};
use crate::error::{EngineError, Result};
use crate::grid::{GameMap, UnitId};
use crate::math::{amount, scaled};
use crate::production::ProductionPolicy;
use crate::resolver::{
    avoid_structures, break_deadlocks, can_afford_move, is_poor_cell, kamikaze_move,
    leave_structure, move_toward_destination, MoveEntry, Resolution, Weighting,
};
use crate::snapshot::{TurnOrders, TurnSnapshot, Unit, UnitCommand};
use crate::unit_state::{Mode, Observation, Thresholds, Transition, UnitState, UnitStateTable};

/// Engine-wide mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GameMode {
    /// Regular play.
    #[default]
    Normal,
    /// Recall: every unit heads for its closest base. Never reverts.
    Endgame,
}

/// Aggregate resource figures for the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceTotals {
    /// Resource left on the board.
    pub on_map: u64,
    /// Resource carried by our units.
    pub carried: u64,
    /// Live unit count.
    pub units: usize,
}

impl ResourceTotals {
    /// Measure a snapshot.
    #[must_use]
    pub fn measure(snapshot: &TurnSnapshot) -> Self {
        Self {
            on_map: snapshot.map.total_resource(),
            carried: snapshot.units.iter().map(|u| u64::from(u.carried)).sum(),
            units: snapshot.units.len(),
        }
    }
}

/// Decision engine state carried from turn to turn.
#[derive(Debug, Clone)]
pub struct Navigator<R: Rng = SmallRng> {
    constants: GameConstants,
    config: EngineConfig,
    production: ProductionPolicy,
    states: UnitStateTable,
    clusters: ClusterIndex,
    totals: ResourceTotals,
    mode: GameMode,
    rng: R,
}

impl Navigator<SmallRng> {
    /// Navigator with a [`SmallRng`] seeded from `config.seed`.
    #[must_use]
    pub fn new(constants: GameConstants, config: EngineConfig) -> Self {
        let rng = SmallRng::seed_from_u64(config.seed);
        Self::with_rng(constants, config, rng)
    }
}

impl<R: Rng> Navigator<R> {
    /// Navigator driven by a caller-supplied RNG.
    pub fn with_rng(constants: GameConstants, config: EngineConfig, rng: R) -> Self {
        let production = ProductionPolicy::new(&constants, &config);
        Self {
            constants,
            config,
            production,
            states: UnitStateTable::new(),
            clusters: ClusterIndex::new(),
            totals: ResourceTotals::default(),
            mode: GameMode::Normal,
            rng,
        }
    }

    /// Match constants.
    #[must_use]
    pub const fn constants(&self) -> &GameConstants {
        &self.constants
    }

    /// Engine tunables.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Per-unit states.
    #[must_use]
    pub const fn states(&self) -> &UnitStateTable {
        &self.states
    }

    /// Per-unit states, mutable. Lets a host seed or override modes.
    pub fn states_mut(&mut self) -> &mut UnitStateTable {
        &mut self.states
    }

    /// Current cluster ranking.
    #[must_use]
    pub const fn clusters(&self) -> &ClusterIndex {
        &self.clusters
    }

    /// Engine-wide mode.
    #[must_use]
    pub const fn game_mode(&self) -> GameMode {
        self.mode
    }

    /// Totals measured on the last turn.
    #[must_use]
    pub const fn totals(&self) -> ResourceTotals {
        self.totals
    }

    fn thresholds(&self) -> Thresholds {
        Thresholds {
            max_carried: self.constants.max_carried,
            max_cell_resource: self.constants.max_cell_resource,
            deposit: self.config.deposit_threshold,
            depleted: self.config.depleted_threshold,
        }
    }

    /// Decide every unit's move and whether to spawn.
    ///
    /// Never fails: a unit whose decision errors stays still and the error
    /// is logged.
    pub fn play_turn(&mut self, snapshot: &TurnSnapshot) -> TurnOrders {
        let turn = snapshot.turn;
        let mut map = snapshot.map.clone();
        self.totals = ResourceTotals::measure(snapshot);

        let mut units = snapshot.units.clone();
        units.sort_by_key(|u| u.id);
        let live: Vec<UnitId> = units.iter().map(|u| u.id).collect();
        let removed = self.states.retain_live(&live);
        if !removed.is_empty() {
            debug!(turn, removed = removed.len(), "Dropped states of lost units");
        }
        for unit in &units {
            self.states.ensure(unit.id).begin_turn();
        }

        if self
            .clusters
            .is_due(turn, self.config.cluster_refresh_interval)
        {
            self.clusters
                .refresh(&map, snapshot.bases.shipyard, &self.config, turn);
        }

        self.update_game_mode(snapshot, &units);

        let mut entries = Vec::with_capacity(units.len());
        for unit in &units {
            let resolution = match self.decide(&mut map, snapshot, unit) {
                Ok(resolution) => resolution,
                Err(err) => {
                    warn!(turn, unit = %unit.id, %err, "Unit decision failed, holding position");
                    map.mark_occupied(unit.position, unit.id);
                    Resolution::STILL
                }
            };
            entries.push(MoveEntry {
                unit: unit.id,
                position: unit.position,
                preferred: resolution.preferred,
                committed: resolution.committed,
            });
        }

        let swaps = break_deadlocks(&mut map, &mut entries);

        for entry in &entries {
            if let Some(state) = self.states.get_mut(entry.unit) {
                state.preferred_move = Some(entry.preferred);
                state.committed_move = Some(entry.committed);
            }
        }

        let spawn = self.production.should_spawn(
            turn,
            snapshot.budget,
            &map,
            snapshot.bases.shipyard,
            self.mode == GameMode::Endgame,
        );

        let orders = TurnOrders {
            moves: entries
                .iter()
                .map(|e| UnitCommand {
                    unit: e.unit,
                    direction: e.committed,
                })
                .collect(),
            spawn,
        };

        debug!(
            turn,
            units = units.len(),
            moving = orders.moves.iter().filter(|c| c.direction.is_move()).count(),
            swaps,
            spawn,
            mode = ?self.mode,
            on_map = self.totals.on_map,
            "Turn decided"
        );

        orders
    }

    /// Switch to endgame once there are too few turns left to bring the
    /// fleet home. One-way.
    fn update_game_mode(&mut self, snapshot: &TurnSnapshot, units: &[Unit]) {
        if self.mode == GameMode::Endgame {
            return;
        }
        let map = &snapshot.map;
        let farthest = snapshot
            .bases
            .iter()
            .flat_map(|base| units.iter().map(move |u| map.distance(u.position, base)))
            .max()
            .unwrap_or(0);
        let needed = amount(farthest) + scaled(units.len() as u32, self.config.recall_congestion);
        let remaining = self.constants.max_turns.saturating_sub(snapshot.turn);

        if amount(remaining) < needed {
            self.mode = GameMode::Endgame;
            info!(
                turn = snapshot.turn,
                remaining,
                farthest,
                units = units.len(),
                "Entering endgame recall"
            );
        }
    }

    /// Run the transition table for `unit`, then pick its move.
    fn decide(&mut self, map: &mut GameMap, snapshot: &TurnSnapshot, unit: &Unit) -> Result<Resolution> {
        let mut state = self
            .states
            .get(unit.id)
            .copied()
            .ok_or(EngineError::UnknownUnit(unit.id))?;

        let at_base = snapshot.bases.contains(map, unit.position);
        let observation = Observation {
            carried: unit.carried,
            at_base,
            destination_resource: state.destination.map(|d| map.resource(d)),
            endgame: self.mode == GameMode::Endgame,
        };
        let transition = state.evaluate(&observation, &self.thresholds());
        self.apply_transition(&mut state, transition, map, snapshot, unit);
        self.states.insert(unit.id, state);

        if transition != Transition::Unchanged {
            debug!(
                turn = snapshot.turn,
                unit = %unit.id,
                ?transition,
                mode = ?state.mode,
                destination = ?state.destination,
                "Unit transition"
            );
        }

        if !can_afford_move(map, unit, self.config.move_cost_ratio) {
            map.mark_occupied(unit.position, unit.id);
            return Ok(Resolution::STILL);
        }

        self.emit_move(map, unit, &state, at_base)
    }

    fn apply_transition(
        &mut self,
        state: &mut UnitState,
        transition: Transition,
        map: &GameMap,
        snapshot: &TurnSnapshot,
        unit: &Unit,
    ) {
        match transition {
            Transition::Unchanged => {}
            Transition::Recall => {
                state.mode = Mode::Endgame;
                state.destination = Some(snapshot.bases.closest(map, unit.position));
            }
            Transition::ReturnHome => {
                state.mode = Mode::Depositing;
                state.destination = Some(snapshot.bases.closest(map, unit.position));
            }
            Transition::SeekResource => {
                state.mode = Mode::Collecting;
                state.destination = self.clusters.select_destination(
                    map,
                    unit.position,
                    self.config.destination_policy,
                    &mut self.rng,
                );
            }
        }
    }

    fn emit_move(
        &mut self,
        map: &mut GameMap,
        unit: &Unit,
        state: &UnitState,
        at_base: bool,
    ) -> Result<Resolution> {
        let destination = state.destination;
        match state.mode {
            Mode::Endgame => {
                let target = destination.ok_or(EngineError::MissingDestination(unit.id))?;
                if map.distance(unit.position, target) == 1 {
                    let direction = kamikaze_move(map, unit.position, target, &mut self.rng);
                    Ok(Resolution {
                        preferred: direction,
                        committed: direction,
                    })
                } else {
                    Ok(move_toward_destination(map, unit, target, Weighting::Direct))
                }
            }
            Mode::Collecting => {
                if at_base {
                    return Ok(leave_structure(map, unit, destination));
                }
                if is_poor_cell(
                    map,
                    unit.position,
                    self.constants.max_cell_resource,
                    self.config.depleted_threshold,
                ) {
                    let target = destination.ok_or(EngineError::MissingDestination(unit.id))?;
                    let weighting = Weighting::Richness {
                        stay_bias: self.config.stay_bias,
                    };
                    let resolution = move_toward_destination(map, unit, target, weighting);
                    let committed =
                        avoid_structures(map, unit.id, unit.position, resolution.committed);
                    return Ok(Resolution {
                        preferred: resolution.preferred,
                        committed,
                    });
                }
                // Harvest.
                map.mark_occupied(unit.position, unit.id);
                Ok(Resolution::STILL)
            }
            Mode::Depositing => {
                let target = destination.ok_or(EngineError::MissingDestination(unit.id))?;
                Ok(move_toward_destination(map, unit, target, Weighting::Direct))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Direction, Position};
    use crate::snapshot::Bases;

    fn constants(size: u32, max_turns: u32) -> GameConstants {
        GameConstants {
            width: size,
            height: size,
            max_turns,
            ..GameConstants::default()
        }
    }

    fn snapshot(turn: u32, map: &GameMap, units: Vec<Unit>, budget: u32) -> TurnSnapshot {
        TurnSnapshot::new(turn, map.clone(), units, Bases::new(Position::new(0, 0)), budget)
    }

    #[test]
    fn test_endgame_is_entered_once_and_kept() {
        let map = GameMap::new(8, 8).unwrap();
        let mut nav = Navigator::new(constants(8, 10), EngineConfig::default());
        let far = Unit::new(UnitId(1), Position::new(4, 4), 0);

        nav.play_turn(&snapshot(1, &map, vec![far], 0));
        assert_eq!(nav.game_mode(), GameMode::Normal);

        nav.play_turn(&snapshot(2, &map, vec![far], 0));
        assert_eq!(nav.game_mode(), GameMode::Endgame);
        let state = nav.states().get(UnitId(1)).copied().unwrap();
        assert_eq!(state.mode, Mode::Endgame);
        assert_eq!(state.destination, Some(Position::new(0, 0)));

        let home = Unit::new(UnitId(1), Position::new(0, 0), 0);
        nav.play_turn(&snapshot(3, &map, vec![home], 0));
        assert_eq!(nav.game_mode(), GameMode::Endgame);
    }

    #[test]
    fn test_full_collector_heads_home_same_turn() {
        let mut map = GameMap::new(8, 8).unwrap();
        map.set_resource(Position::new(3, 3), 500);
        let mut nav = Navigator::new(constants(8, 400), EngineConfig::default());
        nav.states_mut().insert(
            UnitId(7),
            UnitState {
                destination: Some(Position::new(3, 3)),
                ..UnitState::new()
            },
        );

        let unit = Unit::new(UnitId(7), Position::new(3, 3), 960);
        let orders = nav.play_turn(&snapshot(5, &map, vec![unit], 0));

        let state = nav.states().get(UnitId(7)).copied().unwrap();
        assert_eq!(state.mode, Mode::Depositing);
        assert_eq!(state.destination, Some(Position::new(0, 0)));
        assert_eq!(orders.direction_for(UnitId(7)), Some(Direction::North));
    }

    #[test]
    fn test_states_follow_live_units() {
        let map = GameMap::new(6, 6).unwrap();
        let mut nav = Navigator::new(constants(6, 400), EngineConfig::default());
        let a = Unit::new(UnitId(1), Position::new(2, 2), 0);
        let b = Unit::new(UnitId(2), Position::new(3, 3), 0);

        nav.play_turn(&snapshot(1, &map, vec![b, a], 0));
        assert_eq!(nav.states().len(), 2);

        let orders = nav.play_turn(&snapshot(2, &map, vec![b], 0));
        assert_eq!(nav.states().len(), 1);
        assert!(nav.states().get(UnitId(1)).is_none());
        assert_eq!(orders.moves.len(), 1);
    }

    #[test]
    fn test_orders_are_sorted_by_unit_id() {
        let mut map = GameMap::new(8, 8).unwrap();
        map.set_resource(Position::new(4, 4), 900);
        let mut nav = Navigator::new(constants(8, 400), EngineConfig::default());
        let units = vec![
            Unit::new(UnitId(9), Position::new(5, 5), 0),
            Unit::new(UnitId(3), Position::new(2, 6), 0),
            Unit::new(UnitId(4), Position::new(6, 1), 0),
        ];
        let orders = nav.play_turn(&snapshot(1, &map, units, 0));
        let ids: Vec<UnitId> = orders.moves.iter().map(|c| c.unit).collect();
        assert_eq!(ids, vec![UnitId(3), UnitId(4), UnitId(9)]);
    }

    #[test]
    fn test_unit_without_destination_holds_position() {
        // Empty board: no cluster is published, so no destination exists.
        let map = GameMap::new(6, 6).unwrap();
        let mut nav = Navigator::new(constants(6, 400), EngineConfig::default());
        let unit = Unit::new(UnitId(1), Position::new(3, 3), 0);
        let orders = nav.play_turn(&snapshot(1, &map, vec![unit], 0));
        assert_eq!(orders.direction_for(UnitId(1)), Some(Direction::Still));
        assert!(nav.clusters().ranked().is_empty());
    }

    #[test]
    fn test_unaffordable_move_stays() {
        let mut map = GameMap::new(8, 8).unwrap();
        map.set_resource(Position::new(3, 3), 800);
        let mut nav = Navigator::new(constants(8, 400), EngineConfig::default());
        nav.states_mut().insert(
            UnitId(1),
            UnitState {
                mode: Mode::Depositing,
                destination: Some(Position::new(0, 0)),
                ..UnitState::new()
            },
        );
        let broke = Unit::new(UnitId(1), Position::new(3, 3), 10);
        let orders = nav.play_turn(&snapshot(1, &map, vec![broke], 0));
        assert_eq!(orders.direction_for(UnitId(1)), Some(Direction::Still));
    }

    #[test]
    fn test_spawn_needs_free_shipyard() {
        let mut map = GameMap::new(8, 8).unwrap();
        map.set_resource(Position::new(4, 4), 900);
        let mut nav = Navigator::new(constants(8, 400), EngineConfig::default());

        let orders = nav.play_turn(&snapshot(1, &map, Vec::new(), 1000));
        assert!(orders.spawn);

        let orders = nav.play_turn(&snapshot(2, &map, Vec::new(), 999));
        assert!(!orders.spawn);

        let parked = Unit::new(UnitId(1), Position::new(0, 0), 0);
        let orders = nav.play_turn(&snapshot(3, &map, vec![parked], 5000));
        assert!(!orders.spawn);
    }

    #[test]
    fn test_totals_are_measured() {
        let mut map = GameMap::new(4, 4).unwrap();
        map.set_resource(Position::new(1, 1), 300);
        map.set_resource(Position::new(2, 2), 200);
        let mut nav = Navigator::new(constants(4, 400), EngineConfig::default());
        let units = vec![
            Unit::new(UnitId(1), Position::new(1, 1), 40),
            Unit::new(UnitId(2), Position::new(3, 3), 60),
        ];
        nav.play_turn(&snapshot(1, &map, units, 0));
        let totals = nav.totals();
        assert_eq!(totals.on_map, 500);
        assert_eq!(totals.carried, 100);
        assert_eq!(totals.units, 2);
    }
}
