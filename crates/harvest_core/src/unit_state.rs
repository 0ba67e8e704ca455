//! Per-unit behavioral state and the transition table.
//!
//! Each live unit owns exactly one [`UnitState`] in the [`UnitStateTable`].
//! Once per turn the navigator builds an [`Observation`] of the unit and asks
//! [`UnitState::evaluate`] which [`Transition`] applies; the table below is
//! checked in priority order and the first matching row wins.
//!
//! | # | Mode        | Condition                                  | Transition      |
//! |---|-------------|--------------------------------------------|-----------------|
//! | 1 | any         | engine is in endgame                       | `Recall`        |
//! | 2 | Collecting  | cargo >= deposit threshold, has destination | `ReturnHome`    |
//! | 3 | Collecting  | no destination, or destination depleted     | `SeekResource`  |
//! | 4 | Depositing  | at a base with empty cargo                  | `SeekResource`  |
//! | 5 | Depositing  | away from base with no destination          | `ReturnHome`    |
//! | - | otherwise   |                                            | `Unchanged`     |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grid::{Direction, Position, UnitId};
use crate::math::{below_fraction, reaches_fraction, Ratio};

/// Behavioral mode of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Heading to or harvesting a resource cell.
    #[default]
    Collecting,
    /// Carrying cargo back to a base.
    Depositing,
    /// Recalled for the end of the match.
    Endgame,
}

/// What the state machine decided for this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Keep mode and destination.
    Unchanged,
    /// Enter [`Mode::Depositing`] towards the closest base.
    ReturnHome,
    /// Enter [`Mode::Collecting`] towards a freshly selected cluster.
    SeekResource,
    /// Enter [`Mode::Endgame`] towards the closest base.
    Recall,
}

/// Facts about a unit that drive its transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Cargo currently carried.
    pub carried: u32,
    /// Unit stands on one of our bases.
    pub at_base: bool,
    /// Resource on the unit's destination cell, if it has one.
    pub destination_resource: Option<u32>,
    /// The engine has entered endgame recall.
    pub endgame: bool,
}

/// Thresholds for the transition table, taken from config and constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Unit cargo capacity.
    pub max_carried: u32,
    /// Per-cell resource capacity.
    pub max_cell_resource: u32,
    /// Cargo fraction that triggers a return.
    pub deposit: Ratio,
    /// Cell fraction under which a destination is considered spent.
    pub depleted: Ratio,
}

/// Mutable per-unit record owned by the navigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnitState {
    /// Current mode.
    pub mode: Mode,
    /// Where the unit is headed.
    pub destination: Option<Position>,
    /// Move the resolver wanted this turn before collisions were considered.
    pub preferred_move: Option<Direction>,
    /// Move actually committed this turn.
    pub committed_move: Option<Direction>,
    /// Move committed on the previous turn.
    pub previous_move: Option<Direction>,
}

impl UnitState {
    /// Fresh state: collecting, no destination.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mode: Mode::Collecting,
            destination: None,
            preferred_move: None,
            committed_move: None,
            previous_move: None,
        }
    }

    /// Run the transition table.
    #[must_use]
    pub fn evaluate(&self, obs: &Observation, limits: &Thresholds) -> Transition {
        if obs.endgame {
            return Transition::Recall;
        }

        match self.mode {
            Mode::Collecting => {
                let full = reaches_fraction(obs.carried, limits.max_carried, limits.deposit);
                if full && self.destination.is_some() {
                    return Transition::ReturnHome;
                }
                let spent = obs.destination_resource.map_or(true, |amount| {
                    below_fraction(amount, limits.max_cell_resource, limits.depleted)
                });
                if spent {
                    Transition::SeekResource
                } else {
                    Transition::Unchanged
                }
            }
            Mode::Depositing => {
                if obs.at_base && obs.carried == 0 {
                    Transition::SeekResource
                } else if !obs.at_base && self.destination.is_none() {
                    Transition::ReturnHome
                } else {
                    Transition::Unchanged
                }
            }
            // Endgame only re-enters through rule 1; without it the unit
            // keeps heading home.
            Mode::Endgame => Transition::Unchanged,
        }
    }

    /// Roll this turn's committed move into `previous_move` and clear the
    /// per-turn fields.
    pub fn begin_turn(&mut self) {
        if let Some(committed) = self.committed_move.take() {
            self.previous_move = Some(committed);
        }
        self.preferred_move = None;
    }
}

/// Arena of unit states keyed by id, iterated in ascending id order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitStateTable {
    states: BTreeMap<UnitId, UnitState>,
}

impl UnitStateTable {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns true if no unit is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// State of `id`, if tracked.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&UnitState> {
        self.states.get(&id)
    }

    /// Mutable state of `id`, if tracked.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut UnitState> {
        self.states.get_mut(&id)
    }

    /// State of `id`, created as [`UnitState::new`] on first sighting.
    pub fn ensure(&mut self, id: UnitId) -> &mut UnitState {
        self.states.entry(id).or_insert_with(UnitState::new)
    }

    /// Replace the state of `id`.
    pub fn insert(&mut self, id: UnitId, state: UnitState) {
        self.states.insert(id, state);
    }

    /// Drop states whose unit is not in `live`. Returns the dropped ids.
    pub fn retain_live(&mut self, live: &[UnitId]) -> Vec<UnitId> {
        let mut removed = Vec::new();
        self.states.retain(|id, _| {
            let keep = live.contains(id);
            if !keep {
                removed.push(*id);
            }
            keep
        });
        removed
    }

    /// Iterate in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &UnitState)> {
        self.states.iter().map(|(id, state)| (*id, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Thresholds {
        Thresholds {
            max_carried: 1000,
            max_cell_resource: 1000,
            deposit: Ratio::from_num(0.95),
            depleted: Ratio::from_num(0.1),
        }
    }

    fn obs(carried: u32, at_base: bool, destination_resource: Option<u32>) -> Observation {
        Observation {
            carried,
            at_base,
            destination_resource,
            endgame: false,
        }
    }

    fn collecting_towards(pos: Position) -> UnitState {
        UnitState {
            destination: Some(pos),
            ..UnitState::new()
        }
    }

    #[test]
    fn test_endgame_overrides_everything() {
        let state = collecting_towards(Position::new(3, 3));
        let mut o = obs(990, false, Some(500));
        o.endgame = true;
        assert_eq!(state.evaluate(&o, &limits()), Transition::Recall);
    }

    #[test]
    fn test_full_collector_returns_home() {
        let state = collecting_towards(Position::new(3, 3));
        assert_eq!(
            state.evaluate(&obs(950, false, Some(500)), &limits()),
            Transition::ReturnHome
        );
    }

    #[test]
    fn test_full_collector_without_destination_seeks_first() {
        let state = UnitState::new();
        assert_eq!(
            state.evaluate(&obs(990, false, None), &limits()),
            Transition::SeekResource
        );
    }

    #[test]
    fn test_depleted_destination_triggers_reselect() {
        let state = collecting_towards(Position::new(3, 3));
        assert_eq!(
            state.evaluate(&obs(10, false, Some(50)), &limits()),
            Transition::SeekResource
        );
        assert_eq!(
            state.evaluate(&obs(10, false, Some(400)), &limits()),
            Transition::Unchanged
        );
    }

    #[test]
    fn test_depositing_transitions() {
        let mut state = UnitState {
            mode: Mode::Depositing,
            ..UnitState::new()
        };
        assert_eq!(
            state.evaluate(&obs(0, true, None), &limits()),
            Transition::SeekResource
        );
        assert_eq!(
            state.evaluate(&obs(500, false, None), &limits()),
            Transition::ReturnHome
        );

        state.destination = Some(Position::new(0, 0));
        assert_eq!(
            state.evaluate(&obs(500, false, None), &limits()),
            Transition::Unchanged
        );
        // Still unloading on the base.
        assert_eq!(
            state.evaluate(&obs(500, true, None), &limits()),
            Transition::Unchanged
        );
    }

    #[test]
    fn test_begin_turn_rolls_moves() {
        let mut state = UnitState::new();
        state.preferred_move = Some(Direction::East);
        state.committed_move = Some(Direction::Still);
        state.begin_turn();
        assert_eq!(state.previous_move, Some(Direction::Still));
        assert_eq!(state.preferred_move, None);
        assert_eq!(state.committed_move, None);
    }

    #[test]
    fn test_table_prunes_dead_units() {
        let mut table = UnitStateTable::new();
        table.ensure(UnitId(3));
        table.ensure(UnitId(1));
        table.ensure(UnitId(2)).mode = Mode::Depositing;

        let removed = table.retain_live(&[UnitId(1), UnitId(2)]);
        assert_eq!(removed, vec![UnitId(3)]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(UnitId(2)).map(|s| s.mode), Some(Mode::Depositing));

        let ids: Vec<UnitId> = table.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![UnitId(1), UnitId(2)]);
    }
}
