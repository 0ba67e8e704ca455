//! Per-turn input snapshot and output orders.
//!
//! The host builds a [`TurnSnapshot`] every turn and receives [`TurnOrders`]
//! back. The engine never mutates a snapshot; occupancy changes made while
//! resolving moves happen on a private copy of the map.

use serde::{Deserialize, Serialize};

use crate::grid::{Direction, GameMap, Position, UnitId};

/// One of our units as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Stable identifier.
    pub id: UnitId,
    /// Current position.
    pub position: Position,
    /// Resource currently carried.
    pub carried: u32,
}

impl Unit {
    /// Create a unit record.
    #[must_use]
    pub const fn new(id: UnitId, position: Position, carried: u32) -> Self {
        Self {
            id,
            position,
            carried,
        }
    }
}

/// Our home shipyard plus any dropoffs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bases {
    /// Home base; units are produced here.
    pub shipyard: Position,
    /// Auxiliary drop points.
    pub dropoffs: Vec<Position>,
}

impl Bases {
    /// Bases with a shipyard and no dropoffs.
    #[must_use]
    pub fn new(shipyard: Position) -> Self {
        Self {
            shipyard,
            dropoffs: Vec::new(),
        }
    }

    /// Add a dropoff.
    #[must_use]
    pub fn with_dropoff(mut self, dropoff: Position) -> Self {
        self.dropoffs.push(dropoff);
        self
    }

    /// Shipyard first, then dropoffs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Position> + '_ {
        std::iter::once(self.shipyard).chain(self.dropoffs.iter().copied())
    }

    /// Returns true if `pos` is one of our bases.
    #[must_use]
    pub fn contains(&self, map: &GameMap, pos: Position) -> bool {
        let pos = map.normalize(pos);
        self.iter().any(|base| map.normalize(base) == pos)
    }

    /// The base closest to `from`. Ties go to the earlier base, so the
    /// shipyard wins against an equally distant dropoff.
    #[must_use]
    pub fn closest(&self, map: &GameMap, from: Position) -> Position {
        let mut best = map.normalize(self.shipyard);
        let mut best_distance = map.distance(from, best);
        for dropoff in &self.dropoffs {
            let distance = map.distance(from, *dropoff);
            if distance < best_distance {
                best = map.normalize(*dropoff);
                best_distance = distance;
            }
        }
        best
    }
}

/// Everything the engine sees about one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSnapshot {
    /// Current turn number, starting at 0 or 1 depending on the host.
    pub turn: u32,
    /// Board state, with occupancy for every unit on it (ours and theirs).
    pub map: GameMap,
    /// Our live units.
    pub units: Vec<Unit>,
    /// Our bases.
    pub bases: Bases,
    /// Resource available for production.
    pub budget: u32,
}

impl TurnSnapshot {
    /// Build a snapshot, marking each of our units on the map.
    ///
    /// Opponent units and structures should already be present in `map`.
    #[must_use]
    pub fn new(turn: u32, mut map: GameMap, units: Vec<Unit>, bases: Bases, budget: u32) -> Self {
        for unit in &units {
            map.mark_occupied(unit.position, unit.id);
        }
        for base in bases.iter() {
            map.set_structure(base);
        }
        Self {
            turn,
            map,
            units,
            bases,
            budget,
        }
    }
}

/// A move order for one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitCommand {
    /// Unit being ordered.
    pub unit: UnitId,
    /// Move to make; `Still` means stay.
    pub direction: Direction,
}

/// Everything the engine decided for one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnOrders {
    /// One command per live unit, in ascending unit id order.
    pub moves: Vec<UnitCommand>,
    /// Produce a new unit at the shipyard.
    pub spawn: bool,
}

impl TurnOrders {
    /// The command issued to `unit`, if any.
    #[must_use]
    pub fn direction_for(&self, unit: UnitId) -> Option<Direction> {
        self.moves
            .iter()
            .find(|c| c.unit == unit)
            .map(|c| c.direction)
    }
}
