//! A local match simulator.
//!
//! Plays the part of the game server for one player: it owns the board and
//! the fleet, turns them into [`TurnSnapshot`]s and applies the engine's
//! [`TurnOrders`]. Rules per turn, in order:
//!
//! 1. A moving unit pays a tenth of its cell's resource (rounded down);
//!    if it cannot pay it stays.
//! 2. A staying unit harvests a quarter of its cell (rounded up), capped
//!    by its free capacity.
//! 3. Units ending on the same cell are destroyed. Their cargo goes to the
//!    budget on a base and onto the cell elsewhere.
//! 4. A surviving unit on a base unloads its cargo into the budget.
//! 5. A spawn costs `unit_cost` and places a new unit on the shipyard; a
//!    unit already there is destroyed together with the new one.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use harvest_core::prelude::{
    Bases, Direction, GameConstants, GameMap, Position, TurnOrders, TurnSnapshot, Unit, UnitId,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What happened while applying one turn's orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReport {
    /// Turn the orders were applied to.
    pub turn: u32,
    /// Units that changed cell.
    pub moved: u32,
    /// Units that wanted to move but could not pay.
    pub stranded: u32,
    /// Resource taken from the board.
    pub harvested: u64,
    /// Resource burned as move cost.
    pub move_cost: u64,
    /// Units destroyed in collisions.
    pub lost: u32,
    /// Resource unloaded into the budget.
    pub deposited: u64,
    /// A unit was produced.
    pub spawned: bool,
}

/// One player's match state.
#[derive(Debug, Clone)]
pub struct World {
    constants: GameConstants,
    map: GameMap,
    bases: Bases,
    units: BTreeMap<UnitId, Unit>,
    budget: u32,
    turn: u32,
    next_id: u32,
}

impl World {
    /// Start a match on `map`. The first turn is turn 1.
    #[must_use]
    pub fn new(constants: GameConstants, mut map: GameMap, bases: Bases, budget: u32) -> Self {
        map.clear_occupancy();
        for base in bases.iter() {
            map.set_structure(base);
        }
        Self {
            constants,
            map,
            bases,
            units: BTreeMap::new(),
            budget,
            turn: 1,
            next_id: 1,
        }
    }

    /// Current turn.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// Production budget.
    #[must_use]
    pub const fn budget(&self) -> u32 {
        self.budget
    }

    /// The board.
    #[must_use]
    pub const fn map(&self) -> &GameMap {
        &self.map
    }

    /// Live units in id order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Number of live units.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Returns true once every turn has been played.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.turn > self.constants.max_turns
    }

    /// Place a unit directly, bypassing production. Returns its id.
    pub fn place_unit(&mut self, position: Position, carried: u32) -> UnitId {
        let id = UnitId(self.next_id);
        self.next_id += 1;
        let position = self.map.normalize(position);
        self.units.insert(id, Unit::new(id, position, carried));
        id
    }

    /// What the engine sees this turn.
    #[must_use]
    pub fn snapshot(&self) -> TurnSnapshot {
        TurnSnapshot::new(
            self.turn,
            self.map.clone(),
            self.units.values().copied().collect(),
            self.bases.clone(),
            self.budget,
        )
    }

    /// Apply `orders` and advance to the next turn.
    ///
    /// Units without an order stay. Orders for unknown units are ignored.
    pub fn apply(&mut self, orders: &TurnOrders) -> TurnReport {
        let mut report = TurnReport {
            turn: self.turn,
            ..TurnReport::default()
        };

        self.resolve_moves(orders, &mut report);
        self.resolve_collisions(&mut report);
        self.unload(&mut report);
        if orders.spawn {
            self.spawn(&mut report);
        }

        debug!(
            turn = self.turn,
            moved = report.moved,
            harvested = report.harvested,
            lost = report.lost,
            deposited = report.deposited,
            budget = self.budget,
            "Turn applied"
        );
        self.turn += 1;
        report
    }

    fn resolve_moves(&mut self, orders: &TurnOrders, report: &mut TurnReport) {
        let max_carried = self.constants.max_carried;
        for unit in self.units.values_mut() {
            let direction = orders.direction_for(unit.id).unwrap_or(Direction::Still);
            let cell = self.map.resource(unit.position);

            if direction.is_move() {
                let cost = cell / 10;
                if unit.carried >= cost {
                    unit.carried -= cost;
                    unit.position = self.map.normalize(unit.position.offset(direction));
                    report.moved += 1;
                    report.move_cost += u64::from(cost);
                    continue;
                }
                report.stranded += 1;
            }

            let gain = cell.div_ceil(4).min(max_carried.saturating_sub(unit.carried));
            self.map.set_resource(unit.position, cell - gain);
            unit.carried += gain;
            report.harvested += u64::from(gain);
        }
    }

    fn resolve_collisions(&mut self, report: &mut TurnReport) {
        let mut by_cell: BTreeMap<Position, Vec<UnitId>> = BTreeMap::new();
        for unit in self.units.values() {
            by_cell.entry(unit.position).or_default().push(unit.id);
        }

        for (position, ids) in by_cell {
            if ids.len() < 2 {
                continue;
            }
            let cargo: u32 = ids
                .iter()
                .filter_map(|id| self.units.remove(id))
                .map(|u| u.carried)
                .fold(0, u32::saturating_add);
            report.lost += ids.len() as u32;
            self.drop_cargo(position, cargo, report);
            debug!(turn = self.turn, %position, units = ids.len(), cargo, "Collision");
        }
    }

    fn drop_cargo(&mut self, position: Position, cargo: u32, report: &mut TurnReport) {
        if self.bases.contains(&self.map, position) {
            self.budget = self.budget.saturating_add(cargo);
            report.deposited += u64::from(cargo);
        } else {
            let cell = self.map.resource(position);
            self.map.set_resource(position, cell.saturating_add(cargo));
        }
    }

    fn unload(&mut self, report: &mut TurnReport) {
        for unit in self.units.values_mut() {
            if unit.carried > 0 && self.bases.contains(&self.map, unit.position) {
                self.budget = self.budget.saturating_add(unit.carried);
                report.deposited += u64::from(unit.carried);
                unit.carried = 0;
            }
        }
    }

    fn spawn(&mut self, report: &mut TurnReport) {
        if self.budget < self.constants.unit_cost {
            return;
        }
        self.budget -= self.constants.unit_cost;
        report.spawned = true;

        let shipyard = self.map.normalize(self.bases.shipyard);
        let blocker = self
            .units
            .values()
            .find(|u| u.position == shipyard)
            .map(|u| u.id);
        match blocker {
            Some(id) => {
                let cargo = self.units.remove(&id).map_or(0, |u| u.carried);
                report.lost += 2;
                self.drop_cargo(shipyard, cargo, report);
                debug!(turn = self.turn, unit = %id, "Spawned onto an occupied shipyard");
            }
            None => {
                self.place_unit(shipyard, 0);
            }
        }
    }

    /// Hash of everything that can differ between two runs.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.turn.hash(&mut hasher);
        self.budget.hash(&mut hasher);
        for unit in self.units.values() {
            unit.id.hash(&mut hasher);
            unit.position.hash(&mut hasher);
            unit.carried.hash(&mut hasher);
        }
        for (_, cell) in self.map.iter() {
            cell.resource.hash(&mut hasher);
        }
        hasher.finish()
    }
}
