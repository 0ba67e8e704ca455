//! Spawn decisions.
//!
//! Evaluated once per turn after every unit has claimed its cell, so the
//! shipyard check sees where units are about to be, not where they were.

use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, GameConstants};
use crate::grid::{GameMap, Position};

/// Why a spawn was refused. Mostly useful in logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnBlock {
    /// Past the production cutoff.
    TooLate,
    /// Budget below the unit cost.
    Unaffordable,
    /// A unit will be on the shipyard at the end of the turn.
    ShipyardOccupied,
    /// The fleet is being recalled. Units head onto the bases without
    /// claiming them, so the shipyard may be taken even if it reads free.
    Recalling,
}

/// Gate for producing a new unit at the shipyard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionPolicy {
    /// Last turn on which a spawn is allowed.
    pub cutoff_turn: u32,
    /// Budget needed for one unit.
    pub unit_cost: u32,
}

impl ProductionPolicy {
    /// Policy from the match constants and engine tunables.
    #[must_use]
    pub const fn new(constants: &GameConstants, config: &EngineConfig) -> Self {
        Self {
            cutoff_turn: config.production_cutoff_turn,
            unit_cost: constants.unit_cost,
        }
    }

    /// Check every spawn condition. `Ok(())` means spawn.
    ///
    /// `map` must be the turn-scoped occupancy layer.
    pub fn check(
        &self,
        turn: u32,
        budget: u32,
        map: &GameMap,
        shipyard: Position,
        recalling: bool,
    ) -> Result<(), SpawnBlock> {
        if recalling {
            return Err(SpawnBlock::Recalling);
        }
        if turn > self.cutoff_turn {
            return Err(SpawnBlock::TooLate);
        }
        if budget < self.unit_cost {
            return Err(SpawnBlock::Unaffordable);
        }
        if map.is_occupied(shipyard) {
            return Err(SpawnBlock::ShipyardOccupied);
        }
        Ok(())
    }

    /// Returns true if a unit should be produced this turn.
    #[must_use]
    pub fn should_spawn(
        &self,
        turn: u32,
        budget: u32,
        map: &GameMap,
        shipyard: Position,
        recalling: bool,
    ) -> bool {
        self.check(turn, budget, map, shipyard, recalling).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::UnitId;

    fn policy() -> ProductionPolicy {
        ProductionPolicy::new(&GameConstants::default(), &EngineConfig::default())
    }

    #[test]
    fn test_spawns_when_all_conditions_hold() {
        let map = GameMap::new(8, 8).unwrap();
        assert!(policy().should_spawn(10, 1000, &map, Position::new(4, 4), false));
        assert!(policy().should_spawn(220, 1000, &map, Position::new(4, 4), false));
    }

    #[test]
    fn test_refusals() {
        let mut map = GameMap::new(8, 8).unwrap();
        let yard = Position::new(4, 4);
        let p = policy();

        assert_eq!(p.check(221, 5000, &map, yard, false), Err(SpawnBlock::TooLate));
        assert_eq!(p.check(5, 999, &map, yard, false), Err(SpawnBlock::Unaffordable));
        assert_eq!(p.check(5, 5000, &map, yard, true), Err(SpawnBlock::Recalling));

        map.mark_occupied(yard, UnitId(1));
        assert_eq!(
            p.check(5, 5000, &map, yard, false),
            Err(SpawnBlock::ShipyardOccupied)
        );
    }

    #[test]
    fn test_cutoff_follows_config() {
        let config = EngineConfig {
            production_cutoff_turn: 50,
            ..EngineConfig::default()
        };
        let p = ProductionPolicy::new(&GameConstants::default(), &config);
        let map = GameMap::new(4, 4).unwrap();
        assert!(!p.should_spawn(51, 10_000, &map, Position::new(0, 0), false));
    }
}
