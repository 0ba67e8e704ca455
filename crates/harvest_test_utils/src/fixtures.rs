//! Test fixtures and helpers.
//!
//! Pre-built maps, units and snapshots for consistent testing.

use harvest_core::prelude::*;

/// Create a ratio from a float (for tests only).
///
/// Note: the engine never converts floats at run time.
/// This is only for convenient test setup.
#[must_use]
pub fn ratio(n: f64) -> Ratio {
    Ratio::from_num(n)
}

/// Build a `w x h` map with the given `(x, y, resource)` cells.
///
/// # Panics
///
/// Panics on a zero dimension.
#[must_use]
pub fn map_with(width: u32, height: u32, cells: &[(i32, i32, u32)]) -> GameMap {
    let mut map = GameMap::new(width, height).expect("fixture dimensions must be positive");
    for &(x, y, amount) in cells {
        map.set_resource(Position::new(x, y), amount);
    }
    map
}

/// A unit record.
#[must_use]
pub fn unit(id: u32, x: i32, y: i32, carried: u32) -> Unit {
    Unit::new(UnitId(id), Position::new(x, y), carried)
}

/// A snapshot with a single shipyard and no dropoffs.
#[must_use]
pub fn snapshot(turn: u32, map: &GameMap, units: Vec<Unit>, shipyard: Position, budget: u32) -> TurnSnapshot {
    TurnSnapshot::new(turn, map.clone(), units, Bases::new(shipyard), budget)
}

/// Constants for a square board of side `size`.
#[must_use]
pub fn constants(size: u32) -> GameConstants {
    GameConstants {
        width: size,
        height: size,
        ..GameConstants::default()
    }
}

/// 5x5 board with 1000 resource on (2, 2) and nothing else.
#[must_use]
pub fn single_rich_cell() -> GameMap {
    map_with(5, 5, &[(2, 2, 1000)])
}

/// A `size x size` board with a deterministic uneven resource pattern.
///
/// Values cycle through `0..=max` so rankings have clear winners.
#[must_use]
pub fn patterned_map(size: u32, max: u32) -> GameMap {
    let mut map = GameMap::new(size, size).expect("fixture dimensions must be positive");
    let step = (max / 7).max(1);
    for y in 0..size as i32 {
        for x in 0..size as i32 {
            let amount = ((x * 3 + y * 5) as u32 % 8) * step;
            map.set_resource(Position::new(x, y), amount.min(max));
        }
    }
    map
}

/// Engine config that refreshes clusters every turn.
#[must_use]
pub fn every_turn_config() -> EngineConfig {
    EngineConfig {
        cluster_refresh_interval: 1,
        ..EngineConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterned_map_is_within_bounds() {
        let map = patterned_map(16, 1000);
        assert!(map.iter().all(|(_, c)| c.resource <= 1000));
        assert!(map.total_resource() > 0);
    }

    #[test]
    fn test_snapshot_fixture_marks_units() {
        let map = single_rich_cell();
        let snap = snapshot(0, &map, vec![unit(1, 0, 0, 0)], Position::new(0, 0), 0);
        assert!(snap.map.is_occupied(Position::new(0, 0)));
        assert_eq!(snap.map.resource(Position::new(2, 2)), 1000);
    }
}
