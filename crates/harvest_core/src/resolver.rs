//! Move resolution against the turn-scoped occupancy layer.
//!
//! Every unit commits to exactly one move per turn. Claims are greedy: the
//! first unit to ask for a free cell gets it, so callers must visit units in
//! a stable order (the navigator uses ascending unit id). A unit standing on
//! a cell already holds it, which means two units that each want the
//! other's cell both end up staying; [`break_deadlocks`] repairs that case
//! after all units have been resolved.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::grid::{Direction, GameMap, Position, UnitId};
use crate::math::{amount, below_fraction, scaled, Ratio};
use crate::snapshot::Unit;

/// How candidate moves are ordered before safety is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weighting {
    /// Richest resulting cell first; staying is a candidate whose score is
    /// the current cell's resource times `stay_bias`.
    Richness {
        /// Multiplier applied to the current cell.
        stay_bias: Ratio,
    },
    /// Keep the target-direction order; staying is not a candidate.
    Direct,
}

/// Outcome of resolving one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Best-ranked move before occupancy was considered.
    pub preferred: Direction,
    /// Move actually claimed.
    pub committed: Direction,
}

impl Resolution {
    /// A unit that wants and gets nothing.
    pub const STILL: Self = Self {
        preferred: Direction::Still,
        committed: Direction::Still,
    };
}

/// Order `directions` from `from` according to `weighting`.
///
/// Sorting is stable: on equal scores moves keep their input order and
/// come before staying.
#[must_use]
pub fn rank_moves(
    map: &GameMap,
    from: Position,
    directions: &[Direction],
    weighting: Weighting,
) -> Vec<Direction> {
    match weighting {
        Weighting::Direct => directions.to_vec(),
        Weighting::Richness { stay_bias } => {
            let mut scored: Vec<(Direction, Ratio)> = directions
                .iter()
                .map(|&d| (d, amount(map.resource(from.offset(d)))))
                .collect();
            scored.push((Direction::Still, scaled(map.resource(from), stay_bias)));
            scored.sort_by(|a, b| b.1.cmp(&a.1));
            scored.into_iter().map(|(d, _)| d).collect()
        }
    }
}

/// Claim the first free cell among `ranked` moves from `from`.
///
/// The claimed cell is marked for the rest of the turn. If every candidate
/// is taken the unit stays and its own cell is (re)claimed.
pub fn choose_safe_move(
    map: &mut GameMap,
    unit: UnitId,
    from: Position,
    ranked: &[Direction],
) -> Direction {
    for &direction in ranked {
        let target = map.normalize(from.offset(direction));
        if map.is_free_for(target, unit) {
            map.mark_occupied(target, unit);
            return direction;
        }
    }
    map.mark_occupied(from, unit);
    Direction::Still
}

/// Move `unit` one step towards `destination`.
pub fn move_toward_destination(
    map: &mut GameMap,
    unit: &Unit,
    destination: Position,
    weighting: Weighting,
) -> Resolution {
    let candidates = map.target_directions(unit.position, destination);
    let ranked = rank_moves(map, unit.position, &candidates, weighting);
    let preferred = ranked.first().copied().unwrap_or(Direction::Still);
    let committed = choose_safe_move(map, unit.id, unit.position, &ranked);
    Resolution {
        preferred,
        committed,
    }
}

/// Step off a structure. Never stays unless all four sides are taken.
///
/// Moves towards `destination` are tried first, each group ordered by
/// resource on the resulting cell.
pub fn leave_structure(map: &mut GameMap, unit: &Unit, destination: Option<Position>) -> Resolution {
    let toward = destination
        .map(|d| map.target_directions(unit.position, d))
        .unwrap_or_default();
    let away: Vec<Direction> = Direction::CARDINALS
        .into_iter()
        .filter(|d| !toward.contains(d))
        .collect();

    let by_resource = |dirs: &[Direction]| {
        let mut dirs = dirs.to_vec();
        dirs.sort_by_key(|&d| std::cmp::Reverse(map.resource(unit.position.offset(d))));
        dirs
    };
    let mut ranked = by_resource(&toward);
    ranked.extend(by_resource(&away));

    let preferred = ranked.first().copied().unwrap_or(Direction::Still);
    let committed = choose_safe_move(map, unit.id, unit.position, &ranked);
    Resolution {
        preferred,
        committed,
    }
}

/// Keep a claimed move from landing on a structure.
///
/// If `direction` leads onto a base or dropoff, that claim is released and
/// the two perpendicular moves are tried instead; failing both, the unit
/// stays.
pub fn avoid_structures(
    map: &mut GameMap,
    unit: UnitId,
    from: Position,
    direction: Direction,
) -> Direction {
    if !direction.is_move() {
        return direction;
    }
    let target = map.normalize(from.offset(direction));
    if !map.has_structure(target) {
        return direction;
    }
    map.vacate(target);
    choose_safe_move(map, unit, from, direction.perpendicular())
}

/// A direct step towards `destination` that ignores occupancy and claims
/// nothing. Used for the final approach during recall.
pub fn kamikaze_move<R: Rng + ?Sized>(
    map: &GameMap,
    from: Position,
    destination: Position,
    rng: &mut R,
) -> Direction {
    map.target_directions(from, destination)
        .choose(rng)
        .copied()
        .unwrap_or(Direction::Still)
}

/// Returns true if `unit` carries enough to pay for leaving its cell.
#[must_use]
pub fn can_afford_move(map: &GameMap, unit: &Unit, move_cost_ratio: Ratio) -> bool {
    amount(unit.carried) >= scaled(map.resource(unit.position), move_cost_ratio)
}

/// Returns true if the cell at `pos` holds less than `ratio` of capacity.
#[must_use]
pub fn is_poor_cell(map: &GameMap, pos: Position, max_cell_resource: u32, ratio: Ratio) -> bool {
    below_fraction(map.resource(pos), max_cell_resource, ratio)
}

/// One unit's resolved move, as seen by the deadlock pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveEntry {
    /// Unit id.
    pub unit: UnitId,
    /// Position at the start of the turn.
    pub position: Position,
    /// Move the unit wanted.
    pub preferred: Direction,
    /// Move the unit got.
    pub committed: Direction,
}

impl MoveEntry {
    fn stalled(&self) -> bool {
        !self.committed.is_move() && self.preferred.is_move()
    }
}

/// Swap pairs of stalled units that block each other.
///
/// For a unit A that stayed although it wanted to move, look for a unit B
/// standing on A's wanted cell, also stalled, whose wanted cell is A's
/// position. Both are rewritten to step onto each other's cell. A unit takes
/// part in at most one swap. Longer cycles are left alone.
///
/// Returns the number of swaps performed.
pub fn break_deadlocks(map: &mut GameMap, entries: &mut [MoveEntry]) -> usize {
    let mut resolved = vec![false; entries.len()];
    let mut swaps = 0;

    for i in 0..entries.len() {
        if resolved[i] || !entries[i].stalled() {
            continue;
        }
        let a = entries[i];
        let a_pos = map.normalize(a.position);
        let a_wants = map.normalize(a.position.offset(a.preferred));

        let partner = (0..entries.len()).find(|&j| {
            let b = &entries[j];
            j != i
                && !resolved[j]
                && b.stalled()
                && map.normalize(b.position) == a_wants
                && map.normalize(b.position.offset(b.preferred)) == a_pos
        });
        let Some(j) = partner else {
            continue;
        };
        let b = entries[j];
        resolved[i] = true;
        resolved[j] = true;

        // b stands on a's wanted cell and vice versa, so each preferred move
        // is the step onto the partner's cell.
        entries[i].committed = a.preferred;
        entries[j].committed = b.preferred;
        map.mark_occupied(b.position, a.unit);
        map.mark_occupied(a.position, b.unit);
        swaps += 1;
        debug!(first = %a.unit, second = %b.unit, "Swapped deadlocked units");
    }

    swaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn map(w: u32, h: u32) -> GameMap {
        GameMap::new(w, h).unwrap()
    }

    fn unit(id: u32, x: i32, y: i32, carried: u32) -> Unit {
        Unit::new(UnitId(id), Position::new(x, y), carried)
    }

    #[test]
    fn test_rank_moves_richness_prefers_rich_cells() {
        let mut m = map(5, 5);
        m.set_resource(Position::new(2, 1), 50);
        m.set_resource(Position::new(3, 2), 300);
        m.set_resource(Position::new(2, 2), 100);

        let ranked = rank_moves(
            &m,
            Position::new(2, 2),
            &[Direction::North, Direction::East],
            Weighting::Richness {
                stay_bias: Ratio::from_num(1.8),
            },
        );
        assert_eq!(
            ranked,
            vec![Direction::East, Direction::Still, Direction::North]
        );
    }

    #[test]
    fn test_rank_moves_prefers_moving_on_ties() {
        let m = map(5, 5);
        let ranked = rank_moves(
            &m,
            Position::new(0, 0),
            &[Direction::South, Direction::East],
            Weighting::Richness {
                stay_bias: Ratio::from_num(1.8),
            },
        );
        assert_eq!(
            ranked,
            vec![Direction::South, Direction::East, Direction::Still]
        );
    }

    #[test]
    fn test_choose_safe_move_skips_occupied() {
        let mut m = map(5, 5);
        let from = Position::new(2, 2);
        m.mark_occupied(from, UnitId(1));
        m.mark_occupied(Position::new(2, 1), UnitId(9));

        let got = choose_safe_move(&mut m, UnitId(1), from, &[Direction::North, Direction::East]);
        assert_eq!(got, Direction::East);
        assert_eq!(m.cell(Position::new(3, 2)).occupant, Some(UnitId(1)));
    }

    #[test]
    fn test_choose_safe_move_stays_when_boxed_in() {
        let mut m = map(5, 5);
        let from = Position::new(0, 0);
        for d in Direction::CARDINALS {
            m.mark_occupied(from.offset(d), UnitId(9));
        }
        let got = choose_safe_move(&mut m, UnitId(1), from, &Direction::CARDINALS);
        assert_eq!(got, Direction::Still);
        assert_eq!(m.cell(from).occupant, Some(UnitId(1)));
    }

    #[test]
    fn test_move_toward_destination_reports_preference() {
        let mut m = map(6, 6);
        let u = unit(1, 1, 0, 0);
        m.mark_occupied(u.position, u.id);
        m.mark_occupied(Position::new(2, 0), UnitId(2));

        let res = move_toward_destination(&mut m, &u, Position::new(3, 0), Weighting::Direct);
        assert_eq!(res.preferred, Direction::East);
        assert_eq!(res.committed, Direction::Still);
    }

    #[test]
    fn test_move_toward_own_cell_is_still() {
        let mut m = map(6, 6);
        let u = unit(1, 4, 4, 0);
        let res = move_toward_destination(&mut m, &u, Position::new(4, 4), Weighting::Direct);
        assert_eq!(res, Resolution::STILL);
    }

    #[test]
    fn test_leave_structure_heads_towards_destination() {
        let mut m = map(8, 8);
        let u = unit(1, 0, 0, 0);
        m.set_structure(u.position);
        m.mark_occupied(u.position, u.id);

        let res = leave_structure(&mut m, &u, Some(Position::new(3, 0)));
        assert_eq!(res.committed, Direction::East);

        m.mark_occupied(Position::new(2, 0), UnitId(5));
        let u2 = unit(2, 2, 1, 0);
        m.mark_occupied(Position::new(3, 1), UnitId(6));
        m.mark_occupied(Position::new(2, 2), UnitId(7));
        m.mark_occupied(Position::new(1, 1), UnitId(8));
        let boxed = leave_structure(&mut m, &u2, None);
        assert_eq!(boxed.committed, Direction::Still);
    }

    #[test]
    fn test_avoid_structures_turns_perpendicular() {
        let mut m = map(6, 6);
        let from = Position::new(1, 1);
        let base = Position::new(2, 1);
        m.set_structure(base);
        m.mark_occupied(from, UnitId(1));
        m.mark_occupied(base, UnitId(1));
        m.mark_occupied(Position::new(1, 0), UnitId(4));

        let got = avoid_structures(&mut m, UnitId(1), from, Direction::East);
        assert_eq!(got, Direction::South);
        assert!(!m.is_occupied(base));

        assert_eq!(
            avoid_structures(&mut m, UnitId(1), from, Direction::West),
            Direction::West
        );
    }

    #[test]
    fn test_kamikaze_ignores_occupancy() {
        let mut m = map(6, 6);
        m.mark_occupied(Position::new(0, 0), UnitId(3));
        let mut rng = SmallRng::seed_from_u64(7);
        let d = kamikaze_move(&m, Position::new(1, 0), Position::new(0, 0), &mut rng);
        assert_eq!(d, Direction::West);
        assert_eq!(m.cell(Position::new(0, 0)).occupant, Some(UnitId(3)));
    }

    #[test]
    fn test_affordability() {
        let mut m = map(4, 4);
        m.set_resource(Position::new(1, 1), 500);
        assert!(can_afford_move(&m, &unit(1, 1, 1, 60), Ratio::from_num(0.1)));
        assert!(!can_afford_move(&m, &unit(1, 1, 1, 40), Ratio::from_num(0.1)));
        assert!(can_afford_move(&m, &unit(1, 0, 0, 0), Ratio::from_num(0.1)));
    }

    #[test]
    fn test_break_deadlocks_swaps_pair() {
        let mut m = map(5, 5);
        let mut entries = vec![
            MoveEntry {
                unit: UnitId(1),
                position: Position::new(1, 0),
                preferred: Direction::East,
                committed: Direction::Still,
            },
            MoveEntry {
                unit: UnitId(2),
                position: Position::new(2, 0),
                preferred: Direction::West,
                committed: Direction::Still,
            },
        ];
        let swaps = break_deadlocks(&mut m, &mut entries);
        assert_eq!(swaps, 1);
        assert_eq!(entries[0].committed, Direction::East);
        assert_eq!(entries[1].committed, Direction::West);
        assert_eq!(m.cell(Position::new(2, 0)).occupant, Some(UnitId(1)));
        assert_eq!(m.cell(Position::new(1, 0)).occupant, Some(UnitId(2)));
    }

    #[test]
    fn test_break_deadlocks_swaps_across_the_seam() {
        let mut m = map(5, 5);
        let mut entries = vec![
            MoveEntry {
                unit: UnitId(1),
                position: Position::new(0, 0),
                preferred: Direction::North,
                committed: Direction::Still,
            },
            MoveEntry {
                unit: UnitId(2),
                position: Position::new(0, 4),
                preferred: Direction::South,
                committed: Direction::Still,
            },
        ];
        assert_eq!(break_deadlocks(&mut m, &mut entries), 1);
        assert_eq!(entries[0].committed, Direction::North);
        assert_eq!(entries[1].committed, Direction::South);
    }

    #[test]
    fn test_break_deadlocks_ignores_moving_and_one_sided() {
        let mut m = map(5, 5);
        let mut entries = vec![
            MoveEntry {
                unit: UnitId(1),
                position: Position::new(1, 0),
                preferred: Direction::East,
                committed: Direction::Still,
            },
            MoveEntry {
                unit: UnitId(2),
                position: Position::new(2, 0),
                preferred: Direction::South,
                committed: Direction::Still,
            },
            MoveEntry {
                unit: UnitId(3),
                position: Position::new(4, 4),
                preferred: Direction::North,
                committed: Direction::North,
            },
        ];
        assert_eq!(break_deadlocks(&mut m, &mut entries), 0);
        assert_eq!(entries[0].committed, Direction::Still);
        assert_eq!(entries[1].committed, Direction::Still);
    }

    #[test]
    fn test_each_unit_swaps_at_most_once() {
        let mut m = map(7, 7);
        // 2 could pair with 1 or with 3; only the first pairing happens.
        let mut entries = vec![
            MoveEntry {
                unit: UnitId(1),
                position: Position::new(1, 0),
                preferred: Direction::East,
                committed: Direction::Still,
            },
            MoveEntry {
                unit: UnitId(2),
                position: Position::new(2, 0),
                preferred: Direction::West,
                committed: Direction::Still,
            },
            MoveEntry {
                unit: UnitId(3),
                position: Position::new(3, 0),
                preferred: Direction::West,
                committed: Direction::Still,
            },
        ];
        assert_eq!(break_deadlocks(&mut m, &mut entries), 1);
        assert_eq!(entries[2].committed, Direction::Still);
    }
}
