//! Wrapping grid model: positions, directions, cells and occupancy.
//!
//! The board is a torus. Every coordinate produced by this module is
//! normalized into `[0, width) x [0, height)`, and every distance accounts
//! for wraparound in both axes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Unique identifier for a unit (ours or an opponent's).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A grid coordinate.
///
/// Positions built by hand may lie outside the board; use
/// [`GameMap::normalize`] before comparing them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    /// Column.
    pub x: i32,
    /// Row. Grows southwards.
    pub y: i32,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The (unnormalized) position one step in `direction`.
    #[must_use]
    pub const fn offset(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Offset by an arbitrary delta, or `None` on integer overflow.
    #[must_use]
    pub fn checked_offset(self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A single-step move. `Still` is the fifth pseudo-direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Towards decreasing y.
    North,
    /// Towards increasing y.
    South,
    /// Towards increasing x.
    East,
    /// Towards decreasing x.
    West,
    /// No movement.
    Still,
}

impl Direction {
    /// The four cardinal directions in canonical order.
    pub const CARDINALS: [Self; 4] = [Self::North, Self::South, Self::East, Self::West];

    /// All five moves, `Still` last.
    pub const ALL: [Self; 5] = [
        Self::North,
        Self::South,
        Self::East,
        Self::West,
        Self::Still,
    ];

    /// Coordinate delta of this move.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::South => (0, 1),
            Self::East => (1, 0),
            Self::West => (-1, 0),
            Self::Still => (0, 0),
        }
    }

    /// The opposite move. `Still` is its own inverse.
    #[must_use]
    pub const fn invert(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::East => Self::West,
            Self::West => Self::East,
            Self::Still => Self::Still,
        }
    }

    /// The two moves at right angles to this one.
    ///
    /// Empty for `Still`.
    #[must_use]
    pub const fn perpendicular(self) -> &'static [Self] {
        match self {
            Self::North | Self::South => &[Self::East, Self::West],
            Self::East | Self::West => &[Self::North, Self::South],
            Self::Still => &[],
        }
    }

    /// Returns true for every move except `Still`.
    #[must_use]
    pub const fn is_move(self) -> bool {
        !matches!(self, Self::Still)
    }

    /// Single-letter code (`n`, `s`, `e`, `w`, `o`).
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::North => 'n',
            Self::South => 's',
            Self::East => 'e',
            Self::West => 'w',
            Self::Still => 'o',
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One cell of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cell {
    /// Resource currently on the cell.
    pub resource: u32,
    /// Unit standing on (or claiming) the cell.
    pub occupant: Option<UnitId>,
    /// Base or dropoff on this cell, any owner.
    pub structure: bool,
}

impl Cell {
    /// Create an empty cell holding `resource`.
    #[must_use]
    pub const fn with_resource(resource: u32) -> Self {
        Self {
            resource,
            occupant: None,
            structure: false,
        }
    }

    /// Returns true if some unit occupies the cell.
    #[must_use]
    pub const fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }
}

/// The toroidal game board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMap {
    /// Width in cells.
    width: u32,
    /// Height in cells.
    height: u32,
    /// Cells stored in row-major order.
    cells: Vec<Cell>,
}

impl GameMap {
    /// Create a board with every cell empty.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidDimensions` if either side is zero or too
    /// large to address with `i32` coordinates.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 || width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(EngineError::InvalidDimensions { width, height });
        }

        let cell_count = (width as usize) * (height as usize);
        Ok(Self {
            width,
            height,
            cells: vec![Cell::default(); cell_count],
        })
    }

    /// Width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Wrap a position into `[0, width) x [0, height)`.
    #[must_use]
    pub fn normalize(&self, pos: Position) -> Position {
        Position::new(
            pos.x.rem_euclid(self.width as i32),
            pos.y.rem_euclid(self.height as i32),
        )
    }

    #[inline]
    fn index(&self, pos: Position) -> usize {
        let pos = self.normalize(pos);
        (pos.y as usize) * (self.width as usize) + (pos.x as usize)
    }

    /// Cell at `pos` (wrapped).
    #[must_use]
    pub fn cell(&self, pos: Position) -> &Cell {
        &self.cells[self.index(pos)]
    }

    /// Mutable cell at `pos` (wrapped).
    pub fn cell_mut(&mut self, pos: Position) -> &mut Cell {
        let index = self.index(pos);
        &mut self.cells[index]
    }

    /// Cell at `origin + (dx, dy)`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::CellLookup` if the offset overflows.
    pub fn cell_at_offset(&self, origin: Position, dx: i32, dy: i32) -> Result<(Position, &Cell)> {
        let pos = origin
            .checked_offset(dx, dy)
            .map(|p| self.normalize(p))
            .ok_or(EngineError::CellLookup { origin, dx, dy })?;
        Ok((pos, self.cell(pos)))
    }

    /// Resource on the cell at `pos`.
    #[must_use]
    pub fn resource(&self, pos: Position) -> u32 {
        self.cell(pos).resource
    }

    /// Set the resource on the cell at `pos`.
    pub fn set_resource(&mut self, pos: Position, resource: u32) {
        self.cell_mut(pos).resource = resource;
    }

    /// Flag the cell at `pos` as holding a structure.
    pub fn set_structure(&mut self, pos: Position) {
        self.cell_mut(pos).structure = true;
    }

    /// Returns true if the cell at `pos` holds a structure.
    #[must_use]
    pub fn has_structure(&self, pos: Position) -> bool {
        self.cell(pos).structure
    }

    /// Iterate over every `(position, cell)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Cell)> + '_ {
        let width = self.width as usize;
        self.cells.iter().enumerate().map(move |(i, cell)| {
            (Position::new((i % width) as i32, (i / width) as i32), cell)
        })
    }

    /// Total resource on the board.
    #[must_use]
    pub fn total_resource(&self) -> u64 {
        self.cells.iter().map(|c| u64::from(c.resource)).sum()
    }

    /// Signed shortest offset from `a` to `b` along one axis of length `len`.
    fn axis_delta(a: i32, b: i32, len: u32) -> i32 {
        let len = len as i32;
        let d = (b - a).rem_euclid(len);
        if d * 2 > len {
            d - len
        } else {
            d
        }
    }

    /// Wraparound Manhattan distance.
    #[must_use]
    pub fn distance(&self, a: Position, b: Position) -> u32 {
        let a = self.normalize(a);
        let b = self.normalize(b);
        let dx = Self::axis_delta(a.x, b.x, self.width).unsigned_abs();
        let dy = Self::axis_delta(a.y, b.y, self.height).unsigned_abs();
        dx + dy
    }

    /// Squared wraparound straight-line distance.
    #[must_use]
    pub fn euclidean_distance_squared(&self, a: Position, b: Position) -> u64 {
        let a = self.normalize(a);
        let b = self.normalize(b);
        let dx = u64::from(Self::axis_delta(a.x, b.x, self.width).unsigned_abs());
        let dy = u64::from(Self::axis_delta(a.y, b.y, self.height).unsigned_abs());
        dx * dx + dy * dy
    }

    /// The four wrapped cardinal neighbours plus `Still` on `pos` itself.
    #[must_use]
    pub fn neighbors(&self, pos: Position) -> [(Direction, Position); 5] {
        Direction::ALL.map(|d| (d, self.normalize(pos.offset(d))))
    }

    /// Cardinal directions that reduce the wrap distance from `from` to `to`.
    ///
    /// Vertical first, then horizontal. Empty when the positions coincide.
    /// When both ways round are equally long, south/east win.
    #[must_use]
    pub fn target_directions(&self, from: Position, to: Position) -> Vec<Direction> {
        let from = self.normalize(from);
        let to = self.normalize(to);
        let mut directions = Vec::with_capacity(2);

        match Self::axis_delta(from.y, to.y, self.height) {
            0 => {}
            d if d > 0 => directions.push(Direction::South),
            _ => directions.push(Direction::North),
        }
        match Self::axis_delta(from.x, to.x, self.width) {
            0 => {}
            d if d > 0 => directions.push(Direction::East),
            _ => directions.push(Direction::West),
        }

        directions
    }

    /// Returns true if any unit occupies `pos`.
    #[must_use]
    pub fn is_occupied(&self, pos: Position) -> bool {
        self.cell(pos).is_occupied()
    }

    /// Returns true if `pos` is empty or already held by `unit`.
    #[must_use]
    pub fn is_free_for(&self, pos: Position, unit: UnitId) -> bool {
        self.cell(pos).occupant.map_or(true, |held| held == unit)
    }

    /// Claim `pos` for `unit` for the rest of the turn.
    pub fn mark_occupied(&mut self, pos: Position, unit: UnitId) {
        self.cell_mut(pos).occupant = Some(unit);
    }

    /// Release any claim on `pos`.
    pub fn vacate(&mut self, pos: Position) {
        self.cell_mut(pos).occupant = None;
    }

    /// Release every claim on the board.
    pub fn clear_occupancy(&mut self) {
        for cell in &mut self.cells {
            cell.occupant = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(w: u32, h: u32) -> GameMap {
        GameMap::new(w, h).unwrap()
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert_eq!(
            GameMap::new(0, 4),
            Err(EngineError::InvalidDimensions {
                width: 0,
                height: 4
            })
        );
    }

    #[test]
    fn test_normalize_wraps_both_axes() {
        let m = map(8, 6);
        assert_eq!(m.normalize(Position::new(-1, -1)), Position::new(7, 5));
        assert_eq!(m.normalize(Position::new(8, 6)), Position::new(0, 0));
        assert_eq!(m.normalize(Position::new(17, -13)), Position::new(1, 5));
    }

    #[test]
    fn test_distance_wraps() {
        let m = map(10, 10);
        assert_eq!(m.distance(Position::new(0, 0), Position::new(9, 9)), 2);
        assert_eq!(m.distance(Position::new(1, 1), Position::new(4, 5)), 7);
        assert_eq!(m.distance(Position::new(2, 2), Position::new(2, 2)), 0);
        assert_eq!(m.distance(Position::new(0, 0), Position::new(5, 5)), 10);
    }

    #[test]
    fn test_euclidean_distance_squared_wraps() {
        let m = map(12, 12);
        assert_eq!(
            m.euclidean_distance_squared(Position::new(0, 0), Position::new(11, 10)),
            1 + 4
        );
    }

    #[test]
    fn test_neighbors_wrap_and_include_still() {
        let m = map(5, 5);
        let n = m.neighbors(Position::new(0, 0));
        assert_eq!(n[0], (Direction::North, Position::new(0, 4)));
        assert_eq!(n[1], (Direction::South, Position::new(0, 1)));
        assert_eq!(n[2], (Direction::East, Position::new(1, 0)));
        assert_eq!(n[3], (Direction::West, Position::new(4, 0)));
        assert_eq!(n[4], (Direction::Still, Position::new(0, 0)));
    }

    #[test]
    fn test_target_directions_take_short_way_round() {
        let m = map(10, 10);
        assert_eq!(
            m.target_directions(Position::new(0, 0), Position::new(8, 2)),
            vec![Direction::South, Direction::West]
        );
        assert_eq!(
            m.target_directions(Position::new(1, 9), Position::new(1, 0)),
            vec![Direction::South]
        );
        assert!(m
            .target_directions(Position::new(3, 3), Position::new(13, 3))
            .is_empty());
    }

    #[test]
    fn test_occupancy_layer() {
        let mut m = map(4, 4);
        let pos = Position::new(1, 2);
        assert!(!m.is_occupied(pos));

        m.mark_occupied(Position::new(5, 6), UnitId(3));
        assert!(m.is_occupied(pos));
        assert!(m.is_free_for(pos, UnitId(3)));
        assert!(!m.is_free_for(pos, UnitId(4)));

        m.vacate(pos);
        assert!(!m.is_occupied(pos));

        m.mark_occupied(pos, UnitId(1));
        m.clear_occupancy();
        assert!(m.iter().all(|(_, c)| !c.is_occupied()));
    }

    #[test]
    fn test_direction_helpers() {
        assert_eq!(Direction::East.invert(), Direction::West);
        assert_eq!(
            Direction::North.perpendicular(),
            &[Direction::East, Direction::West]
        );
        assert!(Direction::Still.perpendicular().is_empty());
        assert_eq!(Direction::Still.code(), 'o');
    }
}
