//! Error types for the decision engine.

use thiserror::Error;

use crate::grid::{Position, UnitId};

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised while building the grid or deciding a unit's move.
///
/// Per-unit errors never abort a turn: the navigator logs them and the unit
/// stays still.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A grid was requested with a zero dimension.
    #[error("Invalid grid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// A neighbour offset could not be mapped onto the grid.
    #[error("Cell lookup failed at offset ({dx}, {dy}) from {origin}")]
    CellLookup {
        /// Position the offset was applied to.
        origin: Position,
        /// Horizontal offset.
        dx: i32,
        /// Vertical offset.
        dy: i32,
    },

    /// A mode branch needed a destination that was never set.
    #[error("Unit {0} has no destination")]
    MissingDestination(UnitId),

    /// A unit has no state entry.
    #[error("Unknown unit: {0}")]
    UnknownUnit(UnitId),
}
