//! Core error types.

use thiserror::Error;

use crate::grid::{GridBounds, Point};

/// Errors raised while building or validating core values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A trajectory must contain at least one point.
    #[error("trajectory is empty")]
    EmptyTrajectory,
    /// A point lies outside the grid it was declared against.
    #[error("point ({}, {}) is outside grid {}x{}", point.x, point.y, grid.max_x, grid.max_y)]
    OutOfBounds {
        /// The offending point.
        point: Point,
        /// The grid it was checked against.
        grid: GridBounds,
    },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_trajectory_display() {
        assert_eq!(CoreError::EmptyTrajectory.to_string(), "trajectory is empty");
    }

    #[test]
    fn out_of_bounds_display() {
        let err = CoreError::OutOfBounds {
            point: Point::new(200, 3),
            grid: GridBounds::new(102, 65),
        };
        assert_eq!(err.to_string(), "point (200, 3) is outside grid 102x65");
    }
}
