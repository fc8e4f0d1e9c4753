//! Grid bounds and points.

use serde::{Deserialize, Serialize};

/// Largest grid axis accepted from configuration.
pub const MAX_GRID_AXIS: u32 = u16::MAX as u32;

/// Inclusive upper bounds of the coordinate grid. Both axes start at 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridBounds {
    /// Largest valid x coordinate.
    pub max_x: u32,
    /// Largest valid y coordinate.
    pub max_y: u32,
}

impl GridBounds {
    /// Create grid bounds.
    pub const fn new(max_x: u32, max_y: u32) -> Self {
        Self { max_x, max_y }
    }

    /// Whether `point` lies inside the grid.
    pub fn contains(&self, point: Point) -> bool {
        point.x <= self.max_x && point.y <= self.max_y
    }

    /// Round a raw coordinate pair and clamp it onto the grid.
    ///
    /// Rounding is half-to-even so that generated paths are reproducible
    /// across implementations of the same geometry.
    pub fn snap(&self, x: f64, y: f64) -> Point {
        Point {
            x: clamp_axis(x, self.max_x),
            y: clamp_axis(y, self.max_y),
        }
    }
}

impl Default for GridBounds {
    fn default() -> Self {
        Self::new(102, 65)
    }
}

fn clamp_axis(value: f64, max: u32) -> u32 {
    value.round_ties_even().clamp(0.0, f64::from(max)) as u32
}

/// A single grid coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: u32,
    /// Vertical coordinate.
    pub y: u32,
}

impl Point {
    /// Create a point.
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid() {
        let grid = GridBounds::default();
        assert_eq!(grid.max_x, 102);
        assert_eq!(grid.max_y, 65);
    }

    #[test]
    fn contains_is_inclusive() {
        let grid = GridBounds::new(10, 5);
        assert!(grid.contains(Point::new(0, 0)));
        assert!(grid.contains(Point::new(10, 5)));
        assert!(!grid.contains(Point::new(11, 5)));
        assert!(!grid.contains(Point::new(10, 6)));
    }

    #[test]
    fn snap_clamps_negative_to_zero() {
        let grid = GridBounds::new(10, 10);
        assert_eq!(grid.snap(-3.7, -0.2), Point::new(0, 0));
    }

    #[test]
    fn snap_clamps_above_max() {
        let grid = GridBounds::new(10, 10);
        assert_eq!(grid.snap(12.2, 10.6), Point::new(10, 10));
    }

    #[test]
    fn snap_rounds_half_to_even() {
        let grid = GridBounds::new(100, 100);
        assert_eq!(grid.snap(42.5, 43.5), Point::new(42, 44));
        assert_eq!(grid.snap(2.4, 2.6), Point::new(2, 3));
    }

    #[test]
    fn point_serializes_as_object() {
        let json = serde_json::to_value(Point::new(3, 4)).unwrap();
        assert_eq!(json, serde_json::json!({"x": 3, "y": 4}));
    }

    #[test]
    fn grid_serializes_with_max_fields() {
        let json = serde_json::to_value(GridBounds::new(102, 65)).unwrap();
        assert_eq!(json, serde_json::json!({"max_x": 102, "max_y": 65}));
    }
}
