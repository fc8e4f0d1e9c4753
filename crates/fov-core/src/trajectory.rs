//! The figure-8 trajectory.
//!
//! Two circular loops side by side, joined by straight horizontal runs
//! through the grid's vertical center:
//!
//! 1. 72 points around the left loop, starting at angle 0
//! 2. 12 points running right along the center line
//! 3. 72 points around the right loop
//! 4. 12 points running back left
//!
//! The path is built once at startup and shared by every session. Sessions
//! index it with an ever-increasing cursor that wraps via [`Trajectory::point_at`].

use std::f64::consts::PI;

use crate::errors::{CoreError, Result};
use crate::grid::{GridBounds, Point};

/// Points per circular loop.
const LOOP_STEPS: u32 = 72;

/// Points per straight run between loop centers.
const CROSSING_STEPS: u32 = 12;

/// Build the figure-8 point sequence for a grid.
///
/// Pure and deterministic: identical bounds always yield identical output.
/// Every point is clamped onto the grid. The result always holds
/// `2 * 72 + 2 * 12 = 168` points.
pub fn build_figure8(grid: GridBounds) -> Vec<Point> {
    let center_y = grid.max_y / 2;
    let left_x = grid.max_x / 3;
    // Widened so grids near `u32::MAX` do not overflow.
    let right_x = ((2 * u64::from(grid.max_x)) / 3) as u32;
    let radius_x = (grid.max_x / 5).clamp(6, 24);
    let radius_y = (grid.max_y / 3).clamp(6, 20);

    let capacity = (2 * (LOOP_STEPS + CROSSING_STEPS)) as usize;
    let mut points = Vec::with_capacity(capacity);

    push_loop(&mut points, grid, left_x, center_y, radius_x, radius_y);
    push_crossing(&mut points, grid, left_x, right_x, center_y);
    push_loop(&mut points, grid, right_x, center_y, radius_x, radius_y);
    push_crossing(&mut points, grid, right_x, left_x, center_y);

    points
}

fn push_loop(
    points: &mut Vec<Point>,
    grid: GridBounds,
    center_x: u32,
    center_y: u32,
    radius_x: u32,
    radius_y: u32,
) {
    for i in 0..LOOP_STEPS {
        let angle = (2.0 * PI * f64::from(i)) / f64::from(LOOP_STEPS);
        let x = f64::from(center_x) + f64::from(radius_x) * angle.cos();
        let y = f64::from(center_y) + f64::from(radius_y) * angle.sin();
        points.push(grid.snap(x, y));
    }
}

/// Excludes the start point and includes the end point.
fn push_crossing(points: &mut Vec<Point>, grid: GridBounds, from_x: u32, to_x: u32, y: u32) {
    for i in 1..=CROSSING_STEPS {
        let t = f64::from(i) / f64::from(CROSSING_STEPS);
        let x = (1.0 - t) * f64::from(from_x) + t * f64::from(to_x);
        points.push(grid.snap(x, f64::from(y)));
    }
}

/// An immutable, non-empty, cyclic sequence of grid points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trajectory {
    grid: GridBounds,
    points: Vec<Point>,
}

impl Trajectory {
    /// The figure-8 trajectory for `grid`.
    pub fn figure8(grid: GridBounds) -> Self {
        Self {
            grid,
            points: build_figure8(grid),
        }
    }

    /// Wrap an explicit point list.
    ///
    /// Fails if the list is empty or any point falls outside `grid`.
    pub fn from_points(grid: GridBounds, points: Vec<Point>) -> Result<Self> {
        if points.is_empty() {
            return Err(CoreError::EmptyTrajectory);
        }
        if let Some(&point) = points.iter().find(|p| !grid.contains(**p)) {
            return Err(CoreError::OutOfBounds { point, grid });
        }
        Ok(Self { grid, points })
    }

    /// The point a cursor refers to. Cursors wrap modulo the length.
    pub fn point_at(&self, cursor: u64) -> Point {
        let len = self.points.len() as u64;
        self.points[(cursor % len) as usize]
    }

    /// Number of distinct points in one lap.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`; construction rejects empty sequences.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Grid the trajectory was built for.
    pub fn grid(&self) -> GridBounds {
        self.grid
    }

    /// All points of one lap, in broadcast order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }
}
