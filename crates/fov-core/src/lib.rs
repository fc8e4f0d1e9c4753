//! # fov-core
//!
//! Foundation types shared by the fov-stream crates.
//!
//! - **Grid**: [`GridBounds`] and [`Point`], the coordinate space every frame lives in
//! - **Trajectory**: the fixed figure-8 path, built once and shared read-only
//! - **Messages**: the `hello` and `pos` frames sent over the streaming socket
//! - **Errors**: [`CoreError`] via `thiserror`

#![deny(unsafe_code)]

pub mod errors;
pub mod grid;
pub mod messages;
pub mod trajectory;

pub use errors::{CoreError, Result};
pub use grid::{GridBounds, MAX_GRID_AXIS, Point};
pub use messages::{HelloMessage, PROTOCOL_VERSION, PositionMessage};
pub use trajectory::{Trajectory, build_figure8};
