//! # fov-settings
//!
//! Configuration for the fov-stream server, loaded in layers (lowest priority first):
//!
//! 1. **Compiled defaults**: [`FovSettings::default()`]
//! 2. **Settings file**: `~/.fov/settings.json` or an explicit path, deep-merged over defaults
//! 3. **Environment variables**: `FOV_*` overrides
//!
//! The binary applies CLI flags on top of the result.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_from, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::*;
