//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`FovSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `FOV_*` environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::{FovSettings, MAX_FPS};

/// Resolve the default settings file path (`~/.fov/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".fov").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<FovSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields the defaults. Invalid JSON or values that fail
/// validation are errors.
pub fn load_settings_from_path(path: &Path) -> Result<FovSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<FovSettings> {
    let parse_error = |source: serde_json::Error| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let defaults = serde_json::to_value(FovSettings::default()).map_err(parse_error)?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(parse_error)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    serde_json::from_value(merged).map_err(parse_error)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(settings: &mut FovSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply `FOV_*` overrides read through `lookup`.
///
/// Empty strings count as unset. Numbers must parse and fall in range;
/// anything else is ignored with a warning and the earlier layer wins.
pub fn apply_overrides_from<F>(settings: &mut FovSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("FOV_PUBLIC_HOST") {
        settings.server.public_host = v;
    }
    if let Some(v) = env.string("FOV_PUBLIC_SCHEME") {
        settings.server.public_scheme = v;
    }
    if let Some(v) = env.string("FOV_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.u16("FOV_STREAM_PORT", 1, u16::MAX) {
        settings.server.stream_port = v;
    }
    if let Some(v) = env.u16("FOV_HTTP_PORT", 1, u16::MAX) {
        settings.server.http_port = v;
    }

    // ── Stream ──────────────────────────────────────────────────────
    if let Some(v) = env.u64("FOV_FPS", 1, u64::from(MAX_FPS)) {
        settings.stream.fps = v as u32;
    }
    if let Some(v) = env.string("FOV_VENUE") {
        settings.stream.venue = v;
    }

    // ── Keepalive ───────────────────────────────────────────────────
    if let Some(v) = env.u64("FOV_KEEPALIVE_INTERVAL_SECS", 1, 3600) {
        settings.keepalive.interval_secs = v;
    }
    if let Some(v) = env.u64("FOV_KEEPALIVE_TIMEOUT_SECS", 1, 86_400) {
        settings.keepalive.timeout_secs = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("FOV_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.bool("FOV_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = self.string(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u16(&self, name: &str, min: u16, max: u16) -> Option<u16> {
        let val = self.string(name)?;
        let result = parse_u16_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = self.string(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
