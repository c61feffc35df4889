//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{FmError, Result};

/// Full fmon configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

/// Filesystem paths used by fmon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    /// Event store database.
    pub sqlite_db: PathBuf,
    /// Append-only report run log.
    pub jsonl_log: PathBuf,
}

/// Presentation defaults handed through to the renderer untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Font size hint (px) used when the caller supplies none.
    pub font_size: u32,
    /// Bounds on the configured default only; caller hints are not clamped.
    pub min_font_size: u32,
    pub max_font_size: u32,
    /// Text substituted for undefined numeric values.
    pub placeholder: String,
}

/// Report run log tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[FMON-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let cfg = home_dir.join(".config").join("fmon").join("config.toml");
        let data = home_dir.join(".local").join("share").join("fmon");
        Self {
            config_file: cfg,
            sqlite_db: data.join("fulfillment.sqlite3"),
            jsonl_log: data.join("reports.jsonl"),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            font_size: 18,
            min_font_size: 8,
            max_font_size: 72,
            placeholder: "-".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 5,
        }
    }
}

impl DisplayConfig {
    /// Resolve a caller-supplied font hint. Any positive value passes through
    /// unchanged; absent or zero falls back to the configured default.
    #[must_use]
    pub fn effective_font_size(&self, requested: Option<u32>) -> u32 {
        requested
            .filter(|size| *size > 0)
            .unwrap_or(self.font_size)
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| FmError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(FmError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a, so the value is stable across processes and toolchains.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // paths
        if let Some(raw) = lookup("FMON_SQLITE_DB") {
            self.paths.sqlite_db = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("FMON_JSONL_LOG") {
            self.paths.jsonl_log = PathBuf::from(raw);
        }

        // display
        if let Some(raw) = lookup("FMON_DISPLAY_FONT_SIZE") {
            self.display.font_size = parse_env("FMON_DISPLAY_FONT_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("FMON_DISPLAY_PLACEHOLDER") {
            self.display.placeholder = raw;
        }

        // logging
        if let Some(raw) = lookup("FMON_LOGGING_ENABLED") {
            self.logging.enabled = parse_env("FMON_LOGGING_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("FMON_LOGGING_MAX_SIZE_BYTES") {
            self.logging.max_size_bytes = parse_env("FMON_LOGGING_MAX_SIZE_BYTES", &raw)?;
        }
        if let Some(raw) = lookup("FMON_LOGGING_MAX_ROTATED_FILES") {
            self.logging.max_rotated_files = parse_env("FMON_LOGGING_MAX_ROTATED_FILES", &raw)?;
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let display = &self.display;
        if display.min_font_size == 0 || display.min_font_size > display.max_font_size {
            return Err(FmError::InvalidConfig {
                details: format!(
                    "display font bounds must satisfy 0 < min <= max, got {}..={}",
                    display.min_font_size, display.max_font_size
                ),
            });
        }
        if !(display.min_font_size..=display.max_font_size).contains(&display.font_size) {
            return Err(FmError::InvalidConfig {
                details: format!(
                    "display.font_size ({}) must be within {}..={}",
                    display.font_size, display.min_font_size, display.max_font_size
                ),
            });
        }
        if display.placeholder.is_empty() {
            return Err(FmError::InvalidConfig {
                details: "display.placeholder must not be empty".to_string(),
            });
        }

        if self.logging.enabled && self.logging.max_size_bytes < 1024 {
            return Err(FmError::InvalidConfig {
                details: format!(
                    "logging.max_size_bytes ({}) must be >= 1024",
                    self.logging.max_size_bytes
                ),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| FmError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
