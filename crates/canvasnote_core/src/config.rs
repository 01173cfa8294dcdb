//! Core runtime configuration.
//!
//! # Responsibility
//! - Load the JSON config file shared by hosts and the CLI.
//! - Derive store and gesture options from it.
//!
//! # Invariants
//! - Every field has a default; a missing file section never fails a load.
//! - `flush_interval_ms` is never negative; `move_threshold` never below zero.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use crate::gesture::{GestureConfig, DEFAULT_MOVE_THRESHOLD};
use crate::logging::default_log_level;
use crate::store::{StoreOptions, DEFAULT_MIN_FLUSH_INTERVAL_MS};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub log_level: String,
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub db_path: PathBuf,
    pub flush_interval_ms: i64,
    pub move_threshold: f32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            db_path: PathBuf::from("canvasnote.sqlite3"),
            flush_interval_ms: DEFAULT_MIN_FLUSH_INTERVAL_MS,
            move_threshold: DEFAULT_MOVE_THRESHOLD,
        }
    }
}

impl CoreConfig {
    /// Reads a JSON config file; absent fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        let mut config: Self = serde_json::from_str(raw)?;
        config.flush_interval_ms = config.flush_interval_ms.max(0);
        config.move_threshold = config.move_threshold.max(0.0);
        Ok(config)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            min_flush_interval_ms: self.flush_interval_ms,
        }
    }

    pub fn gesture_config(&self) -> GestureConfig {
        GestureConfig {
            move_threshold: self.move_threshold,
            ..GestureConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CoreConfig;

    #[test]
    fn missing_fields_take_defaults() {
        let config = CoreConfig::from_json(r#"{ "flush_interval_ms": 100 }"#).unwrap();
        assert_eq!(config.flush_interval_ms, 100);
        assert_eq!(config.move_threshold, 3.0);
        assert_eq!(config.store_options().min_flush_interval_ms, 100);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn negative_values_are_clamped() {
        let config =
            CoreConfig::from_json(r#"{ "flush_interval_ms": -5, "move_threshold": -1.0 }"#)
                .unwrap();
        assert_eq!(config.flush_interval_ms, 0);
        assert_eq!(config.gesture_config().move_threshold, 0.0);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let error = CoreConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(error.to_string().contains("absent.json"));
    }
}
