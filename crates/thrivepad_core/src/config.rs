//! Environment-driven runtime settings.
//!
//! Values are read through `mockable::Env` so they can be exercised with
//! `MockEnv` in tests.

use crate::logging::{default_log_level, normalize_level, normalize_log_dir, LoggingError};
use mockable::Env;
use std::path::PathBuf;
use thiserror::Error;

pub const DB_PATH_ENV: &str = "THRIVEPAD_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "THRIVEPAD_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "THRIVEPAD_LOG_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: LoggingError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// SQLite file for the local backend; in-memory when `None`.
    pub database_path: Option<PathBuf>,
    pub log_level: &'static str,
    /// File logging is disabled when `None`.
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Reads settings from `env`; blank variables count as unset.
    pub fn from_env<E: Env>(env: &E) -> Result<Self, ConfigError> {
        let mut config = Self {
            database_path: non_blank(env, DB_PATH_ENV).map(PathBuf::from),
            ..Self::default()
        };
        if let Some(level) = non_blank(env, LOG_LEVEL_ENV) {
            config.set_log_level(&level)?;
        }
        if let Some(dir) = non_blank(env, LOG_DIR_ENV) {
            config.set_log_dir(PathBuf::from(dir))?;
        }
        Ok(config)
    }

    pub fn set_log_level(&mut self, level: &str) -> Result<(), ConfigError> {
        self.log_level = normalize_level(level).map_err(|source| ConfigError::Invalid {
            name: LOG_LEVEL_ENV,
            source,
        })?;
        Ok(())
    }

    pub fn set_log_dir(&mut self, dir: PathBuf) -> Result<(), ConfigError> {
        self.log_dir = Some(normalize_log_dir(&dir).map_err(|source| ConfigError::Invalid {
            name: LOG_DIR_ENV,
            source,
        })?);
        Ok(())
    }
}

fn non_blank<E: Env>(env: &E, name: &str) -> Option<String> {
    env.string(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
