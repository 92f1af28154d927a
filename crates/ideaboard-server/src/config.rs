//! Server configuration loaded from the environment.

use std::env;

use ideaboard_core::AppSettings;
use ideaboard_db::DbConfig;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is set but empty")]
    Empty(&'static str),

    #[error("{0} is not valid unicode")]
    NotUnicode(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub settings: AppSettings,
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// Unset variables fall back to [`DbConfig::default`]; a variable that
    /// is set to an empty string is rejected.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key))
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Result<String, env::VarError>,
    {
        let read = |key: &'static str, default: String| -> Result<String, ConfigError> {
            match lookup(key) {
                Ok(value) if value.trim().is_empty() => Err(ConfigError::Empty(key)),
                Ok(value) => Ok(value),
                Err(env::VarError::NotPresent) => Ok(default),
                Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(key)),
            }
        };

        let defaults = DbConfig::default();
        let db = DbConfig {
            url: read("IDEABOARD_DB_URL", defaults.url)?,
            namespace: read("IDEABOARD_DB_NAMESPACE", defaults.namespace)?,
            database: read("IDEABOARD_DB_DATABASE", defaults.database)?,
            username: read("IDEABOARD_DB_USERNAME", defaults.username)?,
            password: read("IDEABOARD_DB_PASSWORD", defaults.password)?,
        };

        let settings = AppSettings {
            build_time: read("IDEABOARD_BUILD_TIME", "unknown".into())?,
        };

        Ok(Self { db, settings })
    }
}
