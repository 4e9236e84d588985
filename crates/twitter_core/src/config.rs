//! Environment-driven runtime configuration.
//!
//! | Variable              | Default                       |
//! |-----------------------|-------------------------------|
//! | `TWITTER_DB_PATH`     | `<temp dir>/twitter.sqlite3`  |
//! | `TWITTER_LOG_LEVEL`   | `default_log_level()`         |
//! | `TWITTER_LOG_DIR`     | unset, file logging stays off |
//! | `TWITTER_FEED_WINDOW` | 5, clamped to 50              |
//!
//! Blank or unparsable values fall back to the default.

use crate::db::{open_db, DbResult};
use crate::logging::{default_log_level, init_logging};
use crate::service::feed_service::normalize_feed_window;
use rusqlite::Connection;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "TWITTER_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "TWITTER_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "TWITTER_LOG_DIR";
pub const FEED_WINDOW_ENV: &str = "TWITTER_FEED_WINDOW";

const DEFAULT_DB_FILE_NAME: &str = "twitter.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub feed_window: u32,
}

impl CoreConfig {
    /// Resolves configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            db_path: read(DB_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)),
            log_level: read(LOG_LEVEL_ENV).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: read(LOG_DIR_ENV).map(PathBuf::from),
            feed_window: normalize_feed_window(
                read(FEED_WINDOW_ENV).and_then(|value| value.parse::<u32>().ok()),
            ),
        }
    }

    /// Starts file logging when a log directory is configured.
    pub fn init_logging(&self) -> Result<(), String> {
        match &self.log_dir {
            Some(dir) => init_logging(&self.log_level, &dir.to_string_lossy()),
            None => Ok(()),
        }
    }

    /// Opens the configured database with the schema installed.
    pub fn open_db(&self) -> DbResult<Connection> {
        open_db(&self.db_path)
    }
}
