//! Engine configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

pub const ENV_DATA_DIR: &str = "NIVESH_DATA_DIR";
pub const ENV_DB_PATH: &str = "NIVESH_DB_PATH";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "NIVESH_FETCH_TIMEOUT_SECS";
pub const ENV_MAX_CONCURRENT_FETCHES: &str = "NIVESH_MAX_CONCURRENT_FETCHES";
pub const ENV_LATEST_LOOKBACK_DAYS: &str = "NIVESH_LATEST_LOOKBACK_DAYS";

const DEFAULT_DATA_DIR: &str = "./.nivesh";
const DB_FILE_NAME: &str = "nivesh.db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NiveshConfig {
    /// Directory holding the cache database and any other local state.
    pub data_dir: PathBuf,

    /// SQLite file; defaults to `<data_dir>/nivesh.db`.
    pub db_path: PathBuf,

    /// Upper bound on one plugin fetch, in seconds.
    pub fetch_timeout_secs: u64,

    /// Plugin fetches allowed in flight at once across all queries.
    pub max_concurrent_fetches: usize,

    /// How far before the expected trading date a latest-quote query looks.
    pub latest_lookback_days: u32,
}

impl Default for NiveshConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from(DEFAULT_DATA_DIR);
        Self {
            db_path: data_dir.join(DB_FILE_NAME),
            data_dir,
            fetch_timeout_secs: 30,
            max_concurrent_fetches: 8,
            latest_lookback_days: 7,
        }
    }
}

impl NiveshConfig {
    /// Reads configuration from `NIVESH_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let data_dir = lookup(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let db_path = lookup(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(DB_FILE_NAME));

        let config = Self {
            data_dir,
            db_path,
            fetch_timeout_secs: parse_var(&lookup, ENV_FETCH_TIMEOUT_SECS)?
                .unwrap_or(defaults.fetch_timeout_secs),
            max_concurrent_fetches: parse_var(&lookup, ENV_MAX_CONCURRENT_FETCHES)?
                .unwrap_or(defaults.max_concurrent_fetches),
            latest_lookback_days: parse_var(&lookup, ENV_LATEST_LOOKBACK_DAYS)?
                .unwrap_or(defaults.latest_lookback_days),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout_secs == 0 {
            return Err(Error::Config(format!("{} must be positive", ENV_FETCH_TIMEOUT_SECS)));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(Error::Config(format!(
                "{} must be positive",
                ENV_MAX_CONCURRENT_FETCHES
            )));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} has invalid value '{}'", key, raw))),
    }
}
