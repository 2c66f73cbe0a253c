use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Descriptive information a source reports about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Registry key, same as the source id
    pub key: String,
    pub name: String,
    pub description: String,
    pub version: u32,
}

/// Refresh and fetch tuning a source hands to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// How long a ticker listing stays fresh. `None` means it never expires
    /// on its own and is only refreshed on demand.
    pub ticker_refresh_interval: Option<Duration>,

    /// Publication lag. Dates after `today - data_refresh_interval` are not
    /// yet settled at the source.
    pub data_refresh_interval: Duration,

    /// Longest window (in days) one `fetch` call may cover.
    pub max_fetch_span: Option<u32>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            ticker_refresh_interval: None,
            data_refresh_interval: Duration::days(1),
            max_fetch_span: None,
        }
    }
}
