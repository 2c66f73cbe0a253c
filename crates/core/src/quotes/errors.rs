//! Per-ticker quote errors.

use thiserror::Error;

use crate::catalog::CatalogError;
use nivesh_market_data::{MarketDataError, SourceId, Ticker};

/// Why one ticker's entry in a quote query failed.
///
/// Cloneable so a single in-flight fetch can hand the same outcome to every
/// caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    #[error("Unknown ticker: {symbol}")]
    UnknownTicker {
        symbol: String,
        source_id: Option<SourceId>,
    },

    #[error("Ambiguous ticker '{symbol}': defined by {}", join_sources(.sources))]
    AmbiguousTicker {
        symbol: String,
        sources: Vec<SourceId>,
    },

    #[error("Unknown source: {0}")]
    UnknownSource(SourceId),

    #[error("Invalid ticker: {0}")]
    InvalidTicker(Ticker),

    #[error("Source unavailable: {source_id} - {message}")]
    SourceUnavailable { source_id: SourceId, message: String },

    #[error("Fetch timed out: {0}")]
    Timeout(Ticker),

    #[error("Storage error: {0}")]
    Storage(String),
}

fn join_sources(sources: &[SourceId]) -> String {
    sources
        .iter()
        .map(SourceId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl QuoteError {
    /// Whether asking again later could succeed. The engine never retries on
    /// its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. } | Self::Timeout(_) | Self::Storage(_)
        )
    }

    /// Maps a plugin failure for `ticker` into a per-ticker error.
    pub fn from_source(ticker: &Ticker, err: MarketDataError) -> Self {
        match err {
            MarketDataError::InvalidTicker { .. } => Self::InvalidTicker(ticker.clone()),
            MarketDataError::Timeout { .. } => Self::Timeout(ticker.clone()),
            MarketDataError::UnknownSource(id) | MarketDataError::DuplicateSource(id) => {
                Self::UnknownSource(id)
            }
            other => Self::SourceUnavailable {
                source_id: ticker.source.clone(),
                message: other.to_string(),
            },
        }
    }
}

impl From<CatalogError> for QuoteError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownTicker { symbol, source_id } => {
                Self::UnknownTicker { symbol, source_id }
            }
            CatalogError::AmbiguousTicker { symbol, sources } => {
                Self::AmbiguousTicker { symbol, sources }
            }
            CatalogError::UnknownSource(id) => Self::UnknownSource(id),
            CatalogError::SourceUnavailable { source_id, message } => {
                Self::SourceUnavailable { source_id, message }
            }
            CatalogError::Storage(message) => Self::Storage(message),
        }
    }
}
