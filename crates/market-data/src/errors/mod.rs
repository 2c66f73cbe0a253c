//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for registry and source operations
//! - [`RetryClass`]: Classification for deciding whether a caller may retry

mod retry;

pub use retry::RetryClass;

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::SourceId;

/// Errors that can occur during registry and source operations.
///
/// Each variant is classified into a [`RetryClass`] via the
/// [`retry_class`](Self::retry_class) method. The engine never retries on its
/// own; the classification is surfaced so callers can decide.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// A source with the same id is already registered.
    #[error("Duplicate source: {0}")]
    DuplicateSource(SourceId),

    /// No source is registered under this id.
    #[error("Unknown source: {0}")]
    UnknownSource(SourceId),

    /// The source cannot currently answer (network failure, bad response, ...).
    #[error("Source unavailable: {source_id} - {message}")]
    SourceUnavailable {
        /// The source that failed
        source_id: SourceId,
        /// What went wrong
        message: String,
    },

    /// The source does not know this symbol, or the symbol is malformed for it.
    #[error("Invalid ticker: {source_id}:{symbol}")]
    InvalidTicker {
        /// The source that rejected the symbol
        source_id: SourceId,
        /// The rejected symbol
        symbol: String,
    },

    /// The request to the source did not complete in time.
    #[error("Timeout: {source_id}")]
    Timeout {
        /// The source that timed out
        source_id: SourceId,
    },

    /// A date range was constructed with `start > end`.
    #[error("Invalid date range: {start} > {end}")]
    InvalidDateRange {
        /// Requested start
        start: NaiveDate,
        /// Requested end
        end: NaiveDate,
    },

    /// The source returned a payload that could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A network error occurred while communicating with a source.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Convenience constructor for [`MarketDataError::SourceUnavailable`].
    pub fn unavailable(source_id: &SourceId, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_id: source_id.clone(),
            message: message.into(),
        }
    }

    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use nivesh_market_data::errors::{MarketDataError, RetryClass};
    /// use nivesh_market_data::SourceId;
    ///
    /// let error = MarketDataError::Timeout { source_id: SourceId::new("amfi") };
    /// assert_eq!(error.retry_class(), RetryClass::Transient);
    ///
    /// let error = MarketDataError::UnknownSource(SourceId::new("nope"));
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::SourceUnavailable { .. } | Self::Timeout { .. } | Self::Network(_) => {
                RetryClass::Transient
            }

            Self::DuplicateSource(_)
            | Self::UnknownSource(_)
            | Self::InvalidTicker { .. }
            | Self::InvalidDateRange { .. }
            | Self::Parse(_) => RetryClass::Never,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_unavailable_is_transient() {
        let error = MarketDataError::unavailable(&SourceId::new("amfi"), "connection reset");
        assert_eq!(error.retry_class(), RetryClass::Transient);
    }

    #[test]
    fn test_invalid_ticker_never_retries() {
        let error = MarketDataError::InvalidTicker {
            source_id: SourceId::new("amfi"),
            symbol: "ABC".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_registry_errors_never_retry() {
        let id = SourceId::new("amfi");
        assert_eq!(
            MarketDataError::DuplicateSource(id.clone()).retry_class(),
            RetryClass::Never
        );
        assert_eq!(
            MarketDataError::UnknownSource(id).retry_class(),
            RetryClass::Never
        );
    }

    #[test]
    fn test_error_display() {
        let error = MarketDataError::InvalidTicker {
            source_id: SourceId::new("amfi"),
            symbol: "XYZ".to_string(),
        };
        assert_eq!(format!("{}", error), "Invalid ticker: amfi:XYZ");

        let error = MarketDataError::unavailable(&SourceId::new("amfi"), "HTTP 503");
        assert_eq!(
            format!("{}", error),
            "Source unavailable: amfi - HTTP 503"
        );
    }
}
