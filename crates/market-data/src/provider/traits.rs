//! Source plugin trait definition.
//!
//! This module defines the `SourcePlugin` trait that every data source
//! implements. The engine never looks past this trait into a source's
//! transport.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{DateRange, QuotePoint, SourceConfig, SourceId, SourceInfo, TickerListing};

/// Trait for data source plugins.
///
/// Implement this trait to add a new data source. The registry keys the
/// plugin by [`id`](Self::id), so the id must be stable across runs: it is
/// part of every cached quote's identity.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use nivesh_market_data::provider::SourcePlugin;
///
/// struct MySource;
///
/// #[async_trait]
/// impl SourcePlugin for MySource {
///     fn id(&self) -> SourceId {
///         SourceId::new("mine")
///     }
///
///     fn info(&self) -> SourceInfo { ... }
///
///     async fn list_tickers(&self) -> Result<Vec<TickerListing>, MarketDataError> { ... }
///
///     async fn fetch(&self, symbol: &str, range: DateRange)
///         -> Result<Vec<QuotePoint>, MarketDataError> { ... }
/// }
/// ```
#[async_trait]
pub trait SourcePlugin: Send + Sync {
    /// Unique identifier for this source, e.g. "amfi".
    fn id(&self) -> SourceId;

    /// Human-readable description of the source.
    fn info(&self) -> SourceInfo;

    /// Refresh and fetch tuning. Defaults to a one-day publication lag with
    /// no listing expiry and no fetch span limit.
    fn config(&self) -> SourceConfig {
        SourceConfig::default()
    }

    /// Enumerate every ticker the source can answer for.
    ///
    /// Fails with `SourceUnavailable` when the listing cannot currently be
    /// obtained.
    async fn list_tickers(&self) -> Result<Vec<TickerListing>, MarketDataError>;

    /// Fetch price points for `symbol` within `range`.
    ///
    /// An empty result means the source has no data for that window (holidays,
    /// weekends). Points outside `range` are allowed. Fails with
    /// `SourceUnavailable` or `InvalidTicker`.
    async fn fetch(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> Result<Vec<QuotePoint>, MarketDataError>;
}
