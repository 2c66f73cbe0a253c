//! Catalog domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nivesh_market_data::{SourceId, Ticker, TickerListing, TickerMetadata};

/// A known ticker and its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub ticker: Ticker,
    pub metadata: TickerMetadata,
}

/// A source's full listing as persisted, with the time it was fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceListing {
    pub source_id: SourceId,
    pub last_updated: DateTime<Utc>,
    pub tickers: Vec<TickerListing>,
}

/// Narrows catalog listings. Each non-empty list matches entries whose field
/// equals one of its values; lists are combined with OR. An empty filter
/// matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickerFilter {
    pub symbols: Vec<String>,
    pub names: Vec<String>,
    pub isins: Vec<String>,
}

impl TickerFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbols(mut self, symbols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.symbols.extend(symbols.into_iter().map(Into::into));
        self
    }

    pub fn with_names(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.names.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_isins(mut self, isins: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.isins.extend(isins.into_iter().map(Into::into));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.names.is_empty() && self.isins.is_empty()
    }

    pub fn matches(&self, symbol: &str, metadata: &TickerMetadata) -> bool {
        if self.is_empty() {
            return true;
        }
        self.symbols.iter().any(|s| s == symbol)
            || self.names.iter().any(|n| *n == metadata.name)
            || metadata
                .isin
                .as_ref()
                .is_some_and(|isin| self.isins.iter().any(|i| i == isin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nivesh_market_data::InstrumentCategory;

    fn metadata() -> TickerMetadata {
        TickerMetadata::new("UTI Nifty Next 50 Index Fund - Direct", InstrumentCategory::MutualFund)
            .with_isin("INF789FC12T1")
    }

    #[test]
    fn test_empty_filter_matches_all() {
        assert!(TickerFilter::new().matches("120716", &metadata()));
    }

    #[test]
    fn test_filters_combine_with_or() {
        let filter = TickerFilter::new()
            .with_symbols(["0500209"])
            .with_names(["UTI Nifty Next 50 Index Fund - Direct"]);
        assert!(filter.matches("120716", &metadata()));
        assert!(filter.matches("0500209", &TickerMetadata::default()));
        assert!(!filter.matches("500210", &TickerMetadata::default()));
    }

    #[test]
    fn test_isin_filter() {
        let filter = TickerFilter::new().with_isins(["INF789FC12T1"]);
        assert!(filter.matches("120716", &metadata()));
        assert!(!filter.matches("120716", &TickerMetadata::default()));
    }
}
