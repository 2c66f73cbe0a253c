use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::types::SourceId;

/// Instrument identity scoped to one source.
///
/// The symbol format is source-defined (AMFI uses numeric scheme codes).
/// The same symbol may exist under different sources without collision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ticker {
    pub source: SourceId,
    pub symbol: String,
}

impl Ticker {
    pub fn new(source: impl Into<SourceId>, symbol: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            symbol: symbol.into(),
        }
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.symbol)
    }
}

/// Instrument classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstrumentCategory {
    #[default]
    MutualFund,
    Equity,
    Etf,
    Index,
    Other,
}

impl InstrumentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MutualFund => "MUTUAL_FUND",
            Self::Equity => "EQUITY",
            Self::Etf => "ETF",
            Self::Index => "INDEX",
            Self::Other => "OTHER",
        }
    }
}

impl FromStr for InstrumentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MUTUAL_FUND" => Ok(Self::MutualFund),
            "EQUITY" => Ok(Self::Equity),
            "ETF" => Ok(Self::Etf),
            "INDEX" => Ok(Self::Index),
            "OTHER" => Ok(Self::Other),
            other => Err(format!("unknown instrument category '{}'", other)),
        }
    }
}

/// Descriptive data for a ticker, as listed by its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TickerMetadata {
    /// Display name (e.g., scheme name)
    pub name: String,

    pub category: InstrumentCategory,

    /// ISIN, when the source publishes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isin: Option<String>,

    /// Source-specific extras
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl TickerMetadata {
    pub fn new(name: impl Into<String>, category: InstrumentCategory) -> Self {
        Self {
            name: name.into(),
            category,
            isin: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_isin(mut self, isin: impl Into<String>) -> Self {
        self.isin = Some(isin.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// One row of a source's ticker listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerListing {
    pub symbol: String,
    pub metadata: TickerMetadata,
}

impl TickerListing {
    pub fn new(symbol: impl Into<String>, metadata: TickerMetadata) -> Self {
        Self {
            symbol: symbol.into(),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_display() {
        let ticker = Ticker::new("amfi", "119551");
        assert_eq!(ticker.to_string(), "amfi:119551");
    }

    #[test]
    fn test_same_symbol_different_sources_are_distinct() {
        let a = Ticker::new("amfi", "100");
        let b = Ticker::new("bse", "100");
        assert_ne!(a, b);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        assert_eq!(
            "MUTUAL_FUND".parse::<InstrumentCategory>(),
            Ok(InstrumentCategory::MutualFund)
        );
        assert!("BOND".parse::<InstrumentCategory>().is_err());
    }
}
