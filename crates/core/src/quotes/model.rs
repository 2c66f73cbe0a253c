//! Quote query and result models.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::errors::QuoteError;
use nivesh_market_data::{QuotePoint, SourceId, Ticker};

/// Which dates a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DateSpec {
    /// A single calendar day.
    On { date: NaiveDate },
    /// An inclusive range; `start > end` fails the whole query.
    Range { start: NaiveDate, end: NaiveDate },
    /// The most recent available point, refreshed when stale.
    Latest,
}

/// One requested ticker, as the caller wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TickerSelector {
    /// A symbol without a source; resolved across every loaded listing.
    Symbol(String),
    /// `source:symbol`.
    Qualified(Ticker),
    /// Every catalog ticker of a source, written `source:*`.
    AllFromSource(SourceId),
}

impl TickerSelector {
    pub fn symbol(symbol: impl Into<String>) -> Self {
        Self::Symbol(symbol.into())
    }

    pub fn qualified(source: impl Into<SourceId>, symbol: impl Into<String>) -> Self {
        Self::Qualified(Ticker::new(source, symbol))
    }

    pub fn all_from(source: impl Into<SourceId>) -> Self {
        Self::AllFromSource(source.into())
    }
}

impl FromStr for TickerSelector {
    type Err = String;

    /// Splits at the first `:`; a `*` symbol selects the whole source.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once(':') {
            None if s.is_empty() => Err("empty ticker selector".to_string()),
            None => Ok(Self::Symbol(s.to_string())),
            Some((source, _)) if source.trim().is_empty() => {
                Err(format!("missing source in selector '{}'", s))
            }
            Some((_, symbol)) if symbol.trim().is_empty() => {
                Err(format!("missing symbol in selector '{}'", s))
            }
            Some((source, "*")) => Ok(Self::AllFromSource(SourceId::new(source.trim()))),
            Some((source, symbol)) => Ok(Self::qualified(source.trim(), symbol.trim())),
        }
    }
}

impl fmt::Display for TickerSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symbol(symbol) => write!(f, "{}", symbol),
            Self::Qualified(ticker) => write!(f, "{}", ticker),
            Self::AllFromSource(source) => write!(f, "{}:*", source),
        }
    }
}

/// A request for quotes over one or more tickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteQuery {
    pub selectors: Vec<TickerSelector>,
    pub date: DateSpec,

    /// Restricts symbol resolution to this source. A qualified ticker from a
    /// different source is reported as unknown under this source.
    #[serde(default)]
    pub source: Option<SourceId>,

    /// Re-fetch the whole window even where it is already covered.
    #[serde(default)]
    pub refresh: bool,
}

impl QuoteQuery {
    pub fn new(selectors: impl IntoIterator<Item = TickerSelector>, date: DateSpec) -> Self {
        Self {
            selectors: selectors.into_iter().collect(),
            date,
            source: None,
            refresh: false,
        }
    }

    pub fn with_source(mut self, source: impl Into<SourceId>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }
}

/// Outcome for one requested ticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteResult {
    /// The selector this entry answers.
    pub request: TickerSelector,
    /// The resolved ticker, when resolution succeeded.
    pub ticker: Option<Ticker>,
    /// Chronological points, or why this ticker failed.
    pub outcome: Result<Vec<QuotePoint>, QuoteError>,
}

impl QuoteResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn points(&self) -> &[QuotePoint] {
        self.outcome.as_deref().unwrap_or_default()
    }

    pub fn error(&self) -> Option<&QuoteError> {
        self.outcome.as_ref().err()
    }
}

/// Entries in request order, one per requested ticker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteResponse {
    pub results: Vec<QuoteResult>,
}

impl QuoteResponse {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuoteResult> {
        self.results.iter()
    }

    pub fn failures(&self) -> impl Iterator<Item = &QuoteResult> {
        self.results.iter().filter(|result| !result.is_ok())
    }
}

impl IntoIterator for QuoteResponse {
    type Item = QuoteResult;
    type IntoIter = std::vec::IntoIter<QuoteResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}
