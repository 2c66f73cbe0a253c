//! Nivesh Market Data Crate
//!
//! This crate defines the vocabulary shared between the quote engine and its
//! data sources, the plugin contract sources implement, and the registry the
//! engine looks them up in.
//!
//! # Overview
//!
//! ```text
//! +------------------+     +------------------+
//! |  SourceRegistry  | --> |   SourcePlugin   |  (AMFI, ...)
//! +------------------+     +------------------+
//!                                  |
//!                       list_tickers / fetch
//!                                  v
//!                  +-------------------------------+
//!                  |  TickerListing / QuotePoint   |
//!                  +-------------------------------+
//! ```
//!
//! # Core Types
//!
//! - [`SourceId`] - Stable identifier of a registered source (e.g. "amfi")
//! - [`Ticker`] - Instrument identity scoped to one source
//! - [`QuotePoint`] - One priced observation for a ticker on a date
//! - [`DateRange`] - Closed interval of calendar days
//! - [`SourceConfig`] - Refresh and fetch tuning a source reports

pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

pub use errors::{MarketDataError, RetryClass};
pub use models::{
    DateRange, InstrumentCategory, QuotePoint, SourceConfig, SourceId, SourceInfo, Ticker,
    TickerListing, TickerMetadata, INR,
};
pub use provider::amfi::AmfiSource;
pub use provider::SourcePlugin;
pub use registry::SourceRegistry;
