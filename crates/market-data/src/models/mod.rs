//! Market data models
//!
//! This module contains the vocabulary shared between the engine and sources:
//! - `types` - Source identifier (SourceId)
//! - `ticker` - Ticker identity, listing rows and metadata
//! - `quote` - Priced observations (QuotePoint)
//! - `date_range` - Closed calendar-date intervals (DateRange)
//! - `source` - Source self-description and tuning (SourceInfo, SourceConfig)

mod date_range;
mod quote;
mod source;
mod ticker;
mod types;

pub use date_range::DateRange;
pub use quote::{QuotePoint, INR};
pub use source::{SourceConfig, SourceInfo};
pub use ticker::{InstrumentCategory, Ticker, TickerListing, TickerMetadata};
pub use types::SourceId;
