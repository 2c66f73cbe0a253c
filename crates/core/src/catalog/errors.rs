//! Catalog error types.

use thiserror::Error;

use nivesh_market_data::SourceId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Unknown ticker: {symbol}")]
    UnknownTicker {
        symbol: String,
        source_id: Option<SourceId>,
    },

    #[error("Ambiguous ticker '{symbol}': defined by {} sources", .sources.len())]
    AmbiguousTicker {
        symbol: String,
        sources: Vec<SourceId>,
    },

    #[error("Unknown source: {0}")]
    UnknownSource(SourceId),

    #[error("Source unavailable: {source_id} - {message}")]
    SourceUnavailable { source_id: SourceId, message: String },

    #[error("Catalog storage error: {0}")]
    Storage(String),
}
