//! Ticker catalog: which `(source, symbol)` pairs exist and what they are.
//!
//! Listings come from each source's `list_tickers`, are persisted through a
//! [`CatalogStore`], and are used to resolve bare symbols to tickers.

mod errors;
mod model;
mod service;
mod store;

pub use errors::CatalogError;
pub use model::{CatalogEntry, SourceListing, TickerFilter};
pub use service::TickerCatalog;
pub use store::{CatalogStore, MemoryCatalogStore};
