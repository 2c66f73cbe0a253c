//! Nivesh Core - ticker catalog, quote cache and quote resolution.
//!
//! This crate is storage-agnostic: it defines the [`quotes::QuoteStore`] and
//! [`catalog::CatalogStore`] traits that the `storage-sqlite` crate
//! implements, and ships in-memory versions of both. Data sources plug in
//! through `nivesh-market-data`.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod errors;
pub mod nivesh;
pub mod quotes;

pub use catalog::{CatalogEntry, TickerCatalog, TickerFilter};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::NiveshConfig;
pub use nivesh::{Nivesh, NiveshBuilder};
pub use quotes::{DateSpec, QuoteError, QuoteQuery, QuoteResponse, QuoteResult, TickerSelector};

// Re-export error types
pub use errors::Error;
pub use errors::Result;
