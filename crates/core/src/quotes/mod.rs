//! Quote caching and resolution.
//!
//! - [`coverage`] - Interval sets recording which dates are already fetched
//! - [`store`] - Storage trait behind the cache, plus an in-memory store
//! - [`cache`] - Points and coverage with per-ticker write exclusion
//! - [`inflight`] - Sharing of identical concurrent fetches
//! - [`resolver`] - Gap computation and fetch orchestration
//! - [`model`] - Query and result types
//!
//! # Architecture
//!
//! ```text
//! QuoteResolver → SourcePlugin (market-data crate)
//!       ↓
//! QuoteCache → QuoteStore (memory / SQLite)
//! ```

pub mod cache;
pub mod coverage;
pub mod errors;
pub mod inflight;
pub mod model;
pub mod resolver;
pub mod store;

pub use cache::QuoteCache;
pub use coverage::CoverageRange;
pub use errors::QuoteError;
pub use model::{DateSpec, QuoteQuery, QuoteResponse, QuoteResult, TickerSelector};
pub use resolver::{QuoteResolver, ResolverSettings};
pub use store::{MemoryQuoteStore, QuoteStore, StoredPoints};
