//! SQLite storage for cached quotes and coverage.

mod model;
mod repository;

pub use model::{coverage_checksum, QuoteCoverageDB, QuoteDB};
pub use repository::SqliteQuoteStore;
