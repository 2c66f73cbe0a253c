//! SQLite storage for ticker listings.

mod model;
mod repository;

pub use model::TickerDB;
pub use repository::SqliteCatalogStore;
