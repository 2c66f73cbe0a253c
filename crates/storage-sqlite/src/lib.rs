//! SQLite storage implementation for Nivesh.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the storage traits defined in `nivesh-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - The single-writer actor every mutation goes through
//! - `QuoteStore` and `CatalogStore` implementations
//!
//! # Architecture
//!
//! This crate is the only place where Diesel dependencies exist. The core
//! crate is database-agnostic and works with traits.
//!
//! ```text
//!        core (cache, catalog)
//!                  │
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```

pub mod catalog;
pub mod db;
pub mod errors;
pub mod market_data;
pub mod schema;
mod storage;

pub use catalog::SqliteCatalogStore;
pub use db::{create_pool, get_connection, init, run_migrations, DbConnection, DbPool, WriteHandle};
pub use errors::{IntoCore, StorageError};
pub use market_data::SqliteQuoteStore;
pub use storage::SqliteStorage;

// Re-export from nivesh-core for convenience
pub use nivesh_core::errors::{DatabaseError, Error, Result};
