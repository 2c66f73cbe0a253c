//! Core error types for Nivesh.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! (from Diesel, SQLite, etc.) are converted to these types by the storage layer.

use chrono::NaiveDate;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::quotes::QuoteError;
use nivesh_market_data::MarketDataError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the engine.
///
/// Per-ticker failures inside a quote query never surface here; they are
/// reported in that ticker's result entry as a [`QuoteError`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Market data operation failed: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Catalog operation failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Quote operation failed: {0}")]
    Quote(#[from] QuoteError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Database-agnostic error type for storage operations.
///
/// This enum uses `String` for all error details, allowing the storage layer
/// to convert storage-specific errors (Diesel, SQLite, etc.) into this format.
#[derive(Error, Debug, Clone)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// A database transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Database migration failed.
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// A stored record failed its integrity check or could not be decoded.
    #[error("Corrupted record: {0}")]
    Corrupted(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Validation errors for caller input.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}
