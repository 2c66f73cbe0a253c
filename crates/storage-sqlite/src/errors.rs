//! Storage-specific error types for SQLite operations.
//!
//! This module provides error types that wrap Diesel-specific errors and convert
//! them to the database-agnostic error types defined in `nivesh_core`.

use diesel::result::Error as DieselError;
use nivesh_core::errors::{DatabaseError, Error};
use thiserror::Error;

/// Storage-specific errors that wrap Diesel and r2d2 types.
///
/// These errors are internal to the storage layer and are converted to
/// `nivesh_core::Error` before being returned to callers.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[from] diesel::ConnectionError),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Query execution failed: {0}")]
    QueryFailed(#[from] DieselError),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A core error raised inside a writer job, carried through the
    /// transaction wrapper unchanged.
    #[error(transparent)]
    Core(#[from] Error),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConnectionFailed(e) => {
                Error::Database(DatabaseError::ConnectionFailed(e.to_string()))
            }
            StorageError::PoolError(e) => {
                Error::Database(DatabaseError::PoolCreationFailed(e.to_string()))
            }
            StorageError::QueryFailed(DieselError::RollbackTransaction) => {
                Error::Database(DatabaseError::TransactionFailed(
                    "transaction rolled back".to_string(),
                ))
            }
            StorageError::QueryFailed(e) => {
                Error::Database(DatabaseError::QueryFailed(e.to_string()))
            }
            StorageError::MigrationFailed(e) => Error::Database(DatabaseError::MigrationFailed(e)),
            StorageError::SerializationError(e) => Error::Database(DatabaseError::Internal(e)),
            StorageError::Io(e) => Error::Database(DatabaseError::ConnectionFailed(e.to_string())),
            StorageError::Core(e) => e,
        }
    }
}

/// Extension trait for easily converting Diesel Results to core Results.
///
/// This provides a `.into_core()` method on any `Result<T, diesel::result::Error>`
/// which handles the conversion through StorageError.
pub trait IntoCore<T> {
    fn into_core(self) -> nivesh_core::Result<T>;
}

impl<T> IntoCore<T> for std::result::Result<T, DieselError> {
    fn into_core(self) -> nivesh_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}

impl<T> IntoCore<T> for std::result::Result<T, r2d2::Error> {
    fn into_core(self) -> nivesh_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}

impl<T> IntoCore<T> for std::result::Result<T, serde_json::Error> {
    fn into_core(self) -> nivesh_core::Result<T> {
        self.map_err(|e| StorageError::SerializationError(e.to_string()).into())
    }
}
