//! One-call setup of the SQLite-backed stores.

use std::path::Path;
use std::sync::Arc;

use log::info;

use crate::catalog::SqliteCatalogStore;
use crate::db::{create_pool, init, run_migrations, spawn_writer, DbPool, WriteHandle};
use crate::market_data::SqliteQuoteStore;
use nivesh_core::{NiveshBuilder, Result};

/// An opened, migrated database with its writer task.
///
/// Must be opened from within a Tokio runtime.
pub struct SqliteStorage {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SqliteStorage {
    pub fn open(db_path: &Path) -> Result<Self> {
        let db_url = init(db_path)?;
        let pool = create_pool(&db_url)?;
        run_migrations(&pool)?;
        let writer = spawn_writer((*pool).clone());
        info!("Opened quote database at {}", db_url);
        Ok(Self { pool, writer })
    }

    pub fn quote_store(&self) -> Arc<SqliteQuoteStore> {
        Arc::new(SqliteQuoteStore::new(Arc::clone(&self.pool), self.writer.clone()))
    }

    pub fn catalog_store(&self) -> Arc<SqliteCatalogStore> {
        Arc::new(SqliteCatalogStore::new(Arc::clone(&self.pool), self.writer.clone()))
    }

    /// Points both stores of `builder` at this database.
    pub fn attach(&self, builder: NiveshBuilder) -> NiveshBuilder {
        builder
            .with_quote_store(self.quote_store())
            .with_catalog_store(self.catalog_store())
    }

    pub fn pool(&self) -> &Arc<DbPool> {
        &self.pool
    }
}
