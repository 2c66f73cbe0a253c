use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use diesel::connection::{Connection, SimpleConnection};
use diesel::r2d2::{self, ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{error, info};

use crate::errors::{IntoCore, StorageError};
use nivesh_core::errors::{DatabaseError, Error, Result};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

pub mod write_actor;
pub use write_actor::{spawn_writer, WriteHandle};

/// Creates the database file (and its directory) if needed and switches it
/// to WAL journaling. Returns the path as a connection string.
pub fn init(db_path: &Path) -> Result<String> {
    if let Some(db_dir) = db_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        if !db_dir.exists() {
            fs::create_dir_all(db_dir).map_err(StorageError::from)?;
        }
    }

    let db_url = db_path.to_string_lossy().into_owned();
    {
        let mut conn = SqliteConnection::establish(&db_url).map_err(StorageError::from)?;
        conn.batch_execute(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA busy_timeout = 30000;
            PRAGMA synchronous  = FULL;
        ",
        )
        .into_core()?;
    }

    Ok(db_url)
}

pub fn create_pool(db_url: &str) -> Result<Arc<DbPool>> {
    let manager = ConnectionManager::<SqliteConnection>::new(db_url);
    let pool = r2d2::Pool::builder()
        .max_size(8)
        .min_idle(Some(1))
        .connection_timeout(Duration::from_secs(30))
        .connection_customizer(Box::new(ConnectionCustomizer))
        .build(manager)
        .map_err(|e| Error::Database(DatabaseError::PoolCreationFailed(e.to_string())))?;
    Ok(Arc::new(pool))
}

pub fn run_migrations(pool: &DbPool) -> Result<()> {
    info!("Running database migrations");
    let mut connection = get_connection(pool)?;

    let result = connection.run_pending_migrations(MIGRATIONS).map_err(|e| {
        error!("Database migration failed: {}", e);
        Error::Database(DatabaseError::MigrationFailed(e.to_string()))
    })?;

    if result.is_empty() {
        info!("No pending migrations to apply.");
    } else {
        info!("Applied the following migrations:");
        for migration_version in &result {
            info!("  - {}", migration_version);
        }
    }

    Ok(())
}

/// Gets a connection from the pool
pub fn get_connection(pool: &Pool<ConnectionManager<SqliteConnection>>) -> Result<DbConnection> {
    pool.get().into_core()
}

#[derive(Debug)]
struct ConnectionCustomizer;

impl r2d2::CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), r2d2::Error> {
        conn.batch_execute(
            "
            PRAGMA busy_timeout = 30000;
            PRAGMA synchronous = FULL;
        ",
        )
        .map_err(r2d2::Error::QueryError)
    }
}
