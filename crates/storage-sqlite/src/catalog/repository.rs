use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::warn;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::model::TickerDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::tickers::dsl as tickers_dsl;
use nivesh_core::catalog::{CatalogStore, SourceListing};
use nivesh_core::Result;
use nivesh_market_data::SourceId;

/// Durable [`CatalogStore`] backed by the `tickers` table.
pub struct SqliteCatalogStore {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SqliteCatalogStore {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn replace_listing(&self, listing: &SourceListing) -> Result<()> {
        let rows = listing
            .tickers
            .iter()
            .map(|ticker| TickerDB::new(&listing.source_id, ticker, listing.last_updated))
            .collect::<std::result::Result<Vec<_>, _>>()
            .into_core()?;
        let source_id = listing.source_id.to_string();

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::delete(tickers_dsl::tickers.filter(tickers_dsl::source_id.eq(source_id.as_str())))
                    .execute(conn)
                    .map_err(StorageError::QueryFailed)?;
                for chunk in rows.chunks(1_000) {
                    diesel::replace_into(tickers_dsl::tickers)
                        .values(chunk)
                        .execute(conn)
                        .map_err(StorageError::QueryFailed)?;
                }
                Ok(())
            })
            .await
    }

    async fn remove_listing(&self, source_id: &SourceId) -> Result<()> {
        let source_id = source_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::delete(tickers_dsl::tickers.filter(tickers_dsl::source_id.eq(source_id)))
                    .execute(conn)
                    .map_err(StorageError::QueryFailed)?;
                Ok(())
            })
            .await
    }

    fn load_listings(&self) -> Result<Vec<SourceListing>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = tickers_dsl::tickers
            .order((tickers_dsl::source_id.asc(), tickers_dsl::symbol.asc()))
            .select(TickerDB::as_select())
            .load::<TickerDB>(&mut conn)
            .into_core()?;

        let mut listings: BTreeMap<String, SourceListing> = BTreeMap::new();
        for row in rows {
            let Some(last_updated) = row.last_updated() else {
                warn!(
                    "Skipping ticker {}:{} with unreadable timestamp '{}'",
                    row.source_id, row.symbol, row.last_updated
                );
                continue;
            };
            let listing = listings
                .entry(row.source_id.clone())
                .or_insert_with(|| SourceListing {
                    source_id: SourceId::new(row.source_id.clone()),
                    last_updated,
                    tickers: Vec::new(),
                });
            // Treat the listing as only as fresh as its oldest row
            listing.last_updated = listing.last_updated.min(last_updated);
            listing.tickers.push(row.into_listing());
        }

        Ok(listings.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use chrono::{TimeZone, Utc};
    use nivesh_market_data::{InstrumentCategory, TickerListing, TickerMetadata};
    use tempfile::tempdir;

    fn create_test_store() -> (SqliteCatalogStore, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_url = crate::db::init(&temp_dir.path().join("test.db")).expect("Failed to init database");
        let pool = create_pool(&db_url).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());
        (SqliteCatalogStore::new(pool, writer), temp_dir)
    }

    fn listing(source: &str, symbols: &[&str]) -> SourceListing {
        SourceListing {
            source_id: SourceId::new(source),
            last_updated: Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap(),
            tickers: symbols
                .iter()
                .map(|symbol| {
                    TickerListing::new(
                        *symbol,
                        TickerMetadata::new(format!("Scheme {}", symbol), InstrumentCategory::MutualFund)
                            .with_isin(format!("INF{}", symbol))
                            .with_attribute("fund_house", "UTI Mutual Fund"),
                    )
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_listing_round_trips_with_metadata() {
        let (store, _temp_dir) = create_test_store();
        let stored = listing("amfi", &["100", "200"]);

        store.replace_listing(&stored).await.unwrap();

        assert_eq!(store.load_listings().unwrap(), vec![stored]);
    }

    #[tokio::test]
    async fn test_replace_drops_symbols_no_longer_listed() {
        let (store, _temp_dir) = create_test_store();
        store.replace_listing(&listing("amfi", &["100", "200"])).await.unwrap();
        store.replace_listing(&listing("other", &["100"])).await.unwrap();

        let replacement = listing("amfi", &["300"]);
        store.replace_listing(&replacement).await.unwrap();

        let loaded = store.load_listings().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], replacement);
        assert_eq!(loaded[1].tickers.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_listing() {
        let (store, _temp_dir) = create_test_store();
        store.replace_listing(&listing("amfi", &["100"])).await.unwrap();

        store.remove_listing(&SourceId::new("amfi")).await.unwrap();

        assert!(store.load_listings().unwrap().is_empty());
    }
}
