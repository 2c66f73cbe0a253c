//! The engine running on SQLite: cached quotes and listings outlive a
//! restart, and a damaged coverage record only costs a re-fetch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use diesel::prelude::*;
use rust_decimal_macros::dec;
use tempfile::tempdir;

use nivesh_core::{DateSpec, FixedClock, Nivesh, QuoteQuery, TickerSelector};
use nivesh_market_data::{
    DateRange, InstrumentCategory, MarketDataError, QuotePoint, SourceId, SourceInfo,
    SourcePlugin, Ticker, TickerListing, TickerMetadata, INR,
};
use nivesh_storage_sqlite::schema::quote_coverage::dsl as coverage_dsl;
use nivesh_storage_sqlite::schema::quotes::dsl as quotes_dsl;
use nivesh_storage_sqlite::{get_connection, SqliteStorage};

#[derive(Default)]
struct CountingSource {
    fetches: AtomicUsize,
    listings: AtomicUsize,
}

#[async_trait]
impl SourcePlugin for CountingSource {
    fn id(&self) -> SourceId {
        SourceId::amfi()
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            key: "amfi".to_string(),
            name: "Counting".to_string(),
            description: String::new(),
            version: 1,
        }
    }

    async fn list_tickers(&self) -> Result<Vec<TickerListing>, MarketDataError> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        Ok(vec![TickerListing::new(
            "120716",
            TickerMetadata::new("UTI Nifty 50 Index Fund", InstrumentCategory::MutualFund),
        )])
    }

    async fn fetch(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> Result<Vec<QuotePoint>, MarketDataError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let ticker = Ticker::new(SourceId::amfi(), symbol);
        let mut points = Vec::new();
        let mut day = range.start();
        while day <= range.end() {
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                points.push(QuotePoint::new(ticker.clone(), day, dec!(152.4123), INR));
            }
            day = day.succ_opt().unwrap();
        }
        Ok(points)
    }
}

fn d(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap()
}

fn open(storage: &SqliteStorage, source: &Arc<CountingSource>) -> Nivesh {
    storage
        .attach(Nivesh::builder())
        .with_source(Arc::clone(source) as Arc<dyn SourcePlugin>)
        .with_clock(Arc::new(FixedClock::on(d(6, 2))))
        .build()
        .unwrap()
}

fn january() -> QuoteQuery {
    QuoteQuery::new(
        [TickerSelector::symbol("120716")],
        DateSpec::Range {
            start: d(1, 1),
            end: d(1, 31),
        },
    )
}

#[tokio::test]
async fn test_cache_survives_restart() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("nivesh.db");
    let source = Arc::new(CountingSource::default());

    let first = {
        let storage = SqliteStorage::open(&db_path).unwrap();
        let nivesh = open(&storage, &source);
        let response = nivesh.get_quotes(&january()).await.unwrap();
        nivesh.shutdown().await.unwrap();
        response
    };
    assert_eq!(first.results[0].points().len(), 23);

    let storage = SqliteStorage::open(&db_path).unwrap();
    let nivesh = open(&storage, &source);
    let second = nivesh.get_quotes(&january()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(source.listings.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_corrupted_coverage_triggers_refetch() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("nivesh.db");
    let source = Arc::new(CountingSource::default());

    {
        let storage = SqliteStorage::open(&db_path).unwrap();
        let nivesh = open(&storage, &source);
        nivesh.get_quotes(&january()).await.unwrap();
        nivesh.shutdown().await.unwrap();

        let mut conn = get_connection(storage.pool()).unwrap();
        diesel::update(coverage_dsl::quote_coverage)
            .set(coverage_dsl::checksum.eq("0000"))
            .execute(&mut conn)
            .unwrap();
    }

    let storage = SqliteStorage::open(&db_path).unwrap();
    let nivesh = open(&storage, &source);
    let response = nivesh.get_quotes(&january()).await.unwrap();

    assert_eq!(response.results[0].points().len(), 23);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    assert_eq!(
        nivesh
            .cache()
            .get_coverage(&Ticker::new(SourceId::amfi(), "120716"))
            .unwrap()
            .intervals(),
        &[DateRange::new(d(1, 1), d(1, 31)).unwrap()]
    );
}

#[tokio::test]
async fn test_unreadable_cached_price_triggers_refetch() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("nivesh.db");
    let source = Arc::new(CountingSource::default());

    {
        let storage = SqliteStorage::open(&db_path).unwrap();
        let nivesh = open(&storage, &source);
        let response = nivesh.get_quotes(&january()).await.unwrap();
        assert_eq!(response.results[0].points().len(), 23);
        nivesh.shutdown().await.unwrap();

        let mut conn = get_connection(storage.pool()).unwrap();
        diesel::update(quotes_dsl::quotes.filter(quotes_dsl::day.eq("2025-01-07")))
            .set(quotes_dsl::price.eq("garbage"))
            .execute(&mut conn)
            .unwrap();
    }

    let storage = SqliteStorage::open(&db_path).unwrap();
    let nivesh = open(&storage, &source);
    let repaired = nivesh.get_quotes(&january()).await.unwrap();
    let again = nivesh.get_quotes(&january()).await.unwrap();

    let points = repaired.results[0].points();
    assert_eq!(points.len(), 23);
    assert!(points.iter().any(|point| point.date == d(1, 7)));
    assert_eq!(repaired, again);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    assert_eq!(
        nivesh
            .cache()
            .get_coverage(&Ticker::new(SourceId::amfi(), "120716"))
            .unwrap()
            .intervals(),
        &[DateRange::new(d(1, 1), d(1, 31)).unwrap()]
    );
}
