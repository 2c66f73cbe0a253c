use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::warn;
use std::sync::Arc;

use super::model::{format_day, QuoteCoverageDB, QuoteDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::quote_coverage::dsl as coverage_dsl;
use crate::schema::quotes::dsl as quotes_dsl;
use nivesh_core::errors::Error;
use nivesh_core::quotes::{CoverageRange, QuoteStore, StoredPoints};
use nivesh_core::Result;
use nivesh_market_data::{DateRange, QuotePoint, Ticker};

/// Durable [`QuoteStore`] backed by the `quotes` and `quote_coverage` tables.
///
/// Reads go through the pool; every commit goes through the single writer so
/// a ticker's points and coverage land in one immediate transaction.
pub struct SqliteQuoteStore {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SqliteQuoteStore {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    fn range_query<'a>(
        ticker: &'a Ticker,
        range: DateRange,
    ) -> crate::schema::quotes::BoxedQuery<'a, diesel::sqlite::Sqlite> {
        quotes_dsl::quotes
            .filter(quotes_dsl::source_id.eq(ticker.source.as_str()))
            .filter(quotes_dsl::symbol.eq(ticker.symbol.as_str()))
            .filter(quotes_dsl::day.ge(format_day(range.start())))
            .filter(quotes_dsl::day.le(format_day(range.end())))
            .into_boxed()
    }
}

#[async_trait]
impl QuoteStore for SqliteQuoteStore {
    async fn commit(
        &self,
        ticker: &Ticker,
        points: &[QuotePoint],
        coverage: &CoverageRange,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let quote_rows: Vec<QuoteDB> = points
            .iter()
            .map(|point| QuoteDB::from_point(point, &now))
            .collect();
        let coverage_row = QuoteCoverageDB::new(ticker, coverage, &now).into_core()?;

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                for chunk in quote_rows.chunks(1_000) {
                    diesel::replace_into(quotes_dsl::quotes)
                        .values(chunk)
                        .execute(conn)
                        .map_err(StorageError::QueryFailed)?;
                }
                diesel::replace_into(coverage_dsl::quote_coverage)
                    .values(&coverage_row)
                    .execute(conn)
                    .map_err(StorageError::QueryFailed)?;
                Ok(())
            })
            .await
    }

    async fn discard(
        &self,
        ticker: &Ticker,
        dates: &[NaiveDate],
        coverage: &CoverageRange,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let source_id = ticker.source.to_string();
        let symbol = ticker.symbol.clone();
        let days: Vec<String> = dates.iter().copied().map(format_day).collect();
        let coverage_row = QuoteCoverageDB::new(ticker, coverage, &now).into_core()?;

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::delete(
                    quotes_dsl::quotes
                        .filter(quotes_dsl::source_id.eq(source_id))
                        .filter(quotes_dsl::symbol.eq(symbol))
                        .filter(quotes_dsl::day.eq_any(days)),
                )
                .execute(conn)
                .map_err(StorageError::QueryFailed)?;
                diesel::replace_into(coverage_dsl::quote_coverage)
                    .values(&coverage_row)
                    .execute(conn)
                    .map_err(StorageError::QueryFailed)?;
                Ok(())
            })
            .await
    }

    fn load_coverage(&self, ticker: &Ticker) -> Result<Option<CoverageRange>> {
        let mut conn = get_connection(&self.pool)?;

        let row = coverage_dsl::quote_coverage
            .filter(coverage_dsl::source_id.eq(ticker.source.as_str()))
            .filter(coverage_dsl::symbol.eq(ticker.symbol.as_str()))
            .select(QuoteCoverageDB::as_select())
            .first(&mut conn)
            .optional()
            .into_core()?;

        match row {
            None => Ok(None),
            Some(row) => row.into_coverage().map(Some).map_err(|e| {
                warn!("Stored coverage for {} rejected: {}", ticker, e);
                Error::Database(e)
            }),
        }
    }

    fn load_points(&self, ticker: &Ticker, range: DateRange) -> Result<StoredPoints> {
        let mut conn = get_connection(&self.pool)?;

        let rows = Self::range_query(ticker, range)
            .order(quotes_dsl::day.asc())
            .select(QuoteDB::as_select())
            .load::<QuoteDB>(&mut conn)
            .into_core()?;

        let mut stored = StoredPoints::default();
        for row in rows {
            let date = row.date();
            match row.into_point() {
                Some(point) => stored.points.push(point),
                None => stored.unreadable.extend(date),
            }
        }
        Ok(stored)
    }

    fn latest_point(&self, ticker: &Ticker, range: DateRange) -> Result<Option<QuotePoint>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = Self::range_query(ticker, range)
            .order(quotes_dsl::day.desc())
            .select(QuoteDB::as_select())
            .load::<QuoteDB>(&mut conn)
            .into_core()?;

        Ok(rows.into_iter().find_map(QuoteDB::into_point))
    }

    async fn flush(&self) -> Result<()> {
        self.writer.flush().await
    }
}
