//! Quote storage traits.
//!
//! This module defines the persistence interface behind the quote cache, so
//! the engine can run against SQLite in production and an in-memory store in
//! tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::coverage::CoverageRange;
use crate::errors::Result;
use nivesh_market_data::{DateRange, QuotePoint, Ticker};

/// Points read back from a store for one range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredPoints {
    /// Decoded points, ordered by date.
    pub points: Vec<QuotePoint>,
    /// Dates with a stored row that could not be decoded.
    pub unreadable: Vec<NaiveDate>,
}

/// Storage interface for cached quotes and their coverage.
///
/// # Design Notes
///
/// - `commit` is the only mutation and is async, since durable writes may go
///   through a writer task
/// - Reads are sync and expected to be fast
/// - A coverage record that fails its integrity check must come back as
///   `DatabaseError::Corrupted` rather than as a (wrong) coverage; the cache
///   treats it as uncovered
/// - A point row that cannot be decoded is reported by date in
///   [`StoredPoints::unreadable`], never silently dropped
#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// Upserts `points` and replaces the ticker's coverage with `coverage`,
    /// atomically and durably.
    ///
    /// `coverage` is the already-merged interval set, not a delta.
    async fn commit(
        &self,
        ticker: &Ticker,
        points: &[QuotePoint],
        coverage: &CoverageRange,
    ) -> Result<()>;

    /// Stored coverage for a ticker, `None` if never written.
    fn load_coverage(&self, ticker: &Ticker) -> Result<Option<CoverageRange>>;

    /// Removes the points stored on `dates` and replaces the ticker's coverage
    /// with `coverage`, atomically and durably.
    async fn discard(
        &self,
        ticker: &Ticker,
        dates: &[NaiveDate],
        coverage: &CoverageRange,
    ) -> Result<()>;

    /// Stored points inside `range`, ordered by date.
    fn load_points(&self, ticker: &Ticker, range: DateRange) -> Result<StoredPoints>;

    /// The most recent readable stored point inside `range`.
    fn latest_point(&self, ticker: &Ticker, range: DateRange) -> Result<Option<QuotePoint>>;

    /// Waits until every acknowledged write has reached durable storage.
    async fn flush(&self) -> Result<()>;
}

#[derive(Default)]
struct MemoryState {
    points: HashMap<Ticker, BTreeMap<NaiveDate, QuotePoint>>,
    coverage: HashMap<Ticker, CoverageRange>,
}

/// Non-durable store for tests and ephemeral use.
#[derive(Default)]
pub struct MemoryQuoteStore {
    state: Mutex<MemoryState>,
}

impl MemoryQuoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

#[async_trait]
impl QuoteStore for MemoryQuoteStore {
    async fn commit(
        &self,
        ticker: &Ticker,
        points: &[QuotePoint],
        coverage: &CoverageRange,
    ) -> Result<()> {
        self.with_state(|state| {
            let series = state.points.entry(ticker.clone()).or_default();
            for point in points {
                series.insert(point.date, point.clone());
            }
            state.coverage.insert(ticker.clone(), coverage.clone());
        });
        Ok(())
    }

    async fn discard(
        &self,
        ticker: &Ticker,
        dates: &[NaiveDate],
        coverage: &CoverageRange,
    ) -> Result<()> {
        self.with_state(|state| {
            if let Some(series) = state.points.get_mut(ticker) {
                for date in dates {
                    series.remove(date);
                }
            }
            state.coverage.insert(ticker.clone(), coverage.clone());
        });
        Ok(())
    }

    fn load_coverage(&self, ticker: &Ticker) -> Result<Option<CoverageRange>> {
        Ok(self.with_state(|state| state.coverage.get(ticker).cloned()))
    }

    fn load_points(&self, ticker: &Ticker, range: DateRange) -> Result<StoredPoints> {
        let points = self.with_state(|state| {
            state
                .points
                .get(ticker)
                .map(|series| {
                    series
                        .range(range.start()..=range.end())
                        .map(|(_, point)| point.clone())
                        .collect()
                })
                .unwrap_or_default()
        });
        Ok(StoredPoints {
            points,
            unreadable: Vec::new(),
        })
    }

    fn latest_point(&self, ticker: &Ticker, range: DateRange) -> Result<Option<QuotePoint>> {
        Ok(self.with_state(|state| {
            state.points.get(ticker).and_then(|series| {
                series
                    .range(range.start()..=range.end())
                    .next_back()
                    .map(|(_, point)| point.clone())
            })
        }))
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}
