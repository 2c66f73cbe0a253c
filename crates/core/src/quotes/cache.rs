//! Quote cache: stored points plus the coverage that says which dates are
//! already known.
//!
//! Writes for one ticker are serialized by a per-ticker async lock held across
//! the store commit. Readers never take that lock; they clone the ticker's
//! coverage out of an in-memory snapshot that is only replaced after a commit
//! succeeds, so they see either the old or the new interval set.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::NaiveDate;
use dashmap::DashMap;
use log::{debug, warn};
use tokio::sync::Mutex;

use super::coverage::CoverageRange;
use super::store::{QuoteStore, StoredPoints};
use crate::errors::{DatabaseError, Error, Result};
use nivesh_market_data::{DateRange, QuotePoint, Ticker};

pub struct QuoteCache {
    store: Arc<dyn QuoteStore>,
    coverage: RwLock<HashMap<Ticker, CoverageRange>>,
    write_locks: DashMap<Ticker, Arc<Mutex<()>>>,
}

impl QuoteCache {
    pub fn new(store: Arc<dyn QuoteStore>) -> Self {
        Self {
            store,
            coverage: RwLock::new(HashMap::new()),
            write_locks: DashMap::new(),
        }
    }

    /// Coverage for `ticker`; empty if never fetched or if the persisted
    /// record is corrupted.
    ///
    /// Any other store error is returned and nothing is remembered, so the
    /// next call reads the store again.
    pub fn get_coverage(&self, ticker: &Ticker) -> Result<CoverageRange> {
        if let Some(coverage) = self
            .coverage
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(ticker)
        {
            return Ok(coverage.clone());
        }

        let loaded = match self.store.load_coverage(ticker) {
            Ok(coverage) => coverage.unwrap_or_default(),
            Err(Error::Database(DatabaseError::Corrupted(reason))) => {
                warn!(
                    "Coverage for {} is corrupted, treating as uncovered: {}",
                    ticker, reason
                );
                CoverageRange::new()
            }
            Err(e) => {
                warn!("Could not load coverage for {}: {}", ticker, e);
                return Err(e);
            }
        };

        // A concurrent put may have published a newer snapshot while the store
        // was being read; keep that one.
        Ok(self
            .coverage
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(ticker.clone())
            .or_insert(loaded)
            .clone())
    }

    /// Stored points inside `range` that fall within coverage, chronological.
    /// Never fetches.
    ///
    /// Covered dates whose stored row is unreadable come back in
    /// [`StoredPoints::unreadable`]; see [`uncover`](Self::uncover).
    pub fn get_points(&self, ticker: &Ticker, range: DateRange) -> Result<StoredPoints> {
        let coverage = self.get_coverage(ticker)?;
        self.points_within(ticker, range, &coverage)
    }

    /// Like [`get_points`](Self::get_points), also admitting dates in
    /// `fetched` that were just fetched but are not (yet) part of coverage.
    pub fn get_points_with(
        &self,
        ticker: &Ticker,
        range: DateRange,
        fetched: &[DateRange],
    ) -> Result<StoredPoints> {
        let mut visible = self.get_coverage(ticker)?;
        for extra in fetched {
            visible.insert(*extra);
        }
        self.points_within(ticker, range, &visible)
    }

    fn points_within(
        &self,
        ticker: &Ticker,
        range: DateRange,
        visible: &CoverageRange,
    ) -> Result<StoredPoints> {
        if visible.is_empty() {
            return Ok(StoredPoints::default());
        }
        let stored = self.store.load_points(ticker, range)?;
        Ok(StoredPoints {
            points: stored
                .points
                .into_iter()
                .filter(|point| visible.contains(point.date))
                .collect(),
            unreadable: stored
                .unreadable
                .into_iter()
                .filter(|date| visible.contains(*date))
                .collect(),
        })
    }

    /// Most recent stored point in `window`, whether or not its date is
    /// settled into coverage.
    pub fn latest_point(&self, ticker: &Ticker, window: DateRange) -> Result<Option<QuotePoint>> {
        self.store.latest_point(ticker, window)
    }

    /// Stores `points` and unions `fetched` into the ticker's coverage.
    ///
    /// Both are committed to the store in one transaction before this returns.
    /// A `fetched` range with no points is still recorded as covered. If the
    /// current coverage cannot be read, nothing is written.
    pub async fn put(
        &self,
        ticker: &Ticker,
        points: Vec<QuotePoint>,
        fetched: Option<DateRange>,
    ) -> Result<CoverageRange> {
        let lock = self.write_lock(ticker);
        let _guard = lock.lock().await;

        let mut merged = self.get_coverage(ticker)?;
        if let Some(range) = fetched {
            merged.insert(range);
        }

        self.store.commit(ticker, &points, &merged).await?;
        debug!(
            "Cached {} points for {}, coverage now {} interval(s)",
            points.len(),
            ticker,
            merged.intervals().len()
        );

        self.publish(ticker, merged.clone());
        Ok(merged)
    }

    /// Takes `dates` out of the ticker's coverage and drops whatever is stored
    /// on them, so the next resolve fetches them again.
    pub async fn uncover(&self, ticker: &Ticker, dates: &[NaiveDate]) -> Result<CoverageRange> {
        let lock = self.write_lock(ticker);
        let _guard = lock.lock().await;

        let mut reduced = self.get_coverage(ticker)?;
        for date in dates {
            reduced.remove(DateRange::single(*date));
        }

        self.store.discard(ticker, dates, &reduced).await?;
        warn!(
            "Dropped {} unreadable cached day(s) from {}",
            dates.len(),
            ticker
        );

        self.publish(ticker, reduced.clone());
        Ok(reduced)
    }

    pub async fn flush(&self) -> Result<()> {
        self.store.flush().await
    }

    fn publish(&self, ticker: &Ticker, coverage: CoverageRange) {
        self.coverage
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(ticker.clone(), coverage);
    }

    fn write_lock(&self, ticker: &Ticker) -> Arc<Mutex<()>> {
        Arc::clone(
            self.write_locks
                .entry(ticker.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }
}
