//! Quote resolver: answers a ticker's date window from the cache, fetching
//! only what the cache does not already cover.
//!
//! # Flow
//!
//! ```text
//! window ─► coverage.missing(window) ─► gaps ─► chunks (max_fetch_span)
//!                                                  │
//!                          InFlight (dedupe) ◄─────┘
//!                                 │
//!                 semaphore ─► timeout(plugin.fetch) ─► cache.put
//! ```
//!
//! Only dates on or before a source's settled horizon (`today` minus its
//! publication lag) are recorded as covered. Later dates are still stored but
//! fetched again on the next query, since the source may not have published
//! them yet.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Weekday};
use futures::future::join_all;
use log::{debug, warn};
use tokio::sync::Semaphore;

use super::cache::QuoteCache;
use super::errors::QuoteError;
use super::inflight::{FetchOutcome, InFlight};
use super::store::StoredPoints;
use crate::clock::Clock;
use nivesh_market_data::{DateRange, QuotePoint, SourcePlugin, SourceRegistry, Ticker};

/// Tuning for [`QuoteResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverSettings {
    pub fetch_timeout: Duration,
    pub max_concurrent_fetches: usize,
    pub latest_lookback_days: u32,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            max_concurrent_fetches: 8,
            latest_lookback_days: 7,
        }
    }
}

pub struct QuoteResolver {
    registry: Arc<SourceRegistry>,
    cache: Arc<QuoteCache>,
    clock: Arc<dyn Clock>,
    inflight: InFlight,
    permits: Arc<Semaphore>,
    settings: ResolverSettings,
}

impl QuoteResolver {
    pub fn new(
        registry: Arc<SourceRegistry>,
        cache: Arc<QuoteCache>,
        clock: Arc<dyn Clock>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            registry,
            cache,
            clock,
            inflight: InFlight::new(),
            permits: Arc::new(Semaphore::new(settings.max_concurrent_fetches.max(1))),
            settings,
        }
    }

    /// Points for `ticker` within `window`, chronological.
    ///
    /// With `refresh` the whole window is fetched again; otherwise only the
    /// parts coverage is missing. Points the source returns outside `window`
    /// are cached but not returned. Covered days whose cached row turns out to
    /// be unreadable are dropped from coverage and fetched once more.
    pub async fn range(
        &self,
        ticker: &Ticker,
        window: DateRange,
        refresh: bool,
    ) -> Result<Vec<QuotePoint>, QuoteError> {
        let plugin = self.plugin(ticker)?;

        let gaps = if refresh {
            vec![window]
        } else {
            self.missing(ticker, window)?
        };
        let stored = self.read_through(&plugin, ticker, window, &gaps).await?;
        if stored.unreadable.is_empty() {
            return Ok(stored.points);
        }

        warn!(
            "{} has {} unreadable cached day(s) in {}, fetching them again",
            ticker,
            stored.unreadable.len(),
            window
        );
        self.cache
            .uncover(ticker, &stored.unreadable)
            .await
            .map_err(storage_error)?;

        let gaps = self.missing(ticker, window)?;
        let repaired = self.read_through(&plugin, ticker, window, &gaps).await?;
        if !repaired.unreadable.is_empty() {
            warn!(
                "{} still has {} unreadable cached day(s) in {}",
                ticker,
                repaired.unreadable.len(),
                window
            );
        }
        Ok(repaired.points)
    }

    fn missing(&self, ticker: &Ticker, window: DateRange) -> Result<Vec<DateRange>, QuoteError> {
        self.cache
            .get_coverage(ticker)
            .map(|coverage| coverage.missing(&window))
            .map_err(storage_error)
    }

    /// Fetches `gaps`, then reads `window` back from the cache.
    async fn read_through(
        &self,
        plugin: &Arc<dyn SourcePlugin>,
        ticker: &Ticker,
        window: DateRange,
        gaps: &[DateRange],
    ) -> Result<StoredPoints, QuoteError> {
        if gaps.is_empty() {
            debug!("{} {} answered from cache", ticker, window);
        } else {
            self.fetch_all(plugin, ticker, gaps).await?;
        }

        self.cache
            .get_points_with(ticker, window, gaps)
            .map_err(storage_error)
    }

    /// The single most recent point for `ticker`, or nothing if the source has
    /// none within the lookback window.
    ///
    /// The window runs from `lookback` days before the latest expected trading
    /// date up to today. If the newest cached point predates the expected
    /// date, everything after it is fetched again regardless of coverage.
    pub async fn latest(
        &self,
        ticker: &Ticker,
        refresh: bool,
    ) -> Result<Vec<QuotePoint>, QuoteError> {
        let plugin = self.plugin(ticker)?;
        let today = self.clock.today();
        let expected = last_weekday_on_or_before(self.settled_horizon(&plugin, today));
        let window_start = expected
            .checked_sub_signed(ChronoDuration::days(i64::from(self.settings.latest_lookback_days)))
            .unwrap_or(expected);
        let window = DateRange::new(window_start.min(today), today)
            .unwrap_or_else(|_| DateRange::single(today));

        let cached = self.latest_cached(ticker, window)?;
        let stale_from = match &cached {
            _ if refresh => Some(window.start()),
            Some(point) if point.date >= expected => None,
            Some(point) => point.date.succ_opt().filter(|next| *next <= today),
            None => Some(window.start()),
        };

        let Some(from) = stale_from else {
            debug!("{} latest point {} is current", ticker, expected);
            return Ok(cached.into_iter().collect());
        };

        let refetch = DateRange::new(from, today).unwrap_or_else(|_| DateRange::single(today));
        debug!(
            "{} latest point is older than {}, re-fetching {}",
            ticker, expected, refetch
        );
        self.fetch_all(&plugin, ticker, &[refetch]).await?;

        Ok(self.latest_cached(ticker, window)?.into_iter().collect())
    }

    fn latest_cached(
        &self,
        ticker: &Ticker,
        window: DateRange,
    ) -> Result<Option<QuotePoint>, QuoteError> {
        self.cache
            .latest_point(ticker, window)
            .map_err(storage_error)
    }

    fn plugin(&self, ticker: &Ticker) -> Result<Arc<dyn SourcePlugin>, QuoteError> {
        self.registry
            .get(&ticker.source)
            .map_err(|_| QuoteError::UnknownSource(ticker.source.clone()))
    }

    fn settled_horizon(&self, plugin: &Arc<dyn SourcePlugin>, today: NaiveDate) -> NaiveDate {
        let lag = plugin.config().data_refresh_interval;
        today
            .checked_sub_signed(lag)
            .map_or(today, |horizon| horizon.min(today))
    }

    /// Fetches every gap (split into spans the source accepts) concurrently.
    /// Fails with the first error once all fetches have settled.
    async fn fetch_all(
        &self,
        plugin: &Arc<dyn SourcePlugin>,
        ticker: &Ticker,
        gaps: &[DateRange],
    ) -> Result<(), QuoteError> {
        let config = plugin.config();
        let max_span = config.max_fetch_span.unwrap_or(0);
        let horizon = self.settled_horizon(plugin, self.clock.today());

        let fetches = gaps
            .iter()
            .flat_map(|gap| gap.chunks(max_span))
            .map(|chunk| self.fetch_chunk(plugin, ticker, chunk, horizon));

        join_all(fetches)
            .await
            .into_iter()
            .find_map(Result::err)
            .map_or(Ok(()), Err)
    }

    async fn fetch_chunk(
        &self,
        plugin: &Arc<dyn SourcePlugin>,
        ticker: &Ticker,
        chunk: DateRange,
        horizon: NaiveDate,
    ) -> FetchOutcome {
        let plugin = Arc::clone(plugin);
        let cache = Arc::clone(&self.cache);
        let permits = Arc::clone(&self.permits);
        let timeout = self.settings.fetch_timeout;
        let owned_ticker = ticker.clone();

        self.inflight
            .run(ticker, chunk, move || async move {
                let ticker = owned_ticker;
                let _permit = permits.acquire_owned().await.map_err(|_| {
                    QuoteError::SourceUnavailable {
                        source_id: ticker.source.clone(),
                        message: "resolver is shutting down".to_string(),
                    }
                })?;

                debug!("Fetching {} {}", ticker, chunk);
                let points = match tokio::time::timeout(timeout, plugin.fetch(&ticker.symbol, chunk))
                    .await
                {
                    Err(_) => {
                        warn!("Fetch for {} {} timed out after {:?}", ticker, chunk, timeout);
                        return Err(QuoteError::Timeout(ticker));
                    }
                    Ok(Err(e)) => {
                        warn!("Fetch for {} {} failed: {}", ticker, chunk, e);
                        return Err(QuoteError::from_source(&ticker, e));
                    }
                    Ok(Ok(points)) => points,
                };

                let points: Vec<QuotePoint> = points
                    .into_iter()
                    .map(|point| QuotePoint {
                        ticker: ticker.clone(),
                        ..point
                    })
                    .collect();
                let count = points.len();

                cache
                    .put(&ticker, points, chunk.clamp_end(horizon))
                    .await
                    .map_err(storage_error)?;
                Ok(count)
            })
            .await
    }
}

fn storage_error(e: crate::errors::Error) -> QuoteError {
    QuoteError::Storage(e.to_string())
}

/// The latest Monday-to-Friday date on or before `date`.
pub fn last_weekday_on_or_before(date: NaiveDate) -> NaiveDate {
    let back = match date.weekday() {
        Weekday::Sat => 1,
        Weekday::Sun => 2,
        _ => 0,
    };
    date.checked_sub_signed(ChronoDuration::days(back))
        .unwrap_or(date)
}
