//! De-duplication of concurrent fetches for the same ticker and window.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use log::debug;

use super::errors::QuoteError;
use nivesh_market_data::{DateRange, Ticker};

pub type FetchOutcome = Result<usize, QuoteError>;

type FetchKey = (Ticker, DateRange);
type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

/// Table of fetches currently running, keyed by `(Ticker, window)`.
///
/// The first caller for a key starts the fetch; anyone arriving while it runs
/// awaits the same future and receives a clone of its outcome. The entry is
/// removed by the fetch itself when it completes, so a later call for the same
/// key starts fresh.
#[derive(Clone, Default)]
pub struct InFlight {
    fetches: Arc<Mutex<HashMap<FetchKey, SharedFetch>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `start()` for `(ticker, range)` unless an identical fetch is
    /// already running, in which case its outcome is awaited instead.
    pub async fn run<F, Fut>(&self, ticker: &Ticker, range: DateRange, start: F) -> FetchOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchOutcome> + Send + 'static,
    {
        let key = (ticker.clone(), range);
        let shared = {
            let mut fetches = self.fetches.lock().unwrap_or_else(PoisonError::into_inner);
            match fetches.get(&key) {
                Some(existing) => {
                    debug!("Joining in-flight fetch for {} {}", ticker, range);
                    existing.clone()
                }
                None => {
                    let table = Arc::clone(&self.fetches);
                    let cleanup_key = key.clone();
                    let fetch = start();
                    let shared = async move {
                        let outcome = fetch.await;
                        table
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .remove(&cleanup_key);
                        outcome
                    }
                    .boxed()
                    .shared();
                    fetches.insert(key, shared.clone());
                    shared
                }
            }
        };
        shared.await
    }

    pub fn len(&self) -> usize {
        self.fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn range() -> DateRange {
        DateRange::single(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap())
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let inflight = InFlight::new();
        let ticker = Ticker::new("amfi", "100");
        let calls = Arc::new(AtomicUsize::new(0));

        let run = |calls: Arc<AtomicUsize>| {
            let inflight = inflight.clone();
            let ticker = ticker.clone();
            async move {
                inflight
                    .run(&ticker, range(), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(3)
                    })
                    .await
            }
        };

        let (a, b) = tokio::join!(run(Arc::clone(&calls)), run(Arc::clone(&calls)));
        assert_eq!(a, Ok(3));
        assert_eq!(b, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(inflight.is_empty());
    }

    #[tokio::test]
    async fn test_completed_fetch_is_not_reused() {
        let inflight = InFlight::new();
        let ticker = Ticker::new("amfi", "100");
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            inflight
                .run(&ticker, range(), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(0)
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_reach_every_waiter() {
        let inflight = InFlight::new();
        let ticker = Ticker::new("amfi", "100");

        let fail = || {
            let ticker = ticker.clone();
            let inflight = inflight.clone();
            async move {
                let timed_out = ticker.clone();
                inflight
                    .run(&ticker, range(), move || async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Err(QuoteError::Timeout(timed_out))
                    })
                    .await
            }
        };

        let (a, b) = tokio::join!(fail(), fail());
        assert!(matches!(a, Err(QuoteError::Timeout(_))));
        assert_eq!(a, b);
    }
}
