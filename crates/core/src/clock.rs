//! Time source for staleness and freshness decisions.

use std::sync::RwLock;

use chrono::{DateTime, NaiveDate, Utc};

/// Source of the current time. Swapped out in tests to pin "today".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// A clock pinned to midday UTC on `date`.
    pub fn on(date: NaiveDate) -> Self {
        let now = date
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);
        Self::new(now)
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(|e| e.into_inner()) = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fixed_clock_moves_only_when_set() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let clock = FixedClock::on(day);
        assert_eq!(clock.today(), day);

        clock.set(clock.now() + Duration::days(2));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 3, 16).unwrap());
    }
}
