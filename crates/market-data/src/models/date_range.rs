//! Closed calendar-date intervals.

use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;

/// A closed interval of calendar days, `start <= end`.
///
/// Dates are treated as a discrete, totally ordered type: two ranges are
/// adjacent when one ends on the day before the other starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange", into = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Clone, Copy, Serialize, Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = MarketDataError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        DateRange::new(raw.start, raw.end)
    }
}

impl From<DateRange> for RawDateRange {
    fn from(range: DateRange) -> Self {
        RawDateRange {
            start: range.start,
            end: range.end,
        }
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, MarketDataError> {
        if start > end {
            return Err(MarketDataError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// A range covering exactly one day.
    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days in the range (always >= 1).
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// True when `other` lies entirely inside `self`.
    pub fn encloses(&self, other: &DateRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// True when the ranges overlap or sit next to each other with no gap.
    pub fn touches(&self, other: &DateRange) -> bool {
        let self_reach = self.end.succ_opt().unwrap_or(NaiveDate::MAX);
        let other_reach = other.end.succ_opt().unwrap_or(NaiveDate::MAX);
        self.start <= other_reach && other.start <= self_reach
    }

    /// Smallest range covering both, only meaningful when they touch.
    pub fn span(&self, other: &DateRange) -> DateRange {
        DateRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// The part of this range on or before `max`.
    pub fn clamp_end(&self, max: NaiveDate) -> Option<DateRange> {
        (self.start <= max).then(|| DateRange {
            start: self.start,
            end: self.end.min(max),
        })
    }

    /// Splits into consecutive ranges of at most `max_days` days each.
    ///
    /// `max_days == 0` is treated as "no limit".
    pub fn chunks(&self, max_days: u32) -> Vec<DateRange> {
        if max_days == 0 || self.num_days() <= i64::from(max_days) {
            return vec![*self];
        }

        let step = Duration::days(i64::from(max_days) - 1);
        let mut chunks = Vec::new();
        let mut cursor = self.start;
        loop {
            let chunk_end = cursor
                .checked_add_signed(step)
                .map_or(self.end, |d| d.min(self.end));
            chunks.push(DateRange {
                start: cursor,
                end: chunk_end,
            });
            match chunk_end.succ_opt() {
                Some(next) if chunk_end < self.end => cursor = next,
                _ => break,
            }
        }
        chunks
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}
