//! Interval bookkeeping for which dates of a ticker are already fetched.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use nivesh_market_data::DateRange;

/// Dates known to be fully fetched for one ticker, including dates that
/// turned out to have no data.
///
/// Invariant: intervals are sorted ascending and no two of them overlap or
/// touch; adjacent intervals are always coalesced into one. Every constructor
/// and mutator restores this, including deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<DateRange>", into = "Vec<DateRange>")]
pub struct CoverageRange {
    intervals: Vec<DateRange>,
}

impl CoverageRange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a normalized coverage from arbitrary (possibly overlapping,
    /// unsorted) intervals.
    pub fn from_intervals(intervals: impl IntoIterator<Item = DateRange>) -> Self {
        let mut coverage = Self::new();
        for range in intervals {
            coverage.insert(range);
        }
        coverage
    }

    pub fn intervals(&self) -> &[DateRange] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Unions `range` in, coalescing with every interval it overlaps or
    /// touches.
    pub fn insert(&mut self, range: DateRange) {
        let mut merged = range;
        let mut result = Vec::with_capacity(self.intervals.len() + 1);
        let mut placed = false;

        for interval in self.intervals.drain(..) {
            if interval.touches(&merged) {
                merged = merged.span(&interval);
            } else if interval.end() < merged.start() {
                result.push(interval);
            } else {
                if !placed {
                    result.push(merged);
                    placed = true;
                }
                result.push(interval);
            }
        }
        if !placed {
            result.push(merged);
        }

        self.intervals = result;
    }

    /// Takes every date of `range` out, splitting the interval it lands in.
    pub fn remove(&mut self, range: DateRange) {
        let mut result = Vec::with_capacity(self.intervals.len() + 1);

        for interval in self.intervals.drain(..) {
            if interval.end() < range.start() || interval.start() > range.end() {
                result.push(interval);
                continue;
            }
            if let Some(left) = range
                .start()
                .pred_opt()
                .and_then(|to| DateRange::new(interval.start(), to).ok())
            {
                result.push(left);
            }
            if let Some(right) = range
                .end()
                .succ_opt()
                .and_then(|from| DateRange::new(from, interval.end()).ok())
            {
                result.push(right);
            }
        }

        self.intervals = result;
    }

    pub fn union(&self, other: &CoverageRange) -> CoverageRange {
        let mut merged = self.clone();
        for range in &other.intervals {
            merged.insert(*range);
        }
        merged
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.interval_at(date).is_some()
    }

    /// True when every date of `range` is covered.
    pub fn covers(&self, range: &DateRange) -> bool {
        self.interval_at(range.start())
            .is_some_and(|interval| interval.encloses(range))
    }

    /// The sub-intervals of `range` not yet covered, as maximal disjoint
    /// ranges in ascending order.
    pub fn missing(&self, range: &DateRange) -> Vec<DateRange> {
        let mut gaps = Vec::new();
        let mut cursor = Some(range.start());

        for interval in &self.intervals {
            let Some(from) = cursor else {
                break;
            };
            if interval.end() < from {
                continue;
            }
            if interval.start() > range.end() {
                break;
            }
            if interval.start() > from {
                if let Some(gap) = interval
                    .start()
                    .pred_opt()
                    .and_then(|to| DateRange::new(from, to).ok())
                {
                    gaps.push(gap);
                }
            }
            cursor = interval.end().succ_opt().filter(|next| *next <= range.end());
        }

        if let Some(from) = cursor {
            if let Ok(gap) = DateRange::new(from, range.end()) {
                gaps.push(gap);
            }
        }
        gaps
    }

    fn interval_at(&self, date: NaiveDate) -> Option<&DateRange> {
        let idx = self.intervals.partition_point(|interval| interval.end() < date);
        self.intervals
            .get(idx)
            .filter(|interval| interval.contains(date))
    }
}

impl From<Vec<DateRange>> for CoverageRange {
    fn from(intervals: Vec<DateRange>) -> Self {
        Self::from_intervals(intervals)
    }
}

impl From<CoverageRange> for Vec<DateRange> {
    fn from(coverage: CoverageRange) -> Self {
        coverage.intervals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn r(start: u32, end: u32) -> DateRange {
        DateRange::new(d(start), d(end)).unwrap()
    }

    #[test]
    fn test_adjacent_ranges_coalesce() {
        let mut coverage = CoverageRange::new();
        coverage.insert(r(1, 10));
        coverage.insert(r(11, 20));
        assert_eq!(coverage.intervals(), &[r(1, 20)]);
    }

    #[test]
    fn test_insert_bridges_multiple_intervals() {
        let mut coverage = CoverageRange::from_intervals([r(1, 3), r(10, 12), r(20, 25)]);
        coverage.insert(r(4, 19));
        assert_eq!(coverage.intervals(), &[r(1, 25)]);
    }

    #[test]
    fn test_insert_keeps_disjoint_intervals_sorted() {
        let coverage = CoverageRange::from_intervals([r(20, 25), r(1, 3), r(10, 12)]);
        assert_eq!(coverage.intervals(), &[r(1, 3), r(10, 12), r(20, 25)]);
    }

    #[test]
    fn test_missing_reports_both_sides_of_covered_middle() {
        let coverage = CoverageRange::from_intervals([r(10, 20)]);
        assert_eq!(coverage.missing(&r(1, 31)), vec![r(1, 9), r(21, 31)]);
    }

    #[test]
    fn test_missing_when_fully_covered() {
        let coverage = CoverageRange::from_intervals([r(1, 31)]);
        assert!(coverage.missing(&r(5, 6)).is_empty());
        assert!(coverage.covers(&r(5, 6)));
    }

    #[test]
    fn test_missing_with_no_coverage_is_whole_range() {
        assert_eq!(CoverageRange::new().missing(&r(3, 7)), vec![r(3, 7)]);
    }

    #[test]
    fn test_missing_between_several_intervals() {
        let coverage = CoverageRange::from_intervals([r(1, 2), r(5, 6), r(9, 9)]);
        assert_eq!(coverage.missing(&r(2, 10)), vec![r(3, 4), r(7, 8), r(10, 10)]);
    }

    #[test]
    fn test_contains_and_covers() {
        let coverage = CoverageRange::from_intervals([r(1, 5), r(10, 15)]);
        assert!(coverage.contains(d(5)));
        assert!(!coverage.contains(d(7)));
        assert!(!coverage.covers(&r(4, 11)));
    }

    #[test]
    fn test_remove_splits_interval() {
        let mut coverage = CoverageRange::from_intervals([r(1, 31)]);
        coverage.remove(DateRange::single(d(7)));
        assert_eq!(coverage.intervals(), &[r(1, 6), r(8, 31)]);
        assert!(!coverage.contains(d(7)));
    }

    #[test]
    fn test_remove_spanning_several_intervals() {
        let mut coverage = CoverageRange::from_intervals([r(1, 5), r(8, 10), r(14, 20)]);
        coverage.remove(r(4, 15));
        assert_eq!(coverage.intervals(), &[r(1, 3), r(16, 20)]);

        coverage.remove(r(1, 3));
        assert_eq!(coverage.intervals(), &[r(16, 20)]);
        coverage.remove(r(25, 31));
        assert_eq!(coverage.intervals(), &[r(16, 20)]);
    }

    #[test]
    fn test_deserialize_normalizes() {
        let json = r#"[{"start":"2025-01-11","end":"2025-01-20"},{"start":"2025-01-01","end":"2025-01-10"}]"#;
        let coverage: CoverageRange = serde_json::from_str(json).unwrap();
        assert_eq!(coverage.intervals(), &[r(1, 20)]);
    }
}
