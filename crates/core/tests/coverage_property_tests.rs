//! Property-based integration tests for quote coverage bookkeeping.
//!
//! These tests check the interval invariants of `CoverageRange` across
//! random insert sequences, using the `proptest` crate for case generation.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use nivesh_core::quotes::CoverageRange;
use nivesh_market_data::DateRange;

// =============================================================================
// Generators
// =============================================================================

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// Generates a date range within a 120-day window so inserts often overlap
/// or touch.
fn arb_range() -> impl Strategy<Value = DateRange> {
    (0i64..120, 0i64..15).prop_map(|(offset, len)| {
        let start = base_date() + Duration::days(offset);
        DateRange::new(start, start + Duration::days(len)).unwrap()
    })
}

fn arb_ranges(max_count: usize) -> impl Strategy<Value = Vec<DateRange>> {
    proptest::collection::vec(arb_range(), 0..=max_count)
}

fn days_of(range: &DateRange) -> impl Iterator<Item = NaiveDate> {
    range.start().iter_days().take_while({
        let end = range.end();
        move |d| *d <= end
    })
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Intervals stay sorted, disjoint and non-adjacent after any inserts.
    #[test]
    fn prop_intervals_sorted_and_coalesced(ranges in arb_ranges(20)) {
        let coverage = CoverageRange::from_intervals(ranges);
        for pair in coverage.intervals().windows(2) {
            let gap_start = pair[0].end().succ_opt().unwrap();
            prop_assert!(gap_start < pair[1].start(), "{:?} and {:?} should have been merged", pair[0], pair[1]);
        }
    }

    /// A date is covered exactly when some inserted range contains it.
    #[test]
    fn prop_contains_matches_inserted_days(ranges in arb_ranges(12), offset in 0i64..140) {
        let coverage = CoverageRange::from_intervals(ranges.clone());
        let date = base_date() + Duration::days(offset);
        let expected = ranges.iter().any(|r| r.contains(date));
        prop_assert_eq!(coverage.contains(date), expected);
    }

    /// Inserting never removes a covered date.
    #[test]
    fn prop_insert_is_monotone(ranges in arb_ranges(12), extra in arb_range(), offset in 0i64..140) {
        let before = CoverageRange::from_intervals(ranges);
        let mut after = before.clone();
        after.insert(extra);
        let date = base_date() + Duration::days(offset);
        if before.contains(date) {
            prop_assert!(after.contains(date));
        }
        prop_assert!(after.covers(&extra));
    }

    /// Gaps are disjoint from coverage, ascending, and together with coverage
    /// account for every day of the query.
    #[test]
    fn prop_missing_is_exact_complement(ranges in arb_ranges(12), query in arb_range()) {
        let coverage = CoverageRange::from_intervals(ranges);
        let gaps = coverage.missing(&query);

        for pair in gaps.windows(2) {
            prop_assert!(pair[0].end() < pair[1].start());
            prop_assert!(!pair[0].touches(&pair[1]));
        }
        for day in days_of(&query) {
            let in_gap = gaps.iter().any(|g| g.contains(day));
            prop_assert_ne!(in_gap, coverage.contains(day), "day {} misclassified", day);
        }
        for gap in &gaps {
            prop_assert!(query.encloses(gap));
        }
    }

    /// Filling the gaps makes the query fully covered.
    #[test]
    fn prop_filling_gaps_covers_query(ranges in arb_ranges(12), query in arb_range()) {
        let mut coverage = CoverageRange::from_intervals(ranges);
        for gap in coverage.missing(&query) {
            coverage.insert(gap);
        }
        prop_assert!(coverage.covers(&query));
        prop_assert!(coverage.missing(&query).is_empty());
    }

    /// Union is order-independent.
    #[test]
    fn prop_union_commutes(a in arb_ranges(8), b in arb_ranges(8)) {
        let left = CoverageRange::from_intervals(a);
        let right = CoverageRange::from_intervals(b);
        prop_assert_eq!(left.union(&right), right.union(&left));
    }

    /// Removing a range uncovers exactly its days and keeps the rest.
    #[test]
    fn prop_remove_uncovers_exactly_the_range(ranges in arb_ranges(12), removed in arb_range()) {
        let before = CoverageRange::from_intervals(ranges);
        let mut after = before.clone();
        after.remove(removed);

        for pair in after.intervals().windows(2) {
            prop_assert!(!pair[0].touches(&pair[1]));
        }
        for offset in 0..150 {
            let day = base_date() + Duration::days(offset);
            let expected = before.contains(day) && !removed.contains(day);
            prop_assert_eq!(after.contains(day), expected, "day {} misclassified", day);
        }
    }
}
