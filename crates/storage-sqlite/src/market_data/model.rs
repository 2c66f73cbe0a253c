//! Database models for cached quotes and their coverage.

use std::str::FromStr;

use chrono::NaiveDate;
use diesel::prelude::*;
use log::warn;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use nivesh_core::errors::DatabaseError;
use nivesh_core::quotes::CoverageRange;
use nivesh_market_data::{QuotePoint, Ticker};

const DAY_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Database model for quotes
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::quotes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct QuoteDB {
    pub source_id: String,
    pub symbol: String,
    pub day: String,
    pub price: String,
    pub currency: String,
    pub fetched_at: String,
}

impl QuoteDB {
    pub fn from_point(point: &QuotePoint, fetched_at: &str) -> Self {
        Self {
            source_id: point.ticker.source.to_string(),
            symbol: point.ticker.symbol.clone(),
            day: format_day(point.date),
            price: point.price.to_string(),
            currency: point.currency.clone(),
            fetched_at: fetched_at.to_string(),
        }
    }

    /// The stored day, if it parses.
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.day, DAY_FORMAT).ok()
    }

    /// Converts back to a point, or `None` (logged) if the stored day or
    /// price does not parse.
    pub fn into_point(self) -> Option<QuotePoint> {
        let date = match NaiveDate::parse_from_str(&self.day, DAY_FORMAT) {
            Ok(date) => date,
            Err(e) => {
                warn!(
                    "Quote {}:{} has unreadable day '{}': {}",
                    self.source_id, self.symbol, self.day, e
                );
                return None;
            }
        };
        let price = match Decimal::from_str(&self.price) {
            Ok(price) => price,
            Err(e) => {
                warn!(
                    "Quote {}:{} on {} has unreadable price '{}': {}",
                    self.source_id, self.symbol, self.day, self.price, e
                );
                return None;
            }
        };
        Some(QuotePoint::new(
            Ticker::new(self.source_id, self.symbol),
            date,
            price,
            self.currency,
        ))
    }
}

/// Database model for a ticker's coverage record
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::quote_coverage)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct QuoteCoverageDB {
    pub source_id: String,
    pub symbol: String,
    pub intervals: String,
    pub checksum: String,
    pub updated_at: String,
}

/// Hex SHA-256 of the serialized intervals.
pub fn coverage_checksum(intervals: &str) -> String {
    hex::encode(Sha256::digest(intervals.as_bytes()))
}

impl QuoteCoverageDB {
    pub fn new(
        ticker: &Ticker,
        coverage: &CoverageRange,
        updated_at: &str,
    ) -> Result<Self, serde_json::Error> {
        let intervals = serde_json::to_string(coverage)?;
        Ok(Self {
            source_id: ticker.source.to_string(),
            symbol: ticker.symbol.clone(),
            checksum: coverage_checksum(&intervals),
            intervals,
            updated_at: updated_at.to_string(),
        })
    }

    /// Verifies the checksum and decodes the intervals.
    pub fn into_coverage(self) -> Result<CoverageRange, DatabaseError> {
        if coverage_checksum(&self.intervals) != self.checksum {
            return Err(DatabaseError::Corrupted(format!(
                "coverage checksum mismatch for {}:{}",
                self.source_id, self.symbol
            )));
        }
        serde_json::from_str(&self.intervals).map_err(|e| {
            DatabaseError::Corrupted(format!(
                "coverage for {}:{} does not parse: {}",
                self.source_id, self.symbol, e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nivesh_market_data::{DateRange, INR};
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    #[test]
    fn test_tampered_coverage_is_rejected() {
        let ticker = Ticker::new("amfi", "120716");
        let coverage = CoverageRange::from_intervals([DateRange::new(d(1), d(10)).unwrap()]);
        let mut row = QuoteCoverageDB::new(&ticker, &coverage, "2025-01-11T00:00:00Z").unwrap();
        row.intervals = row.intervals.replace("2025-01-10", "2025-01-20");

        assert!(matches!(row.into_coverage(), Err(DatabaseError::Corrupted(_))));
    }

    #[test]
    fn test_unparseable_price_keeps_its_date() {
        let point = QuotePoint::new(Ticker::new("amfi", "120716"), d(6), dec!(101.25), INR);
        let mut row = QuoteDB::from_point(&point, "2025-01-07T00:00:00Z");
        assert_eq!(row.clone().into_point(), Some(point));

        row.price = "N.A.".to_string();
        assert_eq!(row.date(), Some(d(6)));
        assert_eq!(row.into_point(), None);
    }
}
