//! Database model for catalog rows.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::warn;

use nivesh_market_data::{InstrumentCategory, SourceId, TickerListing, TickerMetadata};

/// One listed ticker. Every row of a source carries the listing's
/// `last_updated`.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::tickers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TickerDB {
    pub source_id: String,
    pub symbol: String,
    pub name: String,
    pub category: String,
    pub isin: Option<String>,
    pub attributes: String,
    pub last_updated: String,
}

impl TickerDB {
    pub fn new(
        source_id: &SourceId,
        listing: &TickerListing,
        last_updated: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            source_id: source_id.to_string(),
            symbol: listing.symbol.clone(),
            name: listing.metadata.name.clone(),
            category: listing.metadata.category.as_str().to_string(),
            isin: listing.metadata.isin.clone(),
            attributes: serde_json::to_string(&listing.metadata.attributes)?,
            last_updated: last_updated.to_rfc3339(),
        })
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.last_updated)
            .map(|ts| ts.with_timezone(&Utc))
            .ok()
    }

    /// Unknown categories fall back to `Other`; unreadable attributes to
    /// none.
    pub fn into_listing(self) -> TickerListing {
        let category = InstrumentCategory::from_str(&self.category).unwrap_or_else(|e| {
            warn!("{}:{}: {}", self.source_id, self.symbol, e);
            InstrumentCategory::Other
        });
        let attributes: BTreeMap<String, String> = serde_json::from_str(&self.attributes)
            .unwrap_or_else(|e| {
                warn!(
                    "{}:{}: unreadable attributes dropped: {}",
                    self.source_id, self.symbol, e
                );
                BTreeMap::new()
            });

        TickerListing::new(
            self.symbol,
            TickerMetadata {
                name: self.name,
                category,
                isin: self.isin,
                attributes,
            },
        )
    }
}
