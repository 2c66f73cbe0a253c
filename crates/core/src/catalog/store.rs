//! Catalog storage traits.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::model::SourceListing;
use crate::errors::Result;
use nivesh_market_data::SourceId;

/// Persistence for ticker listings, one listing per source.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Replaces everything stored for `listing.source_id` with `listing`.
    async fn replace_listing(&self, listing: &SourceListing) -> Result<()>;

    /// Removes a source's stored listing.
    async fn remove_listing(&self, source_id: &SourceId) -> Result<()>;

    /// Every stored listing.
    fn load_listings(&self) -> Result<Vec<SourceListing>>;
}

#[derive(Default)]
pub struct MemoryCatalogStore {
    listings: Mutex<BTreeMap<SourceId, SourceListing>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn replace_listing(&self, listing: &SourceListing) -> Result<()> {
        self.listings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(listing.source_id.clone(), listing.clone());
        Ok(())
    }

    async fn remove_listing(&self, source_id: &SourceId) -> Result<()> {
        self.listings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(source_id);
        Ok(())
    }

    fn load_listings(&self) -> Result<Vec<SourceListing>> {
        Ok(self
            .listings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect())
    }
}
