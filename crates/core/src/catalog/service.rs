use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::{debug, info, warn};

use super::errors::CatalogError;
use super::model::{CatalogEntry, SourceListing, TickerFilter};
use super::store::CatalogStore;
use crate::clock::Clock;
use nivesh_market_data::{SourceId, SourceRegistry, Ticker, TickerListing, TickerMetadata};

struct LoadedListing {
    last_updated: DateTime<Utc>,
    entries: BTreeMap<String, TickerMetadata>,
}

impl LoadedListing {
    fn from_tickers(last_updated: DateTime<Utc>, tickers: Vec<TickerListing>) -> Self {
        // Later rows win when a listing repeats a symbol.
        let entries = tickers
            .into_iter()
            .map(|listing| (listing.symbol, listing.metadata))
            .collect();
        Self {
            last_updated,
            entries,
        }
    }
}

/// Known `(source, symbol)` pairs and their metadata.
///
/// Each source's listing is swapped in whole under a write lock, so readers
/// see either the previous listing or the new one. Listings stay until
/// replaced by a refresh or removed by [`invalidate`](Self::invalidate).
pub struct TickerCatalog {
    registry: Arc<SourceRegistry>,
    store: Arc<dyn CatalogStore>,
    clock: Arc<dyn Clock>,
    listings: RwLock<HashMap<SourceId, Arc<LoadedListing>>>,
}

impl TickerCatalog {
    pub fn new(
        registry: Arc<SourceRegistry>,
        store: Arc<dyn CatalogStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            store,
            clock,
            listings: RwLock::new(HashMap::new()),
        }
    }

    /// Hydrates listings persisted by earlier runs. Listings of sources that
    /// are no longer registered are ignored. Returns the number of sources
    /// loaded.
    pub fn load(&self) -> Result<usize, CatalogError> {
        let stored = self
            .store
            .load_listings()
            .map_err(|e| CatalogError::Storage(e.to_string()))?;

        let mut loaded = 0;
        let mut listings = self.listings.write().unwrap_or_else(PoisonError::into_inner);
        for listing in stored {
            if !self.registry.contains(&listing.source_id) {
                debug!(
                    "Ignoring stored listing for unregistered source '{}'",
                    listing.source_id
                );
                continue;
            }
            listings.insert(
                listing.source_id,
                Arc::new(LoadedListing::from_tickers(listing.last_updated, listing.tickers)),
            );
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Re-lists `source_id` from its plugin and replaces its entries.
    ///
    /// On failure the previous entries stay untouched. Returns the number of
    /// tickers now listed for the source.
    pub async fn refresh(&self, source_id: &SourceId) -> Result<usize, CatalogError> {
        let plugin = self
            .registry
            .get(source_id)
            .map_err(|_| CatalogError::UnknownSource(source_id.clone()))?;

        let tickers = plugin.list_tickers().await.map_err(|e| {
            warn!("Listing tickers for '{}' failed: {}", source_id, e);
            CatalogError::SourceUnavailable {
                source_id: source_id.clone(),
                message: e.to_string(),
            }
        })?;

        let listing = SourceListing {
            source_id: source_id.clone(),
            last_updated: self.clock.now(),
            tickers,
        };
        self.store
            .replace_listing(&listing)
            .await
            .map_err(|e| CatalogError::Storage(e.to_string()))?;

        let loaded = Arc::new(LoadedListing::from_tickers(listing.last_updated, listing.tickers));
        let count = loaded.entries.len();
        self.listings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(source_id.clone(), loaded);

        info!("Catalog for '{}' refreshed with {} tickers", source_id, count);
        Ok(count)
    }

    /// Refreshes each source whose listing is missing or older than its
    /// `ticker_refresh_interval`. Failures are logged and the previous
    /// listing (if any) is kept.
    pub async fn ensure_fresh(&self, sources: &[SourceId]) {
        let stale: Vec<&SourceId> = sources.iter().filter(|id| self.is_stale(id)).collect();
        let outcomes = join_all(stale.iter().map(|id| self.refresh(id))).await;
        for (id, outcome) in stale.into_iter().zip(outcomes) {
            if let Err(e) = outcome {
                warn!("Keeping previous catalog for '{}': {}", id, e);
            }
        }
    }

    /// True when the listing is absent or has outlived the source's refresh
    /// interval. Unregistered sources are never stale.
    pub fn is_stale(&self, source_id: &SourceId) -> bool {
        let Ok(plugin) = self.registry.get(source_id) else {
            return false;
        };
        match self.last_updated(source_id) {
            None => true,
            Some(last_updated) => plugin
                .config()
                .ticker_refresh_interval
                .is_some_and(|interval| self.clock.now() - last_updated >= interval),
        }
    }

    pub fn is_loaded(&self, source_id: &SourceId) -> bool {
        self.read_listing(source_id).is_some()
    }

    pub fn last_updated(&self, source_id: &SourceId) -> Option<DateTime<Utc>> {
        self.read_listing(source_id).map(|listing| listing.last_updated)
    }

    /// Resolves a symbol to a ticker.
    ///
    /// With a source, the symbol must be in that source's listing; if the
    /// listing was never loaded the pair is accepted as-is and left for the
    /// plugin to validate. Without a source, every loaded listing is
    /// searched and the symbol must be defined by exactly one source.
    pub fn resolve(&self, symbol: &str, source: Option<&SourceId>) -> Result<Ticker, CatalogError> {
        match source {
            Some(source_id) => {
                if !self.registry.contains(source_id) {
                    return Err(CatalogError::UnknownSource(source_id.clone()));
                }
                match self.read_listing(source_id) {
                    Some(listing) if !listing.entries.contains_key(symbol) => {
                        Err(CatalogError::UnknownTicker {
                            symbol: symbol.to_string(),
                            source_id: Some(source_id.clone()),
                        })
                    }
                    _ => Ok(Ticker::new(source_id.clone(), symbol)),
                }
            }
            None => {
                let listings = self.listings.read().unwrap_or_else(PoisonError::into_inner);
                let mut candidates: Vec<SourceId> = self
                    .registry
                    .list()
                    .filter(|id| {
                        listings
                            .get(id)
                            .is_some_and(|listing| listing.entries.contains_key(symbol))
                    })
                    .collect();

                match candidates.len() {
                    0 => Err(CatalogError::UnknownTicker {
                        symbol: symbol.to_string(),
                        source_id: None,
                    }),
                    1 => Ok(Ticker::new(candidates.remove(0), symbol)),
                    _ => Err(CatalogError::AmbiguousTicker {
                        symbol: symbol.to_string(),
                        sources: candidates,
                    }),
                }
            }
        }
    }

    /// Catalog entries in registration order of their source, then by
    /// symbol, optionally restricted to one source and narrowed by `filter`.
    pub fn list(
        &self,
        source: Option<&SourceId>,
        filter: &TickerFilter,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        let sources: Vec<SourceId> = match source {
            Some(id) if !self.registry.contains(id) => {
                return Err(CatalogError::UnknownSource(id.clone()))
            }
            Some(id) => vec![id.clone()],
            None => self.registry.list().collect(),
        };

        let listings = self.listings.read().unwrap_or_else(PoisonError::into_inner);
        let entries = sources
            .into_iter()
            .filter_map(|id| listings.get(&id).map(|listing| (id, Arc::clone(listing))))
            .flat_map(|(id, listing)| {
                listing
                    .entries
                    .iter()
                    .filter(|(symbol, metadata)| filter.matches(symbol, metadata))
                    .map(|(symbol, metadata)| CatalogEntry {
                        ticker: Ticker::new(id.clone(), symbol.clone()),
                        metadata: metadata.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        Ok(entries)
    }

    /// Drops a source's entries from memory and from the store.
    pub async fn invalidate(&self, source_id: &SourceId) -> Result<(), CatalogError> {
        self.listings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(source_id);
        self.store
            .remove_listing(source_id)
            .await
            .map_err(|e| CatalogError::Storage(e.to_string()))?;
        info!("Catalog for '{}' invalidated", source_id);
        Ok(())
    }

    fn read_listing(&self, source_id: &SourceId) -> Option<Arc<LoadedListing>> {
        self.listings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source_id)
            .cloned()
    }
}
