//! Application context: the registry, catalog, cache and resolver bundled
//! behind the public query operations.

use std::slice;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::join_all;
use log::{debug, info, warn};

use crate::catalog::{CatalogEntry, CatalogStore, MemoryCatalogStore, TickerCatalog, TickerFilter};
use crate::clock::{Clock, SystemClock};
use crate::config::NiveshConfig;
use crate::errors::{Result, ValidationError};
use crate::quotes::{
    DateSpec, MemoryQuoteStore, QuoteCache, QuoteError, QuoteQuery, QuoteResolver, QuoteResponse,
    QuoteResult, QuoteStore, ResolverSettings, TickerSelector,
};
use nivesh_market_data::{DateRange, SourceId, SourceInfo, SourcePlugin, SourceRegistry, Ticker};

impl From<&NiveshConfig> for ResolverSettings {
    fn from(config: &NiveshConfig) -> Self {
        Self {
            fetch_timeout: config.fetch_timeout(),
            max_concurrent_fetches: config.max_concurrent_fetches,
            latest_lookback_days: config.latest_lookback_days,
        }
    }
}

/// Entry point for quote and ticker queries.
///
/// Built once with [`NiveshBuilder`], shared freely, and closed with
/// [`shutdown`](Self::shutdown) so pending cache writes reach disk.
pub struct Nivesh {
    registry: Arc<SourceRegistry>,
    catalog: Arc<TickerCatalog>,
    cache: Arc<QuoteCache>,
    resolver: QuoteResolver,
    config: NiveshConfig,
}

impl Nivesh {
    pub fn builder() -> NiveshBuilder {
        NiveshBuilder::new()
    }

    /// Quotes for every requested ticker, one entry per ticker in request
    /// order.
    ///
    /// Only a malformed request (a range with `start > end`) fails the whole
    /// call. Failures scoped to one ticker (unknown or ambiguous symbol,
    /// source errors, timeouts) are reported in that ticker's entry while the
    /// rest proceed. A `source:*` selector expands to one entry per ticker of
    /// that source, or a single error entry if its listing is unavailable.
    pub async fn get_quotes(&self, query: &QuoteQuery) -> Result<QuoteResponse> {
        let window = match query.date {
            DateSpec::On { date } => Some(DateRange::single(date)),
            DateSpec::Range { start, end } => Some(validate_range(start, end)?),
            DateSpec::Latest => None,
        };
        debug!(
            "get_quotes: {} selector(s), window {:?}, refresh {}",
            query.selectors.len(),
            window,
            query.refresh
        );

        if query
            .selectors
            .iter()
            .any(|selector| matches!(selector, TickerSelector::Symbol(_)))
        {
            let sources: Vec<SourceId> = match &query.source {
                Some(source) => vec![source.clone()],
                None => self.registry.list().collect(),
            };
            self.catalog.ensure_fresh(&sources).await;
        }

        let mut targets: Vec<(TickerSelector, std::result::Result<Ticker, QuoteError>)> =
            Vec::with_capacity(query.selectors.len());
        for selector in &query.selectors {
            match selector {
                TickerSelector::Symbol(symbol) => targets.push((
                    selector.clone(),
                    self.catalog
                        .resolve(symbol, query.source.as_ref())
                        .map_err(QuoteError::from),
                )),
                TickerSelector::Qualified(ticker) => targets.push((
                    selector.clone(),
                    match &query.source {
                        Some(filter) if *filter != ticker.source => {
                            Err(QuoteError::UnknownTicker {
                                symbol: ticker.symbol.clone(),
                                source_id: Some(filter.clone()),
                            })
                        }
                        _ => self
                            .catalog
                            .resolve(&ticker.symbol, Some(&ticker.source))
                            .map_err(QuoteError::from),
                    },
                )),
                TickerSelector::AllFromSource(source) => match self.expand_source(source).await {
                    Ok(tickers) => targets.extend(
                        tickers
                            .into_iter()
                            .map(|ticker| (selector.clone(), Ok(ticker))),
                    ),
                    Err(e) => targets.push((selector.clone(), Err(e))),
                },
            }
        }

        let outcomes = join_all(targets.iter().map(|(_, target)| async move {
            let ticker = target.as_ref().map_err(Clone::clone)?;
            match window {
                Some(window) => self.resolver.range(ticker, window, query.refresh).await,
                None => self.resolver.latest(ticker, query.refresh).await,
            }
        }))
        .await;

        let results: Vec<QuoteResult> = targets
            .into_iter()
            .zip(outcomes)
            .map(|((request, target), outcome)| QuoteResult {
                request,
                ticker: target.ok(),
                outcome,
            })
            .collect();

        let failed = results.iter().filter(|result| !result.is_ok()).count();
        if failed > 0 {
            warn!("get_quotes: {} of {} entries failed", failed, results.len());
        }
        Ok(QuoteResponse { results })
    }

    /// Every catalog ticker of `source`, loading or refreshing its listing as
    /// needed.
    async fn expand_source(&self, source: &SourceId) -> std::result::Result<Vec<Ticker>, QuoteError> {
        if !self.registry.contains(source) {
            return Err(QuoteError::UnknownSource(source.clone()));
        }
        if self.catalog.is_loaded(source) {
            self.catalog.ensure_fresh(slice::from_ref(source)).await;
        } else {
            self.catalog.refresh(source).await?;
        }

        Ok(self
            .catalog
            .list(Some(source), &TickerFilter::new())?
            .into_iter()
            .map(|entry| entry.ticker)
            .collect())
    }

    /// Catalog entries, refreshing stale listings first.
    pub async fn get_tickers(
        &self,
        source: Option<&SourceId>,
        filter: &TickerFilter,
    ) -> Result<Vec<CatalogEntry>> {
        let sources: Vec<SourceId> = match source {
            Some(id) => vec![id.clone()],
            None => self.registry.list().collect(),
        };
        self.catalog.ensure_fresh(&sources).await;
        Ok(self.catalog.list(source, filter)?)
    }

    /// Registered source ids in registration order.
    pub fn get_sources(&self) -> Vec<SourceId> {
        self.registry.list().collect()
    }

    pub fn source_infos(&self) -> Vec<SourceInfo> {
        self.registry.infos()
    }

    /// Forces a listing refresh for one source.
    pub async fn refresh_tickers(&self, source: &SourceId) -> Result<usize> {
        Ok(self.catalog.refresh(source).await?)
    }

    /// Drops a source's listing until it is next refreshed.
    pub async fn invalidate_tickers(&self, source: &SourceId) -> Result<()> {
        Ok(self.catalog.invalidate(source).await?)
    }

    pub fn catalog(&self) -> &TickerCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    pub fn config(&self) -> &NiveshConfig {
        &self.config
    }

    /// Flushes pending cache writes.
    pub async fn shutdown(&self) -> Result<()> {
        self.cache.flush().await?;
        info!("Nivesh shut down");
        Ok(())
    }
}

fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<DateRange> {
    DateRange::new(start, end).map_err(|_| ValidationError::InvalidDateRange { start, end }.into())
}

/// Builder for [`Nivesh`].
///
/// Stores default to in-memory implementations and the clock to the system
/// clock.
pub struct NiveshBuilder {
    sources: Vec<Arc<dyn SourcePlugin>>,
    quote_store: Option<Arc<dyn QuoteStore>>,
    catalog_store: Option<Arc<dyn CatalogStore>>,
    clock: Option<Arc<dyn Clock>>,
    config: NiveshConfig,
}

impl NiveshBuilder {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            quote_store: None,
            catalog_store: None,
            clock: None,
            config: NiveshConfig::default(),
        }
    }

    /// Registers a source plugin. Duplicate ids fail at [`build`](Self::build).
    pub fn with_source(mut self, source: Arc<dyn SourcePlugin>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_quote_store(mut self, store: Arc<dyn QuoteStore>) -> Self {
        self.quote_store = Some(store);
        self
    }

    pub fn with_catalog_store(mut self, store: Arc<dyn CatalogStore>) -> Self {
        self.catalog_store = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_config(mut self, config: NiveshConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Nivesh> {
        self.config.validate()?;

        let mut registry = SourceRegistry::new();
        for source in self.sources {
            registry.register(source)?;
        }
        let registry = Arc::new(registry);

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let quote_store = self
            .quote_store
            .unwrap_or_else(|| Arc::new(MemoryQuoteStore::new()));
        let catalog_store = self
            .catalog_store
            .unwrap_or_else(|| Arc::new(MemoryCatalogStore::new()));

        let catalog = Arc::new(TickerCatalog::new(
            Arc::clone(&registry),
            catalog_store,
            Arc::clone(&clock),
        ));
        match catalog.load() {
            Ok(count) => debug!("Loaded {} stored ticker listing(s)", count),
            Err(e) => warn!("Stored ticker listings could not be loaded: {}", e),
        }

        let cache = Arc::new(QuoteCache::new(quote_store));
        let resolver = QuoteResolver::new(
            Arc::clone(&registry),
            Arc::clone(&cache),
            clock,
            ResolverSettings::from(&self.config),
        );

        info!("Nivesh ready with {} source(s)", registry.len());
        Ok(Nivesh {
            registry,
            catalog,
            cache,
            resolver,
            config: self.config,
        })
    }
}

impl Default for NiveshBuilder {
    fn default() -> Self {
        Self::new()
    }
}
