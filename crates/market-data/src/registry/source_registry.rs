//! Registry of source plugins keyed by their SourceId.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};

use crate::errors::MarketDataError;
use crate::models::{SourceId, SourceInfo};
use crate::provider::SourcePlugin;

/// Holds every registered source plugin.
///
/// Mutation takes `&mut self`; once built the registry is shared as
/// `Arc<SourceRegistry>` and is read-only, so lookups need no locking.
/// Enumeration follows registration order.
#[derive(Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn SourcePlugin>>,
    index: HashMap<SourceId, usize>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin under its own id.
    ///
    /// Fails with `DuplicateSource` if the id is already taken; use
    /// [`replace`](Self::replace) to swap a plugin deliberately.
    pub fn register(&mut self, plugin: Arc<dyn SourcePlugin>) -> Result<(), MarketDataError> {
        let id = plugin.id();
        if self.index.contains_key(&id) {
            return Err(MarketDataError::DuplicateSource(id));
        }

        info!("Registered source '{}'", id);
        self.index.insert(id, self.sources.len());
        self.sources.push(plugin);
        Ok(())
    }

    /// Replaces the plugin registered under the same id, keeping its
    /// position. Returns the previous plugin.
    pub fn replace(
        &mut self,
        plugin: Arc<dyn SourcePlugin>,
    ) -> Result<Arc<dyn SourcePlugin>, MarketDataError> {
        let id = plugin.id();
        let slot = *self
            .index
            .get(&id)
            .ok_or_else(|| MarketDataError::UnknownSource(id.clone()))?;

        debug!("Replacing source '{}'", id);
        Ok(std::mem::replace(&mut self.sources[slot], plugin))
    }

    pub fn get(&self, id: &SourceId) -> Result<Arc<dyn SourcePlugin>, MarketDataError> {
        self.index
            .get(id)
            .map(|&slot| Arc::clone(&self.sources[slot]))
            .ok_or_else(|| MarketDataError::UnknownSource(id.clone()))
    }

    pub fn contains(&self, id: &SourceId) -> bool {
        self.index.contains_key(id)
    }

    /// Ids of all registered sources in registration order.
    ///
    /// The iterator is lazy; call `list()` again to restart.
    pub fn list(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.sources.iter().map(|source| source.id())
    }

    /// Self-descriptions of all registered sources in registration order.
    pub fn infos(&self) -> Vec<SourceInfo> {
        self.sources.iter().map(|source| source.info()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateRange, QuotePoint, TickerListing};
    use async_trait::async_trait;

    struct MockSource {
        id: &'static str,
        version: u32,
    }

    impl MockSource {
        fn new(id: &'static str, version: u32) -> Arc<dyn SourcePlugin> {
            Arc::new(Self { id, version })
        }
    }

    #[async_trait]
    impl SourcePlugin for MockSource {
        fn id(&self) -> SourceId {
            SourceId::new(self.id)
        }

        fn info(&self) -> SourceInfo {
            SourceInfo {
                key: self.id.to_string(),
                name: self.id.to_uppercase(),
                description: String::new(),
                version: self.version,
            }
        }

        async fn list_tickers(&self) -> Result<Vec<TickerListing>, MarketDataError> {
            Ok(Vec::new())
        }

        async fn fetch(
            &self,
            _symbol: &str,
            _range: DateRange,
        ) -> Result<Vec<QuotePoint>, MarketDataError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = SourceRegistry::new();
        registry.register(MockSource::new("amfi", 1)).unwrap();

        let source = registry.get(&SourceId::new("amfi")).unwrap();
        assert_eq!(source.id(), SourceId::new("amfi"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = SourceRegistry::new();
        registry.register(MockSource::new("amfi", 1)).unwrap();

        let err = registry.register(MockSource::new("amfi", 2)).unwrap_err();
        assert!(matches!(err, MarketDataError::DuplicateSource(id) if id.as_str() == "amfi"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_source() {
        let registry = SourceRegistry::new();
        let err = registry.get(&SourceId::new("nope")).err().unwrap();
        assert!(matches!(err, MarketDataError::UnknownSource(_)));
    }

    #[test]
    fn test_list_preserves_registration_order_and_restarts() {
        let mut registry = SourceRegistry::new();
        registry.register(MockSource::new("zeta", 1)).unwrap();
        registry.register(MockSource::new("alpha", 1)).unwrap();
        registry.register(MockSource::new("amfi", 1)).unwrap();

        let first: Vec<String> = registry.list().map(|id| id.to_string()).collect();
        let second: Vec<String> = registry.list().map(|id| id.to_string()).collect();
        assert_eq!(first, vec!["zeta", "alpha", "amfi"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut registry = SourceRegistry::new();
        registry.register(MockSource::new("amfi", 1)).unwrap();
        registry.register(MockSource::new("bse", 1)).unwrap();

        let previous = registry.replace(MockSource::new("amfi", 2)).unwrap();
        assert_eq!(previous.info().version, 1);

        let infos = registry.infos();
        assert_eq!(infos[0].key, "amfi");
        assert_eq!(infos[0].version, 2);
        assert_eq!(infos[1].key, "bse");
    }

    #[test]
    fn test_replace_unknown_fails() {
        let mut registry = SourceRegistry::new();
        let err = registry.replace(MockSource::new("amfi", 1)).err().unwrap();
        assert!(matches!(err, MarketDataError::UnknownSource(_)));
    }
}
