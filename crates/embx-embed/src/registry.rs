use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::EmbeddingProviderConfig;
use crate::error::ProviderError;
use crate::factory::build_embedding_provider;
use crate::traits::EmbeddingProvider;

/// Provider adapters keyed by their `name()`.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<&'static str, Arc<dyn EmbeddingProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_configs<I>(configs: I) -> Result<Self, ProviderError>
    where
        I: IntoIterator<Item = EmbeddingProviderConfig>,
    {
        let mut registry = Self::new();
        for cfg in configs {
            registry.register(build_embedding_provider(cfg)?);
        }
        Ok(registry)
    }

    /// Adds or replaces the adapter registered under the same name.
    pub fn register(&mut self, provider: Arc<dyn EmbeddingProvider>) -> &mut Self {
        self.providers.insert(provider.name(), provider);
        self
    }

    pub fn with(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn EmbeddingProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered names in alphabetical order.
    pub fn names(&self) -> Vec<&'static str> {
        self.providers.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn EmbeddingProvider>> {
        self.providers.values()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::PROVIDER_NAMES;

    #[test]
    fn builds_every_known_provider() {
        let configs = PROVIDER_NAMES.iter().filter_map(|name| {
            EmbeddingProviderConfig::from_lookup(name, Duration::from_secs(5), |_| None)
        });
        let registry = ProviderRegistry::from_configs(configs).expect("registry");
        assert_eq!(registry.names(), PROVIDER_NAMES.to_vec());
        let configured: Vec<_> = registry
            .iter()
            .filter(|p| p.is_configured())
            .map(|p| p.name())
            .collect();
        assert_eq!(configured, vec!["ollama"]);
    }

    #[test]
    fn lookup_by_name() {
        let cfg = EmbeddingProviderConfig::from_lookup("voyage", Duration::from_secs(5), |_| None)
            .expect("known provider");
        let registry = ProviderRegistry::from_configs([cfg]).expect("registry");
        assert!(registry.contains("voyage"));
        assert_eq!(
            registry.get("voyage").map(|p| p.default_model().to_string()),
            Some("voyage-3-lite".to_string())
        );
        assert!(registry.get("openai").is_none());
    }
}
