//! Environment wiring for the `embx` binary: provider registry, cache
//! selection and log setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use embx_cache::{CacheStore, SqliteCacheStore, default_cache_path};
use embx_embed::{EmbeddingProviderConfig, PROVIDER_NAMES, ProviderError, ProviderRegistry, mask_secret};
use embx_engine::{Comparison, Dispatcher, DispatcherConfig, EmbeddingResult, env_bool};
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status for configuration errors and runs where nothing succeeded.
pub const EXIT_ALL_FAILED: u8 = 2;

/// Logs go to stderr so stdout stays machine-readable. `EMBX_LOG` wins over
/// `RUST_LOG`; the fallback level is `warn`.
pub fn init_tracing() {
    let filter = std::env::var("EMBX_LOG")
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    // A subscriber may already be installed by an embedding host.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub dispatcher: DispatcherConfig,
    pub cache_enabled: bool,
    pub cache_path: PathBuf,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            dispatcher: DispatcherConfig::from_lookup(&lookup),
            cache_enabled: env_bool(&lookup, "EMBX_CACHE_ENABLED", true),
            cache_path: default_cache_path(&lookup),
        }
    }
}

/// Every known provider, with credentials resolved through `lookup`.
pub fn provider_configs<F>(lookup: F, timeout: Duration) -> Vec<EmbeddingProviderConfig>
where
    F: Fn(&str) -> Option<String>,
{
    PROVIDER_NAMES
        .iter()
        .filter_map(|name| EmbeddingProviderConfig::from_lookup(name, timeout, &lookup))
        .collect()
}

/// Opens the on-disk cache. Failure to open is logged and leaves the run
/// uncached rather than aborting it.
pub fn open_cache(settings: &Settings) -> Option<Arc<dyn CacheStore>> {
    if !settings.cache_enabled {
        return None;
    }
    match SqliteCacheStore::open(&settings.cache_path) {
        Ok(store) => Some(Arc::new(store)),
        Err(err) => {
            warn!(path = %settings.cache_path.display(), error = %err, "cache unavailable; continuing without it");
            None
        }
    }
}

pub fn build_dispatcher(
    settings: &Settings,
    configs: Vec<EmbeddingProviderConfig>,
) -> Result<Dispatcher, ProviderError> {
    let registry = ProviderRegistry::from_configs(configs)?;
    Ok(Dispatcher::new(
        registry,
        open_cache(settings),
        settings.dispatcher.clone(),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    pub name: &'static str,
    pub default_model: String,
    pub configured: bool,
    pub credential_env: Option<&'static str>,
    /// Masked; never the full secret.
    pub api_key: Option<String>,
}

pub fn provider_listing(configs: &[EmbeddingProviderConfig], registry: &ProviderRegistry) -> Vec<ProviderInfo> {
    configs
        .iter()
        .map(|cfg| {
            let provider = registry.get(cfg.name());
            ProviderInfo {
                name: cfg.name(),
                default_model: provider
                    .as_ref()
                    .map(|p| p.default_model().to_string())
                    .unwrap_or_default(),
                configured: provider.as_ref().is_some_and(|p| p.is_configured()),
                credential_env: cfg.credential_env(),
                api_key: cfg.api_key().map(mask_secret),
            }
        })
        .collect()
}

/// Nothing succeeded, or a fail-fast run stopped at a failure.
pub const fn comparison_exit_code(comparison: &Comparison) -> u8 {
    if comparison.all_failed() || comparison.stopped_early {
        EXIT_ALL_FAILED
    } else {
        0
    }
}

pub fn batch_exit_code(results: &[EmbeddingResult]) -> u8 {
    if !results.is_empty() && results.iter().all(|r| !r.is_ok()) {
        EXIT_ALL_FAILED
    } else {
        0
    }
}
