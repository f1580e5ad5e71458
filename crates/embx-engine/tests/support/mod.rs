#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use embx_engine::{
    CacheEntry, CacheError, CacheKey, CacheStore, DispatcherConfig, EmbeddingProvider,
    MemoryCacheStore, ProviderError, ProviderRegistry, ProviderRequest, ProviderResponse, RetryPolicy,
};

/// Deterministic adapter whose latency, failures and output shape are set
/// per test.
pub struct ScriptedProvider {
    name: &'static str,
    default_model: &'static str,
    dims: usize,
    delay: Duration,
    text_delays: HashMap<String, Duration>,
    failure: Option<fn() -> ProviderError>,
    fail_first: usize,
    empty_at: Option<usize>,
    drop_last: bool,
    cost: Option<f64>,
    configured: bool,
    max_batch: usize,
    calls: AtomicUsize,
    inputs: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            default_model: "scripted-small",
            dims: 4,
            delay: Duration::from_millis(5),
            text_delays: HashMap::new(),
            failure: None,
            fail_first: 0,
            empty_at: None,
            drop_last: false,
            cost: None,
            configured: true,
            max_batch: 64,
            calls: AtomicUsize::new(0),
            inputs: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn dims(mut self, dims: usize) -> Self {
        self.dims = dims;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn delay_for(mut self, text: &str, delay: Duration) -> Self {
        self.text_delays.insert(text.to_string(), delay);
        self
    }

    /// Every call fails with `err`.
    pub fn failing(self, err: fn() -> ProviderError) -> Self {
        self.failing_first(usize::MAX, err)
    }

    /// The first `n` calls fail with `err`, later ones succeed.
    pub fn failing_first(mut self, n: usize, err: fn() -> ProviderError) -> Self {
        self.failure = Some(err);
        self.fail_first = n;
        self
    }

    pub fn empty_vector_at(mut self, index: usize) -> Self {
        self.empty_at = Some(index);
        self
    }

    pub fn short_response(mut self) -> Self {
        self.drop_last = true;
        self
    }

    pub fn cost(mut self, total: f64) -> Self {
        self.cost = Some(total);
        self
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn max_batch(mut self, n: usize) -> Self {
        self.max_batch = n;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inputs_seen(&self) -> usize {
        self.inputs.load(Ordering::SeqCst)
    }

    /// Most `embed` calls that were running at the same moment.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// The vector `ScriptedProvider` returns for `text`.
#[allow(clippy::cast_precision_loss)]
pub fn vector_for(provider: &str, text: &str, dims: usize) -> Vec<f32> {
    let seed: usize = text.bytes().chain(provider.bytes()).map(usize::from).sum();
    (0..dims).map(|i| ((seed + i * 7) % 11) as f32 + 1.0).collect()
}

#[async_trait]
impl EmbeddingProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn default_model(&self) -> &str {
        self.default_model
    }

    fn supports(&self, model: &str) -> bool {
        model.starts_with("scripted-")
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch
    }

    async fn embed(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.fetch_add(request.inputs.len(), Ordering::SeqCst);

        let delay = request
            .inputs
            .iter()
            .filter_map(|t| self.text_delays.get(t).copied())
            .max()
            .unwrap_or(self.delay);
        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        tokio::time::sleep(delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        if let Some(err) = self.failure {
            if call < self.fail_first {
                return Err(err());
            }
        }

        let dims = request.dimensions.unwrap_or(self.dims);
        let mut vectors: Vec<Vec<f32>> = request
            .inputs
            .iter()
            .map(|t| vector_for(self.name, t, dims))
            .collect();
        if let Some(slot) = self.empty_at.and_then(|i| vectors.get_mut(i)) {
            slot.clear();
        }
        if self.drop_last {
            vectors.pop();
        }

        Ok(ProviderResponse {
            provider: self.name.to_string(),
            model: request.model,
            vectors,
            usage_tokens: None,
            cost_usd: self.cost,
        })
    }
}

/// Cache whose every operation fails.
pub struct BrokenCache;

impl CacheStore for BrokenCache {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn get(&self, _key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        Err(CacheError::Closed)
    }

    fn put(&self, _entry: CacheEntry) -> Result<(), CacheError> {
        Err(CacheError::Closed)
    }

    fn len(&self) -> Result<usize, CacheError> {
        Err(CacheError::Closed)
    }
}

/// Memory cache whose reads block the calling thread for `delay`.
pub struct SlowCache {
    pub inner: MemoryCacheStore,
    pub delay: Duration,
}

impl CacheStore for SlowCache {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        std::thread::sleep(self.delay);
        self.inner.get(key)
    }

    fn put(&self, entry: CacheEntry) -> Result<(), CacheError> {
        self.inner.put(entry)
    }

    fn len(&self) -> Result<usize, CacheError> {
        self.inner.len()
    }
}

pub fn rate_limited() -> ProviderError {
    ProviderError::api(429, "slow down")
}

pub fn unauthorized() -> ProviderError {
    ProviderError::api(401, "bad key")
}

pub fn network_down() -> ProviderError {
    ProviderError::Network("connection refused".to_string())
}

pub fn fast_config() -> DispatcherConfig {
    DispatcherConfig {
        concurrency: 8,
        retry: RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_millis(10),
            jitter: Duration::ZERO,
            ..RetryPolicy::default()
        },
        call_timeout: Duration::from_secs(5),
        batch_deadline: None,
    }
}

pub fn registry(providers: &[Arc<ScriptedProvider>]) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    for p in providers {
        registry.register(Arc::clone(p) as Arc<dyn EmbeddingProvider>);
    }
    registry
}
