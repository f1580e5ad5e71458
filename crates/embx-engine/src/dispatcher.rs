use std::collections::HashMap;
use std::sync::Arc;

use embx_cache::{CacheEntry, CacheStore};
use embx_core::{CacheKey, EmbeddingParams, EmbeddingRequest, EmbeddingResult, ErrorKind};
use embx_embed::{EmbeddingProvider, ProviderRegistry, ProviderRequest};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::DispatcherConfig;
use crate::error::EngineError;
use crate::inflight::{Claim, InFlight, Pending, Ticket};
use crate::normalize::{Embedded, Failure, ItemOutcome, normalize_response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// When false the cache is neither read nor written.
    pub use_cache: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self { use_cache: true }
    }
}

impl DispatchOptions {
    pub const fn without_cache() -> Self {
        Self { use_cache: false }
    }
}

/// Routes embedding requests to provider adapters.
///
/// One dispatcher owns the concurrency budget and the in-flight map, so
/// concurrent batches on the same instance share both.
pub struct Dispatcher {
    registry: ProviderRegistry,
    core: Arc<Core>,
    inflight: InFlight,
}

/// What a detached provider call needs once its caller may be gone.
struct Core {
    cache: Option<Arc<dyn CacheStore>>,
    config: DispatcherConfig,
    permits: Semaphore,
}

/// Misses that can share one adapter call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GroupKey {
    provider: &'static str,
    model: String,
    params: EmbeddingParams,
}

struct Group {
    provider: Arc<dyn EmbeddingProvider>,
    items: Vec<(Ticket, String)>,
}

impl Dispatcher {
    pub fn new(
        registry: ProviderRegistry,
        cache: Option<Arc<dyn CacheStore>>,
        config: DispatcherConfig,
    ) -> Self {
        let permits = Semaphore::new(config.concurrency.max(1));
        Self {
            registry,
            core: Arc::new(Core {
                cache,
                config,
                permits,
            }),
            inflight: InFlight::default(),
        }
    }

    pub const fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.core.config
    }

    pub fn cache(&self) -> Option<&Arc<dyn CacheStore>> {
        self.core.cache.as_ref()
    }

    /// Embeds `texts` with one provider. An absent or blank `model` selects
    /// the adapter's default.
    pub async fn embed_batch(
        &self,
        provider: &str,
        model: Option<&str>,
        texts: &[String],
        params: EmbeddingParams,
        options: DispatchOptions,
    ) -> Result<Vec<EmbeddingResult>, EngineError> {
        let adapter = self.provider(provider)?;
        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| adapter.default_model())
            .to_string();
        let requests = texts
            .iter()
            .map(|text| EmbeddingRequest::new(text.as_str(), provider, model.as_str(), params))
            .collect();
        self.dispatch(requests, options).await
    }

    /// Resolves every request to exactly one result, in submission order.
    ///
    /// Only an unknown provider aborts; every other failure is reported on
    /// the affected items. Remote calls run on detached tasks, so the batch
    /// deadline or dropping this future only ends this caller's wait. Other
    /// callers sharing those keys still receive the outcome.
    pub async fn dispatch(
        &self,
        requests: Vec<EmbeddingRequest>,
        options: DispatchOptions,
    ) -> Result<Vec<EmbeddingResult>, EngineError> {
        let adapters = requests
            .iter()
            .map(|r| self.provider(r.provider()))
            .collect::<Result<Vec<_>, _>>()?;
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let deadline = self.core.config.batch_deadline.map(|d| started + d);
        let mut results: Vec<Option<EmbeddingResult>> = vec![None; requests.len()];

        // First index of each distinct key, then every index sharing it.
        let mut positions: HashMap<CacheKey, Vec<usize>> = HashMap::new();
        let mut distinct: Vec<(CacheKey, usize)> = Vec::new();
        for (index, request) in requests.iter().enumerate() {
            let key = request.cache_key();
            positions
                .entry(key)
                .or_insert_with(|| {
                    distinct.push((key, index));
                    Vec::new()
                })
                .push(index);
        }

        let mut groups: HashMap<GroupKey, Group> = HashMap::new();
        let mut group_order: Vec<GroupKey> = Vec::new();
        let mut waits: Vec<(CacheKey, Pending)> = Vec::new();

        for (key, first) in distinct {
            let (Some(request), Some(adapter)) = (requests.get(first), adapters.get(first)) else {
                continue;
            };

            if request.model().trim().is_empty() || !adapter.supports(request.model()) {
                let failure = Failure::new(
                    ErrorKind::InvalidModel,
                    format!(
                        "model '{}' is not supported by {}",
                        request.model(),
                        adapter.name()
                    ),
                    0.0,
                );
                let indices = positions.get(&key).map_or(&[][..], Vec::as_slice);
                fill(&mut results, indices, request, &Err(failure));
                continue;
            }

            let (pending, owned) = match self.inflight.claim(key) {
                Claim::Owner(ticket, pending) => (pending, Some(ticket)),
                Claim::Waiter(pending) => (pending, None),
            };
            waits.push((key, pending));
            let Some(ticket) = owned else {
                continue;
            };

            let group_key = GroupKey {
                provider: adapter.name(),
                model: request.model().to_string(),
                params: request.params(),
            };
            let group = groups.entry(group_key.clone()).or_insert_with(|| {
                group_order.push(group_key);
                Group {
                    provider: Arc::clone(adapter),
                    items: Vec::new(),
                }
            });
            group.items.push((ticket, request.text().to_string()));
        }

        let mut chunks = 0_usize;
        for group_key in group_order {
            let Some(group) = groups.remove(&group_key) else {
                continue;
            };
            let size = group.provider.max_batch_size().max(1);
            let mut items = group.items.into_iter().peekable();
            while items.peek().is_some() {
                let chunk: Vec<_> = items.by_ref().take(size).collect();
                chunks += 1;
                // Detached: the cache read and remote call outlive this
                // future and resolve the tickets for every caller waiting.
                // Holding the keys means no other caller can publish them
                // between the read and the call.
                tokio::spawn(Arc::clone(&self.core).run_chunk(
                    Arc::clone(&group.provider),
                    group_key.model.clone(),
                    group_key.params,
                    chunk,
                    options,
                ));
            }
        }

        debug!(
            items = requests.len(),
            distinct = positions.len(),
            chunks,
            awaiting = waits.len(),
            "dispatching batch"
        );

        let outcomes = join_all(
            waits
                .into_iter()
                .map(|(key, pending)| await_outcome(key, pending, deadline, started)),
        )
        .await;

        let mut timed_out = 0_usize;
        for (key, outcome) in outcomes {
            if matches!(&outcome, Err(f) if f.message == DEADLINE_EXCEEDED) {
                timed_out += 1;
            }
            let indices = positions.get(&key).map_or(&[][..], Vec::as_slice);
            let Some(request) = indices.first().and_then(|i| requests.get(*i)) else {
                continue;
            };
            fill(&mut results, indices, request, &outcome);
        }
        if timed_out > 0 {
            warn!(items = timed_out, "batch deadline exceeded");
        }

        let results: Vec<EmbeddingResult> = results
            .into_iter()
            .zip(&requests)
            .enumerate()
            .map(|(index, (slot, request))| {
                slot.unwrap_or_else(|| {
                    EmbeddingResult::failure(
                        index,
                        request.provider(),
                        request.model(),
                        ErrorKind::ProviderError,
                        "item was not resolved",
                        0.0,
                    )
                })
            })
            .collect();

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        let cached = results.iter().filter(|r| r.cached).count();
        info!(
            items = results.len(),
            cached,
            failed,
            elapsed_ms = elapsed_ms(started),
            "batch complete"
        );
        Ok(results)
    }

    fn provider(&self, name: &str) -> Result<Arc<dyn EmbeddingProvider>, EngineError> {
        self.registry
            .get(name)
            .ok_or_else(|| EngineError::UnknownProvider {
                name: name.to_string(),
                available: self.registry.names().join(", "),
            })
    }
}

impl Core {
    /// Reads `keys` on the blocking pool. Errors count as misses; the result
    /// always has one slot per key.
    async fn lookup_all(&self, keys: Vec<CacheKey>) -> Vec<Option<CacheEntry>> {
        let count = keys.len();
        let Some(cache) = self.cache.clone() else {
            return std::iter::repeat_with(|| None).take(count).collect();
        };
        if keys.is_empty() {
            return Vec::new();
        }

        let read = tokio::task::spawn_blocking(move || {
            keys.iter()
                .map(|key| match cache.get(key) {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!(cache = cache.name(), error = %err, "cache read failed; treating as miss");
                        None
                    }
                })
                .collect::<Vec<_>>()
        })
        .await;

        read.unwrap_or_else(|err| {
            warn!(error = %err, "cache read task failed; treating as misses");
            std::iter::repeat_with(|| None).take(count).collect()
        })
    }

    /// Writes `entries` on the blocking pool. Failures are logged only.
    async fn store_all(&self, entries: Vec<CacheEntry>) {
        let Some(cache) = self.cache.clone() else {
            return;
        };
        if entries.is_empty() {
            return;
        }

        let written = tokio::task::spawn_blocking(move || {
            for entry in entries {
                if let Err(err) = cache.put(entry) {
                    warn!(cache = cache.name(), error = %err, "cache write failed");
                }
            }
        })
        .await;
        if let Err(err) = written {
            warn!(error = %err, "cache write task failed");
        }
    }

    /// Serves what it can of `items` from the cache, runs one adapter call for
    /// the rest, writes successes back, then publishes each outcome to
    /// whoever is waiting on it.
    async fn run_chunk(
        self: Arc<Self>,
        provider: Arc<dyn EmbeddingProvider>,
        model: String,
        params: EmbeddingParams,
        items: Vec<(Ticket, String)>,
        options: DispatchOptions,
    ) {
        let items = if options.use_cache && self.cache.is_some() {
            self.serve_cached(items).await
        } else {
            items
        };
        if items.is_empty() {
            return;
        }

        let (tickets, inputs): (Vec<Ticket>, Vec<String>) = items.into_iter().unzip();
        let request = ProviderRequest {
            inputs,
            model,
            dimensions: params.dimensions,
            truncation: params.truncation,
        };

        let outcomes = self.call_with_retry(provider.as_ref(), request).await;

        if options.use_cache {
            let entries = tickets
                .iter()
                .zip(&outcomes)
                .filter_map(|(ticket, outcome)| {
                    let embedded = outcome.as_ref().ok()?;
                    Some(CacheEntry::new(
                        *ticket.key(),
                        embedded.vector.clone(),
                        provider.name(),
                        embedded.model.as_str(),
                    ))
                })
                .collect();
            // Written before the keys are released, so a later claim sees it.
            self.store_all(entries).await;
        }

        for (ticket, outcome) in tickets.into_iter().zip(outcomes) {
            ticket.resolve(outcome);
        }
    }

    /// Resolves cache hits among `items` and returns the misses.
    async fn serve_cached(&self, items: Vec<(Ticket, String)>) -> Vec<(Ticket, String)> {
        let keys = items.iter().map(|(ticket, _)| *ticket.key()).collect();
        let entries = self.lookup_all(keys).await;

        let total = items.len();
        let mut misses = Vec::with_capacity(total);
        for ((ticket, text), entry) in items.into_iter().zip(entries) {
            match entry {
                Some(entry) => ticket.resolve(Ok(Embedded {
                    vector: entry.vector,
                    model: entry.model,
                    latency_ms: 0.0,
                    cost_usd: Some(0.0),
                    cached: true,
                })),
                None => misses.push((ticket, text)),
            }
        }
        debug!(hits = total - misses.len(), misses = misses.len(), "cache checked");
        misses
    }

    /// Calls the adapter until it succeeds, fails permanently, or the retry
    /// budget runs out. Always returns one outcome per input.
    async fn call_with_retry(
        &self,
        provider: &dyn EmbeddingProvider,
        request: ProviderRequest,
    ) -> Vec<ItemOutcome> {
        let expected = request.inputs.len();
        let policy = &self.config.retry;
        let mut attempt = 0_u32;

        loop {
            attempt += 1;
            let Ok(permit) = self.permits.acquire().await else {
                let failure = Failure::new(ErrorKind::ProviderError, "dispatcher is shut down", 0.0);
                return vec![Err(failure); expected];
            };
            let started = Instant::now();
            let result =
                tokio::time::timeout(self.config.call_timeout, provider.embed(request.clone()))
                    .await;
            let latency_ms = elapsed_ms(started);
            drop(permit);

            let (kind, message) = match result {
                Ok(Ok(response)) => {
                    debug!(
                        provider = provider.name(),
                        model = %request.model,
                        items = expected,
                        attempt,
                        latency_ms,
                        "provider call succeeded"
                    );
                    return normalize_response(response, expected, latency_ms);
                }
                Ok(Err(err)) => (err.kind(), err.to_string()),
                Err(_) => (
                    ErrorKind::Timeout,
                    format!(
                        "call exceeded {:.1}s timeout",
                        self.config.call_timeout.as_secs_f64()
                    ),
                ),
            };

            if policy.should_retry(attempt, kind) {
                let delay = policy.backoff_with_jitter(attempt, rand::random::<f64>());
                warn!(
                    provider = provider.name(),
                    attempt,
                    kind = %kind,
                    delay_ms = delay.as_millis(),
                    error = %message,
                    "provider call failed; retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            warn!(
                provider = provider.name(),
                attempt,
                kind = %kind,
                error = %message,
                "provider call failed"
            );
            return vec![Err(Failure::new(kind, message, latency_ms)); expected];
        }
    }
}

const DEADLINE_EXCEEDED: &str = "batch deadline exceeded";

/// Waits for a key's outcome until this caller's own deadline.
async fn await_outcome(
    key: CacheKey,
    pending: Pending,
    deadline: Option<Instant>,
    started: Instant,
) -> (CacheKey, ItemOutcome) {
    let joined = match deadline {
        Some(at) => tokio::time::timeout_at(at, pending).await.ok(),
        None => Some(pending.await),
    };
    let outcome = match joined {
        Some(Ok(outcome)) => outcome,
        Some(Err(_)) => Err(Failure::new(
            ErrorKind::ProviderError,
            "in-flight call ended without a result",
            elapsed_ms(started),
        )),
        None => Err(Failure::new(
            ErrorKind::Timeout,
            DEADLINE_EXCEEDED,
            elapsed_ms(started),
        )),
    };
    (key, outcome)
}

/// Writes `outcome` into every slot in `indices`.
fn fill(
    results: &mut [Option<EmbeddingResult>],
    indices: &[usize],
    request: &EmbeddingRequest,
    outcome: &ItemOutcome,
) {
    for &index in indices {
        let Some(slot) = results.get_mut(index) else {
            continue;
        };
        let result = match outcome {
            Ok(e) => {
                let mut result = EmbeddingResult::success(
                    index,
                    request.provider(),
                    e.model.as_str(),
                    e.vector.clone(),
                    e.latency_ms,
                    e.cost_usd,
                );
                result.cached = e.cached;
                result
            }
            Err(f) => EmbeddingResult::failure(
                index,
                request.provider(),
                request.model(),
                f.kind,
                f.message.as_str(),
                f.latency_ms,
            ),
        };
        *slot = Some(result);
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
