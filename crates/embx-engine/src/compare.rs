//! Side-by-side embedding of one input across several providers.

use std::fmt;
use std::str::FromStr;

use embx_core::{EmbeddingParams, EmbeddingRequest, EmbeddingResult, ErrorKind, Status};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info};

use crate::dispatcher::{DispatchOptions, Dispatcher};
use crate::error::EngineError;
use crate::ranking::{RankBy, assign_quality_scores, rank_rows};

/// A provider to compare, optionally pinned to a model.
///
/// Parses from `provider` or `provider:model`; only the first `:` separates,
/// so model ids may contain colons themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTarget {
    pub name: String,
    pub model: Option<String>,
}

impl ProviderTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: None,
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

impl FromStr for ProviderTarget {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, model) = match s.split_once(':') {
            Some((name, model)) => (name.trim(), Some(model.trim())),
            None => (s, None),
        };
        if name.is_empty() {
            return Err(EngineError::Configuration(format!(
                "invalid provider target '{s}'"
            )));
        }
        Ok(Self {
            name: name.to_ascii_lowercase(),
            model: model.filter(|m| !m.is_empty()).map(str::to_string),
        })
    }
}

impl fmt::Display for ProviderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.model {
            Some(model) => write!(f, "{}:{model}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareOptions {
    pub rank_by: RankBy,
    /// Drop providers without credentials before dispatching.
    pub only_configured: bool,
    /// Keep failed rows in the output.
    pub include_errors: bool,
    /// Keep at most this many rows after ranking.
    pub top: Option<usize>,
    pub use_cache: bool,
    /// Run providers one at a time and stop at the first failure.
    pub fail_fast: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            rank_by: RankBy::None,
            only_configured: false,
            include_errors: true,
            top: None,
            use_cache: true,
            fail_fast: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub provider: String,
    pub model: String,
    pub status: Status,
    pub dimensions: usize,
    pub cached: bool,
    pub latency_ms: f64,
    pub cost_usd: Option<f64>,
    pub quality_score: Option<f64>,
    pub dimension_mismatch: bool,
    pub rank: Option<usize>,
    pub error_kind: Option<ErrorKind>,
    pub error: Option<String>,
    #[serde(skip)]
    pub vector: Option<Vec<f32>>,
}

impl ComparisonRow {
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

impl From<EmbeddingResult> for ComparisonRow {
    fn from(r: EmbeddingResult) -> Self {
        Self {
            provider: r.provider,
            model: r.model,
            status: r.status,
            dimensions: r.dimensions,
            cached: r.cached,
            latency_ms: r.latency_ms,
            cost_usd: r.cost_usd,
            quality_score: None,
            dimension_mismatch: false,
            rank: None,
            error_kind: r.error_kind,
            error: r.error,
            vector: r.vector,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub rank_by: RankBy,
    /// Successful rows before filtering.
    pub success_count: usize,
    /// Providers that took part before filtering.
    pub provider_count: usize,
    /// A fail-fast run hit a failure and skipped the remaining providers.
    pub stopped_early: bool,
    pub rows: Vec<ComparisonRow>,
}

impl Comparison {
    pub const fn all_failed(&self) -> bool {
        self.success_count == 0
    }
}

impl Dispatcher {
    /// Embeds `text` with every target and ranks the outcomes.
    ///
    /// An empty `targets` list means every registered provider. Provider
    /// failures become error rows; only configuration problems abort.
    pub async fn compare(
        &self,
        text: &str,
        targets: &[ProviderTarget],
        params: EmbeddingParams,
        options: &CompareOptions,
    ) -> Result<Comparison, EngineError> {
        let requests = self.plan_comparison(text, targets, params, options.only_configured)?;
        let provider_count = requests.len();
        let dispatch = DispatchOptions {
            use_cache: options.use_cache,
        };

        let mut rows = Vec::with_capacity(provider_count);
        let mut stopped_early = false;
        if options.fail_fast {
            for request in requests {
                let row = self.compare_one(request, dispatch).await?;
                stopped_early = !row.is_ok();
                rows.push(row);
                if stopped_early {
                    debug!("stopping comparison at first failure");
                    break;
                }
            }
        } else {
            let runs = requests
                .into_iter()
                .map(|request| self.compare_one(request, dispatch));
            for row in join_all(runs).await {
                rows.push(row?);
            }
        }

        let success_count = rows.iter().filter(|r| r.is_ok()).count();
        assign_quality_scores(&mut rows);
        rank_rows(&mut rows, options.rank_by);

        if !options.include_errors {
            rows.retain(ComparisonRow::is_ok);
        }
        if let Some(top) = options.top {
            rows.truncate(top);
        }

        info!(
            providers = provider_count,
            succeeded = success_count,
            rank_by = %options.rank_by,
            "comparison complete"
        );
        Ok(Comparison {
            rank_by: options.rank_by,
            success_count,
            provider_count,
            stopped_early,
            rows,
        })
    }

    /// Resolves targets to one request each, failing on unknown providers or
    /// an empty selection.
    fn plan_comparison(
        &self,
        text: &str,
        targets: &[ProviderTarget],
        params: EmbeddingParams,
        only_configured: bool,
    ) -> Result<Vec<EmbeddingRequest>, EngineError> {
        let registry = self.registry();
        if registry.is_empty() {
            return Err(EngineError::Configuration(
                "no embedding providers are registered".to_string(),
            ));
        }

        let targets: Vec<ProviderTarget> = if targets.is_empty() {
            registry.names().into_iter().map(ProviderTarget::new).collect()
        } else {
            targets.to_vec()
        };

        let mut requests = Vec::with_capacity(targets.len());
        for target in &targets {
            let provider =
                registry
                    .get(&target.name)
                    .ok_or_else(|| EngineError::UnknownProvider {
                        name: target.name.clone(),
                        available: registry.names().join(", "),
                    })?;
            if only_configured && !provider.is_configured() {
                debug!(provider = provider.name(), "skipping unconfigured provider");
                continue;
            }
            let model = target
                .model
                .as_deref()
                .unwrap_or_else(|| provider.default_model());
            requests.push(EmbeddingRequest::new(text, provider.name(), model, params));
        }

        if requests.is_empty() {
            return Err(EngineError::Configuration(
                "no configured providers left to compare".to_string(),
            ));
        }
        Ok(requests)
    }

    async fn compare_one(
        &self,
        request: EmbeddingRequest,
        options: DispatchOptions,
    ) -> Result<ComparisonRow, EngineError> {
        let provider = request.provider().to_string();
        let model = request.model().to_string();
        let result = self.dispatch(vec![request], options).await?;
        Ok(result.into_iter().next().map_or_else(
            || {
                ComparisonRow::from(EmbeddingResult::failure(
                    0,
                    provider,
                    model,
                    ErrorKind::ProviderError,
                    "no result returned",
                    0.0,
                ))
            },
            ComparisonRow::from,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_parsing() {
        let t: ProviderTarget = "openai".parse().expect("parse");
        assert_eq!(t, ProviderTarget::new("openai"));

        let t: ProviderTarget = "Ollama:nomic-embed-text:latest".parse().expect("parse");
        assert_eq!(t.name, "ollama");
        assert_eq!(t.model.as_deref(), Some("nomic-embed-text:latest"));
        assert_eq!(t.to_string(), "ollama:nomic-embed-text:latest");

        let t: ProviderTarget = "voyage:".parse().expect("parse");
        assert_eq!(t.model, None);

        assert!(":model".parse::<ProviderTarget>().is_err());
    }

    #[test]
    fn row_serialization_omits_vector() {
        let row = ComparisonRow::from(EmbeddingResult::success(
            0,
            "openai",
            "text-embedding-3-small",
            vec![0.5, 0.5],
            12.0,
            Some(0.000_02),
        ));
        let json = serde_json::to_value(&row).expect("json");
        assert!(json.get("vector").is_none());
        assert_eq!(json.get("status").and_then(|v| v.as_str()), Some("ok"));
        assert_eq!(json.get("dimensions").and_then(serde_json::Value::as_u64), Some(2));
    }
}
