//! Validation of raw adapter output into per-item outcomes.

use embx_core::{ErrorKind, dominant_dimension};
use embx_embed::ProviderResponse;

#[derive(Debug, Clone, PartialEq)]
pub struct Embedded {
    pub vector: Vec<f32>,
    pub model: String,
    pub latency_ms: f64,
    pub cost_usd: Option<f64>,
    /// Served from the cache rather than a remote call.
    pub cached: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
    pub latency_ms: f64,
}

impl Failure {
    pub fn new(kind: ErrorKind, message: impl Into<String>, latency_ms: f64) -> Self {
        Self {
            kind,
            message: message.into(),
            latency_ms,
        }
    }
}

pub type ItemOutcome = Result<Embedded, Failure>;

/// Splits one adapter response into `expected` outcomes, in request order.
///
/// A count mismatch fails every item of the call. Otherwise each vector is
/// checked on its own: it must be non-empty, finite, and match the dominant
/// dimension of the call.
pub fn normalize_response(
    response: ProviderResponse,
    expected: usize,
    latency_ms: f64,
) -> Vec<ItemOutcome> {
    if response.vectors.len() != expected {
        let message = format!(
            "{} returned {} vectors for {expected} inputs",
            response.provider,
            response.vectors.len()
        );
        return (0..expected)
            .map(|_| Err(Failure::new(ErrorKind::MalformedResponse, message.clone(), latency_ms)))
            .collect();
    }

    let dims = dominant_dimension(
        response
            .vectors
            .iter()
            .map(Vec::len)
            .filter(|len| *len > 0),
    );
    #[allow(clippy::cast_precision_loss)]
    let per_item_cost = response
        .cost_usd
        .map(|total| total / expected.max(1) as f64);

    response
        .vectors
        .into_iter()
        .map(|vector| {
            let malformed = |msg: String| Err(Failure::new(ErrorKind::MalformedResponse, msg, latency_ms));
            if vector.is_empty() {
                return malformed("empty vector".to_string());
            }
            if vector.iter().any(|v| !v.is_finite()) {
                return malformed("vector contains non-finite values".to_string());
            }
            if dims.is_some_and(|d| d != vector.len()) {
                return malformed(format!(
                    "vector has {} dimensions, call returned {}",
                    vector.len(),
                    dims.unwrap_or_default()
                ));
            }
            Ok(Embedded {
                vector,
                model: response.model.clone(),
                latency_ms,
                cost_usd: per_item_cost,
                cached: false,
            })
        })
        .collect()
}
