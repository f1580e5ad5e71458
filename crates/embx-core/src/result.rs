use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Error,
}

/// Canonical outcome for one (input, provider) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResult {
    pub index: usize,
    pub provider: String,
    pub model: String,
    pub vector: Option<Vec<f32>>,
    pub dimensions: usize,
    pub latency_ms: f64,
    pub cost_usd: Option<f64>,
    pub cached: bool,
    pub status: Status,
    pub error_kind: Option<ErrorKind>,
    pub error: Option<String>,
}

impl EmbeddingResult {
    pub fn success(
        index: usize,
        provider: impl Into<String>,
        model: impl Into<String>,
        vector: Vec<f32>,
        latency_ms: f64,
        cost_usd: Option<f64>,
    ) -> Self {
        Self {
            index,
            provider: provider.into(),
            model: model.into(),
            dimensions: vector.len(),
            vector: Some(vector),
            latency_ms,
            cost_usd,
            cached: false,
            status: Status::Ok,
            error_kind: None,
            error: None,
        }
    }

    pub fn failure(
        index: usize,
        provider: impl Into<String>,
        model: impl Into<String>,
        kind: ErrorKind,
        message: impl Into<String>,
        latency_ms: f64,
    ) -> Self {
        Self {
            index,
            provider: provider.into(),
            model: model.into(),
            vector: None,
            dimensions: 0,
            latency_ms,
            cost_usd: None,
            cached: false,
            status: Status::Error,
            error_kind: Some(kind),
            error: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}
