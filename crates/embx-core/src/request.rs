use serde::{Deserialize, Serialize};

use crate::key::CacheKey;

/// How a provider should handle inputs longer than the model context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationMode {
    /// Leave the decision to the provider.
    #[default]
    Auto,
    /// Reject over-long inputs.
    Disabled,
    /// Drop tokens from the start of the input.
    Start,
    /// Drop tokens from the end of the input.
    End,
}

impl TruncationMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Disabled => "disabled",
            Self::Start => "start",
            Self::End => "end",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmbeddingParams {
    pub dimensions: Option<usize>,
    #[serde(default)]
    pub truncation: TruncationMode,
}

impl EmbeddingParams {
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn with_truncation(mut self, truncation: TruncationMode) -> Self {
        self.truncation = truncation;
        self
    }
}

/// A single text to embed with one provider/model pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingRequest {
    text: String,
    provider: String,
    model: String,
    params: EmbeddingParams,
}

impl EmbeddingRequest {
    pub fn new(
        text: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
        params: EmbeddingParams,
    ) -> Self {
        Self {
            text: text.into(),
            provider: provider.into(),
            model: model.into(),
            params,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub const fn params(&self) -> EmbeddingParams {
        self.params
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::derive(&self.provider, &self.model, &self.text, self.params)
    }
}
