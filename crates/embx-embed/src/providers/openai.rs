use crate::config::OpenAiCompatibleConfig;
use crate::error::ProviderError;
use crate::providers::openai_compatible::OpenAiCompatibleEmbeddingProvider;
use crate::traits::EmbeddingProvider;
use crate::types::{ProviderRequest, ProviderResponse};

/// USD per one million input tokens.
const PRICE_PER_1M_TOKENS: [(&str, f64); 3] = [
    ("text-embedding-3-small", 0.02),
    ("text-embedding-3-large", 0.13),
    ("text-embedding-ada-002", 0.10),
];

pub fn price_per_million(model: &str) -> Option<f64> {
    PRICE_PER_1M_TOKENS
        .iter()
        .find(|(m, _)| *m == model)
        .map(|(_, p)| *p)
}

#[allow(clippy::cast_precision_loss)]
fn estimate_cost(tokens: Option<u64>, model: &str) -> Option<f64> {
    let price = price_per_million(model)?;
    Some(tokens? as f64 / 1_000_000.0 * price)
}

#[derive(Clone)]
pub struct OpenAiEmbeddingProvider {
    inner: OpenAiCompatibleEmbeddingProvider,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            inner: OpenAiCompatibleEmbeddingProvider::named("openai", config)?,
        })
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn default_model(&self) -> &str {
        self.inner.default_model()
    }

    fn supports(&self, model: &str) -> bool {
        model.starts_with("text-embedding-")
    }

    fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }

    fn max_batch_size(&self) -> usize {
        2048
    }

    async fn embed(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        if !self.supports(&request.model) {
            return Err(ProviderError::UnsupportedModel(request.model));
        }
        let mut res = self.inner.embed(request).await?;
        if res.cost_usd.is_none() {
            res.cost_usd = estimate_cost(res.usage_tokens, &res.model);
        }
        Ok(res)
    }
}
