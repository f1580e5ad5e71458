use embx_core::TruncationMode;
use serde_json::{Map, Value};

use crate::config::OpenAiCompatibleConfig;
use crate::error::ProviderError;
use crate::providers::openai_compatible::OpenAiCompatibleEmbeddingProvider;
use crate::traits::EmbeddingProvider;
use crate::types::{ProviderRequest, ProviderResponse};

#[derive(Clone)]
pub struct VoyageEmbeddingProvider {
    inner: OpenAiCompatibleEmbeddingProvider,
}

impl VoyageEmbeddingProvider {
    pub fn new(mut config: OpenAiCompatibleConfig) -> Result<Self, ProviderError> {
        if config.base_url.trim().is_empty() {
            config.base_url = "https://api.voyageai.com/v1".to_string();
        }
        Ok(Self {
            inner: OpenAiCompatibleEmbeddingProvider::named("voyage", config)?,
        })
    }

    fn payload(request: &ProviderRequest) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("model".to_string(), Value::String(request.model.clone()));
        payload.insert(
            "input".to_string(),
            Value::Array(request.inputs.iter().cloned().map(Value::String).collect()),
        );
        if let Some(dim) = request.dimensions {
            payload.insert("output_dimension".to_string(), Value::Number(dim.into()));
        }
        match request.truncation {
            TruncationMode::Auto => {}
            TruncationMode::Disabled => {
                payload.insert("truncation".to_string(), Value::Bool(false));
            }
            TruncationMode::Start | TruncationMode::End => {
                payload.insert("truncation".to_string(), Value::Bool(true));
            }
        }
        payload
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for VoyageEmbeddingProvider {
    fn name(&self) -> &'static str {
        "voyage"
    }

    fn default_model(&self) -> &str {
        self.inner.default_model()
    }

    fn supports(&self, model: &str) -> bool {
        model.starts_with("voyage-")
    }

    fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }

    fn max_batch_size(&self) -> usize {
        1000
    }

    async fn embed(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        if !self.supports(&request.model) {
            return Err(ProviderError::UnsupportedModel(request.model));
        }
        if request.inputs.is_empty() {
            return Err(ProviderError::Config("embedding input is empty".to_string()));
        }

        let payload = Self::payload(&request);
        let (parsed, vectors) = self
            .inner
            .post_embeddings(payload, request.inputs.len())
            .await?;

        Ok(ProviderResponse {
            provider: self.name().to_string(),
            model: parsed.model.unwrap_or(request.model),
            vectors,
            usage_tokens: parsed.usage.and_then(|u| u.tokens()),
            cost_usd: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_uses_voyage_field_names() {
        let mut req = ProviderRequest::single("a", "voyage-3-lite");
        req.dimensions = Some(512);
        req.truncation = TruncationMode::Disabled;
        let p = VoyageEmbeddingProvider::payload(&req);
        assert_eq!(p.get("output_dimension").and_then(Value::as_u64), Some(512));
        assert_eq!(p.get("truncation"), Some(&Value::Bool(false)));
        assert!(p.get("dimensions").is_none());
    }

    #[test]
    fn auto_truncation_is_omitted() {
        let p = VoyageEmbeddingProvider::payload(&ProviderRequest::single("a", "voyage-3"));
        assert!(p.get("truncation").is_none());
    }
}
