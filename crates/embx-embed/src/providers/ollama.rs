use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::OllamaConfig;
use crate::error::ProviderError;
use crate::providers::http::{endpoint, send_json};
use crate::traits::EmbeddingProvider;
use crate::types::{ProviderRequest, ProviderResponse};

/// Local Ollama daemon. The legacy `/api/embeddings` endpoint takes one
/// prompt per request, so batches are sent sequentially.
#[derive(Clone)]
pub struct OllamaEmbeddingProvider {
    config: OllamaConfig,
    client: Client,
}

impl OllamaEmbeddingProvider {
    pub fn new(config: OllamaConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }

    fn max_batch_size(&self) -> usize {
        16
    }

    async fn embed(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        if request.inputs.is_empty() {
            return Err(ProviderError::Config("embedding input is empty".to_string()));
        }

        let url = endpoint(&self.config.base_url, "api/embeddings");
        let mut vectors = Vec::with_capacity(request.inputs.len());
        for prompt in &request.inputs {
            let payload = OllamaEmbedRequest {
                model: &request.model,
                prompt,
            };
            let parsed: OllamaEmbedResponse =
                send_json(self.client.post(&url).json(&payload)).await?;
            let vector = parsed.embedding.ok_or_else(|| {
                ProviderError::InvalidResponse("ollama response missing embedding".to_string())
            })?;
            vectors.push(vector);
        }

        Ok(ProviderResponse {
            provider: self.name().to_string(),
            model: request.model,
            vectors,
            usage_tokens: None,
            cost_usd: Some(0.0),
        })
    }
}

#[derive(Debug, Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_embedding_field_parses_as_none() {
        let parsed: OllamaEmbedResponse = serde_json::from_str(r#"{"error":"x"}"#).expect("parse");
        assert!(parsed.embedding.is_none());
    }

    #[test]
    fn local_provider_needs_no_credentials() {
        let p = OllamaEmbeddingProvider::new(OllamaConfig::new("nomic-embed-text")).expect("client");
        assert!(p.is_configured());
        assert_eq!(p.default_model(), "nomic-embed-text");
    }
}
