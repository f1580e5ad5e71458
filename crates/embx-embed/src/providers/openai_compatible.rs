use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::OpenAiCompatibleConfig;
use crate::error::ProviderError;
use crate::providers::http::{endpoint, send_json};
use crate::traits::EmbeddingProvider;
use crate::types::{ProviderRequest, ProviderResponse};

/// Adapter for any endpoint speaking the `/embeddings` wire format.
#[derive(Clone)]
pub struct OpenAiCompatibleEmbeddingProvider {
    name: &'static str,
    config: OpenAiCompatibleConfig,
    client: Client,
}

impl OpenAiCompatibleEmbeddingProvider {
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, ProviderError> {
        Self::named("openai-compatible", config)
    }

    pub fn named(name: &'static str, config: OpenAiCompatibleConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            name,
            config,
            client,
        })
    }

    pub fn config(&self) -> &OpenAiCompatibleConfig {
        &self.config
    }

    fn payload(request: &ProviderRequest) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("model".to_string(), Value::String(request.model.clone()));
        payload.insert(
            "input".to_string(),
            Value::Array(request.inputs.iter().cloned().map(Value::String).collect()),
        );
        if let Some(dim) = request.dimensions {
            payload.insert("dimensions".to_string(), Value::Number(dim.into()));
        }
        payload
    }

    /// Posts `payload` and returns vectors sorted by their response index.
    pub(crate) async fn post_embeddings(
        &self,
        payload: Map<String, Value>,
        expected: usize,
    ) -> Result<(OpenAiEmbeddingResponse, Vec<Vec<f32>>), ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential(credential_hint(self.name)))?;

        let mut req = self
            .client
            .post(endpoint(&self.config.base_url, "embeddings"))
            .bearer_auth(api_key)
            .json(&payload);
        for (name, value) in &self.config.extra_headers {
            req = req.header(name, value);
        }

        let mut parsed: OpenAiEmbeddingResponse = send_json(req).await?;
        if parsed.data.len() != expected {
            return Err(ProviderError::InvalidResponse(format!(
                "expected {expected} embeddings, got {}",
                parsed.data.len()
            )));
        }

        let mut data = std::mem::take(&mut parsed.data);
        data.sort_by_key(|it| it.index);
        let vectors = data.into_iter().map(|it| it.embedding).collect();
        Ok((parsed, vectors))
    }
}

fn credential_hint(name: &str) -> &'static str {
    match name {
        "voyage" => "EMBX_VOYAGE_API_KEY",
        "openrouter" => "EMBX_OPENROUTER_API_KEY",
        _ => "EMBX_OPENAI_API_KEY",
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiCompatibleEmbeddingProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn embed(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        if request.inputs.is_empty() {
            return Err(ProviderError::Config("embedding input is empty".to_string()));
        }

        let payload = Self::payload(&request);
        let (parsed, vectors) = self.post_embeddings(payload, request.inputs.len()).await?;

        Ok(ProviderResponse {
            provider: self.name.to_string(),
            model: parsed.model.unwrap_or(request.model),
            vectors,
            usage_tokens: parsed.usage.as_ref().and_then(Usage::tokens),
            cost_usd: parsed.usage.and_then(|u| u.cost),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiEmbeddingResponse {
    #[serde(default)]
    pub model: Option<String>,
    pub data: Vec<EmbeddingItem>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingItem {
    #[serde(default)]
    pub index: usize,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Usage {
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
    #[serde(default)]
    pub cost: Option<f64>,
}

impl Usage {
    pub fn tokens(&self) -> Option<u64> {
        self.prompt_tokens.or(self.total_tokens)
    }
}
