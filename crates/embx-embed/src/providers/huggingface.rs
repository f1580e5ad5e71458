use embx_core::TruncationMode;
use reqwest::Client;
use serde_json::{Map, Value, json};

use crate::config::HuggingFaceConfig;
use crate::error::ProviderError;
use crate::providers::http::{endpoint, send_json};
use crate::traits::EmbeddingProvider;
use crate::types::{ProviderRequest, ProviderResponse};

/// Hosted feature-extraction pipeline on the HuggingFace inference router.
#[derive(Clone)]
pub struct HuggingFaceEmbeddingProvider {
    config: HuggingFaceConfig,
    client: Client,
}

impl HuggingFaceEmbeddingProvider {
    pub fn new(config: HuggingFaceConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn url(&self, model: &str) -> String {
        endpoint(
            &self.config.base_url,
            &format!("{model}/pipeline/feature-extraction"),
        )
    }

    fn payload(request: &ProviderRequest) -> Value {
        let mut payload = Map::new();
        payload.insert("inputs".to_string(), json!(request.inputs));
        match request.truncation {
            TruncationMode::Auto => {}
            TruncationMode::Disabled => {
                payload.insert("truncate".to_string(), Value::Bool(false));
            }
            TruncationMode::Start => {
                payload.insert("truncate".to_string(), Value::Bool(true));
                payload.insert("truncation_direction".to_string(), json!("Left"));
            }
            TruncationMode::End => {
                payload.insert("truncate".to_string(), Value::Bool(true));
                payload.insert("truncation_direction".to_string(), json!("Right"));
            }
        }
        Value::Object(payload)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HuggingFaceEmbeddingProvider {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn max_batch_size(&self) -> usize {
        32
    }

    async fn embed(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        if request.inputs.is_empty() {
            return Err(ProviderError::Config("embedding input is empty".to_string()));
        }
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential("EMBX_HUGGINGFACE_API_KEY"))?;

        let req = self
            .client
            .post(self.url(&request.model))
            .bearer_auth(api_key)
            .json(&Self::payload(&request));
        let body: Value = send_json(req).await?;
        let vectors = normalize_response(&body, request.inputs.len())?;

        Ok(ProviderResponse {
            provider: self.name().to_string(),
            model: request.model,
            vectors,
            usage_tokens: None,
            cost_usd: None,
        })
    }
}

#[allow(clippy::cast_possible_truncation)]
fn as_vector(value: &Value) -> Option<Vec<f32>> {
    let items = value.as_array()?;
    items
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

/// Accepts the shapes the inference router is known to return: a bare vector
/// for single inputs, a list of vectors, or an object with `embeddings`/`data`.
pub fn normalize_response(body: &Value, expected: usize) -> Result<Vec<Vec<f32>>, ProviderError> {
    if expected == 1 {
        if let Some(v) = as_vector(body) {
            return Ok(vec![v]);
        }
    }

    if let Some(rows) = body.as_array() {
        let vectors: Option<Vec<Vec<f32>>> = rows.iter().map(as_vector).collect();
        if let Some(vectors) = vectors.filter(|v| v.len() == expected) {
            return Ok(vectors);
        }
    }

    if let Some(obj) = body.as_object() {
        let list = obj
            .get("embeddings")
            .or_else(|| obj.get("data"))
            .and_then(Value::as_array);
        if let Some(list) = list {
            let vectors: Vec<Vec<f32>> = list
                .iter()
                .filter_map(|item| {
                    item.get("embedding")
                        .and_then(as_vector)
                        .or_else(|| as_vector(item))
                })
                .collect();
            if vectors.len() == expected {
                return Ok(vectors);
            }
        }
    }

    Err(ProviderError::InvalidResponse(
        "unexpected feature-extraction response shape; use a sentence embedding model".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_vector_for_single_input() {
        let v = normalize_response(&json!([0.1, 0.2]), 1).expect("shape");
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].len(), 2);
    }

    #[test]
    fn list_of_vectors() {
        let v = normalize_response(&json!([[1.0, 2.0], [3.0, 4.0]]), 2).expect("shape");
        assert_eq!(v, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn wrapped_embeddings_object() {
        let body = json!({"embeddings": [{"embedding": [1.0]}, [2.0]]});
        let v = normalize_response(&body, 2).expect("shape");
        assert_eq!(v, vec![vec![1.0], vec![2.0]]);
        let body = json!({"data": [{"embedding": [1.0]}]});
        assert!(normalize_response(&body, 1).is_ok());
    }

    #[test]
    fn token_level_output_is_rejected() {
        let body = json!([[[0.1, 0.2], [0.3, 0.4]]]);
        let err = normalize_response(&body, 1).expect_err("token embeddings");
        assert_eq!(err.kind(), embx_core::ErrorKind::MalformedResponse);
    }

    #[test]
    fn count_mismatch_is_rejected() {
        assert!(normalize_response(&json!([[1.0], [2.0]]), 3).is_err());
    }

    #[test]
    fn truncation_maps_to_direction() {
        let mut req = ProviderRequest::single("a", "m");
        req.truncation = TruncationMode::Start;
        let p = HuggingFaceEmbeddingProvider::payload(&req);
        assert_eq!(p["truncate"], json!(true));
        assert_eq!(p["truncation_direction"], json!("Left"));
    }
}
