use crate::config::OpenAiCompatibleConfig;
use crate::error::ProviderError;
use crate::providers::openai_compatible::OpenAiCompatibleEmbeddingProvider;
use crate::traits::EmbeddingProvider;
use crate::types::{ProviderRequest, ProviderResponse};

/// OpenRouter proxies vendor models under `vendor/model` ids and reports the
/// billed cost in `usage.cost`.
#[derive(Clone)]
pub struct OpenRouterEmbeddingProvider {
    inner: OpenAiCompatibleEmbeddingProvider,
}

impl OpenRouterEmbeddingProvider {
    pub fn new(mut config: OpenAiCompatibleConfig) -> Result<Self, ProviderError> {
        if config.base_url.trim().is_empty() {
            config.base_url = "https://openrouter.ai/api/v1".to_string();
        }
        Ok(Self {
            inner: OpenAiCompatibleEmbeddingProvider::named("openrouter", config)?,
        })
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenRouterEmbeddingProvider {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    fn default_model(&self) -> &str {
        self.inner.default_model()
    }

    fn supports(&self, model: &str) -> bool {
        model
            .split_once('/')
            .is_some_and(|(vendor, name)| !vendor.is_empty() && !name.is_empty())
    }

    fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }

    async fn embed(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        if !self.supports(&request.model) {
            return Err(ProviderError::UnsupportedModel(request.model));
        }
        self.inner.embed(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn models_need_vendor_prefix() {
        let p = OpenRouterEmbeddingProvider::new(OpenAiCompatibleConfig::new(
            None,
            "openai/text-embedding-3-small",
        ))
        .expect("client");
        assert!(p.supports("openai/text-embedding-3-small"));
        assert!(!p.supports("text-embedding-3-small"));
        assert!(!p.supports("/x"));
        assert!(!p.is_configured());
    }

    #[tokio::test]
    async fn bare_model_name_is_rejected() {
        let p = OpenRouterEmbeddingProvider::new(OpenAiCompatibleConfig::new(
            Some("or-test".to_string()),
            "openai/text-embedding-3-small",
        ))
        .expect("client");
        let err = p
            .embed(ProviderRequest::single("hello", "text-embedding-3-small"))
            .await
            .expect_err("unsupported");
        assert!(matches!(err, ProviderError::UnsupportedModel(_)));
    }
}
