use std::sync::Arc;

use crate::config::EmbeddingProviderConfig;
use crate::error::ProviderError;
use crate::providers::{
    HuggingFaceEmbeddingProvider, OllamaEmbeddingProvider, OpenAiEmbeddingProvider,
    OpenRouterEmbeddingProvider, VoyageEmbeddingProvider,
};
use crate::traits::EmbeddingProvider;

pub fn build_embedding_provider(
    cfg: EmbeddingProviderConfig,
) -> Result<Arc<dyn EmbeddingProvider>, ProviderError> {
    match cfg {
        EmbeddingProviderConfig::OpenAi(c) => Ok(Arc::new(OpenAiEmbeddingProvider::new(c)?)),
        EmbeddingProviderConfig::Voyage(c) => Ok(Arc::new(VoyageEmbeddingProvider::new(c)?)),
        EmbeddingProviderConfig::OpenRouter(c) => {
            Ok(Arc::new(OpenRouterEmbeddingProvider::new(c)?))
        }
        EmbeddingProviderConfig::HuggingFace(c) => {
            Ok(Arc::new(HuggingFaceEmbeddingProvider::new(c)?))
        }
        EmbeddingProviderConfig::Ollama(c) => Ok(Arc::new(OllamaEmbeddingProvider::new(c)?)),
    }
}
