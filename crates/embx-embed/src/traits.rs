use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{ProviderRequest, ProviderResponse};

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn default_model(&self) -> &str;

    /// Cheap local check; does not contact the provider.
    fn supports(&self, model: &str) -> bool {
        !model.trim().is_empty()
    }

    /// Whether the credentials this provider needs are present.
    fn is_configured(&self) -> bool {
        true
    }

    /// Largest number of inputs sent in one `embed` call.
    fn max_batch_size(&self) -> usize {
        128
    }

    /// Embeds `request.inputs`; vectors come back in input order.
    async fn embed(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;
}
