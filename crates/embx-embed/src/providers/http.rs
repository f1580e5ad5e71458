use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ProviderError;

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Sends the request and decodes a successful JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, ProviderError> {
    let res = req.send().await?;
    if !res.status().is_success() {
        let status = res.status().as_u16();
        let url = res.url().clone();
        let body = res.text().await.unwrap_or_default();
        debug!(status, url = %url, "provider returned error status");
        return Err(ProviderError::api(status, body));
    }
    let bytes = res.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        assert_eq!(endpoint("https://a.b/v1/", "/embeddings"), "https://a.b/v1/embeddings");
        assert_eq!(endpoint("https://a.b/v1", "embeddings"), "https://a.b/v1/embeddings");
    }
}
