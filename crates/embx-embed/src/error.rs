use embx_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("missing credential: set {0}")]
    MissingCredential(&'static str),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("model '{0}' is not supported by this provider")]
    UnsupportedModel(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("provider returned invalid response: {0}")]
    InvalidResponse(String),

    #[error("provider API error: status={status}, body={body}")]
    Api { status: u16, body: String },

    #[error("request timed out")]
    Timeout,
}

const MAX_BODY_CHARS: usize = 512;

impl ProviderError {
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        let mut body: String = body.into();
        if let Some((cut, _)) = body.char_indices().nth(MAX_BODY_CHARS) {
            body.truncate(cut);
            body.push_str("...");
        }
        Self::Api { status, body }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredential(_) => ErrorKind::AuthError,
            Self::Config(_) => ErrorKind::ProviderError,
            Self::UnsupportedModel(_) => ErrorKind::InvalidModel,
            Self::Http(err) => classify_transport(err),
            Self::Network(_) => ErrorKind::NetworkError,
            Self::Serde(_) | Self::InvalidResponse(_) => ErrorKind::MalformedResponse,
            Self::Api { status, body } => classify_status(*status, body),
            Self::Timeout => ErrorKind::Timeout,
        }
    }
}

fn classify_transport(err: &reqwest::Error) -> ErrorKind {
    if err.is_timeout() {
        ErrorKind::Timeout
    } else if err.is_decode() {
        ErrorKind::MalformedResponse
    } else if let Some(status) = err.status() {
        classify_status(status.as_u16(), "")
    } else if err.is_connect() || err.is_request() || err.is_body() {
        ErrorKind::NetworkError
    } else {
        ErrorKind::ProviderError
    }
}

pub fn classify_status(status: u16, body: &str) -> ErrorKind {
    match status {
        401 | 403 => ErrorKind::AuthError,
        404 => ErrorKind::InvalidModel,
        400 | 422 if body.to_ascii_lowercase().contains("model") => ErrorKind::InvalidModel,
        408 | 504 => ErrorKind::Timeout,
        429 => ErrorKind::RateLimited,
        _ => ErrorKind::ProviderError,
    }
}
