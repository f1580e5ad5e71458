use std::fmt;

use serde::{Deserialize, Serialize};

/// Failure taxonomy shared by every provider adapter.
///
/// Adapters classify their own failures into one of these kinds so retry and
/// reporting can be applied without knowing provider internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    AuthError,
    RateLimited,
    Timeout,
    InvalidModel,
    NetworkError,
    ProviderError,
    MalformedResponse,
}

impl ErrorKind {
    pub const ALL: [Self; 7] = [
        Self::AuthError,
        Self::RateLimited,
        Self::Timeout,
        Self::InvalidModel,
        Self::NetworkError,
        Self::ProviderError,
        Self::MalformedResponse,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthError => "AuthError",
            Self::RateLimited => "RateLimited",
            Self::Timeout => "Timeout",
            Self::InvalidModel => "InvalidModel",
            Self::NetworkError => "NetworkError",
            Self::ProviderError => "ProviderError",
            Self::MalformedResponse => "MalformedResponse",
        }
    }

    /// Default retryable set. `ProviderError` is not part of it.
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::RateLimited | Self::Timeout | Self::NetworkError)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rate_limit_timeout_and_network_are_transient() {
        let transient: Vec<_> = ErrorKind::ALL
            .into_iter()
            .filter(|k| k.is_transient())
            .collect();
        assert_eq!(
            transient,
            vec![
                ErrorKind::RateLimited,
                ErrorKind::Timeout,
                ErrorKind::NetworkError
            ]
        );
    }

    #[test]
    fn serializes_as_variant_name() {
        let json = serde_json::to_string(&ErrorKind::MalformedResponse).expect("serialize");
        assert_eq!(json, "\"MalformedResponse\"");
    }
}
