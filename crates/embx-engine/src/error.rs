use thiserror::Error;

/// Failures that stop an operation before any provider is called.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unknown provider '{name}'; available: {available}")]
    UnknownProvider { name: String, available: String },
}
