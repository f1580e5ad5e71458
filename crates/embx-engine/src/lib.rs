pub mod compare;
pub mod config;
pub mod dispatcher;
pub mod error;
mod inflight;
pub mod normalize;
pub mod ranking;

pub use compare::{CompareOptions, Comparison, ComparisonRow, ProviderTarget};
pub use config::{DispatcherConfig, env_bool, env_f64, env_usize};
pub use dispatcher::{DispatchOptions, Dispatcher};
pub use error::EngineError;
pub use normalize::{Embedded, Failure, ItemOutcome};
pub use ranking::RankBy;

pub use embx_cache::{CacheEntry, CacheError, CacheStore, MemoryCacheStore, SqliteCacheStore};
pub use embx_core::*;
pub use embx_embed::{
    EmbeddingProvider, EmbeddingProviderConfig, ProviderError, ProviderRegistry, ProviderRequest,
    ProviderResponse, build_embedding_provider,
};
