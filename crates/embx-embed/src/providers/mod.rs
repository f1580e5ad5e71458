mod http;
pub mod huggingface;
pub mod ollama;
pub mod openai;
pub mod openai_compatible;
pub mod openrouter;
pub mod voyage;

pub use huggingface::HuggingFaceEmbeddingProvider;
pub use ollama::OllamaEmbeddingProvider;
pub use openai::OpenAiEmbeddingProvider;
pub use openai_compatible::OpenAiCompatibleEmbeddingProvider;
pub use openrouter::OpenRouterEmbeddingProvider;
pub use voyage::VoyageEmbeddingProvider;
