use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub extra_headers: Vec<(String, String)>,
}

impl OpenAiCompatibleConfig {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
            extra_headers: Vec::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl HuggingFaceConfig {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: "https://router.huggingface.co/hf-inference/models".to_string(),
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl OllamaConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub enum EmbeddingProviderConfig {
    OpenAi(OpenAiCompatibleConfig),
    Voyage(OpenAiCompatibleConfig),
    OpenRouter(OpenAiCompatibleConfig),
    HuggingFace(HuggingFaceConfig),
    Ollama(OllamaConfig),
}

pub const PROVIDER_NAMES: [&str; 5] = ["huggingface", "ollama", "openai", "openrouter", "voyage"];

impl EmbeddingProviderConfig {
    /// Resolves one provider's settings from process environment variables.
    pub fn from_env(name: &str, timeout: Duration) -> Option<Self> {
        Self::from_lookup(name, timeout, |key| std::env::var(key).ok())
    }

    /// Every known provider, configured or not, in name order.
    pub fn all_from_env(timeout: Duration) -> Vec<Self> {
        PROVIDER_NAMES
            .iter()
            .filter_map(|name| Self::from_env(name, timeout))
            .collect()
    }

    pub fn from_lookup<F>(name: &str, timeout: Duration, lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|&k| lookup(k))
                .find(|v| !v.trim().is_empty())
        };

        let cfg = match name {
            "openai" => {
                let mut c = OpenAiCompatibleConfig::new(
                    first(&["EMBX_OPENAI_API_KEY", "OPENAI_API_KEY"]),
                    "text-embedding-3-small",
                );
                if let Some(url) = first(&["EMBX_OPENAI_BASE_URL", "OPENAI_BASE_URL"]) {
                    c.base_url = url;
                }
                Self::OpenAi(c.with_timeout(timeout))
            }
            "voyage" => Self::Voyage(
                OpenAiCompatibleConfig::new(
                    first(&["EMBX_VOYAGE_API_KEY", "VOYAGE_API_KEY"]),
                    "voyage-3-lite",
                )
                .with_base_url("https://api.voyageai.com/v1")
                .with_timeout(timeout),
            ),
            "openrouter" => {
                let mut c = OpenAiCompatibleConfig::new(
                    first(&["EMBX_OPENROUTER_API_KEY", "OPENROUTER_API_KEY"]),
                    "openai/text-embedding-3-small",
                )
                .with_base_url(
                    first(&["EMBX_OPENROUTER_BASE_URL", "OPENROUTER_BASE_URL"])
                        .unwrap_or_else(|| "https://openrouter.ai/api/v1".to_string()),
                )
                .with_timeout(timeout);
                if let Some(referer) = first(&["EMBX_OPENROUTER_REFERER", "OPENROUTER_REFERER"]) {
                    c.extra_headers.push(("HTTP-Referer".to_string(), referer));
                }
                if let Some(title) = first(&["EMBX_OPENROUTER_TITLE", "OPENROUTER_TITLE"]) {
                    c.extra_headers.push(("X-Title".to_string(), title));
                }
                Self::OpenRouter(c)
            }
            "huggingface" => {
                let mut c = HuggingFaceConfig::new(
                    first(&[
                        "EMBX_HUGGINGFACE_API_KEY",
                        "HF_TOKEN",
                        "HUGGINGFACEHUB_API_TOKEN",
                    ]),
                    "sentence-transformers/all-MiniLM-L6-v2",
                );
                if let Some(url) = first(&["EMBX_HUGGINGFACE_BASE_URL"]) {
                    c.base_url = url;
                }
                c.timeout = timeout;
                Self::HuggingFace(c)
            }
            "ollama" => {
                let mut c = OllamaConfig::new(
                    first(&["EMBX_OLLAMA_MODEL"]).unwrap_or_else(|| "nomic-embed-text".to_string()),
                );
                if let Some(url) = first(&["EMBX_OLLAMA_BASE_URL", "OLLAMA_BASE_URL"]) {
                    c.base_url = url;
                }
                c.timeout = timeout;
                Self::Ollama(c)
            }
            _ => return None,
        };
        Some(cfg)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai",
            Self::Voyage(_) => "voyage",
            Self::OpenRouter(_) => "openrouter",
            Self::HuggingFace(_) => "huggingface",
            Self::Ollama(_) => "ollama",
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        match self {
            Self::OpenAi(c) | Self::Voyage(c) | Self::OpenRouter(c) => c.api_key.as_deref(),
            Self::HuggingFace(c) => c.api_key.as_deref(),
            Self::Ollama(_) => None,
        }
    }

    /// Environment variable a user should set to configure this provider.
    pub const fn credential_env(&self) -> Option<&'static str> {
        match self {
            Self::OpenAi(_) => Some("EMBX_OPENAI_API_KEY"),
            Self::Voyage(_) => Some("EMBX_VOYAGE_API_KEY"),
            Self::OpenRouter(_) => Some("EMBX_OPENROUTER_API_KEY"),
            Self::HuggingFace(_) => Some("EMBX_HUGGINGFACE_API_KEY"),
            Self::Ollama(_) => None,
        }
    }
}

/// Shows only the first four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let head: String = secret.chars().take(4).collect();
    format!("{head}...")
}
