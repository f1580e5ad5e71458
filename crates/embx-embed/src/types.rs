use embx_core::TruncationMode;

#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub inputs: Vec<String>,
    pub model: String,
    pub dimensions: Option<usize>,
    pub truncation: TruncationMode,
}

impl ProviderRequest {
    pub fn new(inputs: Vec<String>, model: impl Into<String>) -> Self {
        Self {
            inputs,
            model: model.into(),
            dimensions: None,
            truncation: TruncationMode::Auto,
        }
    }

    pub fn single(input: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(vec![input.into()], model)
    }
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub provider: String,
    pub model: String,
    pub vectors: Vec<Vec<f32>>,
    pub usage_tokens: Option<u64>,
    /// Total cost of the call, when the provider reports or implies one.
    pub cost_usd: Option<f64>,
}
