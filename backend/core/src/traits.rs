use anyhow::Result;
use async_trait::async_trait;

/// One piece of a multimodal prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    /// Raw bytes plus their MIME type, e.g. a menu screenshot.
    InlineData { mime_type: String, data: Vec<u8> },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn image(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self::InlineData {
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// Request to a generative model.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub parts: Vec<Part>,
    /// When set, the model must answer with JSON matching this schema.
    pub response_schema: Option<serde_json::Value>,
    pub temperature: f32,
}

impl GenerateRequest {
    pub fn new(parts: Vec<Part>) -> Self {
        Self {
            parts,
            response_schema: None,
            temperature: 0.0,
        }
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Concatenated text parts, mostly useful for logging and tests.
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Response from a generative model.
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}

/// A hosted multimodal model used for both OCR and summarization.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Provider name (e.g., "gemini").
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse>;
}
