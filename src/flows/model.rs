//! The generative model seam.

use super::media::DataUri;
use crate::error::ModelError;

use async_trait::async_trait;

/// One piece of a multimodal prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Media(DataUri),
}

#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub parts: Vec<Part>,
    /// JSON Schema the output must satisfy. `None` asks for plain text.
    pub response_schema: Option<serde_json::Value>,
}

/// A hosted model that turns a multimodal prompt into text.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Returns the concatenated text of the first candidate.
    async fn generate(&self, request: GenerateRequest) -> Result<String, ModelError>;
}
