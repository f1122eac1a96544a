//! Gemini `generateContent` client.

use super::model::{GenerateRequest, GenerativeModel, Part};
use crate::config::ModelConfig;
use crate::error::{ConfigError, ModelError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Talks to the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        })
    }

    /// Build from config. A missing key is not an error here; calls fail
    /// with [`ModelError::MissingApiKey`] instead.
    pub fn from_config(config: &ModelConfig) -> crate::Result<Self> {
        let api_key = match config.api_key() {
            Ok(key) => key,
            Err(ConfigError::MissingEnv(name)) => {
                tracing::warn!(variable = %name, "model API key is not set, flows will be unavailable");
                None
            }
            Err(error) => return Err(error.into()),
        };

        Ok(Self::new(
            config.base_url.clone(),
            config.model.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
        )?)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    InlineData {
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    response_json_schema: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<String, ModelError> {
        let api_key = self.api_key.as_deref().ok_or(ModelError::MissingApiKey)?;

        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => RequestPart::Text { text },
                Part::Media(uri) => RequestPart::InlineData {
                    inline_data: InlineData {
                        mime_type: uri.mime_type(),
                        data: uri.data(),
                    },
                },
            })
            .collect();

        let body = GenerateContentRequest {
            contents: [Content { role: "user", parts }],
            generation_config: request.response_schema.as_ref().map(|schema| GenerationConfig {
                response_mime_type: "application/json",
                response_json_schema: schema,
            }),
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), model = %self.model, "model request rejected");
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: GenerateContentResponse = response.json().await?;
        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(text)
    }
}
