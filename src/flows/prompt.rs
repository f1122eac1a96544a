//! Prompt templates rendered into multimodal parts.
//!
//! Templates are minijinja. `{{ media(field) }}` splices the data URI held
//! in `field` into the prompt as an inline media part; everything around
//! it becomes text parts.

use super::media::DataUri;
use super::model::{GenerateRequest, GenerativeModel, Part};
use crate::error::{Error, ModelError, Result};

use minijinja::{Environment, UndefinedBehavior};
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Delimits media placeholders in rendered text. Never valid inside a data URI.
const MEDIA_MARKER: char = '\u{1}';

/// A named prompt template.
#[derive(Debug, Clone, Copy)]
pub struct Prompt {
    pub name: &'static str,
    pub template: &'static str,
}

impl Prompt {
    pub const fn new(name: &'static str, template: &'static str) -> Self {
        Self { name, template }
    }

    /// Render the template against `input`. Media markers are removed from
    /// the input first, so only `media()` can open a media part.
    pub fn render<I: Serialize>(&self, input: &I) -> Result<Vec<Part>> {
        let mut context = serde_json::to_value(input)?;
        scrub_markers(&mut context);

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_function("media", |value: String| {
            format!("{MEDIA_MARKER}{value}{MEDIA_MARKER}")
        });

        let rendered = env
            .render_str(self.template, &context)
            .map_err(|error| ModelError::Prompt {
                prompt: self.name,
                reason: error.to_string(),
            })?;

        let mut parts = Vec::new();
        for (index, segment) in rendered.split(MEDIA_MARKER).enumerate() {
            if index % 2 == 1 {
                parts.push(Part::Media(DataUri::parse("media", segment)?));
            } else if !segment.trim().is_empty() {
                parts.push(Part::Text(segment.trim().to_string()));
            }
        }
        Ok(parts)
    }

    /// Run the prompt and parse the model's JSON output as `O`.
    pub async fn generate<I, O>(&self, model: &dyn GenerativeModel, input: &I) -> Result<O>
    where
        I: Serialize,
        O: DeserializeOwned + JsonSchema,
    {
        let request = GenerateRequest {
            parts: self.render(input)?,
            response_schema: Some(response_schema::<O>(self.name)?),
        };

        let started = std::time::Instant::now();
        let text = model.generate(request).await?;
        tracing::debug!(
            prompt = self.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "model call finished"
        );

        parse_output(self.name, &text)
    }

    /// Run the prompt for free-form text.
    pub async fn generate_text<I: Serialize>(&self, model: &dyn GenerativeModel, input: &I) -> Result<String> {
        let request = GenerateRequest {
            parts: self.render(input)?,
            response_schema: None,
        };
        let text = model.generate(request).await?;
        Ok(text.trim().to_string())
    }
}

fn scrub_markers(value: &mut Value) {
    match value {
        Value::String(text) => text.retain(|c| c != MEDIA_MARKER),
        Value::Array(items) => items.iter_mut().for_each(scrub_markers),
        Value::Object(fields) => fields.values_mut().for_each(scrub_markers),
        _ => {}
    }
}

/// JSON Schema for `O`, without the meta keys hosted models reject.
pub fn response_schema<O: JsonSchema>(prompt: &'static str) -> Result<serde_json::Value> {
    let schema = schemars::schema_for!(O);
    let mut value = serde_json::to_value(&schema).map_err(|error| ModelError::Prompt {
        prompt,
        reason: error.to_string(),
    })?;
    if let Some(object) = value.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
    }
    Ok(value)
}

/// Parse model output, tolerating a surrounding markdown code fence.
pub fn parse_output<O: DeserializeOwned>(flow: &'static str, text: &str) -> Result<O> {
    serde_json::from_str(strip_code_fence(text)).map_err(|error| {
        Error::Model(ModelError::InvalidOutput {
            flow,
            reason: error.to_string(),
        })
    })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the language tag line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
