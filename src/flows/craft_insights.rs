//! Cultural background for a named craft.

use super::model::GenerativeModel;
use super::prompt::Prompt;
use crate::error::{Result, ValidationError};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const PROMPT: Prompt = Prompt::new(
    "craft_insights",
    "You are an expert in cultural crafts. Write a detailed piece on the history, origin, \
     techniques and cultural significance of this craft: {{ craft_name }}.",
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CraftInsightsInput {
    pub craft_name: String,
}

impl CraftInsightsInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.craft_name.trim().chars().count() < 3 {
            return Err(ValidationError::new(
                "craft_name",
                "Please enter at least 3 characters.",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CraftInsightsOutput {
    /// Detailed write-up about the craft.
    pub craft_details: String,
}

pub async fn explore_craft_insights(
    model: &dyn GenerativeModel,
    input: &CraftInsightsInput,
) -> Result<CraftInsightsOutput> {
    input.validate()?;
    let input = CraftInsightsInput {
        craft_name: input.craft_name.trim().to_string(),
    };
    PROMPT.generate(model, &input).await
}
