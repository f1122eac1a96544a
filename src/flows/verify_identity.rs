//! Location check for artisan identity verification.

use super::media::DataUri;
use super::model::GenerativeModel;
use super::prompt::Prompt;
use crate::error::{Result, ValidationError};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const PROMPT: Prompt = Prompt::new(
    "verify_identity",
    r#"You are an identity verification assistant for an artisan marketplace.

You receive an artisan's current GPS coordinates and the city declared in their profile, along with the live photo they just took. Decide whether the GPS location is reasonably within the declared city.

- If the coordinates are consistent with the declared city, set is_verified to true and give a short confirmation in verification_result.
- Otherwise set is_verified to false and explain the mismatch in verification_result.

GPS location: {{ gps_location }}
Declared city: {{ declared_city }}
Live photo: {{ media(photo_data_uri) }}"#,
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyIdentityInput {
    /// Live camera photo as a data URI.
    pub photo_data_uri: String,
    /// `"<latitude>, <longitude>"`.
    pub gps_location: String,
    pub declared_city: String,
}

impl VerifyIdentityInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let photo = DataUri::parse("photo_data_uri", &self.photo_data_uri)?;
        if !photo.is_image() {
            return Err(ValidationError::new(
                "photo_data_uri",
                "The verification photo must be an image.",
            ));
        }
        if self.declared_city.trim().is_empty() {
            return Err(ValidationError::new(
                "declared_city",
                "Your profile does not have a city set.",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VerifyIdentityOutput {
    /// Whether the GPS location matches the declared city.
    pub is_verified: bool,
    /// Explanation of the decision.
    pub verification_result: String,
}

pub async fn verify_artisan_location(
    model: &dyn GenerativeModel,
    input: &VerifyIdentityInput,
) -> Result<VerifyIdentityOutput> {
    input.validate()?;
    PROMPT.generate(model, input).await
}
