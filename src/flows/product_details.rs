//! Title, marketing copy, hashtags and price from a product photo.

use super::media::DataUri;
use super::model::GenerativeModel;
use super::prompt::Prompt;
use crate::error::{Result, ValidationError};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const PROMPT: Prompt = Prompt::new(
    "product_details",
    r#"You are an assistant helping artisans write compelling product listings.

From the product photo, description and target audience, produce:
- a catchy product title
- a detailed marketing description
- relevant hashtags
- a suggested price in Indian Rupees (₹)

Product description: {{ product_description }}
Target audience: {{ target_audience }}
Product photo: {{ media(product_photo_data_uri) }}

Answer in JSON."#,
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetailsInput {
    /// `data:<mime>;base64,<payload>` photo of the product.
    pub product_photo_data_uri: String,
    pub product_description: String,
    pub target_audience: String,
}

impl ProductDetailsInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let photo = DataUri::parse("product_photo_data_uri", &self.product_photo_data_uri)?;
        if !photo.is_image() {
            return Err(ValidationError::new(
                "product_photo_data_uri",
                "The product photo must be an image.",
            ));
        }
        if self.product_description.trim().is_empty() {
            return Err(ValidationError::new(
                "product_description",
                "Please describe the product.",
            ));
        }
        if self.target_audience.trim().is_empty() {
            return Err(ValidationError::new(
                "target_audience",
                "Please describe who the product is for.",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProductDetailsOutput {
    /// A catchy product title.
    pub product_title: String,
    /// A detailed marketing description.
    pub product_description: String,
    /// Relevant hashtags for the product.
    pub hashtags: String,
    /// A suggested price for the product in Indian Rupees (₹).
    pub suggested_price: String,
}

pub async fn generate_product_details(
    model: &dyn GenerativeModel,
    input: &ProductDetailsInput,
) -> Result<ProductDetailsOutput> {
    input.validate()?;
    PROMPT.generate(model, input).await
}
