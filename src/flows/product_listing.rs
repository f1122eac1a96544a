//! Listing drafts: from a photo and description, or from an artisan's
//! own profile.

use super::media::DataUri;
use super::model::GenerativeModel;
use super::prompt::Prompt;
use crate::error::{Result, ValidationError};
use crate::profile::UserProfile;
use crate::storage::BlobStore;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const LISTING_PROMPT: Prompt = Prompt::new(
    "product_listing",
    r#"You are an e-commerce marketer who specialises in handmade Indian crafts.

Using the seller's description and the product image, write a compelling product listing.
Prices are in Indian Rupees (₹).

Product description: {{ product_description }}
Image: {{ media(product_image) }}

Give a catchy title, a detailed story-led description, a fair price in INR and 3 to 5 relevant hashtags."#,
);

const ARTISAN_LISTING_PROMPT: Prompt = Prompt::new(
    "artisan_listing",
    r#"You are an e-commerce marketer who specialises in handmade Indian crafts.

An artisan practising {{ craft_name }} describes their work like this:
{{ artisan_story }}

Here is a photo of a piece they made: {{ media(craft_image) }}

Write a catchy product title, a warm product description grounded in the artisan's story and a fair price in Indian Rupees (₹)."#,
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductListingInput {
    pub product_description: String,
    /// Data URI of the product image.
    pub product_image: String,
}

impl ProductListingInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.product_description.trim().is_empty() {
            return Err(ValidationError::new(
                "product_description",
                "Please describe the product.",
            ));
        }
        DataUri::parse("product_image", &self.product_image)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProductListingOutput {
    /// A catchy and descriptive title for the product.
    pub product_title: String,
    /// A detailed and appealing story-based product description.
    pub product_story: String,
    /// A suggested price for the product in INR.
    pub suggested_price: f64,
    /// Three to five relevant hashtags for social media.
    pub hashtags: Vec<String>,
}

pub async fn generate_product_listing(
    model: &dyn GenerativeModel,
    input: &ProductListingInput,
) -> Result<ProductListingOutput> {
    input.validate()?;
    LISTING_PROMPT.generate(model, input).await
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtisanListingInput {
    pub craft_name: String,
    pub artisan_story: String,
    /// Data URI of a sample of the artisan's work.
    pub craft_image: String,
}

impl ArtisanListingInput {
    /// Assemble the input from the artisan's profile, loading their first
    /// sample image from blob storage.
    pub async fn from_profile(profile: &UserProfile, blobs: &dyn BlobStore) -> Result<Self> {
        let incomplete = || {
            ValidationError::new(
                "profile",
                "Please ensure your craft name, about section, and sample photo are set in your artisan profile.",
            )
        };

        let craft_name = profile
            .craft
            .as_deref()
            .map(str::trim)
            .filter(|craft| !craft.is_empty())
            .ok_or_else(incomplete)?;
        let artisan_story = profile
            .bio
            .as_deref()
            .map(str::trim)
            .filter(|bio| !bio.is_empty())
            .ok_or_else(incomplete)?;
        let image_url = profile.sample_images.first().ok_or_else(incomplete)?;
        let blob_path = blobs.path_for_url(image_url).ok_or_else(incomplete)?;

        let bytes = blobs.get(&blob_path).await?;
        let mime_type = mime_guess::from_path(&blob_path).first_or(mime_guess::mime::IMAGE_JPEG);

        Ok(Self {
            craft_name: craft_name.to_string(),
            artisan_story: artisan_story.to_string(),
            craft_image: DataUri::from_bytes(mime_type.essence_str(), &bytes).to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ArtisanListingOutput {
    /// A catchy and descriptive title for the product.
    pub product_title: String,
    /// A warm product description drawn from the artisan's story.
    pub product_description: String,
    /// A suggested price for the product in INR.
    pub suggested_price: f64,
}

pub async fn generate_artisan_listing(
    model: &dyn GenerativeModel,
    input: &ArtisanListingInput,
) -> Result<ArtisanListingOutput> {
    DataUri::parse("craft_image", &input.craft_image)?;
    ARTISAN_LISTING_PROMPT.generate(model, input).await
}
