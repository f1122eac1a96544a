//! Generative flows: prompt templates, typed outputs and the model client.

pub mod craft_insights;
pub mod gemini;
pub mod media;
pub mod model;
pub mod product_details;
pub mod product_listing;
pub mod prompt;
pub mod transcription;
pub mod verify_identity;

pub use craft_insights::{CraftInsightsInput, CraftInsightsOutput, explore_craft_insights};
pub use gemini::GeminiClient;
pub use media::DataUri;
pub use model::{GenerateRequest, GenerativeModel, Part};
pub use product_details::{ProductDetailsInput, ProductDetailsOutput, generate_product_details};
pub use product_listing::{
    ArtisanListingInput, ArtisanListingOutput, ProductListingInput, ProductListingOutput,
    generate_artisan_listing, generate_product_listing,
};
pub use transcription::{
    ArtisanStoryOutput, TranscribeAudioInput, TranscribeAudioOutput, transcribe_and_polish_story,
    transcribe_audio,
};
pub use verify_identity::{VerifyIdentityInput, VerifyIdentityOutput, verify_artisan_location};
