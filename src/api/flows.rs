use super::error::ApiError;
use super::extract::SignedIn;
use super::state::ApiState;
use crate::error::Error;
use crate::flows::{
    ArtisanListingInput, ArtisanListingOutput, ArtisanStoryOutput, CraftInsightsInput,
    CraftInsightsOutput, ProductDetailsInput, ProductDetailsOutput, ProductListingInput,
    ProductListingOutput, TranscribeAudioInput, TranscribeAudioOutput, explore_craft_insights,
    generate_artisan_listing, generate_product_details, generate_product_listing,
    transcribe_and_polish_story, transcribe_audio,
};

use axum::Json;
use axum::extract::State;
use std::sync::Arc;

const GENERATION_FAILED: &str = "Generation Failed";
const TRANSCRIPTION_FAILED: &str = "Transcription Failed";

/// Open to everyone, signed in or not.
pub(super) async fn craft_insights(
    State(state): State<Arc<ApiState>>,
    Json(input): Json<CraftInsightsInput>,
) -> Result<Json<CraftInsightsOutput>, ApiError> {
    let output = explore_craft_insights(state.model.as_ref(), &input)
        .await
        .map_err(|error| ApiError::from_error("Error", error))?;
    Ok(Json(output))
}

pub(super) async fn product_details(
    State(state): State<Arc<ApiState>>,
    signed_in: SignedIn,
    Json(input): Json<ProductDetailsInput>,
) -> Result<Json<ProductDetailsOutput>, ApiError> {
    signed_in.require_artisan()?;
    let output = generate_product_details(state.model.as_ref(), &input)
        .await
        .map_err(|error| ApiError::from_error(GENERATION_FAILED, error))?;
    Ok(Json(output))
}

pub(super) async fn product_listing(
    State(state): State<Arc<ApiState>>,
    signed_in: SignedIn,
    Json(input): Json<ProductListingInput>,
) -> Result<Json<ProductListingOutput>, ApiError> {
    signed_in.require_artisan()?;
    let output = generate_product_listing(state.model.as_ref(), &input)
        .await
        .map_err(|error| ApiError::from_error(GENERATION_FAILED, error))?;
    Ok(Json(output))
}

/// Draft a listing from the artisan's own profile.
pub(super) async fn artisan_listing(
    State(state): State<Arc<ApiState>>,
    signed_in: SignedIn,
) -> Result<Json<ArtisanListingOutput>, ApiError> {
    let profile = signed_in.require_artisan()?;
    let input = ArtisanListingInput::from_profile(profile, state.blobs.as_ref())
        .await
        .map_err(|error| match error {
            Error::Validation(_) => ApiError::from_error("Profile Incomplete", error),
            error => ApiError::from_error(GENERATION_FAILED, error),
        })?;

    let output = generate_artisan_listing(state.model.as_ref(), &input)
        .await
        .map_err(|error| ApiError::from_error(GENERATION_FAILED, error))?;
    Ok(Json(output))
}

pub(super) async fn transcribe(
    State(state): State<Arc<ApiState>>,
    _signed_in: SignedIn,
    Json(input): Json<TranscribeAudioInput>,
) -> Result<Json<TranscribeAudioOutput>, ApiError> {
    let output = transcribe_audio(state.model.as_ref(), &input)
        .await
        .map_err(|error| ApiError::from_error(TRANSCRIPTION_FAILED, error))?;
    Ok(Json(output))
}

pub(super) async fn artisan_story(
    State(state): State<Arc<ApiState>>,
    _signed_in: SignedIn,
    Json(input): Json<TranscribeAudioInput>,
) -> Result<Json<ArtisanStoryOutput>, ApiError> {
    let output = transcribe_and_polish_story(state.model.as_ref(), &input)
        .await
        .map_err(|error| ApiError::from_error(TRANSCRIPTION_FAILED, error))?;
    Ok(Json(output))
}
