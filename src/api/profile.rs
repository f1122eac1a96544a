use super::error::ApiError;
use super::extract::SignedIn;
use super::state::ApiState;
use crate::flows::VerifyIdentityOutput;
use crate::profile::{ArtisanApplication, GpsLocation, ProfileSetup, SampleImage, UserProfile, verify_artisan_identity};

use axum::Json;
use axum::extract::{Multipart, State};
use serde::Deserialize;
use std::sync::Arc;

const APPLICATION_FAILED: &str = "Application Failed";

#[derive(Deserialize)]
pub(super) struct VerifyIdentityRequest {
    photo_data_uri: String,
    latitude: f64,
    longitude: f64,
}

pub(super) async fn setup_profile(
    State(state): State<Arc<ApiState>>,
    signed_in: SignedIn,
    Json(setup): Json<ProfileSetup>,
) -> Result<Json<UserProfile>, ApiError> {
    let uid = &signed_in.user.uid;
    state
        .profiles
        .complete_setup(uid, &setup)
        .await
        .map_err(|error| ApiError::from_error("Update Failed", error))?;
    let profile = state
        .profiles
        .require(uid)
        .await
        .map_err(|error| ApiError::from_error("Update Failed", error))?;
    Ok(Json(profile))
}

/// Multipart fields: `craft_name`, `experience`, `bio` and the
/// `sample_image` file.
pub(super) async fn apply_as_artisan(
    State(state): State<Arc<ApiState>>,
    signed_in: SignedIn,
    mut multipart: Multipart,
) -> Result<Json<UserProfile>, ApiError> {
    let mut craft_name = String::new();
    let mut experience = String::new();
    let mut bio = String::new();
    let mut sample_image = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(error) => {
                tracing::warn!(%error, "malformed artisan application upload");
                return Err(ApiError::bad_request(APPLICATION_FAILED, "The upload could not be read."));
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        let read_failed = |error: axum::extract::multipart::MultipartError| {
            tracing::warn!(%error, field = %name, "failed to read application field");
            ApiError::bad_request(APPLICATION_FAILED, "The upload could not be read.")
        };

        match name.as_str() {
            "sample_image" => {
                let file_name = field.file_name().unwrap_or("sample").to_string();
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| mime_guess::from_path(&file_name).first_or_octet_stream().to_string());
                let bytes = field.bytes().await.map_err(read_failed)?;
                sample_image = Some(SampleImage {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "craft_name" => craft_name = field.text().await.map_err(read_failed)?,
            "experience" => experience = field.text().await.map_err(read_failed)?,
            "bio" => bio = field.text().await.map_err(read_failed)?,
            other => tracing::debug!(field = %other, "ignoring unknown application field"),
        }
    }

    let experience = experience.trim().parse::<i64>().map_err(|_| {
        ApiError::bad_request(APPLICATION_FAILED, "Experience must be a positive number")
    })?;
    let application = ArtisanApplication {
        craft_name,
        experience,
        bio,
        sample_image,
    };

    let profile = state
        .profiles
        .apply_as_artisan(&signed_in.user.uid, &application, state.blobs.as_ref())
        .await
        .map_err(|error| ApiError::from_error(APPLICATION_FAILED, error))?;
    Ok(Json(profile))
}

pub(super) async fn verify_identity(
    State(state): State<Arc<ApiState>>,
    signed_in: SignedIn,
    Json(request): Json<VerifyIdentityRequest>,
) -> Result<Json<VerifyIdentityOutput>, ApiError> {
    let location = GpsLocation {
        latitude: request.latitude,
        longitude: request.longitude,
    };
    let outcome = verify_artisan_identity(
        &state.profiles,
        state.model.as_ref(),
        &signed_in.user.uid,
        request.photo_data_uri,
        location,
    )
    .await
    .map_err(|error| ApiError::from_error("Verification Error", error))?;
    Ok(Json(outcome))
}
