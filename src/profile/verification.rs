//! Artisan identity verification against the declared city.

use super::models::VerificationStatus;
use super::store::ProfileStore;
use crate::error::{Error, Result, ValidationError};
use crate::flows::{GenerativeModel, VerifyIdentityInput, VerifyIdentityOutput, verify_artisan_location};

use serde::{Deserialize, Serialize};

/// A device GPS fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsLocation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError::new("latitude", "Latitude must be between -90 and 90."));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError::new(
                "longitude",
                "Longitude must be between -180 and 180.",
            ));
        }
        Ok(())
    }
}

impl std::fmt::Display for GpsLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// Check a pending artisan's location against their declared city. A
/// positive result marks them verified; a negative one leaves the status
/// as it was so they can try again.
pub async fn verify_artisan_identity(
    profiles: &ProfileStore,
    model: &dyn GenerativeModel,
    uid: &str,
    photo_data_uri: String,
    location: GpsLocation,
) -> Result<VerifyIdentityOutput> {
    let profile = profiles.require(uid).await?;
    if !profile.is_artisan() || profile.verification_status != Some(VerificationStatus::Pending) {
        return Err(Error::Forbidden(
            "Only artisans with a pending application can verify their identity.".into(),
        ));
    }

    let declared_city = profile
        .city
        .as_deref()
        .map(str::trim)
        .filter(|city| !city.is_empty())
        .ok_or_else(|| {
            ValidationError::new(
                "city",
                "Your profile does not have a city set. Please complete your profile first.",
            )
        })?
        .to_string();
    location.validate()?;

    let input = VerifyIdentityInput {
        photo_data_uri,
        gps_location: location.to_string(),
        declared_city,
    };
    let outcome = verify_artisan_location(model, &input).await?;

    if outcome.is_verified {
        profiles
            .set_verification_status(uid, VerificationStatus::Verified)
            .await?;
    } else {
        tracing::info!(uid, result = %outcome.verification_result, "identity verification did not pass");
    }

    Ok(outcome)
}
