//! Profile document types and form validation.

use crate::error::ValidationError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marketplace role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Buyer,
    Artisan,
}

/// Where an artisan stands in identity verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(VerificationStatus::Pending),
            "verified" => Ok(VerificationStatus::Verified),
            "rejected" => Ok(VerificationStatus::Rejected),
            other => Err(format!(
                "unknown verification status {other:?} (expected pending, verified or rejected)"
            )),
        }
    }
}

/// The `users/{uid}` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Role,
    /// Only artisans carry a status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_status: Option<VerificationStatus>,
    #[serde(default)]
    pub profile_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub craft: Option<String>,
    /// Years of experience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn is_artisan(&self) -> bool {
        self.role == Role::Artisan
    }

    pub fn is_verified_artisan(&self) -> bool {
        self.is_artisan() && self.verification_status == Some(VerificationStatus::Verified)
    }
}

fn require_min_chars(
    field: &'static str,
    value: &str,
    min: usize,
    message: &str,
) -> Result<(), ValidationError> {
    if value.trim().chars().count() < min {
        return Err(ValidationError::new(field, message));
    }
    Ok(())
}

/// Details collected right after sign-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSetup {
    pub name: String,
    pub city: String,
    pub phone: String,
}

impl ProfileSetup {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_min_chars("name", &self.name, 2, "Please enter your full name.")?;
        require_min_chars("city", &self.city, 2, "Please enter your city.")?;
        require_min_chars("phone", &self.phone, 10, "Please enter a valid phone number.")?;
        Ok(())
    }
}

/// An uploaded sample photo.
#[derive(Debug, Clone)]
pub struct SampleImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A buyer's request to become an artisan.
#[derive(Debug, Clone)]
pub struct ArtisanApplication {
    pub craft_name: String,
    pub experience: i64,
    pub bio: String,
    pub sample_image: Option<SampleImage>,
}

impl ArtisanApplication {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_min_chars("craft_name", &self.craft_name, 2, "Craft name is required")?;
        if self.experience < 0 || u32::try_from(self.experience).is_err() {
            return Err(ValidationError::new(
                "experience",
                "Experience must be a positive number",
            ));
        }
        require_min_chars(
            "bio",
            &self.bio,
            20,
            "Please tell us a bit more about your craft.",
        )?;

        match &self.sample_image {
            Some(image) if !image.bytes.is_empty() => {
                if !image.content_type.starts_with("image/") {
                    return Err(ValidationError::new(
                        "sample_image",
                        "The sample must be an image file.",
                    ));
                }
                Ok(())
            }
            _ => Err(ValidationError::new(
                "sample_image",
                "A sample photo is required.",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application() -> ArtisanApplication {
        ArtisanApplication {
            craft_name: "Blue Pottery".to_string(),
            experience: 12,
            bio: "Third-generation potter from Jaipur working in quartz clay.".to_string(),
            sample_image: Some(SampleImage {
                file_name: "vase.jpg".to_string(),
                content_type: "image/jpeg".to_string(),
                bytes: vec![0xff, 0xd8, 0xff],
            }),
        }
    }

    #[test]
    fn setup_requires_plausible_values() {
        let valid = ProfileSetup {
            name: "Asha Devi".to_string(),
            city: "Jaipur".to_string(),
            phone: "9876543210".to_string(),
        };
        assert!(valid.validate().is_ok());

        let short_phone = ProfileSetup {
            phone: "98765".to_string(),
            ..valid.clone()
        };
        let error = short_phone.validate().expect_err("short phone");
        assert_eq!(error.field, "phone");
        assert_eq!(error.message, "Please enter a valid phone number.");

        let blank_name = ProfileSetup {
            name: "  a ".to_string(),
            ..valid
        };
        assert_eq!(blank_name.validate().expect_err("name").field, "name");
    }

    #[test]
    fn application_validation_covers_each_field() {
        assert!(application().validate().is_ok());

        let negative = ArtisanApplication {
            experience: -1,
            ..application()
        };
        assert_eq!(negative.validate().expect_err("experience").field, "experience");

        let short_bio = ArtisanApplication {
            bio: "I make pots.".to_string(),
            ..application()
        };
        assert_eq!(short_bio.validate().expect_err("bio").field, "bio");

        let no_image = ArtisanApplication {
            sample_image: None,
            ..application()
        };
        assert_eq!(
            no_image.validate().expect_err("image").message,
            "A sample photo is required."
        );

        let not_an_image = ArtisanApplication {
            sample_image: Some(SampleImage {
                file_name: "notes.txt".to_string(),
                content_type: "text/plain".to_string(),
                bytes: b"hello".to_vec(),
            }),
            ..application()
        };
        assert_eq!(not_an_image.validate().expect_err("type").field, "sample_image");
    }

    #[test]
    fn verification_status_parses_from_cli_strings() {
        assert_eq!("verified".parse(), Ok(VerificationStatus::Verified));
        assert!("approved".parse::<VerificationStatus>().is_err());
    }

    #[test]
    fn profile_documents_default_missing_fields() {
        let profile: UserProfile = serde_json::from_value(serde_json::json!({
            "uid": "u1",
            "email": "asha@example.com",
            "created_at": "2026-01-01T00:00:00Z"
        }))
        .expect("parse");
        assert_eq!(profile.role, Role::Buyer);
        assert!(!profile.profile_complete);
        assert!(!profile.is_artisan());
        assert_eq!(profile.verification_status, None);
    }
}
