//! Base64 data URIs carrying images and audio into model prompts.

use crate::error::ValidationError;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// A parsed `data:<mime>;base64,<payload>` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    mime_type: String,
    data: String,
}

impl DataUri {
    /// Parse and validate a data URI. `field` names the input in errors.
    pub fn parse(field: &'static str, value: &str) -> Result<Self, ValidationError> {
        let invalid = || {
            ValidationError::new(
                field,
                "Expected a data URI of the form 'data:<mimetype>;base64,<encoded_data>'.",
            )
        };

        let rest = value.trim().strip_prefix("data:").ok_or_else(invalid)?;
        let (meta, payload) = rest.split_once(',').ok_or_else(invalid)?;
        let meta = meta.strip_suffix(";base64").ok_or_else(invalid)?;

        // Drop parameters such as `;codecs=opus`.
        let mime_type = meta.split(';').next().unwrap_or_default().trim();
        if !mime_type.contains('/') || payload.is_empty() {
            return Err(invalid());
        }
        if STANDARD.decode(payload).is_err() {
            return Err(ValidationError::new(field, "The data URI payload is not valid base64."));
        }

        Ok(Self {
            mime_type: mime_type.to_ascii_lowercase(),
            data: payload.to_string(),
        })
    }

    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The base64 payload.
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn is_audio(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }
}

impl std::fmt::Display for DataUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.data)
    }
}
