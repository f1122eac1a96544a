//! JSON error responses.
//!
//! Every failure is rendered as `{title, description}`, the notice a client
//! shows the user.

use crate::error::{Error, ModelError, StorageError};

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

const GENERIC_DESCRIPTION: &str = "Something went wrong. Please try again.";

#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    title: String,
    description: String,
}

impl ApiError {
    pub fn new(status: StatusCode, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            status,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn bad_request(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, title, description)
    }

    pub fn unauthorized(description: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Not signed in", description)
    }

    pub fn forbidden(description: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "Access Denied", description)
    }

    pub fn not_found(description: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found", description)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Map a domain error, titled with the action that failed.
    pub fn from_error(title: &str, error: Error) -> Self {
        match error {
            Error::Validation(error) => Self::bad_request(title, error.message),
            Error::NotFound(what) => Self::new(StatusCode::NOT_FOUND, title, format!("{what} not found.")),
            Error::Storage(StorageError::Missing(path)) => {
                Self::new(StatusCode::NOT_FOUND, title, format!("{path} not found."))
            }
            Error::Forbidden(message) => Self::forbidden(message),
            Error::Conflict(message) => Self::new(StatusCode::CONFLICT, title, message),
            Error::Model(ModelError::MissingApiKey) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                title,
                "The AI service is not configured.",
            ),
            Error::Model(error) => {
                tracing::warn!(%error, "model call failed");
                Self::new(
                    StatusCode::BAD_GATEWAY,
                    title,
                    "The AI service could not complete the request. Please try again.",
                )
            }
            error => {
                tracing::error!(%error, "request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, title, GENERIC_DESCRIPTION)
            }
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self::from_error("Error", error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
