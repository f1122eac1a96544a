//! Request extractors for the session header and the signed-in user.

use super::error::ApiError;
use super::state::ApiState;
use crate::profile::UserProfile;
use crate::session::{AuthUser, Session};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::sync::Arc;

/// Header carrying the session id issued by `POST /api/session`.
pub const SESSION_HEADER: &str = "x-session-id";

/// The session named by the request's session header.
pub struct CurrentSession(pub Arc<Session>);

impl FromRequestParts<Arc<ApiState>> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<ApiState>) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::unauthorized("No session. Create one first."))?;

        let session = state
            .sessions
            .get(id)
            .await
            .ok_or_else(|| ApiError::unauthorized("Your session has expired. Please start a new one."))?;

        Ok(Self(session))
    }
}

/// A session with a signed-in user. The profile is read fresh from the
/// store so authorization never trails the session mirror.
pub struct SignedIn {
    pub user: AuthUser,
    pub profile: Option<UserProfile>,
}

impl SignedIn {
    pub fn require_profile(&self) -> Result<&UserProfile, ApiError> {
        self.profile
            .as_ref()
            .ok_or_else(|| ApiError::not_found("Your profile could not be found."))
    }

    pub fn require_artisan(&self) -> Result<&UserProfile, ApiError> {
        let profile = self.require_profile()?;
        if !profile.is_artisan() {
            return Err(ApiError::forbidden("You must be an artisan to view this page."));
        }
        Ok(profile)
    }
}

impl FromRequestParts<Arc<ApiState>> for SignedIn {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<ApiState>) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = CurrentSession::from_request_parts(parts, state).await?;
        let user = session
            .state()
            .user
            .ok_or_else(|| ApiError::unauthorized("Please sign in to continue."))?;
        let profile = state.profiles.get(&user.uid).await?;

        Ok(Self { user, profile })
    }
}
