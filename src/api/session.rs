use super::error::ApiError;
use super::extract::CurrentSession;
use super::state::ApiState;
use crate::profile::UserProfile;
use crate::session::{AuthUser, SessionState};

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use futures::stream::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;

const PROFILE_SETUP_PATH: &str = "/profile-setup";
const HOME_PATH: &str = "/";

#[derive(Serialize)]
pub(super) struct SessionCreated {
    session_id: String,
}

#[derive(Serialize)]
pub(super) struct SessionView {
    user: Option<AuthUser>,
    profile: Option<UserProfile>,
    loading: bool,
    is_artisan: bool,
    /// Where a client should send the user next, if anywhere.
    redirect: Option<&'static str>,
}

impl From<&SessionState> for SessionView {
    fn from(state: &SessionState) -> Self {
        Self {
            user: state.user.clone(),
            profile: state.profile.clone(),
            loading: state.loading,
            is_artisan: state.is_artisan(),
            redirect: state.needs_profile_setup().then_some(PROFILE_SETUP_PATH),
        }
    }
}

#[derive(Serialize)]
pub(super) struct SignInResponse {
    is_new_user: bool,
    redirect: &'static str,
    session: SessionView,
}

pub(super) async fn create_session(State(state): State<Arc<ApiState>>) -> (StatusCode, Json<SessionCreated>) {
    let session = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id: session.id().to_string(),
        }),
    )
}

pub(super) async fn get_session(CurrentSession(session): CurrentSession) -> Json<SessionView> {
    Json(SessionView::from(&session.state()))
}

pub(super) async fn delete_session(
    State(state): State<Arc<ApiState>>,
    CurrentSession(session): CurrentSession,
) -> StatusCode {
    state.sessions.remove(session.id()).await;
    StatusCode::NO_CONTENT
}

/// Accept an identity from the sign-in provider. First-time users get an
/// initial profile and are sent to profile setup.
pub(super) async fn sign_in(
    State(state): State<Arc<ApiState>>,
    CurrentSession(session): CurrentSession,
    Json(user): Json<AuthUser>,
) -> Result<Json<SignInResponse>, ApiError> {
    if user.uid.trim().is_empty() {
        return Err(ApiError::bad_request("Sign In Failed", "The identity is missing a user id."));
    }

    let is_new_user = state
        .profiles
        .create_initial(&user)
        .await
        .map_err(|error| ApiError::from_error("Sign In Failed", error))?;
    let settled = session
        .sign_in(user)
        .await
        .map_err(|error| ApiError::from_error("Sign In Failed", error))?;

    Ok(Json(SignInResponse {
        is_new_user,
        redirect: if is_new_user { PROFILE_SETUP_PATH } else { HOME_PATH },
        session: SessionView::from(&settled),
    }))
}

pub(super) async fn sign_out(CurrentSession(session): CurrentSession) -> Result<Json<SessionView>, ApiError> {
    let settled = session
        .sign_out()
        .await
        .map_err(|error| ApiError::from_error("Sign Out Failed", error))?;
    Ok(Json(SessionView::from(&settled)))
}

/// Server-sent session state: the current value, then every change.
pub(super) async fn session_events(
    CurrentSession(session): CurrentSession,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut updates = session.subscribe();

    let stream = async_stream::stream! {
        loop {
            let view = SessionView::from(&*updates.borrow_and_update());
            if let Ok(json) = serde_json::to_string(&view) {
                yield Ok(Event::default().event("session").data(json));
            }
            if updates.changed().await.is_err() {
                break;
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
