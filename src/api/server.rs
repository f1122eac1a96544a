//! HTTP server setup: router, blob serving, and API routes.

use super::state::ApiState;
use super::{cart, flows, products, profile, session};
use crate::storage::blob::BLOB_ROUTE;

use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::response::Json;
use axum::routing::{get, post, put};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

/// Request bodies carry base64 photos and audio.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Assemble the full application router.
pub fn build_router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route(
            "/session",
            post(session::create_session)
                .get(session::get_session)
                .delete(session::delete_session),
        )
        .route("/session/sign-in", post(session::sign_in))
        .route("/session/sign-out", post(session::sign_out))
        .route("/session/events", get(session::session_events))
        .route("/cart", get(cart::get_cart))
        .route("/cart/items", post(cart::add_item))
        .route(
            "/cart/items/{id}",
            put(cart::update_item).delete(cart::remove_item),
        )
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route("/products/stream", get(products::product_stream))
        .route("/products/{id}", get(products::get_product))
        .route("/products/{id}/cart", post(products::add_product_to_cart))
        .route("/profile/setup", put(profile::setup_profile))
        .route("/profile/artisan-application", post(profile::apply_as_artisan))
        .route("/profile/verify-identity", post(profile::verify_identity))
        .route("/flows/craft-insights", post(flows::craft_insights))
        .route("/flows/product-details", post(flows::product_details))
        .route("/flows/product-listing", post(flows::product_listing))
        .route("/flows/artisan-listing", post(flows::artisan_listing))
        .route("/flows/transcribe", post(flows::transcribe))
        .route("/flows/artisan-story", post(flows::artisan_story));

    Router::new()
        .nest("/api", api_routes)
        .nest_service(BLOB_ROUTE, ServeDir::new(&state.blob_dir))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the given address.
///
/// Returns a handle that resolves when the server shuts down. The caller
/// passes a `tokio::sync::watch::Receiver<bool>` for graceful shutdown.
pub async fn start_http_server(
    bind: SocketAddr,
    state: Arc<ApiState>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "HTTP server listening");

    let handle = tokio::spawn(async move {
        let mut shutdown = shutdown_rx;
        if let Err(error) = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|v| *v).await;
            })
            .await
        {
            tracing::error!(%error, "HTTP server exited with an error");
        }
    });

    Ok(handle)
}

// -- API handlers --

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn status(State(state): State<Arc<ApiState>>) -> Json<serde_json::Value> {
    let uptime = state.started_at.elapsed();
    Json(serde_json::json!({
        "status": "running",
        "pid": std::process::id(),
        "uptime_seconds": uptime.as_secs(),
        "sessions": state.sessions.len().await,
        "products": state.feed.snapshot().len(),
    }))
}
