//! HTTP API for the marketplace.
//!
//! Exposes sessions, the cart, the product catalog, profiles and the
//! generative flows as JSON, with server-sent events for live views.
//! Uploaded blobs are served back under `/blobs`.

mod cart;
mod error;
mod extract;
mod flows;
mod products;
mod profile;
mod server;
mod session;
mod state;

pub use error::ApiError;
pub use extract::SESSION_HEADER;
pub use server::{build_router, start_http_server};
pub use state::ApiState;

#[cfg(test)]
mod tests;
