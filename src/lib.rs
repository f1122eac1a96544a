//! Craftopia: a marketplace service for handmade crafts.
//!
//! Buyers browse a live product catalog and keep a per-session cart.
//! Artisans apply with a sample of their work, verify their identity and
//! publish listings drafted by a generative model.

pub mod api;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod db;
pub mod documents;
pub mod error;
pub mod flows;
pub mod logging;
pub mod profile;
pub mod session;
pub mod storage;

pub use error::{Error, Result};
