//! Shared state for the HTTP API.

use crate::catalog::{CatalogFeed, ProductCatalog};
use crate::config::Config;
use crate::documents::DocumentStore;
use crate::flows::{GeminiClient, GenerativeModel};
use crate::profile::ProfileStore;
use crate::session::SessionRegistry;
use crate::storage::{BlobStore, LocalBlobStore};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sweeps run this many times per idle TTL, but never more than once a second.
const SWEEPS_PER_TTL: u32 = 4;

/// State shared across all API handlers.
pub struct ApiState {
    pub started_at: Instant,
    pub profiles: ProfileStore,
    pub catalog: ProductCatalog,
    /// Live catalog snapshot the product routes filter.
    pub feed: CatalogFeed,
    pub sessions: Arc<SessionRegistry>,
    pub blobs: Arc<dyn BlobStore>,
    /// Directory served under `/blobs`.
    pub blob_dir: PathBuf,
    pub model: Arc<dyn GenerativeModel>,
}

impl ApiState {
    pub async fn new(
        documents: DocumentStore,
        blobs: LocalBlobStore,
        model: Arc<dyn GenerativeModel>,
        session_idle_ttl: Duration,
    ) -> crate::Result<Self> {
        let profiles = ProfileStore::new(documents.clone());
        let catalog = ProductCatalog::new(documents);
        let feed = catalog.start_feed().await?;

        let sessions = Arc::new(SessionRegistry::new(profiles.clone(), session_idle_ttl));
        let sweep_interval = (session_idle_ttl / SWEEPS_PER_TTL).max(Duration::from_secs(1));
        sessions.spawn_sweeper(sweep_interval);

        Ok(Self {
            started_at: Instant::now(),
            sessions,
            profiles,
            catalog,
            feed,
            blob_dir: blobs.root().to_path_buf(),
            blobs: Arc::new(blobs),
            model,
        })
    }

    /// Open the database, blob directory and model client named by `config`.
    pub async fn from_config(config: &Config) -> crate::Result<Self> {
        let pool = crate::db::connect(&config.database_path()?).await?;
        let blobs = LocalBlobStore::new(config.blob_dir()?, config.public_url());
        let model = GeminiClient::from_config(&config.model)?;
        tracing::info!(model = model.model(), has_api_key = model.has_api_key(), "model client ready");

        Self::new(DocumentStore::new(pool), blobs, Arc::new(model), config.session_idle_ttl()).await
    }
}
