//! Blob storage: put bytes at a path, get back a retrievable URL.

use crate::error::StorageError;

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// URL prefix under which the HTTP server exposes stored blobs.
pub const BLOB_ROUTE: &str = "/blobs";

/// Object storage seam.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` at `path`, replacing anything already there. Returns
    /// the URL the blob can be fetched from.
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String, StorageError>;

    /// Read a blob back by path.
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Map a URL handed out by [`BlobStore::put`] back to its path.
    fn path_for_url(&self, url: &str) -> Option<String>;
}

/// Blobs stored as files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = sanitize_path(path)?;
        Ok(self.root.join(relative))
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}/{}", self.public_url, BLOB_ROUTE, path.trim_start_matches('/'))
    }
}

/// Reject anything that could escape the storage root.
fn sanitize_path(path: &str) -> Result<PathBuf, StorageError> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(StorageError::InvalidPath(path.to_string()));
    }

    let mut clean = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::InvalidPath(path.to_string()));
            }
        }
    }

    if clean.as_os_str().is_empty() {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(clean)
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String, StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        tracing::debug!(
            path,
            content_type,
            size_bytes = bytes.len(),
            "stored blob"
        );
        Ok(self.url_for(path))
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::Missing(path.to_string()))
            }
            Err(error) => Err(error.into()),
        }
    }

    fn path_for_url(&self, url: &str) -> Option<String> {
        let prefix = format!("{}{}/", self.public_url, BLOB_ROUTE);
        url.strip_prefix(&prefix).map(str::to_string)
    }
}
