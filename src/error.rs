//! Error types shared across the crate.

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("malformed document: {0}")]
    Document(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("environment variable {0} referenced by config is not set")]
    MissingEnv(String),

    #[error("no data directory configured and none could be determined")]
    NoDataDir,
}

/// Failures talking to the hosted generative model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model returned no output")]
    EmptyResponse,

    #[error("{flow} produced output that does not match its schema: {reason}")]
    InvalidOutput { flow: &'static str, reason: String },

    #[error("failed to render prompt {prompt}: {reason}")]
    Prompt { prompt: &'static str, reason: String },

    #[error("no API key configured for the generative model")]
    MissingApiKey,
}

/// A user input that failed validation. `message` is user-facing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Blob and session storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid blob path: {0}")]
    InvalidPath(String),

    #[error("blob not found: {0}")]
    Missing(String),
}
