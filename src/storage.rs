//! Blob and session storage.
//!
//! Blobs (artisan sample photos) live on local disk and are served back under
//! `/blobs/`. Session storage is a small per-session key/value store that the
//! cart mirrors itself into; it is created with the session and dropped with
//! it.

pub mod blob;
pub mod session;

pub use blob::{BlobStore, LocalBlobStore};
pub use session::{MemorySessionStorage, SessionStorage};
