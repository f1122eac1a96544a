//! Document collections on SQLite.
//!
//! Each collection (`users`, `products`) holds JSON documents keyed by id.
//! Writes follow document-database semantics: `merge` creates or deep-merges,
//! `update` only touches existing documents. Every successful write is
//! broadcast as a [`DocumentChange`] so readers can keep live views.

use crate::error::{Error, Result};

use chrono::{DateTime, SecondsFormat, Utc};
use futures::StreamExt as _;
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use tokio::sync::broadcast;

/// Collection holding user profiles.
pub const USERS: &str = "users";
/// Collection holding product listings.
pub const PRODUCTS: &str = "products";

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// A stored document.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Deserialize the document body.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

/// Notification that a document was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChange {
    pub collection: String,
    pub id: String,
}

/// Listing order by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    NewestFirst,
    OldestFirst,
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    data: String,
    created_at: String,
    updated_at: String,
}

impl DocumentRow {
    fn into_document(self) -> Result<Document> {
        Ok(Document {
            id: self.id,
            data: serde_json::from_str(&self.data)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| Error::Other(anyhow::anyhow!("bad stored timestamp {value:?}: {error}")))
}

/// Fixed-width RFC 3339 so lexical order matches time order.
fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// SQLite-backed document collections with change notifications.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
    changes: broadcast::Sender<DocumentChange>,
}

impl DocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { pool, changes }
    }

    /// Point read.
    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let row: Option<DocumentRow> = sqlx::query_as(
            "SELECT id, data, created_at, updated_at FROM documents \
             WHERE collection = ? AND id = ?",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DocumentRow::into_document).transpose()
    }

    /// Create the document only if no document with this id exists.
    /// Returns whether it was created.
    pub async fn create_if_absent(&self, collection: &str, id: &str, data: &Value) -> Result<bool> {
        let now = format_timestamp(Utc::now());
        let result = sqlx::query(
            "INSERT OR IGNORE INTO documents (collection, id, data, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(collection)
        .bind(id)
        .bind(data.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() > 0;
        if created {
            self.notify(collection, id);
        }
        Ok(created)
    }

    /// Add a document under a generated id. Returns the id.
    pub async fn add(&self, collection: &str, data: &Value) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = format_timestamp(Utc::now());
        sqlx::query(
            "INSERT INTO documents (collection, id, data, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(collection)
        .bind(&id)
        .bind(data.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.notify(collection, &id);
        Ok(id)
    }

    /// Merge `fields` into the document, creating it when absent. Nested
    /// objects merge recursively; arrays and scalars are replaced.
    pub async fn merge(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()> {
        let now = format_timestamp(Utc::now());
        sqlx::query(
            "INSERT INTO documents (collection, id, data, created_at, updated_at) \
             VALUES (?, ?, json(?), ?, ?) \
             ON CONFLICT (collection, id) DO UPDATE SET \
             data = json_patch(documents.data, excluded.data), updated_at = excluded.updated_at",
        )
        .bind(collection)
        .bind(id)
        .bind(Value::Object(fields).to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.notify(collection, id);
        Ok(())
    }

    /// Merge `fields` into an existing document. Fails with
    /// [`Error::NotFound`] when the document does not exist.
    pub async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()> {
        let result = sqlx::query(
            "UPDATE documents SET data = json_patch(data, ?), updated_at = ? \
             WHERE collection = ? AND id = ?",
        )
        .bind(Value::Object(fields).to_string())
        .bind(format_timestamp(Utc::now()))
        .bind(collection)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("{collection}/{id}")));
        }

        self.notify(collection, id);
        Ok(())
    }

    /// All documents of a collection ordered by creation time.
    pub async fn list(&self, collection: &str, order: Order) -> Result<Vec<Document>> {
        let sql = match order {
            Order::NewestFirst => {
                "SELECT id, data, created_at, updated_at FROM documents \
                 WHERE collection = ? ORDER BY created_at DESC, rowid DESC"
            }
            Order::OldestFirst => {
                "SELECT id, data, created_at, updated_at FROM documents \
                 WHERE collection = ? ORDER BY created_at ASC, rowid ASC"
            }
        };

        let rows: Vec<DocumentRow> = sqlx::query_as(sql)
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(DocumentRow::into_document).collect()
    }

    /// Receive a notification for every write from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentChange> {
        self.changes.subscribe()
    }

    /// Live view of one document: yields the current value, then the new
    /// value after every write to it. A failed read is yielded as an error
    /// and the watch carries on with the next change.
    pub fn watch_document(&self, collection: &str, id: &str) -> BoxStream<'static, Result<Option<Document>>> {
        let store = self.clone();
        let collection = collection.to_string();
        let id = id.to_string();

        async_stream::stream! {
            // Subscribe before the first read so no write slips between them.
            let mut changes = store.subscribe();
            yield store.get(&collection, &id).await;

            loop {
                let reload = match changes.recv().await {
                    Ok(change) => change.collection == collection && change.id == id,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, %collection, %id, "document watcher lagged, reloading");
                        true
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if reload {
                    yield store.get(&collection, &id).await;
                }
            }
        }
        .boxed()
    }

    /// Live query over a collection: yields the ordered snapshot, then a
    /// fresh snapshot after every write to the collection. A failed read is
    /// yielded as an error and the query keeps running.
    pub fn watch_collection(&self, collection: &str, order: Order) -> BoxStream<'static, Result<Vec<Document>>> {
        let store = self.clone();
        let collection = collection.to_string();

        async_stream::stream! {
            let mut changes = store.subscribe();
            yield store.list(&collection, order).await;

            loop {
                let reload = match changes.recv().await {
                    Ok(change) => change.collection == collection,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, %collection, "collection watcher lagged, reloading");
                        true
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if reload {
                    yield store.list(&collection, order).await;
                }
            }
        }
        .boxed()
    }

    fn notify(&self, collection: &str, id: &str) {
        // No receivers is fine.
        let _ = self.changes.send(DocumentChange {
            collection: collection.to_string(),
            id: id.to_string(),
        });
    }
}
