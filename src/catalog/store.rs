//! Product persistence and the live catalog feed.

use super::models::{NewListing, Product, SellerDetails};
use crate::documents::{Document, DocumentStore, Order, PRODUCTS};
use crate::error::{Error, Result};
use crate::profile::UserProfile;

use chrono::Utc;
use futures::StreamExt as _;
use futures::stream::BoxStream;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Typed access to the `products` collection.
#[derive(Debug, Clone)]
pub struct ProductCatalog {
    documents: DocumentStore,
}

/// Parse a snapshot, skipping documents that are not valid products.
fn products_from(documents: Vec<Document>) -> Vec<Product> {
    documents
        .into_iter()
        .filter_map(|document| match product_from(&document) {
            Ok(product) => Some(product),
            Err(error) => {
                tracing::warn!(id = %document.id, %error, "skipping malformed product");
                None
            }
        })
        .collect()
}

fn product_from(document: &Document) -> Result<Product> {
    let mut product: Product = document.parse()?;
    product.id = document.id.clone();
    Ok(product)
}

impl ProductCatalog {
    pub fn new(documents: DocumentStore) -> Self {
        Self { documents }
    }

    /// Every product, newest first.
    pub async fn list(&self) -> Result<Vec<Product>> {
        let documents = self.documents.list(PRODUCTS, Order::NewestFirst).await?;
        Ok(products_from(documents))
    }

    pub async fn get(&self, id: &str) -> Result<Option<Product>> {
        match self.documents.get(PRODUCTS, id).await? {
            Some(document) => Ok(Some(product_from(&document)?)),
            None => Ok(None),
        }
    }

    /// Publish a listing for `seller`, who must be a verified artisan.
    pub async fn create(&self, listing: &NewListing, seller: &UserProfile) -> Result<Product> {
        if !seller.is_verified_artisan() {
            return Err(Error::Forbidden(
                "Only verified artisans can publish listings.".into(),
            ));
        }
        listing.validate()?;

        let mut product = Product {
            id: String::new(),
            title: listing.title.trim().to_string(),
            ai_story: listing.story.trim().to_string(),
            ai_price: listing.price,
            images: listing.images.clone(),
            ai_tags: listing.normalized_tags(),
            artisan_id: seller.uid.clone(),
            seller_details: SellerDetails {
                name: seller.name.clone().unwrap_or_default(),
                city: seller.city.clone().unwrap_or_default(),
            },
            created_at: Utc::now(),
        };

        let mut body = serde_json::to_value(&product)?;
        if let Value::Object(fields) = &mut body {
            fields.remove("id");
        }
        product.id = self.documents.add(PRODUCTS, &body).await?;

        tracing::info!(id = %product.id, artisan_id = %seller.uid, "product listed");
        Ok(product)
    }

    /// Live query: the newest-first snapshot, then a new one after every
    /// change to the collection.
    pub fn watch(&self) -> BoxStream<'static, Result<Vec<Product>>> {
        self.documents
            .watch_collection(PRODUCTS, Order::NewestFirst)
            .map(|snapshot| snapshot.map(products_from))
            .boxed()
    }

    /// Start a background task holding the latest snapshot. Waits for the
    /// first snapshot before returning.
    pub async fn start_feed(&self) -> Result<CatalogFeed> {
        let mut stream = self.watch();
        let initial = match stream.next().await {
            Some(snapshot) => snapshot?,
            None => Vec::new(),
        };
        tracing::info!(products = initial.len(), "catalog feed started");

        let (sender, receiver) = watch::channel(Arc::new(initial));
        let task = tokio::spawn(async move {
            while let Some(snapshot) = stream.next().await {
                match snapshot {
                    Ok(products) => {
                        sender.send_replace(Arc::new(products));
                    }
                    // Keep serving the last good snapshot.
                    Err(error) => tracing::warn!(%error, "could not refresh catalog snapshot"),
                }
            }
        });

        Ok(CatalogFeed { receiver, task })
    }
}

/// Latest catalog snapshot, kept current by a background task.
pub struct CatalogFeed {
    receiver: watch::Receiver<Arc<Vec<Product>>>,
    task: JoinHandle<()>,
}

impl CatalogFeed {
    pub fn snapshot(&self) -> Arc<Vec<Product>> {
        self.receiver.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Product>>> {
        self.receiver.clone()
    }
}

impl Drop for CatalogFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}
