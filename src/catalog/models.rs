//! Product documents.

use crate::cart::CartItem;
use crate::error::ValidationError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cart hint used when a product has no tags.
const DEFAULT_HINT: &str = "craft";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerDetails {
    pub name: String,
    pub city: String,
}

/// A listing in the `products` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Document id. Not stored in the document body.
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub ai_story: String,
    /// Price in rupees.
    pub ai_price: f64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub ai_tags: Vec<String>,
    pub artisan_id: String,
    pub seller_details: SellerDetails,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// The cart line for one unit of this product.
    pub fn to_cart_item(&self) -> CartItem {
        CartItem {
            id: self.id.clone(),
            name: self.title.clone(),
            price: format!("₹{:.2}", self.ai_price),
            image: self.images.first().cloned().unwrap_or_default(),
            quantity: 1,
            hint: Some(
                self.ai_tags
                    .first()
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_HINT.to_string()),
            ),
        }
    }
}

/// What an artisan submits to create a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewListing {
    pub title: String,
    #[serde(default)]
    pub story: String,
    pub price: f64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewListing {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::new("title", "Please give the product a title."));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ValidationError::new("price", "Price must be a positive amount."));
        }
        Ok(())
    }

    /// Trimmed tags without `#` prefixes or duplicates, in input order.
    pub fn normalized_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for tag in &self.tags {
            let tag = tag.trim().trim_start_matches('#').trim();
            if !tag.is_empty() && !tags.iter().any(|existing| existing == tag) {
                tags.push(tag.to_string());
            }
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price: f64, tags: &[&str]) -> Product {
        Product {
            id: id.into(),
            title: format!("Product {id}"),
            ai_story: String::new(),
            ai_price: price,
            images: vec![format!("https://img.example/{id}.jpg")],
            ai_tags: tags.iter().map(|tag| tag.to_string()).collect(),
            artisan_id: "a1".into(),
            seller_details: SellerDetails {
                name: "Asha".into(),
                city: "Jaipur".into(),
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn cart_item_uses_first_image_and_tag() {
        let item = product("p1", 1200.0, &["pottery", "blue"]).to_cart_item();
        assert_eq!(item.price, "₹1200.00");
        assert_eq!(item.image, "https://img.example/p1.jpg");
        assert_eq!(item.hint.as_deref(), Some("pottery"));
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn untagged_products_get_the_default_hint() {
        let item = product("p1", 10.5, &[]).to_cart_item();
        assert_eq!(item.hint.as_deref(), Some("craft"));
        assert_eq!(item.price, "₹10.50");
    }

    #[test]
    fn listing_tags_are_normalized() {
        let listing = NewListing {
            title: "Vase".into(),
            story: String::new(),
            price: 100.0,
            images: Vec::new(),
            tags: vec!["#pottery".into(), " pottery ".into(), "".into(), "#".into(), "blue".into()],
        };
        assert_eq!(listing.normalized_tags(), vec!["pottery", "blue"]);
    }

    #[test]
    fn listing_requires_title_and_sane_price() {
        let mut listing = NewListing {
            title: " ".into(),
            story: String::new(),
            price: 100.0,
            images: Vec::new(),
            tags: Vec::new(),
        };
        assert_eq!(listing.validate().unwrap_err().field, "title");

        listing.title = "Vase".into();
        listing.price = f64::NAN;
        assert_eq!(listing.validate().unwrap_err().field, "price");
        listing.price = -1.0;
        assert_eq!(listing.validate().unwrap_err().field, "price");
    }
}
