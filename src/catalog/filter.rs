//! Search, price, tag and sort filters over a catalog snapshot.

use super::models::Product;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Upper end of the default price range, in rupees.
pub const MAX_PRICE: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOption {
    #[default]
    Newest,
    Oldest,
    PriceAsc,
    PriceDesc,
}

impl SortOption {
    pub fn label(&self) -> &'static str {
        match self {
            SortOption::Newest => "Newest",
            SortOption::Oldest => "Oldest",
            SortOption::PriceAsc => "Price: Low to High",
            SortOption::PriceDesc => "Price: High to Low",
        }
    }

    fn compare(&self, a: &Product, b: &Product) -> Ordering {
        match self {
            SortOption::Newest => b.created_at.cmp(&a.created_at),
            SortOption::Oldest => a.created_at.cmp(&b.created_at),
            SortOption::PriceAsc => a.ai_price.partial_cmp(&b.ai_price).unwrap_or(Ordering::Equal),
            SortOption::PriceDesc => b.ai_price.partial_cmp(&a.ai_price).unwrap_or(Ordering::Equal),
        }
    }
}

/// Inclusive price bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: MAX_PRICE,
        }
    }
}

impl PriceRange {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilters {
    /// Case-insensitive title substring.
    pub search: String,
    pub sort: SortOption,
    pub price_range: PriceRange,
    /// Products must carry every selected tag.
    pub tags: Vec<String>,
}

impl ProductFilters {
    /// Number of filters differing from the defaults, counting each
    /// selected tag.
    pub fn active_count(&self) -> usize {
        let mut count = 0;
        if !self.search.is_empty() {
            count += 1;
        }
        if self.sort != SortOption::default() {
            count += 1;
        }
        if self.price_range != PriceRange::default() {
            count += 1;
        }
        count + self.tags.len()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Select the tag, or deselect it when already selected.
    pub fn toggle_tag(&mut self, tag: &str) {
        if let Some(position) = self.tags.iter().position(|selected| selected == tag) {
            self.tags.remove(position);
        } else {
            self.tags.push(tag.to_string());
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        let matches_search = product
            .title
            .to_lowercase()
            .contains(&self.search.to_lowercase());
        let matches_tags = self
            .tags
            .iter()
            .all(|tag| product.ai_tags.iter().any(|own| own == tag));

        matches_search && self.price_range.contains(product.ai_price) && matches_tags
    }
}

/// Products passing every filter, in the requested order.
pub fn filter_products(products: &[Product], filters: &ProductFilters) -> Vec<Product> {
    let mut matching: Vec<Product> = products
        .iter()
        .filter(|product| filters.matches(product))
        .cloned()
        .collect();
    // Stable, so ties keep snapshot order.
    matching.sort_by(|a, b| filters.sort.compare(a, b));
    matching
}

/// Every tag in the snapshot, deduplicated in first-seen order.
pub fn all_tags(products: &[Product]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in products.iter().flat_map(|product| &product.ai_tags) {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    tags
}
