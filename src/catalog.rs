//! Product listings: storage, live snapshots and client-side filtering.

pub mod filter;
pub mod models;
pub mod store;

pub use filter::{PriceRange, ProductFilters, SortOption, all_tags, filter_products};
pub use models::{NewListing, Product, SellerDetails};
pub use store::{CatalogFeed, ProductCatalog};
