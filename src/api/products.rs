use super::cart::CartView;
use super::error::ApiError;
use super::extract::{CurrentSession, SignedIn};
use super::state::ApiState;
use crate::catalog::{NewListing, PriceRange, Product, ProductFilters, SortOption, all_tags, filter_products};

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

#[derive(Deserialize, Default)]
pub(super) struct ProductsQuery {
    #[serde(default)]
    q: String,
    sort: Option<String>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    /// Comma-separated tag list.
    tags: Option<String>,
}

impl ProductsQuery {
    fn into_filters(self) -> Result<ProductFilters, ApiError> {
        let defaults = PriceRange::default();
        let sort = match self.sort.as_deref().map(str::trim).filter(|sort| !sort.is_empty()) {
            Some(sort) => serde_json::from_value::<SortOption>(serde_json::Value::String(sort.to_string()))
                .map_err(|_| {
                    ApiError::bad_request(
                        "Invalid Filter",
                        format!("Unknown sort option {sort:?}. Use newest, oldest, price-asc or price-desc."),
                    )
                })?,
            None => SortOption::default(),
        };
        let tags = self
            .tags
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect();

        Ok(ProductFilters {
            search: self.q,
            sort,
            price_range: PriceRange {
                min: self.min_price.unwrap_or(defaults.min),
                max: self.max_price.unwrap_or(defaults.max),
            },
            tags,
        })
    }
}

#[derive(Serialize)]
pub(super) struct ProductList {
    products: Vec<Product>,
    /// Tags across the whole catalog, for the filter picker.
    all_tags: Vec<String>,
    active_filters: usize,
    sort_label: &'static str,
}

impl ProductList {
    fn build(snapshot: &[Product], filters: &ProductFilters) -> Self {
        Self {
            products: filter_products(snapshot, filters),
            all_tags: all_tags(snapshot),
            active_filters: filters.active_count(),
            sort_label: filters.sort.label(),
        }
    }
}

#[derive(Serialize)]
pub(super) struct AddedToCart {
    title: &'static str,
    description: String,
    cart: CartView,
}

pub(super) async fn list_products(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<ProductList>, ApiError> {
    let filters = query.into_filters()?;
    let snapshot = state.feed.snapshot();
    Ok(Json(ProductList::build(&snapshot, &filters)))
}

/// Live filtered catalog: one event per snapshot.
pub(super) async fn product_stream(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ProductsQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let filters = query.into_filters()?;
    let mut updates = state.feed.subscribe();

    let stream = async_stream::stream! {
        loop {
            let snapshot = updates.borrow_and_update().clone();
            if let Ok(json) = serde_json::to_string(&ProductList::build(&snapshot, &filters)) {
                yield Ok(Event::default().event("products").data(json));
            }
            if updates.changed().await.is_err() {
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

pub(super) async fn get_product(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    state
        .catalog
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("This product does not exist."))
}

pub(super) async fn create_product(
    State(state): State<Arc<ApiState>>,
    signed_in: SignedIn,
    Json(listing): Json<NewListing>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let seller = signed_in.require_artisan()?;
    let product = state
        .catalog
        .create(&listing, seller)
        .await
        .map_err(|error| ApiError::from_error("Save Failed", error))?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub(super) async fn add_product_to_cart(
    State(state): State<Arc<ApiState>>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
) -> Result<Json<AddedToCart>, ApiError> {
    let product = state
        .catalog
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("This product does not exist."))?;

    let mut cart = session.cart().lock().await;
    cart.add(product.to_cart_item());

    Ok(Json(AddedToCart {
        title: "Added to cart",
        description: format!("{} has been added to your cart.", product.title),
        cart: CartView::from(cart.cart()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_defaults_match_filter_defaults() {
        let filters = ProductsQuery::default().into_filters().unwrap();
        assert_eq!(filters, ProductFilters::default());
    }

    #[test]
    fn query_parses_tags_and_range() {
        let query = ProductsQuery {
            q: "vase".into(),
            sort: Some("price-desc".into()),
            min_price: Some(100.0),
            max_price: None,
            tags: Some("pottery, blue,,".into()),
        };
        let filters = query.into_filters().unwrap();
        assert_eq!(filters.sort, SortOption::PriceDesc);
        assert_eq!(filters.price_range, PriceRange { min: 100.0, max: 10_000.0 });
        assert_eq!(filters.tags, vec!["pottery", "blue"]);
    }

    #[test]
    fn unknown_sort_is_rejected() {
        let query = ProductsQuery {
            sort: Some("cheapest".into()),
            ..ProductsQuery::default()
        };
        let error = query.into_filters().err().expect("rejected");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }
}
