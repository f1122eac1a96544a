use super::error::ApiError;
use super::extract::CurrentSession;
use crate::cart::{Cart, CartItem, MAX_LINE_QUANTITY, QuantityUpdate};

use axum::Json;
use axum::extract::Path;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub(super) struct CartView {
    items: Vec<CartItem>,
    /// Formatted rupee total.
    total: String,
    item_count: u64,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items().to_vec(),
            total: cart.formatted_total(),
            item_count: cart.item_count(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct QuantityRequest {
    quantity: i64,
}

pub(super) async fn get_cart(CurrentSession(session): CurrentSession) -> Json<CartView> {
    let cart = session.cart().lock().await;
    Json(CartView::from(cart.cart()))
}

pub(super) async fn add_item(
    CurrentSession(session): CurrentSession,
    Json(item): Json<CartItem>,
) -> Result<Json<CartView>, ApiError> {
    if item.id.trim().is_empty() {
        return Err(ApiError::bad_request("Cart Error", "The item is missing an id."));
    }

    let mut cart = session.cart().lock().await;
    cart.add(item);
    Ok(Json(CartView::from(cart.cart())))
}

pub(super) async fn update_item(
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
    Json(request): Json<QuantityRequest>,
) -> Result<Json<CartView>, ApiError> {
    if request.quantity > i64::from(MAX_LINE_QUANTITY) {
        return Err(ApiError::bad_request(
            "Cart Error",
            format!("You can order at most {MAX_LINE_QUANTITY} of an item."),
        ));
    }

    let mut cart = session.cart().lock().await;
    match cart.update_quantity(&id, request.quantity) {
        QuantityUpdate::Updated | QuantityUpdate::Removed => Ok(Json(CartView::from(cart.cart()))),
        QuantityUpdate::Missing => Err(ApiError::not_found("That item is not in your cart.")),
    }
}

pub(super) async fn remove_item(
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
) -> Result<Json<CartView>, ApiError> {
    let mut cart = session.cart().lock().await;
    if !cart.remove(&id) {
        return Err(ApiError::not_found("That item is not in your cart."));
    }
    Ok(Json(CartView::from(cart.cart())))
}
