//! JSON endpoints.
//!
//! Same guard as the pages, but an unauthenticated request gets a 401 rather
//! than a redirect.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use shopfront_core::{CartLineItem, Price, ProductId};

use crate::api::Product;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Cart contents with aggregates.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartLineItem>,
    pub item_count: u32,
    pub total: Price,
}

/// `GET /api/cart`
pub async fn cart(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
) -> Json<CartResponse> {
    let cart = state.cart().snapshot();
    Json(CartResponse {
        item_count: cart.item_count(),
        total: cart.total_price(),
        items: cart.items().to_vec(),
    })
}

/// `GET /api/products/{id}`
///
/// # Errors
///
/// 404 if the catalog has no such product, 502 if the catalog is unreachable.
pub async fn product(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(state.api().find_product(id).await?))
}
