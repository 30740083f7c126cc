//! Cart route handlers.
//!
//! The cart lives in the in-memory [`CartStore`](shopfront_core::CartStore);
//! every mutation redirects back to a page that re-renders the new state.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tracing::instrument;

use shopfront_core::{CartLineItem, CartState, ProductId};

use super::{MessageQuery, PageContext, with_notice};
use crate::api::ApiError;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Cart item display data for templates.
#[derive(Debug, Clone)]
pub struct CartItemView {
    pub id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    /// Quantity submitted by the "-" button; 0 removes the line.
    pub decrement: u32,
    /// Quantity submitted by the "+" button.
    pub increment: u32,
}

/// Cart display data for templates.
#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: String,
    pub item_count: u32,
}

impl CartView {
    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<&CartLineItem> for CartItemView {
    fn from(item: &CartLineItem) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            quantity: item.quantity,
            price: item.unit_price.to_string(),
            line_price: item.subtotal().to_string(),
            decrement: item.quantity.saturating_sub(1),
            increment: item.quantity.saturating_add(1),
        }
    }
}

impl From<&CartState> for CartView {
    fn from(cart: &CartState) -> Self {
        Self {
            items: cart.items().iter().map(CartItemView::from).collect(),
            total: cart.total_price().to_string(),
            item_count: cart.item_count(),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    /// Search term to keep when returning to the listing.
    #[serde(default)]
    pub q: Option<String>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

/// Display cart page.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    let cart = CartView::from(&state.cart().snapshot());

    CartShowTemplate {
        page: PageContext::new(&state, Some(&user), query),
        cart,
    }
}

/// Add one of a product to the cart.
///
/// Name and price come from the catalog, not the form.
#[instrument(skip_all, fields(product_id = %form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Form(form): Form<AddToCartForm>,
) -> Redirect {
    let back = match form.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => format!("/products?q={}", urlencoding::encode(q)),
        None => "/products".to_string(),
    };

    match state.api().find_product(form.product_id).await {
        Ok(product) => {
            let item = CartLineItem::new(product.id, product.title.clone(), product.price, 1);
            let cart = state.cart().add_item(item);
            tracing::debug!(lines = cart.len(), "Added to cart");
            Redirect::to(&with_notice(
                &back,
                "success",
                &format!("{} added to cart", product.title),
            ))
        }
        Err(e @ ApiError::NotFound(_)) => {
            tracing::warn!(error = %e, "Add to cart for unknown product");
            Redirect::to(&with_notice(&back, "error", "Product not found"))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to look up product");
            Redirect::to(&with_notice(&back, "error", "Failed to add to cart"))
        }
    }
}

/// Set a line's quantity; below 1 removes the line.
#[instrument(skip_all, fields(product_id = %form.product_id, quantity = form.quantity))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Form(form): Form<UpdateCartForm>,
) -> Redirect {
    state.cart().update_quantity(form.product_id, form.quantity);
    Redirect::to("/cart")
}

/// Remove a line from the cart.
#[instrument(skip_all, fields(product_id = %form.product_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Redirect {
    state.cart().remove_item(form.product_id);
    Redirect::to("/cart")
}
