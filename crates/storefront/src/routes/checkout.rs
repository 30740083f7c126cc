//! Checkout handlers.
//!
//! Payment is simulated: after the configured delay the cart is cleared and
//! the shopper is sent back to the product listing.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use super::cart::CartView;
use super::{MessageQuery, PageContext, with_notice};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Notice shown after the simulated payment.
pub const PAYMENT_SUCCESS: &str = "Payment successful! Thank you for your purchase!";

/// Checkout summary template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

/// Display the order summary. Shipping is always free.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    CheckoutTemplate {
        cart: CartView::from(&state.cart().snapshot()),
        page: PageContext::new(&state, Some(&user), query),
    }
}

/// Simulate payment, then clear the cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn pay(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Response {
    let cart = state.cart().snapshot();
    if cart.is_empty() {
        return Redirect::to(&with_notice("/cart", "error", "Your cart is empty")).into_response();
    }

    tracing::info!(
        lines = cart.len(),
        total = %cart.total_price(),
        "Processing simulated payment"
    );
    tokio::time::sleep(state.config().checkout_delay).await;

    let remaining = state.cart().settle(&cart);
    tracing::info!(remaining = remaining.len(), "Payment complete, paid lines removed");

    Redirect::to(&with_notice("/products", "success", PAYMENT_SUCCESS)).into_response()
}
