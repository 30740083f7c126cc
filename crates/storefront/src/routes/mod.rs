//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//! GET  /health                 - Health check
//!
//! # Auth
//! GET  /login                  - Login page (?next= return location)
//! POST /login                  - Login action
//! GET  /register               - Register page
//! POST /register               - Register action
//! POST /logout                 - Logout action
//!
//! # Products (requires auth)
//! GET  /products               - Product listing (?q= search)
//!
//! # Cart (requires auth)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add one of a product
//! POST /cart/update            - Set quantity (below 1 removes)
//! POST /cart/remove            - Remove line
//!
//! # Checkout (requires auth)
//! GET  /checkout               - Order summary
//! POST /checkout               - Simulated payment, clears cart
//!
//! # JSON API (requires auth, 401 instead of redirect)
//! GET  /api/cart               - Cart contents and total
//! GET  /api/products/{id}      - Single product
//! ```
//!
//! Transient notices travel as `?error=` / `?success=` query parameters and
//! are rendered by the target page.

pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod products;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use chrono::Datelike;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use shopfront_core::UserIdentity;

use crate::middleware::request_id_middleware;
use crate::state::AppState;

// =============================================================================
// Shared Page Data
// =============================================================================

/// Query parameters for error/success display.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Data every page layout needs.
#[derive(Debug, Clone)]
pub struct PageContext {
    /// Display name of the logged-in user.
    pub user_name: Option<String>,
    /// Number of distinct lines in the cart, for the nav badge.
    pub cart_count: usize,
    pub error: Option<String>,
    pub success: Option<String>,
    pub year: i32,
}

impl PageContext {
    /// Build the layout context for the current request.
    #[must_use]
    pub fn new(state: &AppState, user: Option<&UserIdentity>, notices: MessageQuery) -> Self {
        Self {
            user_name: user.map(|u| u.name.clone()),
            cart_count: state.cart().snapshot().len(),
            error: notices.error.filter(|m| !m.is_empty()),
            success: notices.success.filter(|m| !m.is_empty()),
            year: chrono::Utc::now().year(),
        }
    }

    /// Whether someone is logged in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user_name.is_some()
    }
}

/// Append a notice to `path` as a query parameter.
///
/// `kind` is `"error"` or `"success"`.
#[must_use]
pub fn with_notice(path: &str, kind: &str, message: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}{kind}={}", urlencoding::encode(message))
}

// =============================================================================
// Routers
// =============================================================================

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
}

/// Create the JSON API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(api::cart))
        .route("/products/{id}", get(api::product))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        .route("/health", get(health))
        // Auth routes
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        // Product routes
        .route("/products", get(products::index))
        // Cart routes
        .nest("/cart", cart_routes())
        // Checkout
        .route("/checkout", get(checkout::show).post(checkout::pay))
        // JSON API
        .nest("/api", api_routes())
}

/// The complete application with tracing and request IDs, ready to serve.
pub fn app(state: AppState) -> Router {
    routes()
        .with_state(state)
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
}

/// Root span for a request; `request_id` is filled in by the request ID middleware.
fn request_span(request: &axum::extract::Request) -> tracing::Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = tracing::field::Empty,
    )
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}
