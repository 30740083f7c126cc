//! Product listing handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use super::{MessageQuery, PageContext};
use crate::api::Product;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Query parameters for the product listing.
#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    /// Search term.
    #[serde(default)]
    pub q: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Product listing template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub products: Vec<Product>,
    pub query: String,
}

/// Display the product listing, filtered by `?q=`.
///
/// A failed fetch renders an empty listing with an error notice.
#[instrument(skip_all, fields(user_id = %user.id, q = %query.q))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ProductsQuery>,
) -> impl IntoResponse {
    let term = query.q.trim().to_string();
    let mut notices = MessageQuery {
        error: query.error,
        success: query.success,
    };

    let products = match state.api().search_products(&term).await {
        Ok(products) => products,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load products");
            notices.error = Some("Failed to load products".to_string());
            Vec::new()
        }
    };

    ProductsIndexTemplate {
        page: PageContext::new(&state, Some(&user), notices),
        products,
        query: term,
    }
}
