//! Client for the remote catalog/auth REST API.
//!
//! # Architecture
//!
//! - Plain JSON over `reqwest`; the remote API is the source of truth for
//!   products and accounts, nothing is synced locally
//! - The product listing is cached in memory via `moka` (5 minute TTL by default)
//! - Every request carries `Authorization: Bearer <token>` when durable storage
//!   holds a token, mirroring a browser request interceptor
//!
//! # Endpoints
//!
//! - `GET  /products` - product listing
//! - `POST /auth/login` - `{ email, password }` -> `{ user, token }`
//! - `GET  /auth/profile` - profile for the bearer token
//! - `POST /users` - registration
//!
//! # Example
//!
//! ```rust,ignore
//! use shopfront_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config.api, storage)?;
//! let products = client.list_products().await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::ApiClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when talking to the remote API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API rejected the credentials or token.
    #[error("Unauthorized: {}", .0.as_deref().unwrap_or("no details"))]
    Unauthorized(Option<String>),

    /// The API answered with a non-success status.
    #[error("API returned {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Status {
        /// HTTP status code.
        status: u16,
        /// The `message` field of the error body, if present.
        message: Option<String>,
    },

    /// The response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ApiError {
    /// Message suitable for showing to the shopper.
    ///
    /// Uses the API's own message when it sent one, `fallback` otherwise.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Unauthorized(Some(message))
            | Self::Status {
                message: Some(message),
                ..
            } => message.clone(),
            Self::NotFound(what) => format!("{what} not found"),
            _ => fallback.to_string(),
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// The API reports `{"message": "..."}` for most failures and
/// `{"message": ["...", "..."]}` for validation failures.
pub(crate) fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("message")? {
        serde_json::Value::String(message) if !message.is_empty() => Some(message.clone()),
        serde_json::Value::Array(messages) => {
            let joined = messages
                .iter()
                .filter_map(serde_json::Value::as_str)
                .collect::<Vec<_>>()
                .join("; ");
            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    }
}
