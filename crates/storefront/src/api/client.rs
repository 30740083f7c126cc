//! REST client implementation.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use shopfront_core::storage::TOKEN_KEY;
use shopfront_core::{DurableStorage, ProductId, UserIdentity};

use super::cache::{CacheKey, CacheValue};
use super::types::{
    AuthSession, CUSTOMER_ROLE, DEFAULT_AVATAR_URL, LoginCredentials, LoginRequest, LoginResponse,
    Product, RegisterRequest, RegisterResponse, Registration,
};
use super::{ApiError, extract_message};
use crate::config::ApiConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the catalog/auth REST API.
///
/// Cheap to clone; clones share the HTTP connection pool and the cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    storage: Arc<dyn DurableStorage>,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// `storage` is consulted on every request for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig, storage: Arc<dyn DurableStorage>) -> Result<Self, ApiError> {
        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(config.cache_ttl)
            .build();

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                storage,
                cache,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Bearer token from durable storage, if one is present.
    fn stored_token(&self) -> Option<SecretString> {
        match self.inner.storage.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()).map(SecretString::from),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read bearer token, sending request without it");
                None
            }
        }
    }

    /// Start a request, attaching the stored bearer token if present.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.inner.client.request(method, self.endpoint(path));
        match self.stored_token() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Send a request and decode a JSON success body.
    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized(extract_message(&body)));
        }

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "API returned non-success status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: extract_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse API response"
            );
            ApiError::Parse(e)
        })
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    /// Get the displayable product listing.
    ///
    /// Products without a usable first image are dropped. The listing is
    /// cached for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Arc<Vec<Product>>, ApiError> {
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let fetched: Vec<Product> = self
            .execute(self.request(Method::GET, "/products"))
            .await?;
        let total = fetched.len();

        let products: Arc<Vec<Product>> = Arc::new(
            fetched
                .into_iter()
                .filter(Product::has_displayable_image)
                .collect(),
        );
        debug!(total, displayable = products.len(), "Fetched product listing");

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(Arc::clone(&products)))
            .await;

        Ok(products)
    }

    /// Products whose title or category contains `term` (case-insensitive).
    ///
    /// An empty term returns the whole listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be fetched.
    #[instrument(skip(self))]
    pub async fn search_products(&self, term: &str) -> Result<Vec<Product>, ApiError> {
        let products = self.list_products().await?;
        Ok(products.iter().filter(|p| p.matches(term)).cloned().collect())
    }

    /// Look up a product in the listing.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] if the listing has no such product, or
    /// an error if the listing cannot be fetched.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn find_product(&self, id: ProductId) -> Result<Product, ApiError> {
        self.list_products()
            .await?
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Product {id}")))
    }

    // =========================================================================
    // Auth Methods
    // =========================================================================

    /// Exchange credentials for a user and bearer token.
    ///
    /// When the login response carries only a token, the profile is fetched
    /// with it.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the API fails.
    #[instrument(skip_all, fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<AuthSession, ApiError> {
        let body = LoginRequest {
            email: credentials.email.as_str(),
            password: credentials.password.expose_secret(),
        };

        let response: LoginResponse = self
            .execute(self.request(Method::POST, "/auth/login").json(&body))
            .await?;

        let token = response.token.filter(|t| !t.is_empty()).map(SecretString::from);

        let user = match (response.user, &token) {
            (Some(user), _) => user,
            (None, Some(token)) => self.profile(token).await?,
            (None, None) => {
                return Err(ApiError::Status {
                    status: StatusCode::OK.as_u16(),
                    message: Some("Login response contained neither user nor token".to_string()),
                });
            }
        };

        tracing::info!(user_id = %user.id, "Login succeeded");
        Ok(AuthSession { user, token })
    }

    /// Create an account with the customer role.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the registration.
    #[instrument(skip_all, fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<UserIdentity, ApiError> {
        let body = RegisterRequest {
            name: &registration.name,
            email: registration.email.as_str(),
            password: registration.password.expose_secret(),
            avatar: DEFAULT_AVATAR_URL,
            role: CUSTOMER_ROLE,
        };

        let response: RegisterResponse = self
            .execute(self.request(Method::POST, "/users").json(&body))
            .await?;

        let user = UserIdentity::from(response);
        tracing::info!(user_id = %user.id, "Registration succeeded");
        Ok(user)
    }

    /// Fetch the profile belonging to `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected or the API fails.
    #[instrument(skip_all)]
    pub async fn profile(&self, token: &SecretString) -> Result<UserIdentity, ApiError> {
        let builder = self
            .inner
            .client
            .get(self.endpoint("/auth/profile"))
            .bearer_auth(token.expose_secret());
        self.execute(builder).await
    }
}
