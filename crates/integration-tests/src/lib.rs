//! Integration tests for Shopfront.
//!
//! Each [`TestContext`] runs the real storefront router on an ephemeral port,
//! backed by a file storage in a temp directory and a `wiremock` server
//! standing in for the remote catalog/auth API.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, redirect};
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shopfront_storefront::config::{ApiConfig, StorefrontConfig};
use shopfront_storefront::routes;
use shopfront_storefront::state::AppState;
use shopfront_storefront::storage::FileStorage;

/// Token the mock API issues on login.
pub const TEST_TOKEN: &str = "test-jwt";

/// A running storefront plus its mock API.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub state: AppState,
    pub api: MockServer,
    storage_path: PathBuf,
    _storage_dir: Option<TempDir>,
}

impl TestContext {
    /// Start a storefront with fresh storage.
    pub async fn start() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("storage.json");
        Self::launch(&path, Some(dir)).await
    }

    /// Start a storefront over an existing storage file, restoring the
    /// session from it the way the binary does on startup.
    pub async fn start_with_storage(storage_path: &Path) -> Self {
        Self::launch(storage_path, None).await
    }

    async fn launch(storage_path: &Path, storage_dir: Option<TempDir>) -> Self {
        let api = MockServer::start().await;

        let config = StorefrontConfig {
            api: ApiConfig {
                base_url: api.uri(),
                ..ApiConfig::default()
            },
            storage_path: storage_path.to_path_buf(),
            checkout_delay: Duration::from_millis(10),
            ..StorefrontConfig::default()
        };

        let storage = Arc::new(FileStorage::new(storage_path));
        let state = AppState::new(config, storage).expect("Failed to build state");
        state.session().restore();

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("No local address");

        let app = routes::app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server error");
        });

        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: format!("http://{addr}"),
            state,
            api,
            storage_path: storage_path.to_path_buf(),
            _storage_dir: storage_dir,
        }
    }

    /// The storage file backing this storefront.
    #[must_use]
    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// Absolute URL for a storefront path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed")
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST failed")
    }

    /// Mount the product listing on the mock API.
    pub async fn mount_catalog(&self) {
        Mock::given(method("GET"))
            .and(path("/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(catalog_json()))
            .mount(&self.api)
            .await;
    }

    /// Mount a login endpoint that accepts any credentials.
    pub async fn mount_login(&self) {
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({ "user": user_json(), "token": TEST_TOKEN })),
            )
            .mount(&self.api)
            .await;
    }

    /// Log in through the storefront's login form.
    pub async fn login(&self) -> Response {
        self.post_form(
            "/login",
            &[("email", "john@mail.com"), ("password", "changeme")],
        )
        .await
    }
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// The user record the mock API returns.
#[must_use]
pub fn user_json() -> Value {
    json!({
        "id": 1,
        "email": "john@mail.com",
        "name": "Jhon",
        "role": "customer",
        "avatar": "https://i.imgur.com/LDOO4Qs.jpg",
    })
}

/// A small product listing, including one product without a usable image.
#[must_use]
pub fn catalog_json() -> Value {
    json!([
        {
            "id": 1,
            "title": "Classic Shirt",
            "price": 10,
            "description": "Cotton shirt",
            "category": { "id": 1, "name": "Clothes", "image": "https://example.com/clothes.png" },
            "images": ["https://example.com/shirt.png"]
        },
        {
            "id": 2,
            "title": "Wool Socks",
            "price": 5.5,
            "description": "Warm socks",
            "category": { "id": 1, "name": "Clothes", "image": "https://example.com/clothes.png" },
            "images": ["https://example.com/socks.png"]
        },
        {
            "id": 3,
            "title": "Placeholder Lamp",
            "price": 99,
            "description": "Missing picture",
            "category": { "id": 5, "name": "Others" },
            "images": ["[\"undefined\"]"]
        }
    ])
}
