//! Wire and domain types for the catalog/auth REST API.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use shopfront_core::{CategoryId, Email, Price, ProductId, UserIdentity};

/// Avatar sent with every registration; the form does not ask for one.
pub const DEFAULT_AVATAR_URL: &str = "https://api.lorem.space/image/face?w=640&h=480";

/// Shown in place of a blank product image.
pub const PLACEHOLDER_IMAGE_URL: &str =
    "https://via.placeholder.com/300x300.png?text=Product+Image";

/// Role assigned to every account created from the storefront.
pub const CUSTOMER_ROLE: &str = "customer";

// =============================================================================
// Catalog
// =============================================================================

/// A product from the catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Price,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub images: Vec<String>,
}

/// The category a product belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub id: Option<CategoryId>,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl Product {
    /// The first image, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Image to show on a product card, falling back to a placeholder.
    #[must_use]
    pub fn card_image(&self) -> &str {
        self.primary_image()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(PLACEHOLDER_IMAGE_URL)
    }

    /// Whether the listing has a usable first image.
    ///
    /// The API occasionally returns placeholder strings such as
    /// `"[\"undefined\"]"`; those products are hidden from the storefront.
    #[must_use]
    pub fn has_displayable_image(&self) -> bool {
        self.primary_image()
            .is_some_and(|url| !url.contains("undefined"))
    }

    /// Case-insensitive match of `term` against the title and category name.
    #[must_use]
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.title.to_lowercase().contains(&term)
            || self.category.name.to_lowercase().contains(&term)
    }
}

// =============================================================================
// Auth
// =============================================================================

/// Validated login credentials.
pub struct LoginCredentials {
    pub email: Email,
    pub password: SecretString,
}

/// Validated registration details.
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub password: SecretString,
}

/// An authenticated user together with the bearer token the API issued.
#[derive(Debug)]
pub struct AuthSession {
    pub user: UserIdentity,
    pub token: Option<SecretString>,
}

/// `POST /auth/login` body.
#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// `POST /auth/login` response.
///
/// Accepts `{ user, token }` as well as the bare `{ access_token, refresh_token }`
/// shape, in which case the profile is fetched separately.
#[derive(Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub user: Option<UserIdentity>,
    #[serde(default, alias = "access_token")]
    pub token: Option<String>,
}

/// `POST /users` body.
#[derive(Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub avatar: &'a str,
    pub role: &'a str,
}

/// `POST /users` response: either `{ user }` or the created user itself.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum RegisterResponse {
    Wrapped { user: UserIdentity },
    Bare(UserIdentity),
}

impl From<RegisterResponse> for UserIdentity {
    fn from(response: RegisterResponse) -> Self {
        match response {
            RegisterResponse::Wrapped { user } | RegisterResponse::Bare(user) => user,
        }
    }
}
