//! Route guard and authentication extractors.
//!
//! The guard policy itself is [`decide`], a pure function of the
//! authentication flag and the requested location. [`RequireAuth`] applies it
//! to a request; [`OptionalAuth`] reads the identity without rejecting.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{Method, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};

use url::Url;

use shopfront_core::UserIdentity;

use crate::state::AppState;

/// Login entry point unauthenticated shoppers are sent to.
pub const LOGIN_PATH: &str = "/login";

const PLACEHOLDER_ORIGIN: &str = "http://localhost";

/// Outcome of the route guard for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render the requested view unchanged.
    Allow,
    /// Send the shopper to log in, remembering where they were going.
    RedirectToLogin {
        /// The originally requested location, if it should be returned to.
        next: Option<String>,
    },
}

impl GuardDecision {
    /// The login URL for this redirect, carrying `next` when present.
    ///
    /// Returns `None` for [`GuardDecision::Allow`].
    #[must_use]
    pub fn login_url(&self) -> Option<String> {
        match self {
            Self::Allow => None,
            Self::RedirectToLogin { next: None } => Some(LOGIN_PATH.to_string()),
            Self::RedirectToLogin { next: Some(next) } => Some(format!(
                "{LOGIN_PATH}?next={}",
                urlencoding::encode(next)
            )),
        }
    }
}

/// Guard policy.
///
/// `requested` is the path and query of the original request, or `None`
/// when the request should not be replayed after login.
#[must_use]
pub fn decide(is_authenticated: bool, requested: Option<&str>) -> GuardDecision {
    if is_authenticated {
        GuardDecision::Allow
    } else {
        GuardDecision::RedirectToLogin {
            next: requested
                .filter(|location| is_local_path(location))
                .map(String::from),
        }
    }
}

/// Post-login destination: `next` if it is a local path, `/` otherwise.
#[must_use]
pub fn safe_next(next: Option<&str>) -> &str {
    next.filter(|location| is_local_path(location))
        .unwrap_or("/")
}

/// Whether `location` is a path on this site rather than another origin.
///
/// Browsers drop tabs and newlines and read `\` as `/`, so any of those
/// disqualify the location outright. What remains must resolve against a
/// placeholder origin without leaving it.
#[must_use]
pub fn is_local_path(location: &str) -> bool {
    if !location.starts_with('/') || location.chars().any(|c| c.is_control() || c == '\\') {
        return false;
    }

    let Ok(base) = Url::parse(PLACEHOLDER_ORIGIN) else {
        return false;
    };
    base.join(location)
        .is_ok_and(|resolved| resolved.origin() == base.origin())
}

/// Extractor that requires an authenticated session.
///
/// If the shopper is not logged in, page requests are redirected to the login
/// page and API requests get a 401.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub UserIdentity);

/// Error returned when authentication is required but the shopper is not logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin(String),
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(url) => Redirect::to(&url).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = state.session().identity();

        // Nested routers strip their prefix from `parts.uri`
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&parts.uri, |original| &original.0);

        // Only idempotent page loads are worth returning to after login
        let requested = (parts.method == Method::GET)
            .then(|| uri.path_and_query().map(|pq| pq.as_str()))
            .flatten();

        match (decide(identity.is_some(), requested), identity) {
            (GuardDecision::Allow, Some(user)) => Ok(Self(user)),
            (decision, _) => {
                if uri.path().starts_with("/api/") {
                    return Err(AuthRejection::Unauthorized);
                }
                tracing::debug!(
                    path = %uri.path(),
                    "Redirecting unauthenticated request to login"
                );
                Err(AuthRejection::RedirectToLogin(
                    decision.login_url().unwrap_or_else(|| LOGIN_PATH.to_string()),
                ))
            }
        }
    }
}

/// Extractor that optionally gets the current identity.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is logged in.
pub struct OptionalAuth(pub Option<UserIdentity>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(state.session().identity()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_allows_authenticated() {
        assert_eq!(decide(true, Some("/cart")), GuardDecision::Allow);
        assert_eq!(decide(true, None), GuardDecision::Allow);
        assert_eq!(GuardDecision::Allow.login_url(), None);
    }

    #[test]
    fn test_decide_captures_requested_location() {
        let decision = decide(false, Some("/products?q=shirt"));
        assert_eq!(
            decision,
            GuardDecision::RedirectToLogin {
                next: Some("/products?q=shirt".to_string())
            }
        );
        assert_eq!(
            decision.login_url().as_deref(),
            Some("/login?next=%2Fproducts%3Fq%3Dshirt")
        );
    }

    #[test]
    fn test_decide_without_location() {
        let decision = decide(false, None);
        assert_eq!(decision, GuardDecision::RedirectToLogin { next: None });
        assert_eq!(decision.login_url().as_deref(), Some("/login"));
    }

    #[test]
    fn test_decide_drops_foreign_location() {
        assert_eq!(
            decide(false, Some("//evil.example/cart")),
            GuardDecision::RedirectToLogin { next: None }
        );
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/cart")), "/cart");
        assert_eq!(safe_next(Some("/products?q=a")), "/products?q=a");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/");
        assert_eq!(safe_next(Some("")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn test_safe_next_rejects_control_characters() {
        assert_eq!(safe_next(Some("/\t/evil.example")), "/");
        assert_eq!(safe_next(Some("/\n/evil.example")), "/");
        assert_eq!(safe_next(Some("/\nevil")), "/");
        assert_eq!(safe_next(Some("/cart\r")), "/");
    }

    #[test]
    fn test_safe_next_rejects_embedded_backslash() {
        assert_eq!(safe_next(Some("/cart\\..\\\\evil.example")), "/");
    }

    #[test]
    fn test_is_local_path_resolution() {
        assert!(is_local_path("/"));
        assert!(is_local_path("/cart?x=1#top"));
        assert!(is_local_path("/products/../cart"));
        assert!(!is_local_path("cart"));
        assert!(!is_local_path("///evil.example"));
        assert!(!is_local_path("https://evil.example/"));
    }

    #[test]
    fn test_decide_drops_location_with_tab() {
        assert_eq!(
            decide(false, Some("/\t/evil.example")),
            GuardDecision::RedirectToLogin { next: None }
        );
    }
}
