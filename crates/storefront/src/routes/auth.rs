//! Authentication route handlers.
//!
//! Handles login, registration and logout against the remote auth API.
//! Successful logins and registrations start a session in the
//! [`SessionStore`](shopfront_core::SessionStore); the bearer token is kept in
//! durable storage for subsequent API calls.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use shopfront_core::UserIdentity;

use super::{MessageQuery, PageContext, with_notice};
use crate::forms::{LoginForm, RegisterForm};
use crate::middleware::{OptionalAuth, is_local_path, safe_next};
use crate::state::AppState;

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
    pub success: Option<String>,
    /// Location to return to after login.
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub next: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
}

// =============================================================================
// Login Routes
// =============================================================================

fn login_url(next: Option<&str>) -> String {
    match next {
        Some(next) if is_local_path(next) => {
            format!("/login?next={}", urlencoding::encode(next))
        }
        _ => "/login".to_string(),
    }
}

/// Display the login page.
///
/// Already-authenticated shoppers go straight to their destination.
pub async fn login_page(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<LoginQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to(safe_next(query.next.as_deref())).into_response();
    }

    LoginTemplate {
        page: PageContext::new(
            &state,
            None,
            MessageQuery {
                error: query.error,
                success: query.success,
            },
        ),
        next: query.next.filter(|next| is_local_path(next)),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Redirect {
    let next = form.next.clone().filter(|n| !n.is_empty());
    let back = login_url(next.as_deref());

    let credentials = match form.validate() {
        Ok(credentials) => credentials,
        Err(e) => return Redirect::to(&with_notice(&back, "error", &e.to_string())),
    };

    let auth = match state.api().login(&credentials).await {
        Ok(auth) => auth,
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            return Redirect::to(&with_notice(&back, "error", &e.user_message("Login failed")));
        }
    };

    if let Some(token) = &auth.token
        && let Err(e) = state.session().remember_token(token)
    {
        tracing::warn!(error = %e, "Failed to persist bearer token");
    }

    start_session(&state, auth.user);

    Redirect::to(&with_notice(
        safe_next(next.as_deref()),
        "success",
        "Login successful!",
    ))
}

/// Log the user in, tolerating a storage failure.
///
/// The in-memory session is active either way; it just won't survive a restart.
fn start_session(state: &AppState, user: UserIdentity) {
    if let Err(e) = state.session().login(user) {
        tracing::error!(error = %e, "Session started but could not be persisted");
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    RegisterTemplate {
        page: PageContext::new(&state, user.as_ref(), query),
    }
}

/// Handle registration form submission.
///
/// A successful registration logs the new user in.
#[instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Redirect {
    let registration = match form.validate() {
        Ok(registration) => registration,
        Err(e) => return Redirect::to(&with_notice("/register", "error", &e.to_string())),
    };

    match state.api().register(&registration).await {
        Ok(user) => {
            start_session(&state, user);
            Redirect::to(&with_notice("/", "success", "Registration successful!"))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            Redirect::to(&with_notice(
                "/register",
                "error",
                &e.user_message("Registration failed"),
            ))
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// End the session and return to the login page.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Redirect {
    state.session().logout();
    Redirect::to(&with_notice("/login", "success", "You have been logged out"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use shopfront_core::storage::{TOKEN_KEY, USER_KEY};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::routes::test_support::{body_text, get, identity, location, post_form, state_for};

    fn user_json() -> serde_json::Value {
        json!({
            "id": 1,
            "email": "john@mail.com",
            "name": "Jhon",
            "role": "customer",
            "avatar": "https://i.imgur.com/LDOO4Qs.jpg",
        })
    }

    #[tokio::test]
    async fn test_login_page_renders_notice_and_next() {
        let state = state_for("http://127.0.0.1:9");
        let response = get(&state, "/login?next=%2Fcart&error=Bad%20things").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_text(response).await;
        assert!(body.contains("Bad things"));
        assert!(body.contains(r#"name="next" value="/cart""#));
    }

    #[tokio::test]
    async fn test_login_page_redirects_when_logged_in() {
        let state = state_for("http://127.0.0.1:9");
        state.session().login(identity()).unwrap();

        let response = get(&state, "/login?next=%2Fcart").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/cart");
    }

    #[tokio::test]
    async fn test_login_page_ignores_next_with_tab_when_logged_in() {
        let state = state_for("http://127.0.0.1:9");
        state.session().login(identity()).unwrap();

        let response = get(&state, "/login?next=%2F%09%2Fevil.example").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn test_login_page_ignores_next_with_newline_when_logged_in() {
        let state = state_for("http://127.0.0.1:9");
        state.session().login(identity()).unwrap();

        let response = get(&state, "/login?next=%2F%0Aevil").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn test_login_page_drops_next_with_newline() {
        let state = state_for("http://127.0.0.1:9");

        let response = get(&state, "/login?next=%2F%0Aevil").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!body_text(response).await.contains(r#"name="next""#));
    }

    #[tokio::test]
    async fn test_login_validation_error_skips_api() {
        // Nothing listens on the API address; a network call would fail differently
        let state = state_for("http://127.0.0.1:9");

        let response = post_form(&state, "/login", "email=&password=&next=%2Fcart").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response),
            "/login?next=%2Fcart&error=Email%20and%20password%20are%20required"
        );
        assert!(!state.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_login_success_returns_to_next_and_persists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({ "user": user_json(), "token": "jwt" })),
            )
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        let response = post_form(
            &state,
            "/login",
            "email=john%40mail.com&password=changeme&next=%2Fcart",
        )
        .await;

        assert_eq!(location(&response), "/cart?success=Login%20successful%21");
        assert!(state.session().is_authenticated());

        let storage = state.session().storage();
        assert!(storage.get(USER_KEY).unwrap().is_some());
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("jwt"));
    }

    #[tokio::test]
    async fn test_login_ignores_foreign_next() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({ "user": user_json(), "token": "jwt" })),
            )
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        let response = post_form(
            &state,
            "/login",
            "email=john%40mail.com&password=changeme&next=https%3A%2F%2Fevil.example",
        )
        .await;

        assert_eq!(location(&response), "/?success=Login%20successful%21");

        let response = post_form(
            &state,
            "/login",
            "email=john%40mail.com&password=changeme&next=%2F%09%2Fevil.example",
        )
        .await;
        assert_eq!(location(&response), "/?success=Login%20successful%21");
    }

    #[tokio::test]
    async fn test_login_api_failure_shows_notice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "message": "Unauthorized" })),
            )
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        let response =
            post_form(&state, "/login", "email=john%40mail.com&password=wrong").await;

        assert_eq!(location(&response), "/login?error=Unauthorized");
        assert!(!state.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_register_validation_error() {
        let state = state_for("http://127.0.0.1:9");
        let response = post_form(
            &state,
            "/register",
            "name=Jhon&email=john%40mail.com&password=secret1&confirm_password=secret2",
        )
        .await;

        assert_eq!(
            location(&response),
            "/register?error=Passwords%20do%20not%20match"
        );
    }

    #[tokio::test]
    async fn test_register_success_logs_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(201).set_body_json(user_json()))
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        let response = post_form(
            &state,
            "/register",
            "name=Jhon&email=john%40mail.com&password=secret1&confirm_password=secret1",
        )
        .await;

        assert_eq!(location(&response), "/?success=Registration%20successful%21");
        assert_eq!(state.session().identity().unwrap().name, "Jhon");
    }

    #[tokio::test]
    async fn test_logout_clears_identity_and_storage() {
        let state = state_for("http://127.0.0.1:9");
        state.session().login(identity()).unwrap();
        state.session().storage().set(TOKEN_KEY, "jwt").unwrap();

        let response = post_form(&state, "/logout", "").await;
        assert_eq!(
            location(&response),
            "/login?success=You%20have%20been%20logged%20out"
        );
        assert!(state.session().identity().is_none());
        assert_eq!(state.session().storage().get(USER_KEY).unwrap(), None);
        assert_eq!(state.session().storage().get(TOKEN_KEY).unwrap(), None);
    }
}
