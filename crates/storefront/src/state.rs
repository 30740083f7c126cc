//! Application state shared across handlers.

use std::sync::Arc;

use tokio::task::JoinHandle;

use shopfront_core::{CartStore, DurableStorage, SessionStore};

use crate::api::{ApiClient, ApiError};
use crate::config::StorefrontConfig;
use crate::error::{clear_sentry_user, set_sentry_user};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// cart and session stores, the API client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
    cart: CartStore,
    session: SessionStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The session starts logged out; call [`SessionStore::restore`] on
    /// [`AppState::session`] to load a persisted identity.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `storage` - Durable storage shared by the session store and the
    ///   API client's bearer-token lookup
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: StorefrontConfig,
        storage: Arc<dyn DurableStorage>,
    ) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config.api, Arc::clone(&storage))?;
        let session = SessionStore::new(storage);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                cart: CartStore::new(),
                session,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the remote API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the shopping cart.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Get a reference to the session store.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// Log every cart change.
    ///
    /// The task ends when the cart store is dropped.
    #[must_use]
    pub fn watch_cart(&self) -> JoinHandle<()> {
        let mut rx = self.cart().subscribe();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let cart = rx.borrow_and_update().clone();
                tracing::debug!(
                    lines = cart.len(),
                    items = cart.item_count(),
                    total = %cart.total_price(),
                    "Cart changed"
                );
            }
        })
    }

    /// Keep the Sentry user context in step with login and logout.
    ///
    /// The task ends when the session store is dropped.
    #[must_use]
    pub fn watch_session(&self) -> JoinHandle<()> {
        let mut rx = self.session().subscribe();
        tokio::spawn(async move {
            loop {
                let identity = rx.borrow_and_update().identity.clone();
                match identity {
                    Some(user) => {
                        tracing::info!(user_id = %user.id, "Session started");
                        set_sentry_user(&user);
                    }
                    None => {
                        tracing::info!("Session ended");
                        clear_sentry_user();
                    }
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use shopfront_core::{CartLineItem, MemoryStorage, Price, ProductId};

    use super::*;

    fn state() -> AppState {
        AppState::new(StorefrontConfig::default(), Arc::new(MemoryStorage::new())).unwrap()
    }

    #[tokio::test]
    async fn test_clones_share_stores() {
        let state = state();
        let clone = state.clone();

        clone.cart().add_item(CartLineItem::new(
            ProductId::new(1),
            "Shirt",
            Price::from_cents(1000),
            2,
        ));
        assert_eq!(state.cart().snapshot().item_count(), 2);
    }

    #[tokio::test]
    async fn test_watch_cart_ends_when_state_dropped() {
        let state = state();
        let handle = state.watch_cart();

        state.cart().clear_cart();
        drop(state);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
