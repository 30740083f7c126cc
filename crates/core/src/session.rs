//! Authenticated identity and its durability.
//!
//! The session store keeps the logged-in [`UserIdentity`] in memory and mirrors
//! it to [`DurableStorage`] so it survives restarts. Corrupt persisted data is
//! never an error for the caller: it is discarded and treated as logged out.

use std::sync::Arc;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use crate::storage::{DurableStorage, StorageError, TOKEN_KEY, USER_KEY};
use crate::types::{Email, UserId};

/// Errors surfaced by [`SessionStore`] mutations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The identity could not be serialized.
    #[error("failed to serialize identity: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Durable storage rejected the write.
    #[error("failed to persist session: {0}")]
    Storage(#[from] StorageError),
}

/// The authenticated user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(rename = "avatar", default)]
    pub avatar_url: String,
}

/// Observable session state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// The loaded identity; `None` when logged out.
    pub identity: Option<UserIdentity>,
}

impl SessionState {
    /// True iff an identity is loaded.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

/// Owner of the authenticated identity.
///
/// Starts logged out; call [`SessionStore::restore`] once at startup to load a
/// persisted identity.
pub struct SessionStore {
    state: watch::Sender<SessionState>,
    storage: Arc<dyn DurableStorage>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create a logged-out session backed by `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self { state, storage }
    }

    /// The storage this session persists to.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn DurableStorage> {
        &self.storage
    }

    /// Load the persisted identity, if any.
    ///
    /// Never fails. A value that does not parse is removed from storage and
    /// the session is left logged out; so is a storage that cannot be read.
    pub fn restore(&self) -> SessionState {
        let identity = match self.storage.get(USER_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<UserIdentity>(&raw) {
                Ok(identity) => Some(identity),
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding unparseable persisted session");
                    if let Err(e) = self.storage.remove(USER_KEY) {
                        tracing::warn!(error = %e, "Failed to remove corrupt session entry");
                    }
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Durable storage unreadable, starting logged out");
                None
            }
        };

        if let Some(identity) = &identity {
            tracing::info!(user_id = %identity.id, "Restored persisted session");
        }

        self.state.send_replace(SessionState { identity });
        self.snapshot()
    }

    /// Make `identity` the active session and persist it.
    ///
    /// The in-memory session is active even if persisting fails; the error
    /// reports that it will not survive a restart.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity cannot be written to storage.
    pub fn login(&self, identity: UserIdentity) -> Result<SessionState, SessionError> {
        let serialized = serde_json::to_string(&identity);
        self.state.send_replace(SessionState {
            identity: Some(identity),
        });
        self.storage.set(USER_KEY, &serialized?)?;
        Ok(self.snapshot())
    }

    /// End the session: clear the in-memory identity and remove the persisted
    /// identity and bearer token.
    ///
    /// Storage failures are logged; the in-memory session is cleared
    /// regardless.
    pub fn logout(&self) -> SessionState {
        self.state.send_if_modified(|state| state.identity.take().is_some());
        for key in [USER_KEY, TOKEN_KEY] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(key, error = %e, "Failed to remove persisted session entry");
            }
        }
        self.snapshot()
    }

    /// True iff an identity is currently loaded.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// The loaded identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<UserIdentity> {
        self.state.borrow().identity.clone()
    }

    /// A copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Subscribe to login/logout transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Persist the bearer token attached to outgoing API requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be written to storage.
    pub fn remember_token(&self, token: &SecretString) -> Result<(), SessionError> {
        use secrecy::ExposeSecret;

        self.storage.set(TOKEN_KEY, token.expose_secret())?;
        Ok(())
    }

    /// The persisted bearer token, if any.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        match self.storage.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()).map(SecretString::from),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read bearer token");
                None
            }
        }
    }
}
