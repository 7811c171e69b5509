//! Auth-session state for the current device user.
//!
//! SYSTEM CONTEXT
//! ==============
//! One [`Session`] is created at startup and handed, by clone, to the auth
//! store, the HTTP client's interceptor list, and the route guard. It is the
//! only writer of the [`TokenStore`] and of the client's authorization header.
//!
//! DESIGN
//! ======
//! Every transition runs inside one critical section with no await point, so
//! token, user, persisted copy and header move together. Commit order on
//! login is: validate, persist, update memory, update header.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::net::client::{DefaultHeaders, ResponseInterceptor, STATUS_UNAUTHORIZED, bearer_value};
use crate::net::types::{LoginGrant, User};
use crate::state::token_store::{TokenStore, TokenStoreError};

/// Coarse session status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthStatus {
    /// The persisted token has not been read yet.
    Uninitialized,
    Anonymous,
    /// A token is held; the user record may still be loading.
    Authenticated,
}

/// Point-in-time copy of the session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub user: Option<User>,
}

/// Reasons a login grant could not be committed.
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("server returned an unusable token")]
    InvalidToken,
    #[error(transparent)]
    Persist(#[from] TokenStoreError),
}

#[derive(Debug, Default)]
struct SessionInner {
    initialized: bool,
    token: Option<String>,
    user: Option<User>,
}

/// Shared handle to the session. Clones refer to the same state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
    tokens: Arc<dyn TokenStore>,
    headers: DefaultHeaders,
}

impl Session {
    pub fn new(tokens: Arc<dyn TokenStore>, headers: DefaultHeaders) -> Self {
        Self { inner: Arc::new(Mutex::new(SessionInner::default())), tokens, headers }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn status(&self) -> AuthStatus {
        let inner = self.lock();
        if !inner.initialized {
            AuthStatus::Uninitialized
        } else if inner.token.is_some() {
            AuthStatus::Authenticated
        } else {
            AuthStatus::Anonymous
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        SessionSnapshot { token: inner.token.clone(), user: inner.user.clone() }
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    /// Whether a token is present. Validity is not checked.
    ///
    /// Before [`Session::restore`] has run, the persisted copy is consulted;
    /// an unreadable store counts as no token.
    #[must_use]
    pub fn has_token(&self) -> bool {
        let inner = self.lock();
        if inner.initialized {
            return inner.token.is_some();
        }
        drop(inner);
        match self.tokens.load() {
            Ok(token) => token.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "token store unreadable; treating as anonymous");
                false
            }
        }
    }

    /// Load the persisted token into memory and mirror it into the default
    /// authorization header. Leaves the session uninitialized on failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the token store cannot be read.
    pub fn restore(&self) -> Result<AuthStatus, TokenStoreError> {
        let mut inner = self.lock();
        let persisted = self.tokens.load()?;

        let header = match persisted.as_deref().map(bearer_value) {
            Some(Ok(value)) => Some(value),
            Some(Err(_)) => {
                tracing::warn!("persisted token is not a valid header value; discarding");
                self.tokens.clear()?;
                None
            }
            None => None,
        };

        inner.initialized = true;
        match header {
            Some(value) => {
                inner.token = persisted;
                self.headers.set_authorization(value);
                tracing::info!("session restored from token store");
                Ok(AuthStatus::Authenticated)
            }
            None => {
                inner.token = None;
                inner.user = None;
                self.headers.clear_authorization();
                Ok(AuthStatus::Anonymous)
            }
        }
    }

    /// Commit a successful login. All-or-nothing: on error nothing changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty, has surrounding whitespace, is
    /// not header-safe, or cannot be persisted.
    pub fn commit_login(&self, grant: LoginGrant) -> Result<SessionSnapshot, CommitError> {
        let LoginGrant { token, user } = grant;
        // The token store trims on load, so only trim-stable tokens round-trip.
        if token.is_empty() || token.trim() != token {
            return Err(CommitError::InvalidToken);
        }
        let header = bearer_value(&token).map_err(|_| CommitError::InvalidToken)?;

        let mut inner = self.lock();
        self.tokens.save(&token)?;
        inner.initialized = true;
        inner.token = Some(token);
        inner.user = Some(user);
        self.headers.set_authorization(header);

        tracing::info!(user_id = ?inner.user.as_ref().map(|u| u.id), "session established");
        Ok(SessionSnapshot { token: inner.token.clone(), user: inner.user.clone() })
    }

    /// Replace the cached user record.
    ///
    /// Applied even if the session was cleared while the fetch that produced
    /// `user` was in flight; last write wins.
    pub fn set_user(&self, user: User) {
        self.lock().user = Some(user);
    }

    /// Drop token and user, remove the persisted token and the authorization
    /// header. Safe to call in any state.
    pub fn clear(&self) {
        let mut inner = self.lock();
        let was_authenticated = inner.token.is_some();
        inner.initialized = true;
        inner.token = None;
        inner.user = None;
        if let Err(e) = self.tokens.clear() {
            tracing::warn!(error = %e, "failed to remove persisted token");
        }
        self.headers.clear_authorization();
        if was_authenticated {
            tracing::info!("session cleared");
        }
    }
}

impl ResponseInterceptor for Session {
    fn on_response(&self, status: u16) {
        if status == STATUS_UNAUTHORIZED {
            tracing::warn!("received 401; forcing logout");
            self.clear();
        }
    }
}
