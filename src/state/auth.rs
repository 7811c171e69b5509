//! Auth store: login, registration, logout and profile refresh.
//!
//! SYSTEM CONTEXT
//! ==============
//! Called by the view layer (the CLI) and by startup. Talks to the server
//! through the shared [`ApiClient`] and records outcomes in the shared
//! [`Session`].
//!
//! ERROR HANDLING
//! ==============
//! Login and registration failures come back as [`AuthFailure`], whose
//! `message` is the server's own text when it sent one and a fixed fallback
//! otherwise. A `401` on the profile endpoint is not an error to the caller:
//! the session is cleared and [`ProfileFetch::Expired`] is returned.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::Arc;

use crate::net::client::{ApiClient, ApiError};
use crate::net::types::{LoginRequest, LoginResponse, MessageBody, RegisterRequest, User};
use crate::state::session::{AuthStatus, CommitError, Session, SessionSnapshot};
use crate::state::token_store::TokenStoreError;

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";
pub const PROFILE_PATH: &str = "/api/user/profile";

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Commit(#[from] CommitError),
}

/// A failed login or registration, with a message fit to show the user.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct AuthFailure {
    pub message: String,
    #[source]
    pub cause: AuthError,
}

impl AuthFailure {
    fn new(cause: impl Into<AuthError>, fallback: &str) -> Self {
        let cause = cause.into();
        let message = match &cause {
            AuthError::Api(api) => api.server_message().unwrap_or(fallback).to_owned(),
            AuthError::Commit(_) => fallback.to_owned(),
        };
        Self { message, cause }
    }
}

/// Outcome of [`AuthStore::fetch_user_profile`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfileFetch {
    /// No token; no request was made.
    Skipped,
    Updated(User),
    /// The server rejected the token; the session has been cleared.
    Expired,
}

/// Session operations over the shared client.
#[derive(Clone)]
pub struct AuthStore {
    session: Session,
    api: ApiClient,
}

impl AuthStore {
    /// Build the store and register the session as a response interceptor on
    /// `api`, so a `401` from any call site clears it.
    pub fn new(session: Session, api: ApiClient) -> Self {
        api.add_interceptor(Arc::new(session.clone()));
        Self { session, api }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Read the persisted token into the session. Does not fetch the profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the token store cannot be read; the session then
    /// stays [`AuthStatus::Uninitialized`].
    pub fn initialize(&self) -> Result<AuthStatus, TokenStoreError> {
        self.session.restore()
    }

    /// Exchange credentials for a token and establish the session.
    ///
    /// Credentials are sent as given; validating them is the server's job.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthFailure`] on any failure. The login itself writes
    /// nothing on failure, but a `401` reply still reaches the session's
    /// interceptor and ends any session already held.
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionSnapshot, AuthFailure> {
        let response: LoginResponse = match self
            .api
            .post_json(LOGIN_PATH, &LoginRequest { username, password })
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%username, error = %e, "login failed");
                return Err(AuthFailure::new(e, LOGIN_FAILED));
            }
        };

        self.session.commit_login(response.into_grant()).map_err(|e| {
            tracing::warn!(%username, error = %e, "login response rejected");
            AuthFailure::new(e, LOGIN_FAILED)
        })
    }

    /// Create an account. Does not log in.
    ///
    /// A 2xx reply whose body is not a `{message}` document still counts as
    /// success, with no message.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthFailure`] if the server rejects the registration or is unreachable.
    pub async fn register(&self, username: &str, password: &str, email: &str) -> Result<Option<String>, AuthFailure> {
        let body = RegisterRequest { username, password, email };
        match self.api.post_json::<_, MessageBody>(REGISTER_PATH, &body).await {
            Ok(reply) => {
                tracing::info!(%username, "registration accepted");
                Ok(reply.message)
            }
            Err(ApiError::Decode(e)) => {
                tracing::info!(%username, error = %e, "registration accepted without a readable message");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(%username, error = %e, "registration failed");
                Err(AuthFailure::new(e, REGISTRATION_FAILED))
            }
        }
    }

    /// Drop the session. Idempotent.
    pub fn logout(&self) {
        self.session.clear();
    }

    /// Refresh the cached user from the server.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] for failures other than `401`; the session is
    /// left untouched in that case.
    pub async fn fetch_user_profile(&self) -> Result<ProfileFetch, ApiError> {
        if self.session.token().is_none() {
            return Ok(ProfileFetch::Skipped);
        }

        match self.api.get_json::<User>(PROFILE_PATH).await {
            Ok(user) => {
                self.session.set_user(user.clone());
                Ok(ProfileFetch::Updated(user))
            }
            Err(e) if e.is_unauthorized() => {
                tracing::warn!("profile fetch rejected token; logging out");
                self.logout();
                Ok(ProfileFetch::Expired)
            }
            Err(e) => {
                tracing::warn!(error = %e, "profile fetch failed");
                Err(e)
            }
        }
    }
}
