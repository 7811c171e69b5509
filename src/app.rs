//! Startup wiring: config, token store, session, client, stores, router.
//!
//! DESIGN
//! ======
//! [`App::build`] only constructs and connects the pieces; nothing touches
//! the network or the token store until [`App::start`]. Tests build an `App`
//! around a scripted transport and an in-memory token store.
//!
//! ERROR HANDLING
//! ==============
//! A token store that cannot be read aborts startup. A failed profile fetch
//! does not: it is logged and the session keeps its restored token.

#[cfg(test)]
#[path = "app_test.rs"]
mod app_test;

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::net::client::{ApiClient, ApiError, DefaultHeaders};
use crate::net::resources::ResourceApi;
use crate::net::transport::{ReqwestTransport, Transport, TransportError};
use crate::routes::{RouteGuard, Router};
use crate::state::auth::{AuthStore, ProfileFetch};
use crate::state::session::{AuthStatus, Session};
use crate::state::token_store::{FileTokenStore, TokenStore, TokenStoreError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    TokenStore(#[from] TokenStoreError),
}

/// Result of [`App::start`].
#[derive(Debug)]
pub struct Startup {
    pub status: AuthStatus,
    /// `None` when no token was restored and no fetch was attempted.
    pub profile: Option<Result<ProfileFetch, ApiError>>,
}

/// Fully wired client application.
pub struct App {
    pub auth: AuthStore,
    pub resources: ResourceApi,
    pub router: Router,
}

impl App {
    /// Wire the components around `transport` and `tokens`.
    pub fn build(config: &ClientConfig, transport: Arc<dyn Transport>, tokens: Arc<dyn TokenStore>) -> Self {
        let headers = DefaultHeaders::new();
        let session = Session::new(tokens, headers.clone());
        let api = ApiClient::new(transport, config.base_url.clone(), headers);
        let auth = AuthStore::new(session.clone(), api.clone());
        let resources = ResourceApi::new(api);
        let router = Router::new(RouteGuard::new(session));
        Self { auth, resources, router }
    }

    /// Build with the real HTTP transport and the file token store named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn connect(config: &ClientConfig) -> Result<Self, AppError> {
        let transport = ReqwestTransport::new(config.timeouts)?;
        let tokens = FileTokenStore::new(config.token_path.clone());
        tracing::debug!(base_url = %config.base_url, token_path = %config.token_path.display(), "client configured");
        Ok(Self::build(config, Arc::new(transport), Arc::new(tokens)))
    }

    /// Restore the session and, if a token came back, refresh the profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the token store cannot be read.
    pub async fn start(&self) -> Result<Startup, AppError> {
        let status = self.auth.initialize()?;
        if status != AuthStatus::Authenticated {
            return Ok(Startup { status, profile: None });
        }

        let profile = self.auth.fetch_user_profile().await;
        if let Err(e) = &profile {
            tracing::warn!(error = %e, "profile fetch at startup failed; continuing");
        }
        Ok(Startup { status: self.auth.session().status(), profile: Some(profile) })
    }
}
