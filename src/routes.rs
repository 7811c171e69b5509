//! Route table and the authentication guard in front of it.
//!
//! SYSTEM CONTEXT
//! ==============
//! The CLI resolves every `open <path>` through [`Router::navigate`]. The
//! guard runs before each navigation, including the first, and only asks the
//! session whether a token is present. Whether that token is still valid is
//! found out later, by the `401` interceptor.

#[cfg(test)]
#[path = "routes_test.rs"]
mod routes_test;

use crate::state::session::Session;

pub const LOGIN_PATH: &str = "/login";

/// Views reachable by path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    Home,
    Login,
    Register,
    Search,
    Introduction,
    Resources,
    Upload,
    NotFound,
}

/// One entry of the route table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteDef {
    pub path: &'static str,
    pub view: View,
    pub requires_auth: bool,
}

pub const ROUTES: &[RouteDef] = &[
    RouteDef { path: "/", view: View::Home, requires_auth: false },
    RouteDef { path: LOGIN_PATH, view: View::Login, requires_auth: false },
    RouteDef { path: "/register", view: View::Register, requires_auth: false },
    RouteDef { path: "/search", view: View::Search, requires_auth: false },
    RouteDef { path: "/introduction", view: View::Introduction, requires_auth: false },
    RouteDef { path: "/resources", view: View::Resources, requires_auth: true },
    RouteDef { path: "/upload", view: View::Upload, requires_auth: true },
];

const NOT_FOUND: RouteDef = RouteDef { path: "/:pathMatch(.*)*", view: View::NotFound, requires_auth: false };

/// Strip query and fragment, ensure a leading slash, drop trailing slashes.
#[must_use]
pub fn normalize_path(raw: &str) -> String {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let trimmed = raw[..end].trim().trim_end_matches('/');
    if trimmed.starts_with('/') { trimmed.to_owned() } else { format!("/{trimmed}") }
}

/// Route for `path`; unknown paths map to the catch-all.
#[must_use]
pub fn resolve(path: &str) -> &'static RouteDef {
    let path = normalize_path(path);
    ROUTES
        .iter()
        .find(|route| route.path == path)
        .unwrap_or(&NOT_FOUND)
}

/// Guard decision for one navigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(&'static str),
}

/// Blocks protected routes when no token is held.
#[derive(Clone)]
pub struct RouteGuard {
    session: Session,
}

impl RouteGuard {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn before_each(&self, to: &RouteDef) -> Navigation {
        if to.requires_auth && !self.session.has_token() {
            tracing::debug!(path = to.path, "protected route without token; redirecting");
            return Navigation::Redirect(LOGIN_PATH);
        }
        Navigation::Proceed
    }
}

/// Where navigation ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub view: View,
    /// Requested path when the guard redirected here.
    pub redirected_from: Option<String>,
}

/// Tracks the current location, applying the guard on every move.
pub struct Router {
    guard: RouteGuard,
    current: Option<Location>,
}

impl Router {
    pub fn new(guard: RouteGuard) -> Self {
        Self { guard, current: None }
    }

    #[must_use]
    pub fn current(&self) -> Option<&Location> {
        self.current.as_ref()
    }

    /// Navigate to `path`, following at most one guard redirect.
    pub fn navigate(&mut self, path: &str) -> &Location {
        let requested = normalize_path(path);
        let target = resolve(&requested);

        let location = match self.guard.before_each(target) {
            Navigation::Proceed => {
                let path = if target.view == View::NotFound { requested } else { target.path.to_owned() };
                Location { path, view: target.view, redirected_from: None }
            }
            Navigation::Redirect(to) => {
                let route = resolve(to);
                Location { path: route.path.to_owned(), view: route.view, redirected_from: Some(requested) }
            }
        };

        tracing::debug!(path = %location.path, view = ?location.view, "navigated");
        self.current.insert(location)
    }
}
