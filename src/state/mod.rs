//! Client-side session state.
//!
//! DESIGN
//! ======
//! `token_store` is the durable mirror of the token, `session` is the single
//! in-memory authority shared by the HTTP client and the route guard, and
//! `auth` exposes the login/register/logout/profile operations on top of it.

pub mod auth;
pub mod session;
pub mod token_store;
