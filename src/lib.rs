//! # resource-hub
//!
//! Client for the course resource sharing site. Owns the session lifecycle:
//! how a bearer token is acquired, persisted, attached to outgoing requests,
//! invalidated on `401` responses, and how route access is gated on it.
//!
//! This crate contains the HTTP client and its transport seam, the session
//! and auth stores, the route table and guard, and the bootstrap that wires
//! them together. The `resource-hub` binary is a thin CLI over these pieces.

pub mod app;
pub mod config;
pub mod net;
pub mod routes;
pub mod state;
