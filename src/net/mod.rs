//! Networking modules for the REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `transport` is the swappable wire layer, `client` adds base URL, default
//! headers and response interception on top of it, `resources` holds the
//! resource endpoints, and `types` defines the shared wire schema.

pub mod client;
pub mod resources;
pub mod transport;
pub mod types;
