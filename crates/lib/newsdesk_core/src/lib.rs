//! # newsdesk_core
//!
//! Core domain logic for Newsdesk: models, authentication primitives,
//! authorization policy, input validation and record storage.

pub mod auth;
pub mod migrate;
pub mod models;
pub mod policy;
pub mod store;
pub mod uuid;
pub mod validation;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
