//! Domain models shared by the store, policy and API layers.

pub mod auth;
pub mod content;
