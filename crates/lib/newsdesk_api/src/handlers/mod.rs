//! Request handlers.
//!
//! Handlers only extract, delegate to `services` and wrap the result in the
//! response envelope.

pub mod admin;
pub mod auth;
pub mod comments;
pub mod news;
