//! Business flows behind the handlers.
//!
//! Services take the store and the caller's [`AuthContext`] explicitly so
//! they can be driven without HTTP.
//!
//! [`AuthContext`]: newsdesk_core::policy::AuthContext

pub mod admin;
pub mod auth;
pub mod comments;
pub mod news;

/// Trim a free-text search term; empty means "no search".
pub(crate) fn search_term(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
