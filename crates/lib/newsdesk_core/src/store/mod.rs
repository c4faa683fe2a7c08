//! Record storage.
//!
//! `Store` is the single seam between the domain and persistence. It offers
//! find/insert/update/delete with filtering, newest-first ordering,
//! skip/limit paging and case-insensitive text search. Cascading deletes are
//! one call each so implementations can run them atomically.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::auth::{NewPrincipal, Principal, PrincipalWithPassword, Role};
use crate::models::content::{
    Category, Comment, NewComment, NewNews, News, NewsChanges, NewsStatus,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate value: {0}")]
    Conflict(String),

    #[error("Referenced record not found: {0}")]
    MissingReference(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// One-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    /// Clamp client input: page ≥ 1, limit in `1..=MAX_PAGE_LIMIT`.
    pub fn new(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    /// Number of records to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// A page of records plus the total number matching the filter.
#[derive(Debug, Clone)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: Page,
}

impl<T> Paged<T> {
    /// Total number of pages.
    pub fn pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.page.limit))
    }
}

/// Principal listing filter.
#[derive(Debug, Clone, Default)]
pub struct PrincipalFilter {
    /// Case-insensitive substring of name or email.
    pub search: Option<String>,
    pub role: Option<Role>,
}

/// News listing filter.
#[derive(Debug, Clone, Default)]
pub struct NewsFilter {
    pub status: Option<NewsStatus>,
    pub category: Option<Category>,
    pub author_id: Option<Uuid>,
    /// Case-insensitive substring of title or content.
    pub search: Option<String>,
}

/// Comment listing filter.
#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub news_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
}

/// Record counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counts {
    pub principals: u64,
    pub news: u64,
    pub comments: u64,
}

/// Child records removed by a cascading delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CascadeReport {
    pub news: u64,
    pub comments: u64,
}

/// Persistence operations used by the API.
///
/// `Option` results mean "no record with that id". Lists are newest first.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fails with [`StoreError::Conflict`] if the email is taken.
    async fn insert_principal(&self, new: NewPrincipal) -> StoreResult<Principal>;
    /// Insert a self-registered principal. It is stored as Admin when no
    /// principal exists yet, otherwise with `new.role`. The emptiness check
    /// and the insert are atomic.
    async fn register_principal(&self, new: NewPrincipal) -> StoreResult<Principal>;
    async fn find_principal(&self, id: Uuid) -> StoreResult<Option<Principal>>;
    async fn find_principal_by_email(
        &self,
        email: &str,
    ) -> StoreResult<Option<PrincipalWithPassword>>;
    async fn list_principals(
        &self,
        filter: &PrincipalFilter,
        page: Page,
    ) -> StoreResult<Paged<Principal>>;
    async fn update_principal_role(&self, id: Uuid, role: Role) -> StoreResult<Option<Principal>>;
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<bool>;
    /// Delete a principal, its news, comments on that news and its own
    /// comments, atomically.
    async fn delete_principal(&self, id: Uuid) -> StoreResult<Option<CascadeReport>>;

    /// Fails with [`StoreError::MissingReference`] if the author is gone.
    async fn insert_news(&self, new: NewNews) -> StoreResult<News>;
    async fn find_news(&self, id: Uuid) -> StoreResult<Option<News>>;
    async fn list_news(&self, filter: &NewsFilter, page: Page) -> StoreResult<Paged<News>>;
    async fn update_news(&self, id: Uuid, changes: &NewsChanges) -> StoreResult<Option<News>>;
    async fn set_news_status(&self, id: Uuid, status: NewsStatus) -> StoreResult<Option<News>>;
    /// Increment the view counter and return the updated record.
    async fn record_news_view(&self, id: Uuid) -> StoreResult<Option<News>>;
    /// Delete a news record and its comments, atomically.
    async fn delete_news(&self, id: Uuid) -> StoreResult<Option<CascadeReport>>;

    /// Fails with [`StoreError::MissingReference`] if the news or author is gone.
    async fn insert_comment(&self, new: NewComment) -> StoreResult<Comment>;
    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>>;
    async fn list_comments(
        &self,
        filter: &CommentFilter,
        page: Page,
    ) -> StoreResult<Paged<Comment>>;
    async fn update_comment_content(
        &self,
        id: Uuid,
        content: &str,
    ) -> StoreResult<Option<Comment>>;
    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool>;

    async fn counts(&self) -> StoreResult<Counts>;
}
