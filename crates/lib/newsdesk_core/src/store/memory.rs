//! In-process store.
//!
//! Backs tests and `--in-memory` development runs. All tables sit behind one
//! `RwLock`, so every operation (cascades included) is atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    CascadeReport, CommentFilter, Counts, NewsFilter, Page, Paged, PrincipalFilter, Store,
    StoreError, StoreResult,
};
use crate::models::auth::{NewPrincipal, Principal, PrincipalWithPassword, Role};
use crate::models::content::{
    AuthorSummary, Category, Comment, NewComment, NewNews, News, NewsChanges, NewsStatus,
};
use crate::uuid::new_id;

#[derive(Debug, Clone)]
struct PrincipalRow {
    principal: Principal,
    password_hash: String,
}

#[derive(Debug, Clone)]
struct NewsRow {
    id: Uuid,
    title: String,
    content: String,
    category: Category,
    image: Option<String>,
    author_id: Uuid,
    views: i64,
    status: NewsStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CommentRow {
    id: Uuid,
    content: String,
    author_id: Uuid,
    news_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    principals: HashMap<Uuid, PrincipalRow>,
    news: HashMap<Uuid, NewsRow>,
    comments: HashMap<Uuid, CommentRow>,
}

impl Tables {
    fn author(&self, id: Uuid) -> StoreResult<AuthorSummary> {
        let row = self
            .principals
            .get(&id)
            .ok_or_else(|| StoreError::InvalidData(format!("dangling author reference {id}")))?;
        Ok(AuthorSummary {
            id,
            name: row.principal.name.clone(),
            email: row.principal.email.clone(),
        })
    }

    fn news_view(&self, row: &NewsRow) -> StoreResult<News> {
        Ok(News {
            id: row.id,
            title: row.title.clone(),
            content: row.content.clone(),
            category: row.category,
            image: row.image.clone(),
            author: self.author(row.author_id)?,
            views: row.views,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn comment_view(&self, row: &CommentRow) -> StoreResult<Comment> {
        Ok(Comment {
            id: row.id,
            content: row.content.clone(),
            author: self.author(row.author_id)?,
            news_id: row.news_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn insert_principal(&mut self, new: NewPrincipal) -> StoreResult<Principal> {
        if self
            .principals
            .values()
            .any(|row| row.principal.email == new.email)
        {
            return Err(StoreError::Conflict(format!("email {}", new.email)));
        }
        let now = Utc::now();
        let principal = Principal {
            id: new_id(),
            name: new.name,
            email: new.email,
            role: new.role,
            created_at: now,
            updated_at: now,
        };
        self.principals.insert(
            principal.id,
            PrincipalRow {
                principal: principal.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(principal)
    }

    /// Remove a news record and its comments; returns comments removed.
    fn remove_news(&mut self, id: Uuid) -> u64 {
        self.news.remove(&id);
        let before = self.comments.len();
        self.comments.retain(|_, c| c.news_id != id);
        (before - self.comments.len()) as u64
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Sort newest first (id breaks ties; ids are time-ordered) and cut a page.
fn paginate<T>(mut rows: Vec<(DateTime<Utc>, Uuid, T)>, page: Page) -> Paged<T> {
    rows.sort_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));
    let total = rows.len() as u64;
    let items = rows
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .map(|(_, _, item)| item)
        .collect();
    Paged { items, total, page }
}

/// Store that keeps all records in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_principal(&self, new: NewPrincipal) -> StoreResult<Principal> {
        let mut tables = self.tables.write().await;
        tables.insert_principal(new)
    }

    async fn register_principal(&self, mut new: NewPrincipal) -> StoreResult<Principal> {
        let mut tables = self.tables.write().await;
        if tables.principals.is_empty() {
            new.role = Role::Admin;
        }
        tables.insert_principal(new)
    }

    async fn find_principal(&self, id: Uuid) -> StoreResult<Option<Principal>> {
        let tables = self.tables.read().await;
        Ok(tables.principals.get(&id).map(|row| row.principal.clone()))
    }

    async fn find_principal_by_email(
        &self,
        email: &str,
    ) -> StoreResult<Option<PrincipalWithPassword>> {
        let tables = self.tables.read().await;
        Ok(tables
            .principals
            .values()
            .find(|row| row.principal.email == email)
            .map(|row| PrincipalWithPassword {
                principal: row.principal.clone(),
                password_hash: row.password_hash.clone(),
            }))
    }

    async fn list_principals(
        &self,
        filter: &PrincipalFilter,
        page: Page,
    ) -> StoreResult<Paged<Principal>> {
        let tables = self.tables.read().await;
        let rows = tables
            .principals
            .values()
            .map(|row| &row.principal)
            .filter(|p| filter.role.is_none_or(|role| p.role == role))
            .filter(|p| {
                filter
                    .search
                    .as_deref()
                    .is_none_or(|s| contains_ci(&p.name, s) || contains_ci(&p.email, s))
            })
            .map(|p| (p.created_at, p.id, p.clone()))
            .collect();
        Ok(paginate(rows, page))
    }

    async fn update_principal_role(&self, id: Uuid, role: Role) -> StoreResult<Option<Principal>> {
        let mut tables = self.tables.write().await;
        Ok(tables.principals.get_mut(&id).map(|row| {
            row.principal.role = role;
            row.principal.updated_at = Utc::now();
            row.principal.clone()
        }))
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(match tables.principals.get_mut(&id) {
            Some(row) => {
                row.password_hash = password_hash.to_string();
                row.principal.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn delete_principal(&self, id: Uuid) -> StoreResult<Option<CascadeReport>> {
        let mut tables = self.tables.write().await;
        if tables.principals.remove(&id).is_none() {
            return Ok(None);
        }
        let owned_news: Vec<Uuid> = tables
            .news
            .values()
            .filter(|n| n.author_id == id)
            .map(|n| n.id)
            .collect();
        let mut report = CascadeReport {
            news: owned_news.len() as u64,
            comments: 0,
        };
        for news_id in owned_news {
            report.comments += tables.remove_news(news_id);
        }
        let before = tables.comments.len();
        tables.comments.retain(|_, c| c.author_id != id);
        report.comments += (before - tables.comments.len()) as u64;
        Ok(Some(report))
    }

    async fn insert_news(&self, new: NewNews) -> StoreResult<News> {
        let mut tables = self.tables.write().await;
        if !tables.principals.contains_key(&new.author_id) {
            return Err(StoreError::MissingReference(format!(
                "author {}",
                new.author_id
            )));
        }
        let now = Utc::now();
        let row = NewsRow {
            id: new_id(),
            title: new.title,
            content: new.content,
            category: new.category,
            image: new.image,
            author_id: new.author_id,
            views: 0,
            status: new.status,
            created_at: now,
            updated_at: now,
        };
        let news = tables.news_view(&row)?;
        tables.news.insert(row.id, row);
        Ok(news)
    }

    async fn find_news(&self, id: Uuid) -> StoreResult<Option<News>> {
        let tables = self.tables.read().await;
        tables.news.get(&id).map(|row| tables.news_view(row)).transpose()
    }

    async fn list_news(&self, filter: &NewsFilter, page: Page) -> StoreResult<Paged<News>> {
        let tables = self.tables.read().await;
        let rows = tables
            .news
            .values()
            .filter(|n| filter.status.is_none_or(|s| n.status == s))
            .filter(|n| filter.category.is_none_or(|c| n.category == c))
            .filter(|n| filter.author_id.is_none_or(|a| n.author_id == a))
            .filter(|n| {
                filter
                    .search
                    .as_deref()
                    .is_none_or(|s| contains_ci(&n.title, s) || contains_ci(&n.content, s))
            })
            .map(|n| Ok((n.created_at, n.id, tables.news_view(n)?)))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(paginate(rows, page))
    }

    async fn update_news(&self, id: Uuid, changes: &NewsChanges) -> StoreResult<Option<News>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.news.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = &changes.title {
            row.title = title.clone();
        }
        if let Some(content) = &changes.content {
            row.content = content.clone();
        }
        if let Some(category) = changes.category {
            row.category = category;
        }
        if let Some(image) = &changes.image {
            row.image = image.clone();
        }
        row.updated_at = Utc::now();
        let row = row.clone();
        tables.news_view(&row).map(Some)
    }

    async fn set_news_status(&self, id: Uuid, status: NewsStatus) -> StoreResult<Option<News>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.news.get_mut(&id) else {
            return Ok(None);
        };
        row.status = status;
        row.updated_at = Utc::now();
        let row = row.clone();
        tables.news_view(&row).map(Some)
    }

    async fn record_news_view(&self, id: Uuid) -> StoreResult<Option<News>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.news.get_mut(&id) else {
            return Ok(None);
        };
        row.views += 1;
        let row = row.clone();
        tables.news_view(&row).map(Some)
    }

    async fn delete_news(&self, id: Uuid) -> StoreResult<Option<CascadeReport>> {
        let mut tables = self.tables.write().await;
        if !tables.news.contains_key(&id) {
            return Ok(None);
        }
        let comments = tables.remove_news(id);
        Ok(Some(CascadeReport { news: 1, comments }))
    }

    async fn insert_comment(&self, new: NewComment) -> StoreResult<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.news.contains_key(&new.news_id) {
            return Err(StoreError::MissingReference(format!("news {}", new.news_id)));
        }
        if !tables.principals.contains_key(&new.author_id) {
            return Err(StoreError::MissingReference(format!(
                "author {}",
                new.author_id
            )));
        }
        let now = Utc::now();
        let row = CommentRow {
            id: new_id(),
            content: new.content,
            author_id: new.author_id,
            news_id: new.news_id,
            created_at: now,
            updated_at: now,
        };
        let comment = tables.comment_view(&row)?;
        tables.comments.insert(row.id, row);
        Ok(comment)
    }

    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        let tables = self.tables.read().await;
        tables
            .comments
            .get(&id)
            .map(|row| tables.comment_view(row))
            .transpose()
    }

    async fn list_comments(
        &self,
        filter: &CommentFilter,
        page: Page,
    ) -> StoreResult<Paged<Comment>> {
        let tables = self.tables.read().await;
        let rows = tables
            .comments
            .values()
            .filter(|c| filter.news_id.is_none_or(|n| c.news_id == n))
            .filter(|c| filter.author_id.is_none_or(|a| c.author_id == a))
            .map(|c| Ok((c.created_at, c.id, tables.comment_view(c)?)))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(paginate(rows, page))
    }

    async fn update_comment_content(
        &self,
        id: Uuid,
        content: &str,
    ) -> StoreResult<Option<Comment>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.comments.get_mut(&id) else {
            return Ok(None);
        };
        row.content = content.to_string();
        row.updated_at = Utc::now();
        let row = row.clone();
        tables.comment_view(&row).map(Some)
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.comments.remove(&id).is_some())
    }

    async fn counts(&self) -> StoreResult<Counts> {
        let tables = self.tables.read().await;
        Ok(Counts {
            principals: tables.principals.len() as u64,
            news: tables.news.len() as u64,
            comments: tables.comments.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn principal(store: &MemoryStore, name: &str, role: Role) -> Principal {
        store
            .insert_principal(NewPrincipal {
                name: name.into(),
                email: format!("{}@example.com", name.to_lowercase()),
                password_hash: "hash".into(),
                role,
            })
            .await
            .unwrap()
    }

    async fn news(store: &MemoryStore, author: Uuid, title: &str) -> News {
        store
            .insert_news(NewNews {
                title: title.into(),
                content: "x".repeat(60),
                category: Category::Technology,
                image: None,
                author_id: author,
                status: NewsStatus::Published,
            })
            .await
            .unwrap()
    }

    async fn comment(store: &MemoryStore, author: Uuid, news_id: Uuid) -> Comment {
        store
            .insert_comment(NewComment {
                content: "comment".into(),
                author_id: author,
                news_id,
            })
            .await
            .unwrap()
    }

    fn registration(name: &str) -> NewPrincipal {
        NewPrincipal {
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            password_hash: "hash".into(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn only_the_first_registration_is_promoted() {
        let store = MemoryStore::new();
        let first = store.register_principal(registration("Ada")).await.unwrap();
        let second = store.register_principal(registration("Bob")).await.unwrap();
        assert_eq!(first.role, Role::Admin);
        assert_eq!(second.role, Role::User);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        principal(&store, "Ada", Role::User).await;
        let err = store
            .insert_principal(NewPrincipal {
                name: "Other".into(),
                email: "ada@example.com".into(),
                password_hash: "hash".into(),
                role: Role::User,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn news_carries_author_summary() {
        let store = MemoryStore::new();
        let ada = principal(&store, "Ada", Role::Moderator).await;
        let n = news(&store, ada.id, "Compilers for everyone").await;
        assert_eq!(n.author.id, ada.id);
        assert_eq!(n.author.email, "ada@example.com");
        assert_eq!(store.find_news(n.id).await.unwrap(), Some(n));
    }

    #[tokio::test]
    async fn image_can_be_set_kept_and_cleared() {
        let store = MemoryStore::new();
        let ada = principal(&store, "Ada", Role::Moderator).await;
        let n = news(&store, ada.id, "Pictures worth a thousand words").await;
        let url = "https://cdn.example.com/a.jpg".to_string();

        let set = NewsChanges {
            image: Some(Some(url.clone())),
            ..Default::default()
        };
        let updated = store.update_news(n.id, &set).await.unwrap().unwrap();
        assert_eq!(updated.image.as_deref(), Some(url.as_str()));

        let retitle = NewsChanges {
            title: Some("Still has a picture".into()),
            ..Default::default()
        };
        let updated = store.update_news(n.id, &retitle).await.unwrap().unwrap();
        assert_eq!(updated.image.as_deref(), Some(url.as_str()));

        let clear = NewsChanges {
            image: Some(None),
            ..Default::default()
        };
        let updated = store.update_news(n.id, &clear).await.unwrap().unwrap();
        assert_eq!(updated.image, None);
    }

    #[tokio::test]
    async fn news_for_unknown_author_is_rejected() {
        let store = MemoryStore::new();
        let err = store
            .insert_news(NewNews {
                title: "Orphaned headline".into(),
                content: "x".repeat(60),
                category: Category::General,
                image: None,
                author_id: Uuid::new_v4(),
                status: NewsStatus::Published,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingReference(_)));
    }

    #[tokio::test]
    async fn list_news_filters_and_pages_newest_first() {
        let store = MemoryStore::new();
        let ada = principal(&store, "Ada", Role::Moderator).await;
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(news(&store, ada.id, &format!("Rust release {i} notes")).await.id);
        }
        let draft = news(&store, ada.id, "Unpublished draft piece").await;
        store
            .set_news_status(draft.id, NewsStatus::Draft)
            .await
            .unwrap();

        let filter = NewsFilter {
            status: Some(NewsStatus::Published),
            search: Some("RUST".into()),
            ..Default::default()
        };
        let first = store
            .list_news(&filter, Page::new(Some(1), Some(2), 10))
            .await
            .unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.pages(), 3);
        assert_eq!(first.items[0].id, ids[4]);
        assert_eq!(first.items[1].id, ids[3]);

        let last = store
            .list_news(&filter, Page::new(Some(3), Some(2), 10))
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].id, ids[0]);
    }

    #[tokio::test]
    async fn record_view_increments_counter() {
        let store = MemoryStore::new();
        let ada = principal(&store, "Ada", Role::Admin).await;
        let n = news(&store, ada.id, "Counting the views").await;
        store.record_news_view(n.id).await.unwrap();
        let updated = store.record_news_view(n.id).await.unwrap().unwrap();
        assert_eq!(updated.views, 2);
        assert!(store.record_news_view(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_news_cascades_comments() {
        let store = MemoryStore::new();
        let ada = principal(&store, "Ada", Role::Moderator).await;
        let bob = principal(&store, "Bob", Role::User).await;
        let n = news(&store, ada.id, "Comments will vanish").await;
        let keep = news(&store, ada.id, "Comments will remain").await;
        comment(&store, bob.id, n.id).await;
        comment(&store, ada.id, n.id).await;
        let kept = comment(&store, bob.id, keep.id).await;

        let report = store.delete_news(n.id).await.unwrap().unwrap();
        assert_eq!(report, CascadeReport { news: 1, comments: 2 });
        assert!(store.find_news(n.id).await.unwrap().is_none());
        assert!(store.find_comment(kept.id).await.unwrap().is_some());
        assert_eq!(store.counts().await.unwrap().comments, 1);
        assert!(store.delete_news(n.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_principal_cascades_everything_they_own() {
        let store = MemoryStore::new();
        let ada = principal(&store, "Ada", Role::Moderator).await;
        let bob = principal(&store, "Bob", Role::User).await;
        let ada_news = news(&store, ada.id, "Ada writes about Rust").await;
        let bob_news = news(&store, bob.id, "Bob writes about Go").await;
        comment(&store, bob.id, ada_news.id).await;
        comment(&store, ada.id, bob_news.id).await;
        comment(&store, bob.id, bob_news.id).await;

        let report = store.delete_principal(ada.id).await.unwrap().unwrap();
        assert_eq!(report, CascadeReport { news: 1, comments: 2 });

        let by_ada = store
            .list_news(
                &NewsFilter {
                    author_id: Some(ada.id),
                    ..Default::default()
                },
                Page::new(None, None, 10),
            )
            .await
            .unwrap();
        assert_eq!(by_ada.total, 0);
        let ada_comments = store
            .list_comments(
                &CommentFilter {
                    author_id: Some(ada.id),
                    ..Default::default()
                },
                Page::new(None, None, 10),
            )
            .await
            .unwrap();
        assert_eq!(ada_comments.total, 0);
        assert_eq!(
            store.counts().await.unwrap(),
            Counts {
                principals: 1,
                news: 1,
                comments: 1
            }
        );
    }

    #[tokio::test]
    async fn principal_listing_filters_by_role_and_search() {
        let store = MemoryStore::new();
        principal(&store, "Ada", Role::Admin).await;
        principal(&store, "Bob", Role::User).await;
        principal(&store, "Bobby", Role::Moderator).await;

        let users = store
            .list_principals(
                &PrincipalFilter {
                    search: Some("bob".into()),
                    role: None,
                },
                Page::new(None, None, 20),
            )
            .await
            .unwrap();
        assert_eq!(users.total, 2);

        let moderators = store
            .list_principals(
                &PrincipalFilter {
                    search: None,
                    role: Some(Role::Moderator),
                },
                Page::new(None, None, 20),
            )
            .await
            .unwrap();
        assert_eq!(moderators.items.len(), 1);
        assert_eq!(moderators.items[0].name, "Bobby");
    }
}
