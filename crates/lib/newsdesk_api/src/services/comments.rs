//! Comment service.

use newsdesk_core::models::content::{Comment, NewComment};
use newsdesk_core::policy::{AuthContext, Operation, ensure_can_modify};
use newsdesk_core::store::{CommentFilter, Page, Paged, Store};
use newsdesk_core::validation::validate_comment;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{CommentRequest, PageQuery};

/// Default page size for comment listings.
pub const COMMENT_PAGE_LIMIT: u32 = 20;

fn not_found() -> AppError {
    AppError::NotFound("Comment not found".into())
}

async fn ensure_news_exists(store: &dyn Store, news_id: Uuid) -> AppResult<()> {
    match store.find_news(news_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound("News not found".into())),
    }
}

async fn fetch(store: &dyn Store, id: Uuid) -> AppResult<Comment> {
    store.find_comment(id).await?.ok_or_else(not_found)
}

/// Comments on one news record, newest first.
pub async fn list_for_news(
    store: &dyn Store,
    news_id: Uuid,
    paging: PageQuery,
) -> AppResult<Paged<Comment>> {
    ensure_news_exists(store, news_id).await?;
    let filter = CommentFilter {
        news_id: Some(news_id),
        author_id: None,
    };
    let page = Page::new(paging.page, paging.limit, COMMENT_PAGE_LIMIT);
    Ok(store.list_comments(&filter, page).await?)
}

/// The caller's own comments.
pub async fn list_mine(
    store: &dyn Store,
    ctx: &AuthContext,
    paging: PageQuery,
) -> AppResult<Paged<Comment>> {
    let filter = CommentFilter {
        news_id: None,
        author_id: Some(ctx.principal_id),
    };
    let page = Page::new(paging.page, paging.limit, COMMENT_PAGE_LIMIT);
    Ok(store.list_comments(&filter, page).await?)
}

pub async fn create(
    store: &dyn Store,
    ctx: &AuthContext,
    news_id: Uuid,
    req: &CommentRequest,
) -> AppResult<Comment> {
    let content = validate_comment(&req.content)?;
    ensure_news_exists(store, news_id).await?;
    let comment = store
        .insert_comment(NewComment {
            content,
            author_id: ctx.principal_id,
            news_id,
        })
        .await?;
    info!(comment_id = %comment.id, %news_id, "comment created");
    Ok(comment)
}

/// Edit content; owner only.
pub async fn update(
    store: &dyn Store,
    ctx: &AuthContext,
    id: Uuid,
    req: &CommentRequest,
) -> AppResult<Comment> {
    let content = validate_comment(&req.content)?;
    let comment = fetch(store, id).await?;
    ensure_can_modify(ctx, &comment, Operation::Update)?;
    store
        .update_comment_content(id, &content)
        .await?
        .ok_or_else(not_found)
}

/// Owner or Admin.
pub async fn delete(store: &dyn Store, ctx: &AuthContext, id: Uuid) -> AppResult<()> {
    let comment = fetch(store, id).await?;
    ensure_can_modify(ctx, &comment, Operation::Delete)?;
    if !store.delete_comment(id).await? {
        return Err(not_found());
    }
    info!(comment_id = %id, by = %ctx.principal_id, "comment deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use newsdesk_core::models::auth::{NewPrincipal, Role};
    use newsdesk_core::models::content::{Category, NewNews, NewsStatus};
    use newsdesk_core::store::MemoryStore;

    use super::*;

    async fn principal(store: &MemoryStore, name: &str, role: Role) -> AuthContext {
        let p = store
            .insert_principal(NewPrincipal {
                name: name.into(),
                email: format!("{}@example.com", name.to_lowercase()),
                password_hash: "hash".into(),
                role,
            })
            .await
            .unwrap();
        AuthContext::new(p.id, p.role)
    }

    async fn news(store: &MemoryStore, author: &AuthContext) -> Uuid {
        store
            .insert_news(NewNews {
                title: "A headline to comment on".into(),
                content: "x".repeat(80),
                category: Category::General,
                image: None,
                author_id: author.principal_id,
                status: NewsStatus::Published,
            })
            .await
            .unwrap()
            .id
    }

    fn body(content: &str) -> CommentRequest {
        CommentRequest {
            content: content.into(),
        }
    }

    #[tokio::test]
    async fn commenting_on_missing_news_is_404() {
        let store = MemoryStore::new();
        let user = principal(&store, "Ada", Role::User).await;
        assert!(matches!(
            create(&store, &user, Uuid::new_v4(), &body("hello")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            list_for_news(&store, Uuid::new_v4(), PageQuery::default()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn admin_deletes_but_cannot_edit_others_comments() {
        let store = MemoryStore::new();
        let admin = principal(&store, "Ada", Role::Admin).await;
        let user = principal(&store, "Bob", Role::User).await;
        let news_id = news(&store, &admin).await;
        let comment = create(&store, &user, news_id, &body("first")).await.unwrap();

        assert!(matches!(
            update(&store, &admin, comment.id, &body("edited")).await,
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(fetch(&store, comment.id).await.unwrap().content, "first");

        delete(&store, &admin, comment.id).await.unwrap();
        assert!(matches!(
            fetch(&store, comment.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn moderator_cannot_delete_others_comments() {
        let store = MemoryStore::new();
        let moderator = principal(&store, "Mod", Role::Moderator).await;
        let user = principal(&store, "Bob", Role::User).await;
        let news_id = news(&store, &moderator).await;
        let comment = create(&store, &user, news_id, &body("mine")).await.unwrap();

        assert!(matches!(
            delete(&store, &moderator, comment.id).await,
            Err(AppError::Forbidden(_))
        ));
        let edited = update(&store, &user, comment.id, &body("  still mine  ")).await.unwrap();
        assert_eq!(edited.content, "still mine");
    }

    #[tokio::test]
    async fn my_comments_lists_only_the_callers() {
        let store = MemoryStore::new();
        let ada = principal(&store, "Ada", Role::User).await;
        let bob = principal(&store, "Bob", Role::User).await;
        let news_id = news(&store, &ada).await;
        create(&store, &ada, news_id, &body("one")).await.unwrap();
        create(&store, &bob, news_id, &body("two")).await.unwrap();
        create(&store, &ada, news_id, &body("three")).await.unwrap();

        let mine = list_mine(&store, &ada, PageQuery::default()).await.unwrap();
        assert_eq!(mine.total, 2);
        assert_eq!(mine.items[0].content, "three");
        let all = list_for_news(&store, news_id, PageQuery::default()).await.unwrap();
        assert_eq!(all.total, 3);
    }
}
