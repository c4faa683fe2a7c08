//! News service: public listings, editorial writes and ownership checks.

use newsdesk_core::models::content::{NewNews, News, NewsStatus};
use newsdesk_core::policy::{AuthContext, Operation, ensure_can_modify};
use newsdesk_core::store::{CascadeReport, NewsFilter, Page, Paged, Store};
use newsdesk_core::validation::{
    parse_category, parse_id, parse_status, validate_news_changes, validate_news_draft,
};
use tracing::info;
use uuid::Uuid;

use super::search_term;
use crate::error::{AppError, AppResult};
use crate::models::{
    AdminNewsQuery, CreateNewsRequest, NewsQuery, NewsStatusRequest, PageQuery, UpdateNewsRequest,
};

/// Default page size for news listings.
pub const NEWS_PAGE_LIMIT: u32 = 10;

/// Default page size for admin listings.
pub const ADMIN_PAGE_LIMIT: u32 = 20;

fn not_found() -> AppError {
    AppError::NotFound("News not found".into())
}

async fn fetch(store: &dyn Store, id: Uuid) -> AppResult<News> {
    store.find_news(id).await?.ok_or_else(not_found)
}

/// Published news, optionally filtered by category and search text.
pub async fn list_published(store: &dyn Store, query: &NewsQuery) -> AppResult<Paged<News>> {
    let filter = NewsFilter {
        status: Some(NewsStatus::Published),
        category: parse_category(query.category.as_deref())?,
        author_id: None,
        search: search_term(query.search.as_deref()),
    };
    let page = Page::new(query.page, query.limit, NEWS_PAGE_LIMIT);
    Ok(store.list_news(&filter, page).await?)
}

/// Published news in one category.
pub async fn list_by_category(
    store: &dyn Store,
    category: &str,
    paging: PageQuery,
) -> AppResult<Paged<News>> {
    let category = parse_category(Some(category))?
        .ok_or_else(|| AppError::Validation("Invalid category".into()))?;
    let filter = NewsFilter {
        status: Some(NewsStatus::Published),
        category: Some(category),
        ..Default::default()
    };
    let page = Page::new(paging.page, paging.limit, NEWS_PAGE_LIMIT);
    Ok(store.list_news(&filter, page).await?)
}

/// The caller's own news in any status.
pub async fn list_mine(
    store: &dyn Store,
    ctx: &AuthContext,
    paging: PageQuery,
) -> AppResult<Paged<News>> {
    let filter = NewsFilter {
        author_id: Some(ctx.principal_id),
        ..Default::default()
    };
    let page = Page::new(paging.page, paging.limit, NEWS_PAGE_LIMIT);
    Ok(store.list_news(&filter, page).await?)
}

/// Fetch one news record and count the view.
pub async fn view(store: &dyn Store, id: Uuid) -> AppResult<News> {
    store.record_news_view(id).await?.ok_or_else(not_found)
}

/// Create a published news record owned by the caller.
pub async fn create(
    store: &dyn Store,
    ctx: &AuthContext,
    req: &CreateNewsRequest,
) -> AppResult<News> {
    let draft = validate_news_draft(
        &req.title,
        &req.content,
        req.category.as_deref(),
        req.image.as_deref(),
    )?;
    let news = store
        .insert_news(NewNews {
            title: draft.title,
            content: draft.content,
            category: draft.category,
            image: draft.image,
            author_id: ctx.principal_id,
            status: NewsStatus::Published,
        })
        .await?;
    info!(news_id = %news.id, author_id = %ctx.principal_id, "news created");
    Ok(news)
}

/// Partial update; owner only.
pub async fn update(
    store: &dyn Store,
    ctx: &AuthContext,
    id: Uuid,
    req: &UpdateNewsRequest,
) -> AppResult<News> {
    let changes = validate_news_changes(
        req.title.as_deref(),
        req.content.as_deref(),
        req.category.as_deref(),
        req.image.as_deref(),
    )?;
    let news = fetch(store, id).await?;
    ensure_can_modify(ctx, &news, Operation::Update)?;
    store.update_news(id, &changes).await?.ok_or_else(not_found)
}

/// Publish or unpublish. Gated by role, not ownership.
pub async fn set_status(
    store: &dyn Store,
    id: Uuid,
    req: &NewsStatusRequest,
) -> AppResult<News> {
    let status = parse_status(&req.status)?;
    let news = store.set_news_status(id, status).await?.ok_or_else(not_found)?;
    info!(news_id = %id, status = %status, "news status changed");
    Ok(news)
}

/// Delete a news record and its comments; owner or Admin.
pub async fn delete(store: &dyn Store, ctx: &AuthContext, id: Uuid) -> AppResult<CascadeReport> {
    let news = fetch(store, id).await?;
    ensure_can_modify(ctx, &news, Operation::Delete)?;
    let report = store.delete_news(id).await?.ok_or_else(not_found)?;
    info!(
        news_id = %id,
        by = %ctx.principal_id,
        comments = report.comments,
        "news deleted"
    );
    Ok(report)
}

/// Every news record in any status, for administrators.
pub async fn admin_list(store: &dyn Store, query: &AdminNewsQuery) -> AppResult<Paged<News>> {
    let author_id = match query.author.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(parse_id(raw, "author")?),
        _ => None,
    };
    let filter = NewsFilter {
        status: None,
        category: parse_category(query.category.as_deref())?,
        author_id,
        search: search_term(query.search.as_deref()),
    };
    let page = Page::new(query.page, query.limit, ADMIN_PAGE_LIMIT);
    Ok(store.list_news(&filter, page).await?)
}
