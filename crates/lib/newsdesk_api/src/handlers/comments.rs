//! Comment request handlers.

use axum::http::StatusCode;
use axum::{Extension, Json, extract::State};
use newsdesk_core::models::content::Comment;
use newsdesk_core::policy::AuthContext;
use newsdesk_core::validation::parse_id;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::{ApiResponse, CommentRequest, Listing, PageQuery};
use crate::services::comments;

/// `GET /api/comments/news/{news_id}`
pub async fn news_comments_handler(
    State(state): State<AppState>,
    ApiPath(news_id): ApiPath<String>,
    ApiQuery(paging): ApiQuery<PageQuery>,
) -> AppResult<Json<ApiResponse<Listing<Comment>>>> {
    let news_id = parse_id(&news_id, "news")?;
    let paged = comments::list_for_news(state.store.as_ref(), news_id, paging).await?;
    Ok(Json(ApiResponse::ok("Comments", paged.into())))
}

/// `GET /api/comments/my-comments`
pub async fn my_comments_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiQuery(paging): ApiQuery<PageQuery>,
) -> AppResult<Json<ApiResponse<Listing<Comment>>>> {
    let paged = comments::list_mine(state.store.as_ref(), &ctx, paging).await?;
    Ok(Json(ApiResponse::ok("Your comments", paged.into())))
}

/// `POST /api/comments/news/{news_id}`
pub async fn create_comment_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(news_id): ApiPath<String>,
    ApiJson(body): ApiJson<CommentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Comment>>)> {
    let news_id = parse_id(&news_id, "news")?;
    let comment = comments::create(state.store.as_ref(), &ctx, news_id, &body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Comment added", comment)),
    ))
}

/// `PUT /api/comments/{id}`: owner only.
pub async fn update_comment_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<CommentRequest>,
) -> AppResult<Json<ApiResponse<Comment>>> {
    let id = parse_id(&id, "comment")?;
    let comment = comments::update(state.store.as_ref(), &ctx, id, &body).await?;
    Ok(Json(ApiResponse::ok("Comment updated", comment)))
}

/// `DELETE /api/comments/{id}`: owner or Admin.
pub async fn delete_comment_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    let id = parse_id(&id, "comment")?;
    comments::delete(state.store.as_ref(), &ctx, id).await?;
    Ok(Json(ApiResponse::ok("Comment deleted", ())))
}
