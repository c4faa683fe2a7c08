//! News request handlers.

use axum::http::StatusCode;
use axum::{Extension, Json, extract::State};
use newsdesk_core::models::content::News;
use newsdesk_core::policy::AuthContext;
use newsdesk_core::validation::parse_id;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::{
    ApiResponse, CreateNewsRequest, DeletionSummary, Listing, NewsQuery, NewsStatusRequest,
    PageQuery, UpdateNewsRequest,
};
use crate::services::news;

/// `GET /api/news`: published news, newest first.
pub async fn list_news_handler(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<NewsQuery>,
) -> AppResult<Json<ApiResponse<Listing<News>>>> {
    let paged = news::list_published(state.store.as_ref(), &query).await?;
    Ok(Json(ApiResponse::ok("News list", paged.into())))
}

/// `GET /api/news/category/{category}`
pub async fn news_by_category_handler(
    State(state): State<AppState>,
    ApiPath(category): ApiPath<String>,
    ApiQuery(paging): ApiQuery<PageQuery>,
) -> AppResult<Json<ApiResponse<Listing<News>>>> {
    let paged = news::list_by_category(state.store.as_ref(), &category, paging).await?;
    Ok(Json(ApiResponse::ok(format!("{category} news"), paged.into())))
}

/// `GET /api/news/my/news`: the caller's news in any status.
pub async fn my_news_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiQuery(paging): ApiQuery<PageQuery>,
) -> AppResult<Json<ApiResponse<Listing<News>>>> {
    let paged = news::list_mine(state.store.as_ref(), &ctx, paging).await?;
    Ok(Json(ApiResponse::ok("Your news", paged.into())))
}

/// `GET /api/news/{id}`: one news record; counts a view.
pub async fn get_news_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> AppResult<Json<ApiResponse<News>>> {
    let id = parse_id(&id, "news")?;
    let news = news::view(state.store.as_ref(), id).await?;
    Ok(Json(ApiResponse::ok("News detail", news)))
}

/// `POST /api/news`: Moderator or Admin.
pub async fn create_news_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(body): ApiJson<CreateNewsRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<News>>)> {
    let news = news::create(state.store.as_ref(), &ctx, &body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("News created", news)),
    ))
}

/// `PUT /api/news/{id}`: owner only.
pub async fn update_news_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<UpdateNewsRequest>,
) -> AppResult<Json<ApiResponse<News>>> {
    let id = parse_id(&id, "news")?;
    let news = news::update(state.store.as_ref(), &ctx, id, &body).await?;
    Ok(Json(ApiResponse::ok("News updated", news)))
}

/// `PATCH /api/news/{id}/status`: Moderator or Admin.
pub async fn news_status_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<NewsStatusRequest>,
) -> AppResult<Json<ApiResponse<News>>> {
    let id = parse_id(&id, "news")?;
    let news = news::set_status(state.store.as_ref(), id, &body).await?;
    Ok(Json(ApiResponse::ok("News status changed", news)))
}

/// `DELETE /api/news/{id}` and `DELETE /api/admin/news/{id}`: owner or Admin.
pub async fn delete_news_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<String>,
) -> AppResult<Json<ApiResponse<DeletionSummary>>> {
    let id = parse_id(&id, "news")?;
    let report = news::delete(state.store.as_ref(), &ctx, id).await?;
    Ok(Json(ApiResponse::ok("News deleted", report.into())))
}
