//! Admin request handlers. All routes here sit behind the Admin role gate.

use axum::{Extension, Json, extract::State};
use newsdesk_core::models::auth::Principal;
use newsdesk_core::models::content::News;
use newsdesk_core::policy::AuthContext;
use newsdesk_core::validation::parse_id;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::{
    AdminNewsQuery, AdminUsersQuery, ApiResponse, Dashboard, DeletionSummary, Listing, RoleRequest,
};
use crate::services::{admin, news};

/// `GET /api/admin/dashboard`
pub async fn dashboard_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Dashboard>>> {
    let board = admin::dashboard(state.store.as_ref()).await?;
    Ok(Json(ApiResponse::ok("Dashboard", board)))
}

/// `GET /api/admin/users`
pub async fn list_users_handler(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AdminUsersQuery>,
) -> AppResult<Json<ApiResponse<Listing<Principal>>>> {
    let paged = admin::list_users(state.store.as_ref(), &query).await?;
    Ok(Json(ApiResponse::ok("Users", paged.into())))
}

/// `DELETE /api/admin/users/{id}`: cascades the user's news and comments.
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<String>,
) -> AppResult<Json<ApiResponse<DeletionSummary>>> {
    let id = parse_id(&id, "user")?;
    let report = admin::delete_user(state.store.as_ref(), &ctx, id).await?;
    Ok(Json(ApiResponse::ok("User deleted", report.into())))
}

/// `PUT /api/admin/users/{id}/role`
pub async fn change_role_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<RoleRequest>,
) -> AppResult<Json<ApiResponse<Principal>>> {
    let id = parse_id(&id, "user")?;
    let principal = admin::change_role(state.store.as_ref(), &ctx, id, &body).await?;
    Ok(Json(ApiResponse::ok("Role updated", principal)))
}

/// `GET /api/admin/news`: all news in any status.
pub async fn list_news_handler(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AdminNewsQuery>,
) -> AppResult<Json<ApiResponse<Listing<News>>>> {
    let paged = news::admin_list(state.store.as_ref(), &query).await?;
    Ok(Json(ApiResponse::ok("All news", paged.into())))
}
