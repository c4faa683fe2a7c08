//! Authentication request handlers.

use axum::http::StatusCode;
use axum::{Extension, Json, extract::State};
use newsdesk_core::models::auth::Principal;
use newsdesk_core::policy::AuthContext;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::ApiJson;
use crate::models::{
    AccessTokenPayload, ApiResponse, AuthPayload, LoginRequest, RefreshRequest, RegisterRequest,
};
use crate::services::auth;

/// `POST /api/auth/register`: create an account and sign in.
pub async fn register_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthPayload>>)> {
    let payload = auth::register(state.store.as_ref(), &state.tokens, &body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Registration successful", payload)),
    ))
}

/// `POST /api/auth/login`: authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthPayload>>> {
    let payload = auth::login(
        state.store.as_ref(),
        &state.tokens,
        state.cipher.as_ref(),
        &body,
    )
    .await?;
    Ok(Json(ApiResponse::ok("Login successful", payload)))
}

/// `POST /api/auth/refresh`: exchange a refresh token for an access token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> AppResult<Json<ApiResponse<AccessTokenPayload>>> {
    let payload = auth::refresh(state.store.as_ref(), &state.tokens, &body.refresh_token).await?;
    Ok(Json(ApiResponse::ok("Token refreshed", payload)))
}

/// `GET /api/auth/profile`: the caller's own record.
pub async fn profile_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> AppResult<Json<ApiResponse<Principal>>> {
    let principal = auth::profile(state.store.as_ref(), ctx.principal_id).await?;
    Ok(Json(ApiResponse::ok("Profile", principal)))
}
