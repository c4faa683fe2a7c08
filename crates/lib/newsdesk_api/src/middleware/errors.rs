//! Top-level error normalization.
//!
//! Server-side failures hide their cause from clients. The cause travels in
//! the response extensions as [`InternalErrorDetail`]; this middleware logs
//! it and, in development only, copies it into the body.

use axum::{
    Json,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::config::Environment;
use crate::error::AppError;
use crate::models::ErrorResponse;

/// Cause of a 5xx response, attached by [`AppError`]'s `IntoResponse`.
#[derive(Debug, Clone)]
pub struct InternalErrorDetail {
    pub body: ErrorResponse,
    pub detail: String,
}

/// Axum middleware: log 5xx causes and expose them in development.
pub async fn normalize_errors(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let mut response = next.run(request).await;

    let Some(InternalErrorDetail { body, detail }) =
        response.extensions_mut().remove::<InternalErrorDetail>()
    else {
        return response;
    };

    let status = response.status();
    error!(%method, path, status = status.as_u16(), detail, "request failed");

    if environment.is_development() {
        return (status, Json(body.with_detail(detail))).into_response();
    }
    response
}

/// Fallback for unknown routes.
pub async fn not_found() -> AppError {
    AppError::NotFound("Route not found".into())
}
