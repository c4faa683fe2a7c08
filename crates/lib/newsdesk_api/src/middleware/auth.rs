//! Authentication gate and role gate.
//!
//! `require_auth` turns a bearer token into an [`AuthContext`] in the request
//! extensions. `require_role` reads that context and checks it against an
//! allow-list. Layer the role gate inside the auth gate.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use newsdesk_core::policy::{AuthContext, PolicyError, RoleSet, authorize_role};
use newsdesk_core::store::Store;
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()))?
        .trim();
    if token.is_empty() {
        return Err(AppError::Unauthorized("Missing bearer token".into()));
    }
    Ok(token)
}

/// Axum middleware: verifies the bearer token, looks the principal up once
/// and injects its [`AuthContext`] into request extensions.
///
/// A valid token for a principal that no longer exists is a 404.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal_id = state.tokens.verify(bearer_token(request.headers())?)?;

    let principal = state
        .store
        .find_principal(principal_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    debug!(principal_id = %principal.id, role = %principal.role, "request authenticated");
    request
        .extensions_mut()
        .insert(AuthContext::new(principal.id, principal.role));

    Ok(next.run(request).await)
}

/// State for [`require_role`]: the allowed roles plus a store handle for
/// contexts whose role was not resolved by the auth gate.
#[derive(Clone)]
pub struct RoleGate {
    store: Arc<dyn Store>,
    allowed: RoleSet,
}

impl RoleGate {
    pub fn new(state: &AppState, allowed: RoleSet) -> Self {
        Self {
            store: state.store.clone(),
            allowed,
        }
    }
}

/// Axum middleware: 401 without an [`AuthContext`], 404 if the principal is
/// gone, 403 if its role is not in the gate's allow-list.
pub async fn require_role(
    State(gate): State<RoleGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = request
        .extensions()
        .get::<AuthContext>()
        .copied()
        .ok_or(PolicyError::Unauthenticated)?;

    let role = match ctx.role {
        Some(role) => role,
        None => {
            let principal = gate
                .store
                .find_principal(ctx.principal_id)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found".into()))?;
            request
                .extensions_mut()
                .insert(AuthContext::new(principal.id, principal.role));
            principal.role
        }
    };

    if let Err(e) = authorize_role(role, gate.allowed) {
        debug!(principal_id = %ctx.principal_id, %role, allowed = %gate.allowed, "role rejected");
        return Err(e.into());
    }
    Ok(next.run(request).await)
}
