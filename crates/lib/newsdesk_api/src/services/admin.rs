//! Administration service: dashboard, principal management.
//!
//! Every flow here sits behind the Admin role gate; the self-action and
//! admin-admin rules still apply on top of it.

use newsdesk_core::models::auth::{Principal, Role};
use newsdesk_core::policy::{AuthContext, ensure_can_delete_principal, ensure_not_self};
use newsdesk_core::store::{CascadeReport, NewsFilter, Page, Paged, PrincipalFilter, Store};
use newsdesk_core::validation::ValidationErrors;
use tracing::info;
use uuid::Uuid;

use super::news::ADMIN_PAGE_LIMIT;
use super::search_term;
use crate::error::{AppError, AppResult};
use crate::models::{AdminUsersQuery, Dashboard, DashboardCounts, RoleRequest};

/// Number of recent principals and news shown on the dashboard.
const RECENT_COUNT: u32 = 5;

fn not_found() -> AppError {
    AppError::NotFound("User not found".into())
}

fn parse_role(raw: &str) -> Result<Role, ValidationErrors> {
    raw.trim().parse().map_err(|_| {
        let allowed: Vec<&str> = Role::ALL.iter().map(|r| r.as_str()).collect();
        ValidationErrors::single(format!("Invalid role; expected one of: {}", allowed.join(", ")))
    })
}

pub async fn dashboard(store: &dyn Store) -> AppResult<Dashboard> {
    let counts = store.counts().await?;
    let recent = Page::new(Some(1), Some(RECENT_COUNT), RECENT_COUNT);
    let recent_users = store
        .list_principals(&PrincipalFilter::default(), recent)
        .await?
        .items;
    let recent_news = store.list_news(&NewsFilter::default(), recent).await?.items;

    Ok(Dashboard {
        counts: DashboardCounts {
            users: counts.principals,
            news: counts.news,
            comments: counts.comments,
        },
        recent_users,
        recent_news,
    })
}

pub async fn list_users(store: &dyn Store, query: &AdminUsersQuery) -> AppResult<Paged<Principal>> {
    let role = match query.role.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(parse_role(raw)?),
        _ => None,
    };
    let filter = PrincipalFilter {
        search: search_term(query.search.as_deref()),
        role,
    };
    let page = Page::new(query.page, query.limit, ADMIN_PAGE_LIMIT);
    Ok(store.list_principals(&filter, page).await?)
}

/// Delete a principal with everything it owns.
///
/// Checked in order: self (403), absent (404), Admin target (403).
pub async fn delete_user(
    store: &dyn Store,
    ctx: &AuthContext,
    id: Uuid,
) -> AppResult<CascadeReport> {
    ensure_not_self(ctx, id, "delete")?;
    let target = store.find_principal(id).await?.ok_or_else(not_found)?;
    ensure_can_delete_principal(ctx, &target)?;

    let report = store.delete_principal(id).await?.ok_or_else(not_found)?;
    info!(
        principal_id = %id,
        by = %ctx.principal_id,
        news = report.news,
        comments = report.comments,
        "principal deleted"
    );
    Ok(report)
}

/// Change another principal's role.
///
/// Checked in order: role value (400), self (403), absent (404).
pub async fn change_role(
    store: &dyn Store,
    ctx: &AuthContext,
    id: Uuid,
    req: &RoleRequest,
) -> AppResult<Principal> {
    let role = parse_role(&req.role)?;
    ensure_not_self(ctx, id, "change the role of")?;
    let principal = store
        .update_principal_role(id, role)
        .await?
        .ok_or_else(not_found)?;
    info!(principal_id = %id, %role, by = %ctx.principal_id, "role changed");
    Ok(principal)
}
