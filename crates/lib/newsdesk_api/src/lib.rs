//! # newsdesk_api
//!
//! HTTP API library for Newsdesk.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, patch, post, put};
use newsdesk_core::auth::AuthError;
use newsdesk_core::auth::cipher::SecretCipher;
use newsdesk_core::auth::jwt::TokenService;
use newsdesk_core::policy::RoleSet;
use newsdesk_core::store::Store;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{admin, auth, comments, news};
use crate::middleware::auth::{RoleGate, require_auth, require_role};
use crate::middleware::errors::{normalize_errors, not_found};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Record storage.
    pub store: Arc<dyn Store>,
    /// API configuration.
    pub config: ApiConfig,
    pub tokens: TokenService,
    /// Present only when `CRYPTO_SECRET_KEY` is configured.
    pub cipher: Option<SecretCipher>,
}

impl AppState {
    /// Build the state, failing on a weak JWT secret or an unusable cipher key.
    pub fn new(store: Arc<dyn Store>, config: ApiConfig) -> Result<Self, AuthError> {
        let tokens = TokenService::new(&config.jwt_secret, config.token_lifetimes)?;
        let cipher = config
            .crypto_secret_key
            .as_deref()
            .map(SecretCipher::new)
            .transpose()?;
        Ok(Self {
            store,
            config,
            tokens,
            cipher,
        })
    }
}

/// Run embedded database migrations.
///
/// Delegates to `newsdesk_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    newsdesk_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/refresh", post(auth::refresh_handler))
        .route("/api/news", get(news::list_news_handler))
        .route(
            "/api/news/category/{category}",
            get(news::news_by_category_handler),
        )
        .route("/api/news/{id}", get(news::get_news_handler))
        .route(
            "/api/comments/news/{news_id}",
            get(comments::news_comments_handler),
        );

    // Any authenticated principal
    let authenticated = Router::new()
        .route("/api/auth/profile", get(auth::profile_handler))
        .route("/api/news/my/news", get(news::my_news_handler))
        .route(
            "/api/news/{id}",
            put(news::update_news_handler).delete(news::delete_news_handler),
        )
        .route(
            "/api/comments/my-comments",
            get(comments::my_comments_handler),
        )
        .route(
            "/api/comments/news/{news_id}",
            post(comments::create_comment_handler),
        )
        .route(
            "/api/comments/{id}",
            put(comments::update_comment_handler).delete(comments::delete_comment_handler),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    // Moderator or Admin
    let editorial = Router::new()
        .route("/api/news", post(news::create_news_handler))
        .route("/api/news/{id}/status", patch(news::news_status_handler))
        .route_layer(from_fn_with_state(
            RoleGate::new(&state, RoleSet::MODERATOR_OR_ADMIN),
            require_role,
        ))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    // Admin only
    let admin_only = Router::new()
        .route("/api/admin/dashboard", get(admin::dashboard_handler))
        .route("/api/admin/users", get(admin::list_users_handler))
        .route("/api/admin/users/{id}", delete(admin::delete_user_handler))
        .route(
            "/api/admin/users/{id}/role",
            put(admin::change_role_handler),
        )
        .route("/api/admin/news", get(admin::list_news_handler))
        .route("/api/admin/news/{id}", delete(news::delete_news_handler))
        .route_layer(from_fn_with_state(
            RoleGate::new(&state, RoleSet::ADMIN),
            require_role,
        ))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(authenticated)
        .merge(editorial)
        .merge(admin_only)
        .fallback(not_found)
        .layer(from_fn_with_state(
            state.config.environment,
            normalize_errors,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
