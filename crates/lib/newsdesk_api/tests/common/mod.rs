//! Shared helpers for the HTTP integration tests. Every test runs against an
//! in-memory store so no database is needed.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use newsdesk_api::config::{ApiConfig, Environment};
use newsdesk_api::{AppState, router};
use newsdesk_core::auth::jwt::TokenLifetimes;
use newsdesk_core::models::auth::Role;
use newsdesk_core::store::{MemoryStore, Store};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

pub const SECRET: &str = "0123456789abcdef0123456789abcdef";

pub fn config(environment: Environment) -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        pg_connection_url: "postgres://unused".into(),
        jwt_secret: SECRET.into(),
        token_lifetimes: TokenLifetimes::default(),
        crypto_secret_key: None,
        environment,
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

/// A registered principal with its access token.
pub struct Session {
    pub id: Uuid,
    pub token: String,
    pub refresh_token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let shared: Arc<dyn Store> = store.clone();
        let state = AppState::new(shared, config(Environment::Production)).expect("state");
        Self {
            router: router(state),
            store,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let req = builder.body(body).expect("request");
        let resp = self.router.clone().oneshot(req).await.expect("response");
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("parse JSON")
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn register(&self, name: &str) -> Session {
        let (status, json) = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "name": name,
                    "email": format!("{}@example.com", name.to_lowercase()),
                    "password": "secret1",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {name}: {json}");
        let data = &json["data"];
        Session {
            id: data["user"]["id"]
                .as_str()
                .and_then(|s| s.parse().ok())
                .expect("user id"),
            token: data["accessToken"].as_str().expect("access token").into(),
            refresh_token: data["refreshToken"].as_str().expect("refresh token").into(),
        }
    }

    /// Role changes go straight to the store so tests can set up any mix.
    pub async fn grant(&self, session: &Session, role: Role) {
        self.store
            .update_principal_role(session.id, role)
            .await
            .expect("update role")
            .expect("principal exists");
    }

    /// Create a published news record, returning its id.
    pub async fn publish(&self, session: &Session, title: &str) -> String {
        let (status, json) = self
            .send(
                Method::POST,
                "/api/news",
                Some(&session.token),
                Some(json!({
                    "title": title,
                    "content": "A body long enough to pass validation for a news article.",
                    "category": "technology",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "publish: {json}");
        json["data"]["id"].as_str().expect("news id").into()
    }

    pub async fn comment(&self, session: &Session, news_id: &str, content: &str) -> String {
        let (status, json) = self
            .send(
                Method::POST,
                &format!("/api/comments/news/{news_id}"),
                Some(&session.token),
                Some(json!({ "content": content })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "comment: {json}");
        json["data"]["id"].as_str().expect("comment id").into()
    }
}

/// Assert the error envelope shape and return the error code.
pub fn error_code(json: &Value) -> &str {
    assert_eq!(json["success"], Value::Bool(false), "not an error: {json}");
    assert!(json["message"].is_string(), "missing message: {json}");
    json["error"].as_str().expect("error code")
}
