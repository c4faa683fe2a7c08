//! Public news and comment listings, status changes and error envelopes.

mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, error_code};
use newsdesk_core::models::auth::Role;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn drafts_are_hidden_from_public_listings() {
    let app = TestApp::new();
    let ada = app.register("Ada").await;
    let shown = app.publish(&ada, "Shown to everyone").await;
    let hidden = app.publish(&ada, "Pulled back to draft").await;

    let (status, json) = app
        .send(
            Method::PATCH,
            &format!("/api/news/{hidden}/status"),
            Some(&ada.token),
            Some(json!({ "status": "draft" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "draft");

    let (status, json) = app.get("/api/news", None).await;
    assert_eq!(status, StatusCode::OK);
    let items = json["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], shown.as_str());
    assert_eq!(json["data"]["pagination"]["total"], 1);

    let (_, json) = app.get("/api/news/category/technology", None).await;
    assert_eq!(json["data"]["pagination"]["total"], 1);

    let (_, json) = app.get("/api/news/my/news", Some(&ada.token)).await;
    assert_eq!(json["data"]["pagination"]["total"], 2);

    let (_, json) = app.get("/api/admin/news", Some(&ada.token)).await;
    assert_eq!(json["data"]["pagination"]["total"], 2);
}

#[tokio::test]
async fn listing_paginates_newest_first() {
    let app = TestApp::new();
    let ada = app.register("Ada").await;
    for i in 0..3 {
        app.publish(&ada, &format!("Headline number {i}")).await;
    }

    let (status, json) = app.get("/api/news?page=2&limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["pagination"]["page"], 2);
    assert_eq!(json["data"]["pagination"]["limit"], 2);
    assert_eq!(json["data"]["pagination"]["total"], 3);
    assert_eq!(json["data"]["pagination"]["pages"], 2);
    let items = json["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Headline number 0");

    let (_, json) = app.get("/api/news?search=NUMBER%202", None).await;
    assert_eq!(json["data"]["pagination"]["total"], 1);
}

#[tokio::test]
async fn viewing_news_counts_views_and_embeds_author() {
    let app = TestApp::new();
    let ada = app.register("Ada").await;
    let id = app.publish(&ada, "Counting views").await;

    app.get(&format!("/api/news/{id}"), None).await;
    let (status, json) = app.get(&format!("/api/news/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["views"], 2);
    assert_eq!(json["data"]["author"]["name"], "Ada");
    assert_eq!(json["data"]["author"]["email"], "ada@example.com");
}

#[tokio::test]
async fn invalid_ids_and_categories_are_400() {
    let app = TestApp::new();
    let ada = app.register("Ada").await;

    let (status, json) = app.get("/api/news/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&json), "validation_error");

    let (status, _) = app.get("/api/comments/news/12345", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/news/category/gossip", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/news",
            Some(&ada.token),
            Some(json!({
                "title": "Bad category",
                "content": "A body long enough to pass validation for a news article.",
                "category": "gossip",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_records_are_404() {
    let app = TestApp::new();
    let ada = app.register("Ada").await;
    let ghost = Uuid::new_v4();

    let (status, json) = app.get(&format!("/api/news/{ghost}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&json), "not_found");

    let (status, _) = app.get(&format!("/api/comments/news/{ghost}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/comments/news/{ghost}"),
            Some(&ada.token),
            Some(json!({ "content": "into the void" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/news/{ghost}/status"),
            Some(&ada.token),
            Some(json!({ "status": "published" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_route_gets_the_error_envelope() {
    let app = TestApp::new();
    let (status, json) = app.get("/api/nothing/here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&json), "not_found");
    assert_eq!(json["message"], "Route not found");
    assert!(json.get("detail").is_none());
}

#[tokio::test]
async fn comments_are_listed_per_news_and_per_author() {
    let app = TestApp::new();
    let ada = app.register("Ada").await;
    let bob = app.register("Bob").await;
    app.grant(&bob, Role::Moderator).await;
    let first = app.publish(&ada, "First story").await;
    let second = app.publish(&bob, "Second story").await;

    app.comment(&bob, &first, "bob on first").await;
    app.comment(&bob, &second, "bob on second").await;
    app.comment(&ada, &first, "ada on first").await;

    let (status, json) = app.get(&format!("/api/comments/news/{first}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let items = json["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["content"], "ada on first");
    assert_eq!(items[0]["author"]["name"], "Ada");

    let (_, json) = app.get("/api/comments/my-comments", Some(&bob.token)).await;
    assert_eq!(json["data"]["pagination"]["total"], 2);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/comments/news/{first}"),
            Some(&bob.token),
            Some(json!({ "content": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn partial_news_update_keeps_other_fields() {
    let app = TestApp::new();
    let ada = app.register("Ada").await;
    let id = app.publish(&ada, "Before the edit").await;

    let (status, json) = app
        .send(
            Method::PUT,
            &format!("/api/news/{id}"),
            Some(&ada.token),
            Some(json!({ "category": "sports" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["title"], "Before the edit");
    assert_eq!(json["data"]["category"], "sports");
}

#[tokio::test]
async fn empty_image_in_update_removes_it() {
    let app = TestApp::new();
    let ada = app.register("Ada").await;
    let id = app.publish(&ada, "Illustrated story").await;
    let uri = format!("/api/news/{id}");

    let (status, json) = app
        .send(
            Method::PUT,
            &uri,
            Some(&ada.token),
            Some(json!({ "image": "https://cdn.example.com/cover.jpg" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["image"], "https://cdn.example.com/cover.jpg");

    let (status, json) = app
        .send(Method::PUT, &uri, Some(&ada.token), Some(json!({ "image": "" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"]["image"].is_null());
}
