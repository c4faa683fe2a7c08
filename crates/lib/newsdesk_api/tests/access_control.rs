//! Role gates, ownership rules and the admin self-protection rules.

mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, error_code};
use newsdesk_core::models::auth::Role;
use newsdesk_core::store::Store;
use serde_json::json;

#[tokio::test]
async fn users_cannot_publish_news() {
    let app = TestApp::new();
    app.register("Ada").await;
    let bob = app.register("Bob").await;

    let (status, json) = app
        .send(
            Method::POST,
            "/api/news",
            Some(&bob.token),
            Some(json!({
                "title": "Not allowed",
                "content": "A body long enough to pass validation for a news article.",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&json), "forbidden");
}

#[tokio::test]
async fn moderator_is_kept_out_of_admin_routes() {
    let app = TestApp::new();
    app.register("Ada").await;
    let moe = app.register("Moe").await;
    app.grant(&moe, Role::Moderator).await;

    for uri in ["/api/admin/dashboard", "/api/admin/users", "/api/admin/news"] {
        let (status, json) = app.get(uri, Some(&moe.token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(error_code(&json), "forbidden");
    }

    // Moderators may still publish.
    app.publish(&moe, "Moderated headline").await;
}

#[tokio::test]
async fn admin_cannot_change_own_role() {
    let app = TestApp::new();
    let ada = app.register("Ada").await;

    for role in ["User", "Moderator", "Admin"] {
        let (status, _) = app
            .send(
                Method::PUT,
                &format!("/api/admin/users/{}/role", ada.id),
                Some(&ada.token),
                Some(json!({ "role": role })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{role}");
    }
    let stored = app.store.find_principal(ada.id).await.unwrap().unwrap();
    assert_eq!(stored.role, Role::Admin);
}

#[tokio::test]
async fn role_change_validates_the_role() {
    let app = TestApp::new();
    let ada = app.register("Ada").await;
    let bob = app.register("Bob").await;

    let uri = format!("/api/admin/users/{}/role", bob.id);
    let (status, json) = app
        .send(Method::PUT, &uri, Some(&ada.token), Some(json!({ "role": "admin" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&json), "validation_error");

    let (status, json) = app
        .send(Method::PUT, &uri, Some(&ada.token), Some(json!({ "role": "Moderator" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["role"], "Moderator");

    // The promoted user now passes the editorial gate with the same token.
    app.publish(&bob, "Freshly promoted").await;
}

#[tokio::test]
async fn admins_cannot_delete_admins_or_themselves() {
    let app = TestApp::new();
    let ada = app.register("Ada").await;
    let eve = app.register("Eve").await;
    app.grant(&eve, Role::Admin).await;

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/admin/users/{}", eve.id),
            Some(&ada.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/admin/users/{}", ada.id),
            Some(&ada.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(app.store.find_principal(eve.id).await.unwrap().is_some());
}

#[tokio::test]
async fn deleting_a_user_cascades_their_content() {
    let app = TestApp::new();
    let ada = app.register("Ada").await;
    let bob = app.register("Bob").await;
    app.grant(&bob, Role::Moderator).await;

    let bobs_news = app.publish(&bob, "Bob writes").await;
    let adas_news = app.publish(&ada, "Ada writes").await;
    app.comment(&ada, &bobs_news, "comment on bob's news").await;
    app.comment(&bob, &adas_news, "bob comments on ada").await;
    app.comment(&ada, &adas_news, "ada comments on ada").await;

    let (status, json) = app
        .send(
            Method::DELETE,
            &format!("/api/admin/users/{}", bob.id),
            Some(&ada.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["deletedNews"], 1);
    assert_eq!(json["data"]["deletedComments"], 2);

    let (_, json) = app.get("/api/admin/dashboard", Some(&ada.token)).await;
    assert_eq!(json["data"]["counts"]["users"], 1);
    assert_eq!(json["data"]["counts"]["news"], 1);
    assert_eq!(json["data"]["counts"]["comments"], 1);

    let (status, _) = app.get("/api/auth/profile", Some(&bob.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_owner_cannot_edit_or_delete_news() {
    let app = TestApp::new();
    let ada = app.register("Ada").await;
    let moe = app.register("Moe").await;
    app.grant(&moe, Role::Moderator).await;
    let news_id = app.publish(&ada, "Ada's headline").await;

    let uri = format!("/api/news/{news_id}");
    let (status, _) = app
        .send(Method::PUT, &uri, Some(&moe.token), Some(json!({ "title": "Hijacked headline" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send(Method::DELETE, &uri, Some(&moe.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["title"], "Ada's headline");
}

#[tokio::test]
async fn admin_may_delete_others_news_but_not_edit_it() {
    let app = TestApp::new();
    let ada = app.register("Ada").await;
    let moe = app.register("Moe").await;
    app.grant(&moe, Role::Moderator).await;
    let news_id = app.publish(&moe, "Moe's headline").await;
    app.comment(&moe, &news_id, "first").await;

    let uri = format!("/api/news/{news_id}");
    let (status, _) = app
        .send(Method::PUT, &uri, Some(&ada.token), Some(json!({ "title": "Edited by admin" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = app
        .send(
            Method::DELETE,
            &format!("/api/admin/news/{news_id}"),
            Some(&ada.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["deletedComments"], 1);

    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_the_author_edits_a_comment() {
    let app = TestApp::new();
    let ada = app.register("Ada").await;
    let bob = app.register("Bob").await;
    let carl = app.register("Carl").await;
    let news_id = app.publish(&ada, "Discuss this").await;
    let comment_id = app.comment(&bob, &news_id, "bob's take").await;

    let uri = format!("/api/comments/{comment_id}");
    let (status, _) = app
        .send(Method::PUT, &uri, Some(&carl.token), Some(json!({ "content": "carl's take" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send(Method::DELETE, &uri, Some(&carl.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = app
        .send(Method::PUT, &uri, Some(&bob.token), Some(json!({ "content": "bob, revised" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["content"], "bob, revised");

    let (status, _) = app.send(Method::DELETE, &uri, Some(&ada.token), None).await;
    assert_eq!(status, StatusCode::OK);
}
