// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Onboarding state machine tests, driven through the router.
//!
//! These tests verify that:
//! 1. Users without a completed onboarding are sent to the onboarding route
//! 2. The onboarding route never redirects to itself
//! 3. Completing onboarding persists, refreshes claims and then redirects
//! 4. A stale pre-completion token does not trap the user in onboarding

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use event_console::models::UserMetadata;
use std::sync::atomic::Ordering;
use tower::ServiceExt;

mod common;

use common::{body_json, create_test_app, identity_user, onboarded_metadata, session_token, TestApp};

async fn get(app: &TestApp, uri: &str, token: &str) -> Response {
    app.router
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header(header::COOKIE, format!("__session={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn submit(app: &TestApp, token: &str, display_name: &str) -> Response {
    app.router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/onboarding")
                .header(header::COOKIE, format!("__session={}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({ "display_name": display_name }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

fn new_session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("__session="))
        .map(|v| {
            v.trim_start_matches("__session=")
                .split(';')
                .next()
                .unwrap_or("")
                .to_string()
        })
}

fn new_user_app() -> TestApp {
    let app = create_test_app();
    app.identity
        .add_user(identity_user("user_1", "Nia", "Young", "nia@example.com"));
    app
}

#[tokio::test]
async fn test_nyc_events_onboarding_scenario() {
    let app = new_user_app();
    let stale_token = app.token_for("user_1");

    // Not onboarded: the home page redirects to onboarding
    let response = get(&app, "/", &stale_token).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/onboarding");

    // Submit the display name
    let response = submit(&app, &stale_token, "NYC Events").await;
    assert_eq!(response.status(), StatusCode::OK);
    let refreshed = new_session_cookie(&response).expect("refreshed session cookie");
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["redirect_to"], "/");
    assert_eq!(body["display_name"], "NYC Events");

    // Metadata now records the completion
    let metadata = app.identity.user("user_1").unwrap().metadata;
    assert_eq!(
        serde_json::to_value(&metadata).unwrap(),
        serde_json::json!({"displayName": "NYC Events", "onboardingComplete": true})
    );
    assert_eq!(app.identity.refreshes.load(Ordering::SeqCst), 1);

    // The refreshed session reaches home
    let response = get(&app, "/", &refreshed).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["display_name"], "NYC Events");

    // So does the stale one: its NEW claim is re-checked, not trusted
    let response = get(&app, "/", &stale_token).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_onboarding_route_does_not_loop() {
    let app = new_user_app();
    let token = app.token_for("user_1");

    let response = get(&app, "/onboarding", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["state"], "NEW");
    assert_eq!(body["suggested_name"], "Nia");
}

#[tokio::test]
async fn test_completed_user_is_sent_away_from_onboarding() {
    let app = new_user_app();
    app.identity
        .set_metadata("user_1", onboarded_metadata("NYC Events"));
    let token = app.token_for("user_1");

    for method in ["GET", "POST"] {
        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri("/onboarding")
                    .header(header::COOKIE, format!("__session={}", token))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"display_name":"Again"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{method}");
        assert_eq!(location(&response), "/");
    }
    assert_eq!(app.identity.metadata_writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_api_routes_are_gated_too() {
    let app = new_user_app();
    let token = app.token_for("user_1");

    let response = get(&app, "/api/collection", &token).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/onboarding");
    assert!(app.cms.calls().is_empty());
}

#[tokio::test]
async fn test_blank_display_name_rejected() {
    let app = new_user_app();
    let token = app.token_for("user_1");

    let response = submit(&app, &token, "   ").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_failed");
    assert_eq!(body["fields"][0]["field"], "display_name");
    assert_eq!(app.identity.metadata_writes.load(Ordering::SeqCst), 0);
    assert_eq!(app.identity.user("user_1").unwrap().metadata, UserMetadata::default());
}

#[tokio::test]
async fn test_unpersisted_completion_does_not_redirect() {
    let app = new_user_app();
    app.identity
        .drop_metadata_writes
        .store(true, Ordering::SeqCst);
    let token = app.token_for("user_1");

    let response = submit(&app, &token, "NYC Events").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = body_json(response).await;
    assert_eq!(body["error"], "identity_error");
    assert!(body.get("redirect_to").is_none());
}

#[tokio::test]
async fn test_completion_pushes_display_name_to_mirror() {
    let app = new_user_app();
    let token = app.token_for("user_1");

    let response = submit(&app, &token, "  NYC Events  ").await;
    assert_eq!(response.status(), StatusCode::OK);

    let items = app.cms.items("users-col");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].str_field("name"), Some("NYC Events"));
    assert_eq!(items[0].str_field("full-name"), Some("Nia Young"));
}

#[tokio::test]
async fn test_mirror_failure_does_not_block_onboarding() {
    let app = new_user_app();
    app.cms.fail_lists(true);
    let token = app.token_for("user_1");

    let response = submit(&app, &token, "NYC Events").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(app
        .identity
        .user("user_1")
        .unwrap()
        .metadata
        .is_onboarding_complete());
}

#[tokio::test]
async fn test_token_without_session_id_still_completes() {
    let app = new_user_app();
    let token = event_console::middleware::auth::create_session_token(
        "user_1",
        None,
        &UserMetadata::default(),
        &common::signing_key(),
    )
    .unwrap();

    let response = submit(&app, &token, "NYC Events").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(new_session_cookie(&response).is_none());
    assert_eq!(app.identity.refreshes.load(Ordering::SeqCst), 0);

    // Fresh state is read back from the provider
    let response = get(&app, "/", &session_token("user_1", &UserMetadata::default())).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_confirmed_completion_is_not_refetched() {
    let app = new_user_app();
    app.identity
        .set_metadata("user_1", onboarded_metadata("NYC Events"));
    // Token without the metadata claim, as the provider issues by default
    let token = session_token("user_1", &UserMetadata::default());

    for _ in 0..3 {
        let response = get(&app, "/", &token).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(app.identity.user_reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_new_state_is_always_rechecked() {
    let app = new_user_app();
    let token = app.token_for("user_1");

    for _ in 0..2 {
        let response = get(&app, "/", &token).await;
        assert_eq!(location(&response), "/onboarding");
    }
    assert_eq!(app.identity.user_reads.load(Ordering::SeqCst), 2);

    // Completing onboarding is remembered without another lookup
    let response = submit(&app, &token, "NYC Events").await;
    assert_eq!(response.status(), StatusCode::OK);
    let reads = app.identity.user_reads.load(Ordering::SeqCst);

    let response = get(&app, "/", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.identity.user_reads.load(Ordering::SeqCst), reads);
}
