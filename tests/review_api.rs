//! Rejection-path tests for the review endpoint group.
//!
//! Every request here must be refused before the handler touches
//! persistence: missing or malformed credentials, wrong capability, or an
//! out-of-range grade. The happy paths are covered by the unit tests on the
//! aggregator and by the repository layer against a real database.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

fn post_review(token: Option<&str>, payload: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/reviews")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    builder.body(Body::from(payload.to_string())).unwrap()
}

fn delete_review(token: Option<&str>, review_id: i32) -> Request<Body> {
    let mut builder = Request::builder()
        .method("DELETE")
        .uri(format!("/reviews/{review_id}"));
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    builder.body(Body::empty()).unwrap()
}

fn review_payload(grade: i32) -> serde_json::Value {
    json!({ "product_id": 1, "comment": "Works as advertised", "grade": grade })
}

#[tokio::test]
async fn create_review_without_token_is_unauthorized() {
    let app = common::test_app();

    let response = app.oneshot(post_review(None, review_payload(4))).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_review_with_malformed_token_is_unauthorized() {
    let app = common::test_app();

    let response = app
        .oneshot(post_review(Some("Bearer not-a-jwt"), review_payload(4)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_review_requires_buyer_capability() {
    let app = common::test_app();
    let token = common::bearer_token(1, "site_admin", "admin");

    let response = app
        .oneshot(post_review(Some(&token), review_payload(4)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn delete_review_requires_admin_capability() {
    let app = common::test_app();
    let token = common::bearer_token(2, "casual_buyer", "buyer");

    let response = app.oneshot(delete_review(Some(&token), 1)).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn delete_review_without_token_is_unauthorized() {
    let app = common::test_app();

    let response = app.oneshot(delete_review(None, 1)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn grade_zero_is_rejected_before_persistence() {
    let app = common::test_app();
    let token = common::bearer_token(2, "casual_buyer", "buyer");

    let response = app
        .oneshot(post_review(Some(&token), review_payload(0)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["success"], json!(false));
}

#[tokio::test]
async fn grade_six_is_rejected_before_persistence() {
    let app = common::test_app();
    let token = common::bearer_token(2, "casual_buyer", "buyer");

    let response = app
        .oneshot(post_review(Some(&token), review_payload(6)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
