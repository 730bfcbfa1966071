//! Bearer-token enforcement (§6A) and the `/health` exemption.

mod common;

use axum_test::TestServer;
use http::StatusCode;

#[tokio::test]
async fn missing_token_is_rejected_when_configured() {
    let server = TestServer::new(common::test_app_with_token("s3cr3t").await).unwrap();
    let response = server.get("/scim/Users").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "401");
    assert!(body["schemas"][0]
        .as_str()
        .unwrap()
        .contains("api:messages:2.0:Error"));
}

#[tokio::test]
async fn wrong_token_is_rejected() {
    let server = TestServer::new(common::test_app_with_token("s3cr3t").await).unwrap();
    let response = server
        .get("/scim/Users")
        .add_header("Authorization", "Bearer wrong")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn correct_token_is_accepted() {
    let server = TestServer::new(common::test_app_with_token("s3cr3t").await).unwrap();
    let response = server
        .get("/scim/Users")
        .add_header("Authorization", "Bearer s3cr3t")
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn health_is_exempt_from_auth() {
    let server = TestServer::new(common::test_app_with_token("s3cr3t").await).unwrap();
    server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn unauthenticated_deployment_requires_no_token() {
    let server = TestServer::new(common::test_app().await).unwrap();
    server.get("/scim/Users").await.assert_status_ok();
}
