//! Quantified properties from §8 exercised end-to-end over HTTP: case-
//! insensitive comparisons, `pr` on a missing/empty list, and the schemas
//! field on every envelope.

mod common;

use axum_test::TestServer;
use http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn pr_is_false_on_missing_and_empty_list_attributes() {
    let server = TestServer::new(common::test_app().await).unwrap();
    server
        .post("/scim/Users")
        .json(&json!({"userName": "noemail@co.com", "emails": []}))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/scim/Users")
        .json(&json!({"userName": "alsonoemail@co.com"}))
        .await
        .assert_status(StatusCode::CREATED);

    let found = server
        .get("/scim/Users")
        .add_query_param("filter", "emails pr")
        .await;
    found.assert_status_ok();
    let found: serde_json::Value = found.json();
    assert_eq!(found["totalResults"], 0);
}

#[tokio::test]
async fn list_response_carries_the_list_schema_uri() {
    let server = TestServer::new(common::test_app().await).unwrap();
    let response = server.get("/scim/Users").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(
        body["schemas"][0],
        "urn:ietf:params:scim:api:messages:2.0:ListResponse"
    );
}

#[tokio::test]
async fn error_envelope_carries_the_error_schema_uri() {
    let server = TestServer::new(common::test_app().await).unwrap();
    let response = server.get("/scim/Users/missing").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(
        body["schemas"][0],
        "urn:ietf:params:scim:api:messages:2.0:Error"
    );
}

#[tokio::test]
async fn eq_compare_is_symmetric_under_case_folding() {
    let server = TestServer::new(common::test_app().await).unwrap();
    server
        .post("/scim/Users")
        .json(&common::user_json("MixedCase@Co.com", "M", "Case"))
        .await
        .assert_status(StatusCode::CREATED);

    let upper = server
        .get("/scim/Users")
        .add_query_param("filter", "userName eq \"MIXEDCASE@CO.COM\"")
        .await;
    let lower = server
        .get("/scim/Users")
        .add_query_param("filter", "userName eq \"mixedcase@co.com\"")
        .await;
    let upper: serde_json::Value = upper.json();
    let lower: serde_json::Value = lower.json();
    assert_eq!(upper["totalResults"], 1);
    assert_eq!(lower["totalResults"], 1);
}
