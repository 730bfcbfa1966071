//! The six literal scenarios from §8.

mod common;

use axum_test::TestServer;
use http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn create_then_fetch() {
    let server = TestServer::new(common::test_app().await).unwrap();

    let body = json!({
        "userName": "jdoe@co.com",
        "name": {"familyName": "Doe", "givenName": "J"},
        "emails": [{"value": "jdoe@co.com", "primary": true, "type": "work"}],
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"]
    });
    let created = server.post("/scim/Users").json(&body).await;
    created.assert_status(StatusCode::CREATED);
    let created: serde_json::Value = created.json();
    let id = created["id"].as_str().unwrap();
    assert!(created.get("password").is_none());

    let fetched = server.get(&format!("/scim/Users/{}", id)).await;
    fetched.assert_status_ok();
    let fetched: serde_json::Value = fetched.json();
    assert_eq!(fetched["userName"], "jdoe@co.com");
    assert!(fetched.get("password").is_none());
}

#[tokio::test]
async fn duplicate_create_is_conflict() {
    let server = TestServer::new(common::test_app().await).unwrap();
    let body = common::user_json("jdoe@co.com", "J", "Doe");

    server.post("/scim/Users").json(&body).await.assert_status(StatusCode::CREATED);
    let dup = server.post("/scim/Users").json(&body).await;
    dup.assert_status(StatusCode::CONFLICT);
    let dup: serde_json::Value = dup.json();
    assert_eq!(
        dup["schemas"][0],
        "urn:ietf:params:scim:api:messages:2.0:Error"
    );
}

#[tokio::test]
async fn duplicate_create_is_conflict_case_insensitively() {
    let server = TestServer::new(common::test_app().await).unwrap();
    server
        .post("/scim/Users")
        .json(&common::user_json("jdoe@co.com", "J", "Doe"))
        .await
        .assert_status(StatusCode::CREATED);
    let dup = server
        .post("/scim/Users")
        .json(&common::user_json("JDOE@CO.COM", "J", "Doe"))
        .await;
    dup.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn search_is_case_insensitive() {
    let server = TestServer::new(common::test_app().await).unwrap();
    server
        .post("/scim/Users")
        .json(&common::user_json("jdoe@co.com", "J", "Doe"))
        .await
        .assert_status(StatusCode::CREATED);

    let found = server
        .get("/scim/Users")
        .add_query_param("filter", "userName eq \"JDOE@CO.COM\"")
        .await;
    found.assert_status_ok();
    let found: serde_json::Value = found.json();
    assert_eq!(found["totalResults"], 1);
    assert_eq!(found["Resources"][0]["userName"], "jdoe@co.com");
}

#[tokio::test]
async fn unparsable_filter_is_bad_request() {
    let server = TestServer::new(common::test_app().await).unwrap();
    let response = server
        .get("/scim/Users")
        .add_query_param("filter", "userName equals \"x\"")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(
        body["schemas"][0],
        "urn:ietf:params:scim:api:messages:2.0:Error"
    );
}

#[tokio::test]
async fn group_patch_add_then_remove_by_value_filter() {
    let server = TestServer::new(common::test_app().await).unwrap();

    let u1 = server
        .post("/scim/Users")
        .json(&common::user_json("u1@co.com", "One", "User"))
        .await
        .json::<serde_json::Value>()["id"]
        .as_str()
        .unwrap()
        .to_string();
    let u2 = server
        .post("/scim/Users")
        .json(&common::user_json("u2@co.com", "Two", "User"))
        .await
        .json::<serde_json::Value>()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let group = server
        .post("/scim/Groups")
        .json(&json!({"displayName": "Engineers"}))
        .await
        .json::<serde_json::Value>();
    let group_id = group["id"].as_str().unwrap();

    let add = server
        .patch(&format!("/scim/Groups/{}", group_id))
        .json(&json!({
            "Operations": [{
                "op": "add",
                "path": "members",
                "value": [{"value": u1}, {"value": u2}]
            }]
        }))
        .await;
    add.assert_status_ok();
    let add: serde_json::Value = add.json();
    let members: Vec<&str> = add["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["value"].as_str().unwrap())
        .collect();
    assert_eq!(members.len(), 2);

    let remove = server
        .patch(&format!("/scim/Groups/{}", group_id))
        .json(&json!({
            "Operations": [{
                "op": "remove",
                "path": format!("members[value eq \"{}\"]", u1)
            }]
        }))
        .await;
    remove.assert_status_ok();
    let remove: serde_json::Value = remove.json();
    let members: Vec<&str> = remove["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["value"].as_str().unwrap())
        .collect();
    assert_eq!(members, vec![u2.as_str()]);
}

#[tokio::test]
async fn pagination_partitions_the_full_result() {
    let server = TestServer::new(common::test_app().await).unwrap();
    for i in 0..5 {
        server
            .post("/scim/Users")
            .json(&common::user_json(&format!("user{}@co.com", i), "U", "Ser"))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let page1 = server
        .get("/scim/Users")
        .add_query_param("filter", "emails.value co \"@co.com\"")
        .add_query_param("startIndex", "1")
        .add_query_param("count", "3")
        .await;
    page1.assert_status_ok();
    let page1: serde_json::Value = page1.json();
    assert_eq!(page1["totalResults"], 5);
    assert_eq!(page1["Resources"].as_array().unwrap().len(), 3);

    let page2 = server
        .get("/scim/Users")
        .add_query_param("filter", "emails.value co \"@co.com\"")
        .add_query_param("startIndex", "4")
        .add_query_param("count", "3")
        .await;
    page2.assert_status_ok();
    let page2: serde_json::Value = page2.json();
    assert_eq!(page2["totalResults"], 5);
    assert_eq!(page2["Resources"].as_array().unwrap().len(), 2);
}
