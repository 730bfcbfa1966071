//! PUT merge semantics (§9 open-question decision), PATCH metadata replace,
//! and group membership idempotence/ordering guarantees (§8 properties).

mod common;

use axum_test::TestServer;
use http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn put_merges_onto_the_existing_record_rather_than_replacing_it() {
    let server = TestServer::new(common::test_app().await).unwrap();
    let created: serde_json::Value = server
        .post("/scim/Users")
        .json(&common::user_json("jdoe@co.com", "J", "Doe"))
        .await
        .json();
    let id = created["id"].as_str().unwrap();

    // PUT supplies only displayName; userName and emails must survive the merge.
    let updated = server
        .put(&format!("/scim/Users/{}", id))
        .json(&json!({"displayName": "J. Doe"}))
        .await;
    updated.assert_status_ok();
    let updated: serde_json::Value = updated.json();
    assert_eq!(updated["displayName"], "J. Doe");
    assert_eq!(updated["userName"], "jdoe@co.com");
    assert_eq!(updated["emails"][0]["value"], "jdoe@co.com");
}

#[tokio::test]
async fn patch_on_a_user_shares_puts_merge_semantics() {
    let server = TestServer::new(common::test_app().await).unwrap();
    let created: serde_json::Value = server
        .post("/scim/Users")
        .json(&common::user_json("jdoe@co.com", "J", "Doe"))
        .await
        .json();
    let id = created["id"].as_str().unwrap();

    let patched = server
        .patch(&format!("/scim/Users/{}", id))
        .json(&json!({"displayName": "J. Doe"}))
        .await;
    patched.assert_status_ok();
    let patched: serde_json::Value = patched.json();
    assert_eq!(patched["displayName"], "J. Doe");
    assert_eq!(patched["userName"], "jdoe@co.com");
}

#[tokio::test]
async fn group_patch_replace_with_no_path_merges_metadata() {
    let server = TestServer::new(common::test_app().await).unwrap();
    let group: serde_json::Value = server
        .post("/scim/Groups")
        .json(&json!({"displayName": "Engineers"}))
        .await
        .json();
    let id = group["id"].as_str().unwrap();

    let patched = server
        .patch(&format!("/scim/Groups/{}", id))
        .json(&json!({
            "Operations": [{"op": "replace", "value": {"displayName": "Eng"}}]
        }))
        .await;
    patched.assert_status_ok();
    let patched: serde_json::Value = patched.json();
    assert_eq!(patched["displayName"], "Eng");
}

#[tokio::test]
async fn set_group_members_then_get_matches_as_a_set() {
    let server = TestServer::new(common::test_app().await).unwrap();
    let u1: serde_json::Value = server
        .post("/scim/Users")
        .json(&common::user_json("a@co.com", "A", "One"))
        .await
        .json();
    let u2: serde_json::Value = server
        .post("/scim/Users")
        .json(&common::user_json("b@co.com", "B", "Two"))
        .await
        .json();
    let group: serde_json::Value = server
        .post("/scim/Groups")
        .json(&json!({"displayName": "Team"}))
        .await
        .json();
    let group_id = group["id"].as_str().unwrap();
    let u1 = u1["id"].as_str().unwrap();
    let u2 = u2["id"].as_str().unwrap();

    server
        .patch(&format!("/scim/Groups/{}", group_id))
        .json(&json!({
            "Operations": [{"op": "replace", "path": "members", "value": [{"value": u1}, {"value": u2}]}]
        }))
        .await
        .assert_status_ok();

    let fetched = server.get(&format!("/scim/Groups/{}", group_id)).await;
    let fetched: serde_json::Value = fetched.json();
    let mut members: Vec<&str> = fetched["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["value"].as_str().unwrap())
        .collect();
    members.sort();
    let mut expected = vec![u1, u2];
    expected.sort();
    assert_eq!(members, expected);
}

#[tokio::test]
async fn adding_the_same_member_twice_is_idempotent() {
    let server = TestServer::new(common::test_app().await).unwrap();
    let user: serde_json::Value = server
        .post("/scim/Users")
        .json(&common::user_json("a@co.com", "A", "One"))
        .await
        .json();
    let group: serde_json::Value = server
        .post("/scim/Groups")
        .json(&json!({"displayName": "Team"}))
        .await
        .json();
    let group_id = group["id"].as_str().unwrap();
    let user_id = user["id"].as_str().unwrap();

    let add_op = json!({
        "Operations": [{"op": "add", "path": "members", "value": [{"value": user_id}]}]
    });
    server
        .patch(&format!("/scim/Groups/{}", group_id))
        .json(&add_op)
        .await
        .assert_status_ok();
    let second = server
        .patch(&format!("/scim/Groups/{}", group_id))
        .json(&add_op)
        .await;
    second.assert_status_ok();
    let second: serde_json::Value = second.json();
    assert_eq!(second["members"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn missing_resource_operations_are_404() {
    let server = TestServer::new(common::test_app().await).unwrap();
    server
        .get("/scim/Users/does-not-exist")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .delete("/scim/Groups/does-not-exist")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
