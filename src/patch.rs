//! PATCH operation interpreter for Groups (C8, §4.8).
//!
//! A `PatchOperation` is classified into one of a fixed set of actions and
//! then applied against the `Store` trait; the interpreter never talks to a
//! backend directly. Classification is grounded in `_execute_group_operation`:
//! (1) `replace` with no path merges `value` onto the group; (2) `add`/
//! `remove` with a `members[...]` path and no `value` resolves the value
//! sub-filter against current members and removes what matches; (3) `add`/
//! `remove` with `path="members"` and a `value` list adds/removes those
//! members; (4) `replace` with `path="members"` replaces the whole set.

use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::filter::{parse_filter, FilterNode};
use crate::model::{PatchOp, PatchOperation};
use crate::store::{ResourceKind, Store};

#[derive(Debug)]
pub enum PatchAction {
    ReplaceMetadata(Value),
    AddMembers(Vec<String>),
    RemoveMembers(Vec<String>),
    ReplaceMembers(Vec<String>),
    RemoveByFilter(FilterNode),
    NoOp,
}

pub fn classify(op: &PatchOperation) -> AppResult<PatchAction> {
    let verb = op.op.to_ascii_lowercase();
    let path = op.path.as_deref();

    if verb == "replace" && path.is_none() {
        let value = op
            .value
            .clone()
            .ok_or_else(|| AppError::Validation("replace without a path requires a value".into()))?;
        return Ok(PatchAction::ReplaceMetadata(value));
    }

    if let Some(path) = path {
        if is_members_value_subfilter_path(path) {
            let filter = parse_member_value_subfilter(path)?;
            return match verb.as_str() {
                "remove" if op.value.is_none() => Ok(PatchAction::RemoveByFilter(filter)),
                "remove" => Err(AppError::Validation(
                    "remove with a value sub-filter path does not take a value".into(),
                )),
                _ => Err(AppError::Validation(format!(
                    "operator '{}' is not supported with a value sub-filter path",
                    verb
                ))),
            };
        }

        if path.eq_ignore_ascii_case("members") {
            return match verb.as_str() {
                "add" => Ok(PatchAction::AddMembers(extract_member_ids(op.value.as_ref())?)),
                "remove" => match &op.value {
                    Some(value) => Ok(PatchAction::RemoveMembers(extract_member_ids(Some(value))?)),
                    None => Ok(PatchAction::ReplaceMembers(Vec::new())),
                },
                "replace" => Ok(PatchAction::ReplaceMembers(extract_member_ids(op.value.as_ref())?)),
                _ => Ok(PatchAction::NoOp),
            };
        }
    }

    Ok(PatchAction::NoOp)
}

fn is_members_value_subfilter_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.starts_with("members[") && lower.ends_with(']')
}

fn parse_member_value_subfilter(path: &str) -> AppResult<FilterNode> {
    let inner = path
        .find('[')
        .zip(path.rfind(']'))
        .map(|(start, end)| &path[start + 1..end])
        .ok_or_else(|| AppError::Validation(format!("malformed value sub-filter path '{}'", path)))?;
    parse_filter(inner)
}

/// `value` on an add/remove/replace for `members` is a list, per RFC 7644,
/// of either plain ids or `{"value": "<id>"}` objects.
fn extract_member_ids(value: Option<&Value>) -> AppResult<Vec<String>> {
    let Value::Array(items) = value.ok_or_else(|| {
        AppError::Validation("members operation requires an array value".to_string())
    })?
    else {
        return Err(AppError::Validation(
            "members operation requires an array value".to_string(),
        ));
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            Value::Object(obj) => obj
                .get("value")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| AppError::Validation("member entry is missing 'value'".to_string())),
            _ => Err(AppError::Validation("member entry must be a string or object".to_string())),
        })
        .collect()
}

async fn apply_action(store: &dyn Store, group_id: &str, action: PatchAction) -> AppResult<()> {
    match action {
        PatchAction::ReplaceMetadata(value) => {
            store.update(ResourceKind::Group, group_id, value).await?;
        }
        PatchAction::AddMembers(ids) => {
            store.add_group_members(group_id, &ids).await?;
        }
        PatchAction::RemoveMembers(ids) => {
            store.remove_group_members(group_id, &ids).await?;
        }
        PatchAction::ReplaceMembers(ids) => {
            store.set_group_members(group_id, &ids).await?;
        }
        PatchAction::RemoveByFilter(filter) => {
            let matched = store.search_group_members(group_id, &filter).await?;
            store.remove_group_members(group_id, &matched).await?;
        }
        PatchAction::NoOp => {}
    }
    Ok(())
}

/// Apply every operation in a PatchOp request, in order, and return the
/// fully-projected, sanitized group afterward.
pub async fn apply_patch(store: &dyn Store, group_id: &str, patch: &PatchOp) -> AppResult<Value> {
    for operation in &patch.operations {
        let action = classify(operation)?;
        apply_action(store, group_id, action).await?;
    }
    store
        .get_by_id(ResourceKind::Group, group_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("group '{}' not found", group_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    async fn setup() -> (MemoryStore, String, Vec<String>) {
        let store = MemoryStore::new();
        let mut user_ids = Vec::new();
        for name in ["alice", "bob", "carol"] {
            let user = store
                .create(ResourceKind::User, json!({"userName": name}))
                .await
                .unwrap();
            user_ids.push(user["id"].as_str().unwrap().to_string());
        }
        let group = store
            .create(ResourceKind::Group, json!({"displayName": "Team"}))
            .await
            .unwrap();
        let group_id = group["id"].as_str().unwrap().to_string();
        (store, group_id, user_ids)
    }

    #[tokio::test]
    async fn replace_with_no_path_merges_metadata() {
        let (store, group_id, _) = setup().await;
        let patch = PatchOp {
            schemas: vec![],
            operations: vec![PatchOperation {
                op: "replace".to_string(),
                path: None,
                value: Some(json!({"displayName": "Renamed"})),
            }],
        };
        let result = apply_patch(&store, &group_id, &patch).await.unwrap();
        assert_eq!(result["displayName"], "Renamed");
    }

    #[tokio::test]
    async fn add_members_with_path_and_value_list() {
        let (store, group_id, user_ids) = setup().await;
        let patch = PatchOp {
            schemas: vec![],
            operations: vec![PatchOperation {
                op: "add".to_string(),
                path: Some("members".to_string()),
                value: Some(json!([{"value": user_ids[0]}, {"value": user_ids[1]}])),
            }],
        };
        let result = apply_patch(&store, &group_id, &patch).await.unwrap();
        assert_eq!(result["members"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn remove_by_value_subfilter_removes_only_matched_member() {
        let (store, group_id, user_ids) = setup().await;
        store
            .add_group_members(&group_id, &user_ids)
            .await
            .unwrap();
        let patch = PatchOp {
            schemas: vec![],
            operations: vec![PatchOperation {
                op: "remove".to_string(),
                path: Some(format!(r#"members[value eq "{}"]"#, user_ids[0])),
                value: None,
            }],
        };
        let result = apply_patch(&store, &group_id, &patch).await.unwrap();
        let remaining: Vec<String> = result["members"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["value"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(remaining.len(), 2);
        assert!(!remaining.contains(&user_ids[0]));
    }

    #[tokio::test]
    async fn replace_members_path_swaps_entire_set() {
        let (store, group_id, user_ids) = setup().await;
        store.add_group_members(&group_id, &user_ids[0..1]).await.unwrap();
        let patch = PatchOp {
            schemas: vec![],
            operations: vec![PatchOperation {
                op: "replace".to_string(),
                path: Some("members".to_string()),
                value: Some(json!([{"value": user_ids[2]}])),
            }],
        };
        let result = apply_patch(&store, &group_id, &patch).await.unwrap();
        let remaining: Vec<String> = result["members"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["value"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(remaining, vec![user_ids[2].clone()]);
    }

    #[tokio::test]
    async fn unrecognized_operation_is_a_noop() {
        let (store, group_id, _) = setup().await;
        let patch = PatchOp {
            schemas: vec![],
            operations: vec![PatchOperation {
                op: "replace".to_string(),
                path: Some("externalId".to_string()),
                value: Some(json!("abc")),
            }],
        };
        let before = store.get_by_id(ResourceKind::Group, &group_id).await.unwrap();
        let after = apply_patch(&store, &group_id, &patch).await.unwrap();
        assert_eq!(before.unwrap()["displayName"], after["displayName"]);
    }
}
