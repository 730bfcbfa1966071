//! In-memory resource store (C7, §4.5, §10A).
//!
//! Backed by a single `RwLock`-guarded map per resource kind plus a
//! membership set, with linear-scan uniqueness checks on create — adequate
//! for tests and small deployments, not meant to scale the way the
//! relational store (C6) does.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::filter::{evaluate, FilterNode};
use crate::model::{generate_id, sanitize};
use crate::store::{ResourceKind, SearchPage, SearchParams, Store};

#[derive(Default)]
struct Db {
    users: HashMap<String, Value>,
    groups: HashMap<String, Value>,
    /// (group_id, user_id) pairs.
    memberships: HashSet<(String, String)>,
}

pub struct MemoryStore {
    db: RwLock<Db>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            db: RwLock::new(Db::default()),
        }
    }

    fn project_user(&self, db: &Db, id: &str, body: &Value) -> Value {
        let mut obj = body.as_object().cloned().unwrap_or_default();
        obj.insert("id".to_string(), Value::String(id.to_string()));
        let groups: Vec<Value> = db
            .memberships
            .iter()
            .filter(|(_, uid)| uid == id)
            .filter_map(|(gid, _)| {
                let display_name = db
                    .groups
                    .get(gid)
                    .and_then(|g| g.get("displayName"))
                    .and_then(|v| v.as_str());
                display_name.map(|name| {
                    serde_json::json!({"value": gid, "display": name, "displayName": name})
                })
            })
            .collect();
        if !groups.is_empty() {
            obj.insert("groups".to_string(), Value::Array(groups));
        } else {
            obj.remove("groups");
        }
        Value::Object(obj)
    }

    fn project_group(&self, db: &Db, id: &str, body: &Value) -> Value {
        let mut obj = body.as_object().cloned().unwrap_or_default();
        obj.insert("id".to_string(), Value::String(id.to_string()));
        let members: Vec<Value> = db
            .memberships
            .iter()
            .filter(|(gid, _)| gid == id)
            .filter_map(|(_, uid)| {
                let display = db
                    .users
                    .get(uid)
                    .and_then(|u| u.get("userName"))
                    .and_then(|v| v.as_str());
                display.map(|name| serde_json::json!({"value": uid, "display": name}))
            })
            .collect();
        obj.insert("members".to_string(), Value::Array(members));
        Value::Object(obj)
    }

    fn project(&self, db: &Db, kind: ResourceKind, id: &str) -> Option<Value> {
        let table = match kind {
            ResourceKind::User => &db.users,
            ResourceKind::Group => &db.groups,
        };
        let body = table.get(id)?;
        Some(match kind {
            ResourceKind::User => self.project_user(db, id, body),
            ResourceKind::Group => self.project_group(db, id, body),
        })
    }

    fn unique_key(kind: ResourceKind) -> &'static str {
        match kind {
            ResourceKind::User => "userName",
            ResourceKind::Group => "displayName",
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_by_id(&self, kind: ResourceKind, id: &str) -> AppResult<Option<Value>> {
        let db = self.db.read().unwrap();
        Ok(self.project(&db, kind, id).map(sanitize))
    }

    async fn search(&self, kind: ResourceKind, params: &SearchParams) -> AppResult<SearchPage> {
        let db = self.db.read().unwrap();
        let ids: Vec<String> = match kind {
            ResourceKind::User => db.users.keys().cloned().collect(),
            ResourceKind::Group => db.groups.keys().cloned().collect(),
        };
        let mut matched: Vec<Value> = ids
            .iter()
            .filter_map(|id| self.project(&db, kind, id))
            .filter(|resource| match &params.filter {
                Some(f) => evaluate(f, resource),
                None => true,
            })
            .collect();
        matched.sort_by(|a, b| {
            a.get("id")
                .and_then(|v| v.as_str())
                .cmp(&b.get("id").and_then(|v| v.as_str()))
        });
        let total = matched.len() as i64;
        let start = (params.start_index.max(1) - 1) as usize;
        let page: Vec<Value> = matched
            .into_iter()
            .skip(start)
            .take(params.count.max(0) as usize)
            .map(sanitize)
            .collect();
        Ok(SearchPage {
            resources: page,
            total,
        })
    }

    async fn create(&self, kind: ResourceKind, body: Value) -> AppResult<Value> {
        let mut db = self.db.write().unwrap();
        let key = Self::unique_key(kind);
        let candidate = body.get(key).and_then(|v| v.as_str());
        let candidate = candidate.ok_or_else(|| {
            AppError::Validation(format!("'{}' is required", key))
        })?;

        let table = match kind {
            ResourceKind::User => &db.users,
            ResourceKind::Group => &db.groups,
        };
        let duplicate = table.values().any(|existing| {
            existing
                .get(key)
                .and_then(|v| v.as_str())
                .is_some_and(|existing| existing.eq_ignore_ascii_case(candidate))
        });
        if duplicate {
            return Err(AppError::AlreadyExists(format!(
                "a resource with {} '{}' already exists",
                key, candidate
            )));
        }

        let id = generate_id();
        let table = match kind {
            ResourceKind::User => &mut db.users,
            ResourceKind::Group => &mut db.groups,
        };
        table.insert(id.clone(), body);
        let projected = self.project(&db, kind, &id).expect("just inserted");
        Ok(sanitize(projected))
    }

    async fn update(&self, kind: ResourceKind, id: &str, body: Value) -> AppResult<Value> {
        let mut db = self.db.write().unwrap();
        let table = match kind {
            ResourceKind::User => &mut db.users,
            ResourceKind::Group => &mut db.groups,
        };
        let existing = table
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("resource '{}' not found", id)))?;
        let merged = merge_json(existing.clone(), body);
        table.insert(id.to_string(), merged);
        let projected = self.project(&db, kind, id).expect("just updated");
        Ok(sanitize(projected))
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> AppResult<()> {
        let mut db = self.db.write().unwrap();
        let existed = match kind {
            ResourceKind::User => db.users.remove(id).is_some(),
            ResourceKind::Group => db.groups.remove(id).is_some(),
        };
        if !existed {
            return Err(AppError::NotFound(format!("resource '{}' not found", id)));
        }
        match kind {
            ResourceKind::User => db.memberships.retain(|(_, uid)| uid != id),
            ResourceKind::Group => db.memberships.retain(|(gid, _)| gid != id),
        }
        Ok(())
    }

    async fn add_group_members(&self, group_id: &str, user_ids: &[String]) -> AppResult<()> {
        let mut db = self.db.write().unwrap();
        if !db.groups.contains_key(group_id) {
            return Err(AppError::NotFound(format!("group '{}' not found", group_id)));
        }
        for uid in user_ids {
            db.memberships.insert((group_id.to_string(), uid.clone()));
        }
        Ok(())
    }

    async fn remove_group_members(&self, group_id: &str, user_ids: &[String]) -> AppResult<()> {
        let mut db = self.db.write().unwrap();
        if !db.groups.contains_key(group_id) {
            return Err(AppError::NotFound(format!("group '{}' not found", group_id)));
        }
        db.memberships
            .retain(|(gid, uid)| !(gid == group_id && user_ids.contains(uid)));
        Ok(())
    }

    async fn set_group_members(&self, group_id: &str, user_ids: &[String]) -> AppResult<()> {
        let mut db = self.db.write().unwrap();
        if !db.groups.contains_key(group_id) {
            return Err(AppError::NotFound(format!("group '{}' not found", group_id)));
        }
        db.memberships.retain(|(gid, _)| gid != group_id);
        for uid in user_ids {
            db.memberships.insert((group_id.to_string(), uid.clone()));
        }
        Ok(())
    }

    async fn search_group_members(
        &self,
        group_id: &str,
        filter: &FilterNode,
    ) -> AppResult<Vec<String>> {
        let db = self.db.read().unwrap();
        if !db.groups.contains_key(group_id) {
            return Err(AppError::NotFound(format!("group '{}' not found", group_id)));
        }
        let matches = db
            .memberships
            .iter()
            .filter(|(gid, _)| gid == group_id)
            .filter_map(|(_, uid)| {
                let display = db
                    .users
                    .get(uid)
                    .and_then(|u| u.get("userName"))
                    .and_then(|v| v.as_str());
                let member = serde_json::json!({"value": uid, "display": display});
                evaluate(filter, &member).then(|| uid.clone())
            })
            .collect();
        Ok(matches)
    }
}

/// Shallow top-level merge: keys present in `patch` override `base`. Matches
/// the single `update(resource_id, **kwargs)` merge semantics both `update`
/// and `PUT` share (§4.6, §9 decision).
fn merge_json(base: Value, patch: Value) -> Value {
    match (base, patch) {
        (Value::Object(mut base_map), Value::Object(patch_map)) => {
            for (k, v) in patch_map {
                base_map.insert(k, v);
            }
            Value::Object(base_map)
        }
        (_, patch) => patch,
    }
}
