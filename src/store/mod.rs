//! Resource store abstraction (C5, §4.5) and its two implementations: an
//! in-memory store (C7) and a relational store over sqlx (C6).

pub mod memory;
pub mod sql;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AppResult;
use crate::filter::FilterNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    User,
    Group,
}

/// A page of search results plus the total count of matching resources
/// across the whole collection (§4.5, §4.6: "total reflects the filtered
/// count, not the page size").
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub resources: Vec<Value>,
    pub total: i64,
}

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub filter: Option<FilterNode>,
    pub start_index: i64,
    pub count: i64,
}

impl SearchParams {
    pub fn all() -> Self {
        Self {
            filter: None,
            start_index: 1,
            count: 100,
        }
    }
}

/// Storage contract shared by every resource kind. Implementations own
/// id generation, uniqueness enforcement, and derived-attribute projection
/// (User.groups, Group.members); callers always see fully-projected,
/// already-sanitized JSON (§4.5, §4.9).
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_by_id(&self, kind: ResourceKind, id: &str) -> AppResult<Option<Value>>;

    async fn search(&self, kind: ResourceKind, params: &SearchParams) -> AppResult<SearchPage>;

    /// Create a resource. `body` is the client-supplied JSON minus any
    /// server-assigned fields; the returned value is the fully-projected
    /// representation including the generated `id`.
    async fn create(&self, kind: ResourceKind, body: Value) -> AppResult<Value>;

    /// Merge `body` onto the existing resource (§4.6: update and PUT share
    /// this merge-onto-existing-record semantics). Returns the updated,
    /// fully-projected representation.
    async fn update(&self, kind: ResourceKind, id: &str, body: Value) -> AppResult<Value>;

    /// Remove a resource. Errors with `NotFound` if it does not exist
    /// (look-before-delete, §10A).
    async fn delete(&self, kind: ResourceKind, id: &str) -> AppResult<()>;

    /// Add users to a group's membership (§4.7, §4.8).
    async fn add_group_members(&self, group_id: &str, user_ids: &[String]) -> AppResult<()>;

    /// Remove specific users from a group's membership.
    async fn remove_group_members(&self, group_id: &str, user_ids: &[String]) -> AppResult<()>;

    /// Replace a group's entire membership set (§4.8 scenario 4).
    async fn set_group_members(&self, group_id: &str, user_ids: &[String]) -> AppResult<()>;

    /// Search a group's members against a value sub-filter, returning the
    /// matching member user ids (§4.8 scenario 2: `members[value eq "x"]`
    /// with no `value` in the operation body).
    async fn search_group_members(
        &self,
        group_id: &str,
        filter: &FilterNode,
    ) -> AppResult<Vec<String>>;
}
