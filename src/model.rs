//! Canonical JSON shape for User and Group resources, and the outbound
//! sanitizer that strips write-only fields (§3, §4.9, C9).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const SCHEMA_USER: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const SCHEMA_GROUP: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
pub const SCHEMA_LIST_RESPONSE: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";
pub const SCHEMA_ERROR: &str = "urn:ietf:params:scim:api:messages:2.0:Error";
pub const SCHEMA_PATCH_OP: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// Fields that must never survive sanitization on an outbound representation.
/// Minimally `password` per §4.9; kept as a list so new write-only fields can
/// be added without touching every call site.
const SENSITIVE_FIELDS: &[&str] = &["password"];

/// Strip sensitive keys from a resource body before it leaves the process.
/// Applied on every outbound path (§3 invariant: "password is stripped from
/// every outbound representation").
pub fn sanitize(mut value: Value) -> Value {
    if let Value::Object(ref mut map) = value {
        for field in SENSITIVE_FIELDS {
            map.remove(*field);
        }
    }
    value
}

/// Generate a collision-resistant identifier for a resource the client did
/// not supply one for (§4.9).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Name {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    #[serde(rename = "familyName", skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(rename = "givenName", skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    pub value: String,
    #[serde(default = "default_true")]
    pub primary: bool,
    #[serde(default = "default_work")]
    #[serde(rename = "type")]
    pub email_type: String,
}

fn default_true() -> bool {
    true
}

fn default_work() -> String {
    "work".to_string()
}

/// Derived view of a group a user belongs to (§3: User.groups).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserGroupRef {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Derived view of a group member (§3: Group.members).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// A User resource. Known attributes are typed; everything else
/// (custom-schema attributes keyed by schema URI, §3) round-trips through
/// `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "externalId", skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Name>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub emails: Vec<Email>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "default_user_schemas")]
    pub schemas: Vec<String>,
    /// Derived on read (§3); direct writes to this field are ignored.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<UserGroupRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_user_schemas() -> Vec<String> {
    vec![SCHEMA_USER.to_string()]
}

impl User {
    pub fn sanitized_json(&self) -> AppJsonResult {
        let value = serde_json::to_value(self)?;
        Ok(sanitize(value))
    }
}

/// A Group resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(default = "default_group_schemas")]
    pub schemas: Vec<String>,
    #[serde(default)]
    pub members: Vec<MemberRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_group_schemas() -> Vec<String> {
    vec![SCHEMA_GROUP.to_string()]
}

impl Group {
    pub fn sanitized_json(&self) -> AppJsonResult {
        let value = serde_json::to_value(self)?;
        Ok(sanitize(value))
    }
}

type AppJsonResult = Result<Value, serde_json::Error>;

/// SCIM list response envelope (§6).
#[derive(Debug, Clone, Serialize)]
pub struct ListResponse {
    pub schemas: Vec<String>,
    #[serde(rename = "totalResults")]
    pub total_results: i64,
    #[serde(rename = "startIndex")]
    pub start_index: i64,
    #[serde(rename = "itemsPerPage")]
    pub items_per_page: i64,
    #[serde(rename = "Resources")]
    pub resources: Vec<Value>,
}

impl ListResponse {
    pub fn new(resources: Vec<Value>, total: i64, start_index: i64, count: i64) -> Self {
        Self {
            schemas: vec![SCHEMA_LIST_RESPONSE.to_string()],
            total_results: total,
            start_index,
            items_per_page: count,
            resources,
        }
    }
}

/// A single PATCH operation per RFC 7644 (§4.8, §6).
#[derive(Debug, Clone, Deserialize)]
pub struct PatchOperation {
    pub op: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

/// A PatchOp request body (§4.8, §6).
#[derive(Debug, Clone, Deserialize)]
pub struct PatchOp {
    #[serde(default)]
    #[allow(dead_code)]
    pub schemas: Vec<String>,
    #[serde(rename = "Operations")]
    pub operations: Vec<PatchOperation>,
}
