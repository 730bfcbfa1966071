//! PostgreSQL-backed store (C6, §4.6). Structurally mirrors the SQLite
//! store; the two are kept as separate modules because the wire
//! placeholder syntax and a handful of type affinities diverge.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{PgPool, Row};

use crate::error::{AppError, AppResult};
use crate::filter::{compile_filter, evaluate, FilterNode, PostgresDialect};
use crate::model::{generate_id, sanitize};
use crate::store::sql::attribute_map::{group_attribute_map, user_attribute_map};
use crate::store::sql::schema::DDL_STATEMENTS;
use crate::store::{ResourceKind, SearchPage, SearchParams, Store};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> AppResult<()> {
        for statement in DDL_STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn fetch_user(&self, id: &str) -> AppResult<Option<Value>> {
        let row = sqlx::query(
            "SELECT id, user_name, external_id, display_name, given_name, family_name, \
             locale, active, extra FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else { return Ok(None) };
        let mut user = user_row_to_json(&row)?;
        self.attach_emails(&mut user, id).await?;
        self.attach_user_groups(&mut user, id).await?;
        Ok(Some(user))
    }

    async fn attach_emails(&self, user: &mut Value, user_id: &str) -> AppResult<()> {
        let rows = sqlx::query(
            "SELECT value, is_primary, email_type FROM user_emails WHERE user_id = $1 \
             ORDER BY is_primary DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        let emails: Vec<Value> = rows
            .iter()
            .map(|row| {
                serde_json::json!({
                    "value": row.try_get::<String, _>("value").unwrap_or_default(),
                    "primary": row.try_get::<bool, _>("is_primary").unwrap_or(false),
                    "type": row.try_get::<String, _>("email_type").unwrap_or_default(),
                })
            })
            .collect();
        if let Value::Object(ref mut obj) = user {
            obj.insert("emails".to_string(), Value::Array(emails));
        }
        Ok(())
    }

    async fn attach_user_groups(&self, user: &mut Value, user_id: &str) -> AppResult<()> {
        let rows = sqlx::query(
            "SELECT g.id as id, g.display_name as display_name FROM groups g \
             JOIN users_groups ug ON ug.group_id = g.id WHERE ug.user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        let groups: Vec<Value> = rows
            .iter()
            .filter_map(|row| {
                let display_name: String = row.try_get("display_name").ok()?;
                let id: String = row.try_get("id").ok()?;
                Some(serde_json::json!({"value": id, "display": display_name, "displayName": display_name}))
            })
            .collect();
        if let Value::Object(ref mut obj) = user {
            if !groups.is_empty() {
                obj.insert("groups".to_string(), Value::Array(groups));
            }
        }
        Ok(())
    }

    async fn fetch_group(&self, id: &str) -> AppResult<Option<Value>> {
        let row = sqlx::query("SELECT id, display_name, extra FROM groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(None) };
        let mut group = group_row_to_json(&row)?;
        self.attach_members(&mut group, id).await?;
        Ok(Some(group))
    }

    async fn attach_members(&self, group: &mut Value, group_id: &str) -> AppResult<()> {
        let rows = sqlx::query(
            "SELECT u.id as id, u.user_name as user_name FROM users u \
             JOIN users_groups ug ON ug.user_id = u.id WHERE ug.group_id = $1",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        let members: Vec<Value> = rows
            .iter()
            .filter_map(|row| {
                let user_name: String = row.try_get("user_name").ok()?;
                let id: String = row.try_get("id").ok()?;
                Some(serde_json::json!({"value": id, "display": user_name}))
            })
            .collect();
        if let Value::Object(ref mut obj) = group {
            obj.insert("members".to_string(), Value::Array(members));
        }
        Ok(())
    }

    async fn require_group(&self, group_id: &str) -> AppResult<()> {
        let exists = sqlx::query("SELECT 1 FROM groups WHERE id = $1")
            .bind(group_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!("group '{}' not found", group_id)));
        }
        Ok(())
    }
}

async fn insert_emails(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: &str,
    emails: &[crate::model::Email],
) -> AppResult<()> {
    for email in emails {
        sqlx::query(
            "INSERT INTO user_emails (id, user_id, value, is_primary, email_type) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(generate_id())
        .bind(user_id)
        .bind(&email.value)
        .bind(email.primary)
        .bind(&email.email_type)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

fn user_row_to_json(row: &sqlx::postgres::PgRow) -> AppResult<Value> {
    let extra: String = row.try_get("extra").unwrap_or_else(|_| "{}".to_string());
    let mut obj: Map<String, Value> = serde_json::from_str(&extra)?;
    obj.insert("id".to_string(), json_opt_string(row.try_get("id").ok()));
    obj.insert(
        "userName".to_string(),
        json_opt_string(row.try_get("user_name").ok()),
    );
    if let Ok(Some(v)) = row.try_get::<Option<String>, _>("external_id") {
        obj.insert("externalId".to_string(), Value::String(v));
    }
    if let Ok(Some(v)) = row.try_get::<Option<String>, _>("display_name") {
        obj.insert("displayName".to_string(), Value::String(v));
    }
    let given_name: Option<String> = row.try_get("given_name").unwrap_or(None);
    let family_name: Option<String> = row.try_get("family_name").unwrap_or(None);
    if given_name.is_some() || family_name.is_some() {
        obj.insert(
            "name".to_string(),
            serde_json::json!({"givenName": given_name, "familyName": family_name}),
        );
    }
    if let Ok(Some(v)) = row.try_get::<Option<String>, _>("locale") {
        obj.insert("locale".to_string(), Value::String(v));
    }
    obj.insert(
        "active".to_string(),
        Value::Bool(row.try_get("active").unwrap_or(true)),
    );
    Ok(Value::Object(obj))
}

fn group_row_to_json(row: &sqlx::postgres::PgRow) -> AppResult<Value> {
    let extra: String = row.try_get("extra").unwrap_or_else(|_| "{}".to_string());
    let mut obj: Map<String, Value> = serde_json::from_str(&extra)?;
    obj.insert("id".to_string(), json_opt_string(row.try_get("id").ok()));
    obj.insert(
        "displayName".to_string(),
        json_opt_string(row.try_get("display_name").ok()),
    );
    Ok(Value::Object(obj))
}

fn json_opt_string(value: Option<String>) -> Value {
    value.map(Value::String).unwrap_or(Value::Null)
}

#[async_trait]
impl Store for PostgresStore {
    async fn get_by_id(&self, kind: ResourceKind, id: &str) -> AppResult<Option<Value>> {
        let resource = match kind {
            ResourceKind::User => self.fetch_user(id).await?,
            ResourceKind::Group => self.fetch_group(id).await?,
        };
        Ok(resource.map(sanitize))
    }

    async fn search(&self, kind: ResourceKind, params: &SearchParams) -> AppResult<SearchPage> {
        let (table, attrs) = match kind {
            ResourceKind::User => ("users", user_attribute_map()),
            ResourceKind::Group => ("groups", group_attribute_map()),
        };
        let (where_sql, bind_values) = match &params.filter {
            Some(filter) => {
                let compiled = compile_filter(filter, table, &attrs, &PostgresDialect)?;
                (format!("WHERE {}", compiled.where_clause), compiled.params)
            }
            None => (String::new(), Vec::new()),
        };
        let limit_idx = bind_values.len() + 1;
        let offset_idx = bind_values.len() + 2;
        let sql = format!(
            "SELECT id, COUNT(*) OVER() as total_count FROM {table} {where_sql} \
             ORDER BY id LIMIT ${limit} OFFSET ${offset}",
            table = table,
            where_sql = where_sql,
            limit = limit_idx,
            offset = offset_idx
        );
        let mut query = sqlx::query(&sql);
        for value in &bind_values {
            query = bind_json_value(query, value);
        }
        let start = (params.start_index.max(1) - 1).max(0);
        query = query.bind(params.count.max(0) as i64).bind(start);
        let rows = query.fetch_all(&self.pool).await?;

        let total = rows
            .first()
            .and_then(|row| row.try_get::<i64, _>("total_count").ok())
            .unwrap_or(0);

        let mut resources = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.try_get("id")?;
            if let Some(resource) = self.get_by_id(kind, &id).await? {
                resources.push(resource);
            }
        }
        Ok(SearchPage { resources, total })
    }

    async fn create(&self, kind: ResourceKind, body: Value) -> AppResult<Value> {
        let id = generate_id();
        let mut tx = self.pool.begin().await?;
        match kind {
            ResourceKind::User => {
                let (core, extra) = split_user_fields(&body);
                let exists = sqlx::query("SELECT 1 FROM users WHERE LOWER(user_name) = LOWER($1)")
                    .bind(&core.user_name)
                    .fetch_optional(&mut *tx)
                    .await?;
                if exists.is_some() {
                    return Err(AppError::AlreadyExists(format!(
                        "userName '{}' already exists",
                        core.user_name
                    )));
                }
                sqlx::query(
                    "INSERT INTO users (id, user_name, external_id, display_name, given_name, \
                     family_name, locale, active, password, extra) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
                )
                .bind(&id)
                .bind(&core.user_name)
                .bind(&core.external_id)
                .bind(&core.display_name)
                .bind(&core.given_name)
                .bind(&core.family_name)
                .bind(&core.locale)
                .bind(core.active)
                .bind(&core.password)
                .bind(serde_json::to_string(&extra)?)
                .execute(&mut *tx)
                .await?;
                insert_emails(&mut tx, &id, &core.emails).await?;
            }
            ResourceKind::Group => {
                let (core, extra) = split_group_fields(&body);
                let exists = sqlx::query("SELECT 1 FROM groups WHERE LOWER(display_name) = LOWER($1)")
                    .bind(&core.display_name)
                    .fetch_optional(&mut *tx)
                    .await?;
                if exists.is_some() {
                    return Err(AppError::AlreadyExists(format!(
                        "displayName '{}' already exists",
                        core.display_name
                    )));
                }
                sqlx::query("INSERT INTO groups (id, display_name, extra) VALUES ($1, $2, $3)")
                    .bind(&id)
                    .bind(&core.display_name)
                    .bind(serde_json::to_string(&extra)?)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await?;
        self.get_by_id(kind, &id)
            .await?
            .ok_or_else(|| AppError::Backend("resource vanished immediately after insert".into()))
    }

    async fn update(&self, kind: ResourceKind, id: &str, body: Value) -> AppResult<Value> {
        let existing = self
            .get_by_id(kind, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("resource '{}' not found", id)))?;
        let merged = merge_json(existing, body);
        let mut tx = self.pool.begin().await?;
        match kind {
            ResourceKind::User => {
                let (core, extra) = split_user_fields(&merged);
                sqlx::query(
                    "UPDATE users SET user_name = $1, external_id = $2, display_name = $3, \
                     given_name = $4, family_name = $5, locale = $6, active = $7, password = $8, \
                     extra = $9 WHERE id = $10",
                )
                .bind(&core.user_name)
                .bind(&core.external_id)
                .bind(&core.display_name)
                .bind(&core.given_name)
                .bind(&core.family_name)
                .bind(&core.locale)
                .bind(core.active)
                .bind(&core.password)
                .bind(serde_json::to_string(&extra)?)
                .bind(id)
                .execute(&mut *tx)
                .await?;
                sqlx::query("DELETE FROM user_emails WHERE user_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                insert_emails(&mut tx, id, &core.emails).await?;
            }
            ResourceKind::Group => {
                let (core, extra) = split_group_fields(&merged);
                sqlx::query("UPDATE groups SET display_name = $1, extra = $2 WHERE id = $3")
                    .bind(&core.display_name)
                    .bind(serde_json::to_string(&extra)?)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await?;
        self.get_by_id(kind, id)
            .await?
            .ok_or_else(|| AppError::Backend("resource vanished immediately after update".into()))
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> AppResult<()> {
        let table = match kind {
            ResourceKind::User => "users",
            ResourceKind::Group => "groups",
        };
        let mut tx = self.pool.begin().await?;
        let existing = sqlx::query(&format!("SELECT 1 FROM {} WHERE id = $1", table))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_none() {
            return Err(AppError::NotFound(format!("resource '{}' not found", id)));
        }
        sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn add_group_members(&self, group_id: &str, user_ids: &[String]) -> AppResult<()> {
        self.require_group(group_id).await?;
        let mut tx = self.pool.begin().await?;
        for user_id in user_ids {
            sqlx::query(
                "INSERT INTO users_groups (user_id, group_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(user_id)
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn remove_group_members(&self, group_id: &str, user_ids: &[String]) -> AppResult<()> {
        self.require_group(group_id).await?;
        let mut tx = self.pool.begin().await?;
        for user_id in user_ids {
            sqlx::query("DELETE FROM users_groups WHERE group_id = $1 AND user_id = $2")
                .bind(group_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn set_group_members(&self, group_id: &str, user_ids: &[String]) -> AppResult<()> {
        self.require_group(group_id).await?;
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM users_groups WHERE group_id = $1")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        for user_id in user_ids {
            sqlx::query(
                "INSERT INTO users_groups (user_id, group_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(user_id)
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn search_group_members(
        &self,
        group_id: &str,
        filter: &FilterNode,
    ) -> AppResult<Vec<String>> {
        self.require_group(group_id).await?;
        let rows = sqlx::query(
            "SELECT u.id as id, u.user_name as user_name FROM users u \
             JOIN users_groups ug ON ug.user_id = u.id WHERE ug.group_id = $1",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        let matches = rows
            .iter()
            .filter_map(|row| {
                let id: String = row.try_get("id").ok()?;
                let user_name: String = row.try_get("user_name").ok()?;
                let member = serde_json::json!({"value": id, "display": user_name});
                evaluate(filter, &member).then_some(id)
            })
            .collect();
        Ok(matches)
    }
}

fn bind_json_value<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    value: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    match value {
        Value::String(s) => query.bind(s.as_str()),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => query.bind(n.as_f64().unwrap_or_default()),
        Value::Null => query.bind(Option::<String>::None),
        other => query.bind(other.to_string()),
    }
}

struct UserCore {
    user_name: String,
    external_id: Option<String>,
    display_name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    locale: Option<String>,
    active: bool,
    password: Option<String>,
    emails: Vec<crate::model::Email>,
}

struct GroupCore {
    display_name: String,
}

fn split_user_fields(value: &Value) -> (UserCore, Map<String, Value>) {
    let mut extra = value.as_object().cloned().unwrap_or_default();
    let user_name = extra
        .remove("userName")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let external_id = extra.remove("externalId").and_then(|v| v.as_str().map(str::to_string));
    let display_name = extra.remove("displayName").and_then(|v| v.as_str().map(str::to_string));
    let name = extra.remove("name");
    let (given_name, family_name) = match &name {
        Some(Value::Object(n)) => (
            n.get("givenName").and_then(|v| v.as_str().map(str::to_string)),
            n.get("familyName").and_then(|v| v.as_str().map(str::to_string)),
        ),
        _ => (None, None),
    };
    let locale = extra.remove("locale").and_then(|v| v.as_str().map(str::to_string));
    let active = extra.remove("active").and_then(|v| v.as_bool()).unwrap_or(true);
    let password = extra.remove("password").and_then(|v| v.as_str().map(str::to_string));
    extra.remove("id");
    extra.remove("groups");
    extra.remove("schemas");
    let mut emails: Vec<crate::model::Email> = extra
        .remove("emails")
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();
    if emails.is_empty() && !user_name.is_empty() {
        emails.push(crate::model::Email {
            value: user_name.clone(),
            primary: true,
            email_type: "work".to_string(),
        });
    }

    (
        UserCore {
            user_name,
            external_id,
            display_name,
            given_name,
            family_name,
            locale,
            active,
            password,
            emails,
        },
        extra,
    )
}

fn split_group_fields(value: &Value) -> (GroupCore, Map<String, Value>) {
    let mut extra = value.as_object().cloned().unwrap_or_default();
    let display_name = extra
        .remove("displayName")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    extra.remove("id");
    extra.remove("members");
    extra.remove("schemas");
    (GroupCore { display_name }, extra)
}

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
