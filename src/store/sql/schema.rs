//! Relational schema (C6, §4.6): a flat, single-tenant layout normalizing
//! emails and group membership out of the resource JSON, grounded directly
//! in the original store's `users` / `user_emails` / `groups` /
//! `users_groups` tables.

/// Statements are ANSI-compatible enough to run unmodified against both
/// SQLite and PostgreSQL: ids are client-facing UUID strings rather than
/// autoincrementing integers, so neither dialect needs a divergent primary
/// key declaration.
pub const DDL_STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        user_name TEXT NOT NULL UNIQUE,
        external_id TEXT,
        display_name TEXT,
        given_name TEXT,
        family_name TEXT,
        locale TEXT,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        password TEXT,
        extra TEXT NOT NULL DEFAULT '{}'
    )"#,
    r#"CREATE TABLE IF NOT EXISTS user_emails (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        value TEXT NOT NULL,
        is_primary BOOLEAN NOT NULL DEFAULT FALSE,
        email_type TEXT NOT NULL DEFAULT 'work'
    )"#,
    r#"CREATE TABLE IF NOT EXISTS groups (
        id TEXT PRIMARY KEY,
        display_name TEXT NOT NULL UNIQUE,
        extra TEXT NOT NULL DEFAULT '{}'
    )"#,
    r#"CREATE TABLE IF NOT EXISTS users_groups (
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        group_id TEXT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
        PRIMARY KEY (user_id, group_id)
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_user_emails_user_id ON user_emails(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_users_groups_user_id ON users_groups(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_users_groups_group_id ON users_groups(group_id)",
];
