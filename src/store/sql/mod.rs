//! Relational resource store (C6, §4.6).

pub mod attribute_map;
pub mod postgres;
pub mod schema;
pub mod sqlite;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;
