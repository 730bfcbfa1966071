//! Backend construction from configuration (§6A): selects and constructs
//! the single `Store` implementation a deployment is configured for.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::store::memory::MemoryStore;
use crate::store::sql::{PostgresStore, SqliteStore};
use crate::store::Store;

pub async fn build_store(config: &AppConfig) -> AppResult<Arc<dyn Store>> {
    match config.store.store_type.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "sql" => build_sql_store(config).await,
        other => Err(AppError::Configuration(format!(
            "unsupported store.type '{}'",
            other
        ))),
    }
}

async fn build_sql_store(config: &AppConfig) -> AppResult<Arc<dyn Store>> {
    match config.store.db_type.as_str() {
        "sqlite" => {
            let pool = sqlx::sqlite::SqlitePoolOptions::new()
                .max_connections(config.store.max_connections)
                .connect(&config.store.connection_url)
                .await?;
            let store = SqliteStore::new(pool);
            store.migrate().await?;
            Ok(Arc::new(store))
        }
        "postgresql" => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.store.max_connections)
                .connect(&config.store.connection_url)
                .await?;
            let store = PostgresStore::new(pool);
            store.migrate().await?;
            Ok(Arc::new(store))
        }
        other => Err(AppError::Configuration(format!(
            "unsupported store.dbType '{}'",
            other
        ))),
    }
}
