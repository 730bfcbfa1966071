//! HTTP wiring (§6A): router assembly, auth and logging as `middleware::from_fn`
//! layers, handlers per resource kind.

pub mod envelope;
pub mod groups;
pub mod users;

use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::auth::auth_middleware;
use crate::config::AppConfig;
use crate::logging::logging_middleware;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}

/// SCIM routes rooted at `/scim` (§6); `/health` stays outside the nest so it
/// remains auth-exempt.
pub fn build_router(config: Arc<AppConfig>, store: Arc<dyn Store>) -> Router {
    let state = AppState { store };

    let scim_routes = Router::new()
        .route("/Users", get(users::search).post(users::create))
        .route(
            "/Users/{id}",
            get(users::get)
                .put(users::update)
                .patch(users::update)
                .delete(users::delete),
        )
        .route("/Groups", get(groups::search).post(groups::create))
        .route(
            "/Groups/{id}",
            get(groups::get)
                .put(groups::update)
                .patch(groups::patch)
                .delete(groups::delete),
        );

    Router::new()
        .nest("/scim", scim_routes)
        .route("/health", get(|| async { Json(json!({"status": "UP"})) }))
        .with_state(state)
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
}
