use std::sync::Arc;

use axum::Router;
use serde_json::{json, Value};

use scim_provisioning_server::config::AppConfig;
use scim_provisioning_server::http::build_router;
use scim_provisioning_server::startup::build_store;

/// Unauthenticated, in-memory app — the default shape most tests exercise.
pub async fn test_app() -> Router {
    let config = Arc::new(AppConfig::default_config());
    let store = build_store(&config).await.unwrap();
    build_router(config, store)
}

/// Same as `test_app` but with a bearer token configured, for auth tests.
pub async fn test_app_with_token(token: &str) -> Router {
    let mut config = AppConfig::default_config();
    config.auth.bearer_token = Some(token.to_string());
    let config = Arc::new(config);
    let store = build_store(&config).await.unwrap();
    build_router(config, store)
}

pub fn user_json(username: &str, given_name: &str, family_name: &str) -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
        "userName": username,
        "name": {
            "givenName": given_name,
            "familyName": family_name
        },
        "emails": [{
            "value": username,
            "primary": true,
            "type": "work"
        }]
    })
}
