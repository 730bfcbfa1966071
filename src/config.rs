//! Application configuration (§6A): a YAML file with a dotted-path
//! environment override that works over arbitrary nested YAML keys without
//! editing the file itself.

use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// `memory` or `sql`.
    #[serde(rename = "type", default = "default_store_type")]
    pub store_type: String,
    /// `sqlite` or `postgresql`; only consulted when `type == "sql"`.
    #[serde(rename = "dbType", default = "default_db_type")]
    pub db_type: String,
    #[serde(default = "default_connection_url")]
    pub connection_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: default_store_type(),
            db_type: default_db_type(),
            connection_url: default_connection_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_store_type() -> String {
    "memory".to_string()
}

fn default_db_type() -> String {
    "sqlite".to_string()
}

fn default_connection_url() -> String {
    ":memory:".to_string()
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// No bearer token configured means the deployment is intentionally
    /// unauthenticated (the zero-config default).
    #[serde(rename = "bearerToken", default)]
    pub bearer_token: Option<String>,
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, String> {
        let path = config_path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file {}: {}", path.display(), e))?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self, String> {
        let mut value: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| format!("failed to parse config: {}", e))?;
        apply_env_overrides(&mut value, Vec::new());
        serde_yaml::from_value(value).map_err(|e| format!("invalid config: {}", e))
    }

    pub fn default_config() -> Self {
        AppConfig {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

/// Walk the parsed YAML tree and, for every scalar leaf, check whether an
/// environment variable named `SCIM_<DOTTED_PATH_UPPERCASED>` is set; if so,
/// it overrides the file's value. E.g. `store.connectionUrl` is overridden
/// by `SCIM_STORE_CONNECTIONURL`. This lets a deployment override any single
/// setting without templating the YAML file itself.
fn apply_env_overrides(value: &mut serde_yaml::Value, path: Vec<String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, child) in map.iter_mut() {
                if let Some(key) = key.as_str() {
                    let mut child_path = path.clone();
                    child_path.push(key.to_string());
                    apply_env_overrides(child, child_path);
                }
            }
        }
        scalar => {
            if path.is_empty() {
                return;
            }
            let env_key = format!("SCIM_{}", path.join("_").to_ascii_uppercase());
            if let Ok(raw) = std::env::var(&env_key) {
                *scalar = coerce_scalar(&raw);
            }
        }
    }
}

fn coerce_scalar(raw: &str) -> serde_yaml::Value {
    if let Ok(b) = raw.parse::<bool>() {
        return serde_yaml::Value::Bool(b);
    }
    if let Ok(n) = raw.parse::<i64>() {
        return serde_yaml::Value::Number(n.into());
    }
    serde_yaml::Value::String(raw.to_string())
}
