use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use scim_provisioning_server::config::AppConfig;
use scim_provisioning_server::http::build_router;
use scim_provisioning_server::startup::build_store;

#[derive(Parser, Debug)]
struct Cli {
    /// Path to a YAML configuration file. Falls back to an unauthenticated,
    /// in-memory store when omitted.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match cli.config {
        Some(path) => AppConfig::load_from_file(&path)
            .map_err(|e| format!("failed to load config from {}: {}", path, e))?,
        None => AppConfig::default_config(),
    };
    let config = Arc::new(config);

    let store = build_store(&config).await?;
    let app = build_router(config.clone(), store);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!(%addr, "starting scim provisioning server");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
