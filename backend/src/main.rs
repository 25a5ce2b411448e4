use anyhow::Context;
use backend::api;
use backend::config::ServerConfig;
use backend::data_access::{DataAccess, MemoryDataAccess, SqliteDataAccess};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::parse();

    let data: Arc<dyn DataAccess> = match &config.database_url {
        Some(url) => {
            info!(url = %url, "Using SQLite storage");
            let sqlite = SqliteDataAccess::connect(url, config.max_connections)
                .await
                .with_context(|| format!("failed to open database {}", url))?;
            Arc::new(sqlite)
        }
        None => {
            info!("Using in-memory storage");
            Arc::new(MemoryDataAccess::new())
        }
    };

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "Chess server listening");

    axum::serve(listener, api::router(data))
        .await
        .context("server error")?;
    Ok(())
}
