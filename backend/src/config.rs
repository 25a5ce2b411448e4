//! Server configuration
//!
//! Read from command line flags, falling back to environment variables
//! (a `.env` file is loaded first by `main`).

use clap::Parser;
use std::net::SocketAddr;

#[derive(Parser, Debug, Clone)]
#[command(name = "backend", about = "Chess game server")]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for HTTP and WebSocket traffic
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// SQLite URL. In-memory storage is used when unset.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Size of the SQLite connection pool
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|err| anyhow::anyhow!("invalid bind address {}: {}", addr, err))
    }
}
