//! Server configuration from command-line flags and environment variables

use clap::Parser;
use std::net::SocketAddr;

#[derive(Debug, Clone, Parser)]
#[command(name = "leavedesk")]
#[command(about = "Leave request approval service")]
#[command(version)]
pub struct Config {
    /// SQLite connection string
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:leavedesk.db?mode=rwc")]
    pub database_url: String,

    /// Address the HTTP server binds to
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    pub listen_addr: SocketAddr,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Mail relay receiving leave notices; notices are only logged when unset
    #[arg(long, env = "NOTIFY_WEBHOOK_URL")]
    pub notify_webhook: Option<String>,
}
