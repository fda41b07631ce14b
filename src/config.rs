//! Configuration for Alcove
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Alcove - anonymous pair-chat relay
#[derive(Parser, Debug, Clone)]
#[command(name = "alcove")]
#[command(about = "Anonymous one-to-one chat relay over WebSocket")]
pub struct Args {
    /// Unique node identifier for this relay instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// Redis connection URL
    /// Pairing state (waiting queue + pair records) lives here
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    pub redis_url: String,

    /// Redis password (overrides any password embedded in REDIS_URL)
    #[arg(long, env = "REDIS_PASSWORD")]
    pub redis_password: Option<String>,

    /// Redis logical database index
    #[arg(long, env = "REDIS_DB", default_value = "0")]
    pub redis_db: i64,

    /// Maximum concurrent chat connections
    #[arg(long, env = "MAX_CLIENTS")]
    pub max_clients: Option<usize>,

    /// Relay chat frames back to their sender as well as to the partner
    /// Clients render their own messages from the echo instead of locally
    #[arg(long, env = "ECHO_SELF", default_value = "true")]
    pub echo_self: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if let Some(max) = self.max_clients {
            if max < 2 {
                return Err("MAX_CLIENTS must be at least 2 (pairing needs two connections)".to_string());
            }
        }

        if self.redis_db < 0 {
            return Err("REDIS_DB must be non-negative".to_string());
        }

        Ok(())
    }
}
