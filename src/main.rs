//! Alcove - anonymous one-to-one chat over WebSocket

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use alcove::{
    chat::DEFAULT_MAX_CLIENTS,
    config::Args,
    server,
    store::{KvStore, RedisStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("alcove={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Alcove - Anonymous Chat Pairing");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Redis: {} (db {})", args.redis_url, args.redis_db);
    info!(
        "Max clients: {}",
        args.max_clients.unwrap_or(DEFAULT_MAX_CLIENTS)
    );
    info!("Self echo: {}", args.echo_self);
    info!("======================================");

    // Connect to Redis; all pairing state lives there, so failure is fatal
    let store = match RedisStore::connect(&args).await {
        Ok(store) => {
            info!("Redis connected successfully");
            store
        }
        Err(e) => {
            error!("Redis connection failed: {}", e);
            std::process::exit(1);
        }
    };
    let store: Arc<dyn KvStore> = Arc::new(store);

    // Create application state
    let state = Arc::new(server::AppState::new(args, store));

    // Run the server
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
