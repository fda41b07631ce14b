//! Status endpoint for Alcove
//!
//! Provides runtime status information including active connections,
//! waiting guests, and store connectivity.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::server::AppState;

/// Connection registry stats
#[derive(Debug, Serialize)]
pub struct ConnectionStats {
    /// Active WebSocket connections
    pub active: usize,
    /// Maximum simultaneous connections
    pub capacity: usize,
}

/// Chat pairing stats
#[derive(Debug, Serialize)]
pub struct ChatStats {
    /// Guests waiting for a partner
    pub waiting: u64,
    /// Whether chat frames echo back to their sender
    pub echo_self: bool,
}

/// Store connectivity stats
#[derive(Debug, Serialize)]
pub struct StoreStats {
    /// Whether the store answered a ping
    pub connected: bool,
}

/// Status response payload
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service name
    pub service: &'static str,
    /// Service version
    pub version: &'static str,
    /// Node ID
    pub node_id: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// Current timestamp
    pub timestamp: String,
    /// Connection registry stats
    pub connections: ConnectionStats,
    /// Chat pairing stats
    pub chat: ChatStats,
    /// Store connectivity stats
    pub store: StoreStats,
}

/// Handle status endpoint (/status)
///
/// The waiting count comes from the shared store, so on a multi-node
/// deployment every node reports the same pool-wide figure.
pub async fn status_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let registry = state.engine.registry();

    let connected = state.store.ping().await.is_ok();
    let waiting = state.engine.waiting_count().await.unwrap_or(0);

    let uptime_seconds = (chrono::Utc::now() - state.started_at)
        .num_seconds()
        .max(0) as u64;

    let response = StatusResponse {
        service: "alcove",
        version: env!("CARGO_PKG_VERSION"),
        node_id: state.args.node_id.to_string(),
        uptime_seconds,
        timestamp: chrono::Utc::now().to_rfc3339(),
        connections: ConnectionStats {
            active: registry.connection_count(),
            capacity: registry.capacity(),
        },
        chat: ChatStats {
            waiting,
            echo_self: state.args.echo_self,
        },
        store: StoreStats { connected },
    };

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"service":"alcove","error":"Serialization failed"}"#.to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
