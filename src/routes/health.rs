//! Health check endpoints
//!
//! Provides Kubernetes-style health probes:
//! - /health, /healthz - Liveness probe (is the service running?)
//! - /ready, /readyz - Readiness probe (is the service ready for traffic?)
//!
//! Liveness probes return 200 whenever the process is up, regardless of
//! store status. Readiness probes ping the store and return 503 until it
//! answers, since without the store no pairing can happen.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::server::AppState;

/// Liveness response payload
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall health status (true if service is running)
    pub healthy: bool,
    /// Service status for UI display: 'online' or 'degraded'
    pub status: &'static str,
    /// Service version
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    /// Current timestamp
    pub timestamp: String,
    /// Node identifier
    pub node_id: String,
    /// Active WebSocket connections
    pub connections: usize,
}

/// Store connectivity details
#[derive(Serialize)]
pub struct StoreHealth {
    /// Whether the store answered a ping
    pub connected: bool,
}

/// Readiness response payload
#[derive(Serialize)]
pub struct ReadyResponse {
    /// Whether the service can pair guests right now
    pub ready: bool,
    /// Service version
    pub version: &'static str,
    /// Store connectivity
    pub store: StoreHealth,
    /// Error message if the store is unreachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn build_health_response(state: &AppState) -> HealthResponse {
    let uptime = (chrono::Utc::now() - state.started_at)
        .num_seconds()
        .max(0) as u64;

    HealthResponse {
        healthy: true,
        status: "online",
        version: env!("CARGO_PKG_VERSION"),
        uptime,
        timestamp: chrono::Utc::now().to_rfc3339(),
        node_id: state.args.node_id.to_string(),
        connections: state.engine.registry().connection_count(),
    }
}

/// Handle liveness probe (/health, /healthz)
///
/// Returns 200 OK whenever the service is running. Store connectivity is
/// deliberately not consulted here; use /ready for that.
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = build_health_response(&state);

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"healthy":true,"error":"Serialization failed"}"#.to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Handle readiness probe (/ready, /readyz)
///
/// Returns 200 OK only if the store answers a ping. Use this endpoint for
/// load balancer health checks; a node that cannot reach the store accepts
/// sockets but can never pair them.
pub async fn readiness_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let (connected, error) = match state.store.ping().await {
        Ok(()) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };

    let response = ReadyResponse {
        ready: connected,
        version: env!("CARGO_PKG_VERSION"),
        store: StoreHealth { connected },
        error,
    };

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"ready":false,"error":"Serialization failed"}"#.to_string());

    let status = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Version information for deployment verification
#[derive(Serialize)]
pub struct VersionResponse {
    /// Cargo package version
    pub version: &'static str,
    /// Git commit hash (short)
    pub commit: &'static str,
    /// Git commit hash (full)
    pub commit_full: &'static str,
    /// Build timestamp
    pub build_time: &'static str,
    /// Service name
    pub service: &'static str,
}

/// Handle version endpoint (/version)
///
/// Returns build information for deployment verification.
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "alcove",
    };

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"version":"unknown","commit":"unknown"}"#.to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
