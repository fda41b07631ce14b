//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Everything is served
//! from one listener: health probes and status as plain GET endpoints, the
//! chat service as a WebSocket upgrade at /ws.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::chat::{self, PairingEngine, SessionRegistry, DEFAULT_MAX_CLIENTS};
use crate::config::Args;
use crate::routes;
use crate::store::KvStore;
use crate::types::Result;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Durable store backing the waiting queue and pair records
    pub store: Arc<dyn KvStore>,
    /// Pairing engine shared by every chat connection
    pub engine: Arc<PairingEngine>,
    /// Process start time, for uptime reporting
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Create AppState over an already-connected store
    pub fn new(args: Args, store: Arc<dyn KvStore>) -> Self {
        let max_clients = args.max_clients.unwrap_or(DEFAULT_MAX_CLIENTS);
        let registry = Arc::new(SessionRegistry::new(max_clients));
        let engine = Arc::new(PairingEngine::new(
            Arc::clone(&store),
            registry,
            args.echo_self,
        ));

        Self {
            args,
            store,
            engine,
            started_at: chrono::Utc::now(),
        }
    }
}

/// Run the HTTP server (accept loop)
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Alcove listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    let max_clients = state.args.max_clients.unwrap_or(DEFAULT_MAX_CLIENTS);
    info!("Chat service enabled at /ws (max {} clients)", max_clients);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .with_upgrades()
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        // Liveness probe - returns 200 if the process is up
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state))
        }

        // Readiness probe - returns 200 only if the store answers
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            routes::readiness_check(Arc::clone(&state)).await
        }

        // Version info for deployment verification
        (Method::GET, "/version") => routes::version_info(),

        // Runtime stats (connections, waiting guests, store health)
        (Method::GET, "/status") => routes::status_check(Arc::clone(&state)).await,

        // CORS preflight
        (Method::OPTIONS, _) => preflight_response(),

        // WebSocket upgrade for the chat service
        (Method::GET, "/ws") => {
            if hyper_tungstenite::is_upgrade_request(&req) {
                chat::handle_chat_upgrade(Arc::clone(&state.engine), req, addr).await
            } else {
                bad_request_response("WebSocket upgrade required for /ws")
            }
        }

        _ => not_found_response(&path),
    };

    Ok(response)
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
        "hint": "Connect via WebSocket at /ws"
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

/// Bad request response
fn bad_request_response(message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Bad Request",
        "message": message
    });

    Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
