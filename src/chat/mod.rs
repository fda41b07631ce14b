//! Anonymous chat pairing service
//!
//! Pairs each connecting WebSocket guest with the oldest waiting stranger
//! and relays chat frames between the two for the life of the pairing.
//! Guests are anonymous; the server mints a random identifier per
//! connection and never asks who is behind it.
//!
//! Protocol:
//! - WS /ws - WebSocket connection, no authentication
//! - Frames are JSON: `{"event", "name", "content"}`
//! - `chat` events carry guest messages, relayed verbatim
//! - `other` events announce a partner joining or leaving
//!
//! Lifecycle:
//! - Connect: claim the oldest waiting guest, or join the queue
//! - Chat: frames relayed between the two partners
//! - Close: pair records cleared, the partner notified exactly once
//!
//! All pairing state (the waiting queue, the pair records) lives in the
//! durable store rather than process memory, so multiple server processes
//! sharing one store form a single pairing pool.

mod engine;
mod message;
mod pairs;
mod queue;
mod registry;
mod relay;

pub use engine::PairingEngine;
pub use message::{WireMessage, EVENT_CHAT, EVENT_SYSTEM};
pub use pairs::PairStore;
pub use queue::WaitingQueue;
pub use registry::{ConnId, GuestId, Outbound, SessionRegistry, SharedOutbound};
pub use relay::Relay;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use http_body_util::Full;
use hyper::{Response, StatusCode};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Store key under which the waiting queue lives
pub const WAIT_LIST_KEY: &str = "wait";

/// Default max clients
pub const DEFAULT_MAX_CLIENTS: usize = 32768;

/// Write half of an upgraded chat WebSocket
type WsSink = Arc<
    Mutex<
        futures_util::stream::SplitSink<
            hyper_tungstenite::WebSocketStream<hyper_util::rt::TokioIo<hyper::upgrade::Upgraded>>,
            Message,
        >,
    >,
>;

/// Outbound seam over the write half of a live WebSocket
struct WsOutbound {
    sink: WsSink,
}

#[async_trait::async_trait]
impl Outbound for WsOutbound {
    async fn send(&self, frame: Message) -> bool {
        let mut guard = self.sink.lock().await;
        guard.send(frame).await.is_ok()
    }
}

/// Handle WebSocket upgrade for a chat connection
pub async fn handle_chat_upgrade(
    engine: Arc<PairingEngine>,
    req: hyper::Request<hyper::body::Incoming>,
    addr: SocketAddr,
) -> Response<Full<Bytes>> {
    // Check if at capacity
    if engine.registry().is_at_capacity() {
        warn!("Chat: at capacity, rejecting {}", addr);
        return Response::builder()
            .status(StatusCode::SERVICE_UNAVAILABLE)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(r#"{"error": "Server at capacity"}"#)))
            .unwrap();
    }

    // Perform WebSocket upgrade
    let (response, websocket) = match hyper_tungstenite::upgrade(req, None) {
        Ok(upgrade) => upgrade,
        Err(e) => {
            warn!("Chat: WebSocket upgrade failed for {}: {}", addr, e);
            return Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .header("Content-Type", "application/json")
                .body(Full::new(Bytes::from(format!(
                    r#"{{"error": "WebSocket upgrade failed: {e}"}}"#
                ))))
                .unwrap();
        }
    };

    // Spawn handler task
    tokio::spawn(async move {
        match websocket.await {
            Ok(ws) => {
                handle_chat_connection(engine, ws, addr).await;
            }
            Err(e) => {
                warn!("Chat: WebSocket connection failed: {}", e);
            }
        }
    });

    response.map(|_| Full::new(Bytes::new()))
}

/// Handle an established chat WebSocket connection
async fn handle_chat_connection(
    engine: Arc<PairingEngine>,
    ws: hyper_tungstenite::WebSocketStream<hyper_util::rt::TokioIo<hyper::upgrade::Upgraded>>,
    addr: SocketAddr,
) {
    let (write, mut read) = ws.split();
    let write = Arc::new(Mutex::new(write));
    let outbound: SharedOutbound = Arc::new(WsOutbound {
        sink: Arc::clone(&write),
    });

    let conn = engine.registry().next_conn_id();
    info!("Chat: new connection {} from {}", conn, addr);

    match engine.handle_connect(conn, Arc::clone(&outbound)).await {
        Ok(guest) => debug!("Chat: {} is {:?}", conn, guest),
        Err(e) => {
            // Store trouble; the socket stays open but unmatched until the
            // guest sends something or reconnects
            warn!("Chat: connect handling failed for {}: {}", conn, e);
        }
    }

    // Frame relay loop
    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                debug!("Chat: read error on {}: {}", conn, e);
                break;
            }
        };

        match msg {
            Message::Text(_) | Message::Binary(_) => {
                if let Err(e) = engine.handle_message(conn, &outbound, msg).await {
                    warn!("Chat: dropping frame from {}: {}", conn, e);
                }
            }
            Message::Ping(data) => {
                let _ = outbound.send(Message::Pong(data)).await;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Cleanup
    if let Err(e) = engine.handle_close(conn).await {
        warn!("Chat: close handling failed for {}: {}", conn, e);
    }
    let _ = write.lock().await.close().await;
    info!("Chat: disconnected {}", conn);
}
