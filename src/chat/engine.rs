//! Pairing engine
//!
//! Orchestrates the per-connection lifecycle: Connecting -> Waiting or
//! Paired -> Closed. The state itself lives in the durable store (queue
//! membership, pair records), never in process memory, so independent
//! connection tasks agree on who talks to whom purely through store
//! operations. Each connection's events arrive strictly in order on its own
//! task; nothing here assumes anything about interleaving across connections
//! beyond the atomicity of the queue pop.

use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::chat::{ConnId, GuestId, PairStore, Relay, SessionRegistry, SharedOutbound, WaitingQueue};
use crate::store::KvStore;
use crate::types::Result;

/// Match-or-wait pairing over a shared durable store
pub struct PairingEngine {
    registry: Arc<SessionRegistry>,
    queue: WaitingQueue,
    pairs: PairStore,
    relay: Relay,
}

impl PairingEngine {
    /// Build the engine and its relay over one store handle
    pub fn new(store: Arc<dyn KvStore>, registry: Arc<SessionRegistry>, echo_self: bool) -> Self {
        let queue = WaitingQueue::new(Arc::clone(&store));
        let pairs = PairStore::new(Arc::clone(&store));
        let relay = Relay::new(Arc::clone(&registry), pairs.clone(), echo_self);
        Self {
            registry,
            queue,
            pairs,
            relay,
        }
    }

    /// The session registry this engine binds connections into
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Guests currently waiting for a partner
    pub async fn waiting_count(&self) -> Result<u64> {
        self.queue.len().await
    }

    /// A new connection opened: claim the oldest waiting guest or start waiting
    ///
    /// Dequeued identifiers whose owner already disconnected are discarded
    /// and the claim loop re-runs. A partner that vanishes between the
    /// liveness check and the pair write is caught by re-checking afterwards;
    /// the half-made pairing is torn down and the loop re-runs, so nobody
    /// ends up paired with a ghost.
    pub async fn handle_connect(&self, conn: ConnId, outbound: SharedOutbound) -> Result<GuestId> {
        let me = self.registry.bind(conn, outbound);

        loop {
            let candidate = match self.queue.try_dequeue().await {
                Ok(candidate) => candidate,
                Err(e) => {
                    // claim failed, but the connection is still worth queueing
                    warn!("Chat: dequeue failed for {:?}, enqueueing instead: {}", me, e);
                    None
                }
            };

            match candidate {
                Some(partner) => {
                    if !self.registry.is_connected(&partner) {
                        debug!("Chat: discarding stale waiting entry {:?}", partner);
                        continue;
                    }

                    self.pairs.pair(&me, &partner).await?;

                    if !self.registry.is_connected(&partner) {
                        self.pairs.unpair(&me, &partner).await?;
                        debug!("Chat: partner {:?} vanished mid-claim, retrying", partner);
                        continue;
                    }

                    let delivered = self.relay.notify_joined(&me, &partner).await?;
                    info!(
                        "Chat: paired {:?} with {:?} ({} notified)",
                        me, partner, delivered
                    );
                    return Ok(me);
                }
                None => {
                    self.queue.enqueue(&me).await?;
                    info!("Chat: {:?} waiting for a partner", me);
                    return Ok(me);
                }
            }
        }
    }

    /// An inbound chat frame: forward it to the sender's partner
    ///
    /// The frame is relayed as received. The registry lookup re-binds if the
    /// connection somehow lost its identifier, so the frame proceeds (then
    /// necessarily unpaired) rather than being dropped on the floor.
    pub async fn handle_message(
        &self,
        conn: ConnId,
        outbound: &SharedOutbound,
        frame: Message,
    ) -> Result<usize> {
        let me = self.registry.bind(conn, Arc::clone(outbound));
        self.relay.relay_chat(&me, frame).await
    }

    /// A connection closed: tear down its pairing and notify the partner
    ///
    /// Idempotent; closing an unknown or already-closed handle is a no-op.
    /// A guest that closes while waiting leaves its queue entry behind, and
    /// the next connect's liveness check discards it.
    pub async fn handle_close(&self, conn: ConnId) -> Result<()> {
        let Some(me) = self.registry.unbind(conn) else {
            return Ok(());
        };

        match self.pairs.lookup(&me).await? {
            Some(partner) => {
                self.pairs.unpair(&me, &partner).await?;
                let delivered = self.relay.notify_left(&partner).await?;
                info!(
                    "Chat: {:?} left, partner {:?} notified ({})",
                    me, partner, delivered
                );
            }
            None => {
                info!("Chat: {:?} left unpaired", me);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{Outbound, WireMessage, EVENT_SYSTEM};
    use crate::store::MemoryStore;
    use tokio::sync::mpsc;

    struct ChannelOutbound {
        tx: mpsc::UnboundedSender<Message>,
    }

    #[async_trait::async_trait]
    impl Outbound for ChannelOutbound {
        async fn send(&self, frame: Message) -> bool {
            self.tx.send(frame).is_ok()
        }
    }

    fn engine() -> PairingEngine {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let registry = Arc::new(SessionRegistry::new(16));
        PairingEngine::new(store, registry, true)
    }

    fn outbound() -> (SharedOutbound, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(ChannelOutbound { tx }), rx)
    }

    #[tokio::test]
    async fn test_first_connect_waits() {
        let engine = engine();
        let (out, mut rx) = outbound();

        let conn = engine.registry().next_conn_id();
        engine.handle_connect(conn, out).await.unwrap();

        assert_eq!(engine.waiting_count().await.unwrap(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_second_connect_pairs_and_notifies_both() {
        let engine = engine();
        let (out_a, mut rx_a) = outbound();
        let (out_b, mut rx_b) = outbound();

        let a = engine
            .handle_connect(engine.registry().next_conn_id(), out_a)
            .await
            .unwrap();
        let b = engine
            .handle_connect(engine.registry().next_conn_id(), out_b)
            .await
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(engine.waiting_count().await.unwrap(), 0);

        for rx in [&mut rx_a, &mut rx_b] {
            let frame = rx.try_recv().expect("joined notice");
            let Message::Text(raw) = frame else {
                panic!("expected text frame");
            };
            let msg = WireMessage::from_json(&raw).unwrap();
            assert_eq!(msg.event, EVENT_SYSTEM);
            assert_eq!(msg.content, "joined the chat");
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn test_close_unknown_conn_is_noop() {
        let engine = engine();
        let conn = engine.registry().next_conn_id();
        engine.handle_close(conn).await.unwrap();
        engine.handle_close(conn).await.unwrap();
    }
}
