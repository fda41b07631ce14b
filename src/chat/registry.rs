//! Session registry
//!
//! Maps live connections to their guest identifiers and write halves.
//! Provides thread-safe liveness checks and filtered delivery for the relay;
//! the underlying map is never iterated by anything else.

use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;
use uuid::Uuid;

/// Per-process handle of one live connection
///
/// Minted by the registry, unique for the process lifetime, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Opaque guest identifier (UUIDv4 string)
///
/// Minted at bind time, immutable for the connection's lifetime. This is the
/// value stored in the waiting queue and the pair records.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct GuestId(Arc<str>);

impl GuestId {
    /// Mint a fresh identifier
    pub fn mint() -> Self {
        GuestId(Uuid::new_v4().to_string().into())
    }

    /// The identifier as stored in the durable store
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for GuestId {
    fn from(s: String) -> Self {
        GuestId(s.into())
    }
}

impl fmt::Display for GuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for GuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GuestId({}..)", self.0.get(..8).unwrap_or(&self.0))
    }
}

/// Transport write half as seen by the chat core
///
/// The server wraps the real WebSocket sink in this; tests substitute
/// channels. `send` returns false when the connection is gone, and the
/// caller skips it silently.
#[async_trait::async_trait]
pub trait Outbound: Send + Sync {
    async fn send(&self, frame: Message) -> bool;
}

/// Shared handle to a connection's write half
pub type SharedOutbound = Arc<dyn Outbound>;

/// What the registry holds per connection: the identifier and the way back out
struct Session {
    guest: GuestId,
    outbound: SharedOutbound,
}

/// Registry of live connections
///
/// Thread-safe map from connection handle to session binding, with a reverse
/// index for identifier liveness checks and a count against capacity.
pub struct SessionRegistry {
    sessions: DashMap<ConnId, Session>,
    /// Reverse index: which connection currently owns a guest identifier
    guests: DashMap<GuestId, ConnId>,
    count: AtomicUsize,
    max_connections: usize,
    next_id: AtomicU64,
}

impl SessionRegistry {
    /// Create a new registry with the given capacity
    pub fn new(max_connections: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            guests: DashMap::new(),
            count: AtomicUsize::new(0),
            max_connections,
            next_id: AtomicU64::new(1),
        }
    }

    /// Mint a connection handle for a newly accepted socket
    pub fn next_conn_id(&self) -> ConnId {
        ConnId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Check if the registry is at capacity
    pub fn is_at_capacity(&self) -> bool {
        self.count.load(Ordering::Relaxed) >= self.max_connections
    }

    /// Get the current connection count
    pub fn connection_count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Get the configured capacity
    pub fn capacity(&self) -> usize {
        self.max_connections
    }

    /// Look up the guest bound to a connection, minting one if absent
    ///
    /// Each connection's events run on a single task, so for a given handle
    /// this never races with itself. A connection whose binding went missing
    /// simply gets a fresh identifier.
    pub fn bind(&self, conn: ConnId, outbound: SharedOutbound) -> GuestId {
        if let Some(session) = self.sessions.get(&conn) {
            return session.guest.clone();
        }

        let guest = GuestId::mint();
        self.sessions.insert(
            conn,
            Session {
                guest: guest.clone(),
                outbound,
            },
        );
        self.guests.insert(guest.clone(), conn);
        self.count.fetch_add(1, Ordering::Relaxed);

        debug!(
            "Registry: bound {} as {:?}, count={}",
            conn,
            guest,
            self.count.load(Ordering::Relaxed)
        );
        guest
    }

    /// Remove a connection's binding, returning its guest if one existed
    ///
    /// Unbinding an unknown handle is a no-op, so close handling stays
    /// idempotent.
    pub fn unbind(&self, conn: ConnId) -> Option<GuestId> {
        let (_, session) = self.sessions.remove(&conn)?;
        self.guests.remove(&session.guest);
        self.count.fetch_sub(1, Ordering::Relaxed);

        debug!(
            "Registry: unbound {} ({:?}), count={}",
            conn,
            session.guest,
            self.count.load(Ordering::Relaxed)
        );
        Some(session.guest)
    }

    /// Check if a guest identifier belongs to a live connection
    pub fn is_connected(&self, guest: &GuestId) -> bool {
        self.guests.contains_key(guest)
    }

    /// Deliver a frame to every live connection whose guest matches the
    /// predicate, returning how many sends succeeded
    ///
    /// This is the only place the session map is iterated. Targets are
    /// snapshotted first so no map lock is held across an await; a send to a
    /// connection that died in between simply fails and is skipped.
    pub async fn deliver_filtered<F>(&self, frame: Message, pred: F) -> usize
    where
        F: Fn(&GuestId) -> bool,
    {
        let targets: Vec<SharedOutbound> = self
            .sessions
            .iter()
            .filter(|entry| pred(&entry.value().guest))
            .map(|entry| Arc::clone(&entry.value().outbound))
            .collect();

        let mut delivered = 0;
        for outbound in targets {
            if outbound.send(frame.clone()).await {
                delivered += 1;
            } else {
                debug!("Registry: delivery skipped, connection gone");
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn channel_outbound() -> (SharedOutbound, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(ChannelOutbound { tx }), rx)
    }

    #[test]
    fn test_conn_ids_unique() {
        let registry = SessionRegistry::new(8);
        let a = registry.next_conn_id();
        let b = registry.next_conn_id();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_bind_is_lookup_or_create() {
        let registry = SessionRegistry::new(8);
        let conn = registry.next_conn_id();
        let (outbound, _rx) = channel_outbound();

        let first = registry.bind(conn, Arc::clone(&outbound));
        let second = registry.bind(conn, outbound);
        assert_eq!(first, second);
        assert_eq!(registry.connection_count(), 1);
        assert!(registry.is_connected(&first));
    }

    #[tokio::test]
    async fn test_unbind_idempotent() {
        let registry = SessionRegistry::new(8);
        let conn = registry.next_conn_id();
        let (outbound, _rx) = channel_outbound();

        let guest = registry.bind(conn, outbound);
        assert_eq!(registry.unbind(conn), Some(guest.clone()));
        assert_eq!(registry.unbind(conn), None);
        assert!(!registry.is_connected(&guest));
        assert_eq!(registry.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_capacity_accounting() {
        let registry = SessionRegistry::new(2);
        let (out_a, _rx_a) = channel_outbound();
        let (out_b, _rx_b) = channel_outbound();

        assert!(!registry.is_at_capacity());
        registry.bind(registry.next_conn_id(), out_a);
        registry.bind(registry.next_conn_id(), out_b);
        assert!(registry.is_at_capacity());
    }

    #[tokio::test]
    async fn test_deliver_filtered_targets_only_matches() {
        let registry = SessionRegistry::new(8);
        let (out_a, mut rx_a) = channel_outbound();
        let (out_b, mut rx_b) = channel_outbound();

        let a = registry.bind(registry.next_conn_id(), out_a);
        let _b = registry.bind(registry.next_conn_id(), out_b);

        let delivered = registry
            .deliver_filtered(Message::Text("hi".to_string()), |g| g == &a)
            .await;

        assert_eq!(delivered, 1);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_deliver_skips_dead_outbound() {
        let registry = SessionRegistry::new(8);
        let (out_a, rx_a) = channel_outbound();
        let a = registry.bind(registry.next_conn_id(), out_a);
        drop(rx_a);

        let delivered = registry
            .deliver_filtered(Message::Text("hi".to_string()), |g| g == &a)
            .await;
        assert_eq!(delivered, 0);
    }
}
