//! Frame relay
//!
//! Decides who receives what. Chat frames go to the sender's partner and, in
//! echo mode, back to the sender; system notifications go to an explicit set
//! of guests. Everything is addressed through the registry's filtered
//! delivery, never a broadcast, so a waiting bystander hears nothing.

use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use crate::chat::{GuestId, PairStore, SessionRegistry, WireMessage};
use crate::types::Result;

/// Partner-scoped frame delivery
pub struct Relay {
    registry: Arc<SessionRegistry>,
    pairs: PairStore,
    echo_self: bool,
}

impl Relay {
    pub fn new(registry: Arc<SessionRegistry>, pairs: PairStore, echo_self: bool) -> Self {
        Self {
            registry,
            pairs,
            echo_self,
        }
    }

    /// Forward a chat frame from `from` to its partner, unparsed
    ///
    /// With echo on, the sender receives its own frame back; an unpaired
    /// sender then sees only the echo. With echo off, an unpaired sender's
    /// frame goes nowhere.
    pub async fn relay_chat(&self, from: &GuestId, frame: Message) -> Result<usize> {
        let partner = self.pairs.lookup(from).await?;

        let delivered = match (partner, self.echo_self) {
            (Some(partner), true) => {
                self.registry
                    .deliver_filtered(frame, |g| g == &partner || g == from)
                    .await
            }
            (Some(partner), false) => {
                self.registry.deliver_filtered(frame, |g| g == &partner).await
            }
            (None, true) => self.registry.deliver_filtered(frame, |g| g == from).await,
            (None, false) => 0,
        };

        debug!("Relay: chat frame from {:?} delivered to {}", from, delivered);
        Ok(delivered)
    }

    /// Tell both sides of a fresh pairing that their partner joined
    pub async fn notify_joined(&self, a: &GuestId, b: &GuestId) -> Result<usize> {
        let frame = Message::Text(WireMessage::partner_joined().to_json()?);
        Ok(self
            .registry
            .deliver_filtered(frame, |g| g == a || g == b)
            .await)
    }

    /// Tell `partner` that its counterpart left; nobody else hears about it
    pub async fn notify_left(&self, partner: &GuestId) -> Result<usize> {
        let frame = Message::Text(WireMessage::partner_left().to_json()?);
        Ok(self.registry.deliver_filtered(frame, |g| g == partner).await)
    }
}
