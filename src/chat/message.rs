//! Chat wire format
//!
//! Every frame on the wire is a UTF-8 JSON object with three string fields:
//! `event`, `name`, `content`. User traffic carries event "chat" and is
//! relayed byte-for-byte, never re-serialized; the relay only ever *builds*
//! system frames, it does not parse user ones. A mis-shaped payload therefore
//! still reaches the partner unchanged.

use serde::{Deserialize, Serialize};

/// Event tag on user chat traffic
pub const EVENT_CHAT: &str = "chat";

/// Event tag on system notifications (partner joined/left)
pub const EVENT_SYSTEM: &str = "other";

/// A chat frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub event: String,
    pub name: String,
    pub content: String,
}

impl WireMessage {
    /// Build a frame from its parts
    pub fn new(event: &str, name: &str, content: &str) -> Self {
        Self {
            event: event.to_string(),
            name: name.to_string(),
            content: content.to_string(),
        }
    }

    /// System frame announcing that the partner has joined
    pub fn partner_joined() -> Self {
        Self::new(EVENT_SYSTEM, "partner", "joined the chat")
    }

    /// System frame announcing that the partner has left
    pub fn partner_left() -> Self {
        Self::new(EVENT_SYSTEM, "partner", "left the chat")
    }

    /// Encode as the JSON wire form
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode from the JSON wire form
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let msg = WireMessage::new(EVENT_CHAT, "anon", "hello there");
        let json = msg.to_json().unwrap();
        let back = WireMessage::from_json(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_field_names_on_the_wire() {
        let json = WireMessage::new(EVENT_CHAT, "a", "b").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["event"], "chat");
        assert_eq!(value["name"], "a");
        assert_eq!(value["content"], "b");
    }

    #[test]
    fn test_system_frames() {
        let joined = WireMessage::partner_joined();
        assert_eq!(joined.event, EVENT_SYSTEM);
        assert_eq!(joined.content, "joined the chat");

        let left = WireMessage::partner_left();
        assert_eq!(left.event, EVENT_SYSTEM);
        assert_eq!(left.content, "left the chat");
        assert_eq!(left.name, joined.name);
    }

    #[test]
    fn test_unknown_fields_tolerated() {
        let raw = r#"{"event":"chat","name":"anon","content":"hi","extra":42}"#;
        let msg = WireMessage::from_json(raw).unwrap();
        assert_eq!(msg.content, "hi");
    }

    #[test]
    fn test_missing_field_rejected() {
        let raw = r#"{"event":"chat","name":"anon"}"#;
        assert!(WireMessage::from_json(raw).is_err());
    }
}
