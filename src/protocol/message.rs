//! Inbound message envelope.
//!
//! The payload is never parsed; the envelope only records arrival order
//! and the connection it came from.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

use crate::identifiers::ConnectionId;

// ============================================================================
// Constants
// ============================================================================

/// Payload sent once when a connection opens.
pub const DEFAULT_HANDSHAKE: &str = "Hello, World";

// ============================================================================
// InboundMessage
// ============================================================================

/// A text frame received from the endpoint.
///
/// # Format
///
/// ```json
/// {
///   "connection": "6f1c…",
///   "sequence": 1,
///   "payload": "Hello, Hello, World!"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InboundMessage {
    /// Connection the frame arrived on.
    pub connection: ConnectionId,

    /// 1-based arrival index within the connection.
    pub sequence: u64,

    /// Raw frame text.
    pub payload: String,
}

impl InboundMessage {
    /// Creates a new inbound message.
    #[inline]
    #[must_use]
    pub fn new(connection: ConnectionId, sequence: u64, payload: impl Into<String>) -> Self {
        Self {
            connection,
            sequence,
            payload: payload.into(),
        }
    }

    /// Returns the payload as a string slice.
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.payload
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_literal() {
        assert_eq!(DEFAULT_HANDSHAKE, "Hello, World");
    }

    #[test]
    fn test_inbound_message_serializes_payload() {
        let id = ConnectionId::generate();
        let message = InboundMessage::new(id, 1, "X");
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["sequence"], 1);
        assert_eq!(json["payload"], "X");
        assert_eq!(json["connection"], id.to_string());
        assert_eq!(message.text(), "X");
    }
}
