//! Diagnostic sinks for inbound messages.
//!
//! A connection hands every inbound text frame to exactly one sink call.
//! Sinks observe, they never reply.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use super::InboundMessage;

// ============================================================================
// DiagnosticSink
// ============================================================================

/// Receives inbound messages for diagnostics.
///
/// Called from the connection event loop, so implementations must not block.
pub trait DiagnosticSink: Send + Sync {
    /// Records one inbound message.
    fn record(&self, message: &InboundMessage);
}

// ============================================================================
// TracingSink
// ============================================================================

/// Default sink: one `info` record per message.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, message: &InboundMessage) {
        info!(
            connection = %message.connection,
            sequence = message.sequence,
            payload = %message.payload,
            "Message received"
        );
    }
}

// ============================================================================
// MemorySink
// ============================================================================

/// Sink that keeps every message in memory.
///
/// Cloning shares the underlying buffer.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<InboundMessage>>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all recorded messages in arrival order.
    #[must_use]
    pub fn records(&self) -> Vec<InboundMessage> {
        self.records.lock().clone()
    }

    /// Returns just the payloads in arrival order.
    #[must_use]
    pub fn payloads(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|m| m.payload.clone())
            .collect()
    }

    /// Returns the number of recorded messages.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns `true` if nothing has been recorded.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, message: &InboundMessage) {
        self.records.lock().push(message.clone());
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::identifiers::ConnectionId;

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        let id = ConnectionId::generate();

        sink.record(&InboundMessage::new(id, 1, "a"));
        sink.record(&InboundMessage::new(id, 2, "b"));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.payloads(), vec!["a", "b"]);
    }

    #[test]
    fn test_memory_sink_clone_shares_buffer() {
        let sink = MemorySink::new();
        let shared = sink.clone();

        shared.record(&InboundMessage::new(ConnectionId::generate(), 1, "X"));

        assert!(!sink.is_empty());
        assert_eq!(sink.records()[0].payload, "X");
    }

    #[test]
    fn test_tracing_sink_does_not_panic() {
        TracingSink.record(&InboundMessage::new(ConnectionId::generate(), 1, "X"));
    }
}
