//! WebSocket message types.
//!
//! Frames exchanged with the endpoint are opaque text. This module only
//! defines what the client attaches to them locally and where inbound
//! frames are reported.
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | handshake | Local → Remote | Sent once when the connection opens |
//! | [`InboundMessage`] | Remote → Local | Forwarded to a [`DiagnosticSink`] |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | Inbound message envelope and protocol constants |
//! | `sink` | Diagnostic sinks for inbound messages |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound message envelope and protocol constants.
pub mod message;

/// Diagnostic sinks.
pub mod sink;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{DEFAULT_HANDSHAKE, InboundMessage};
pub use sink::{DiagnosticSink, MemorySink, TracingSink};
