//! WebSocket transport layer.
//!
//! This module handles the link between the client and the factory
//! endpoint, plus a small greeting server used by the demos and tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Client (Rust)  │                              │  Endpoint       │
//! │                 │         WebSocket            │                 │
//! │  Supervisor     │◄────────────────────────────►│  GreetingServer │
//! │  → Connection   │      ws://localhost:8080     │  (or any peer)  │
//! │  → Sink         │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::connect` - TCP connect plus upgrade, bounded by a timeout
//! 2. Event loop sends the handshake once, state becomes `Open`
//! 3. Every inbound text frame is recorded to the diagnostic sink
//! 4. Remote close or error ends the loop (`Closed` / `Failed`)
//! 5. `Supervisor` backs off and opens a new connection
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection and event loop |
//! | `server` | Greeting server binding and accept loop |
//! | `supervisor` | Reconnect loop with bounded backoff |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// Greeting server.
pub mod server;

/// Supervised reconnecting connection.
pub mod supervisor;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{
    Connection, ConnectionOptions, ConnectionState, DEFAULT_CONNECT_TIMEOUT, duration_to_millis,
};
pub use server::{GreetingServer, ServerHandle};
pub use supervisor::{ReconnectPolicy, Supervisor, SupervisorHandle};
