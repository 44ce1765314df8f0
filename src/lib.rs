//! Smart factory client - logo view, greeter module and factory link.
//!
//! This library provides the two halves of the smart factory front end:
//!
//! - **Connection**: opens a WebSocket to the factory endpoint, sends a
//!   fixed handshake once the link is ready and hands every inbound message
//!   to a diagnostic sink.
//! - **View**: a static tree with one clickable logo. A click initializes
//!   the external greeter module and, once that completes, calls
//!   `greet("WebAssembly")`.
//!
//! The halves share nothing at runtime. A slow or unreachable endpoint never
//! blocks a click, and a pending click never delays inbound messages.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use smart_factory_client::{Client, NativeGreeter, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder()
//!         .endpoint("ws://localhost:8080")
//!         .build()?;
//!
//!     // Connection and view start independently
//!     let session = client.start(Arc::new(NativeGreeter::new()));
//!     println!("{} interactive element(s)", session.app.render().interactive_count());
//!
//!     if let Some(chain) = session.app.click().into_handle() {
//!         println!("{}", chain.join().await?);
//!     }
//!
//!     session.shutdown().await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`], [`ClientBuilder`], [`ClientOptions`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`module`] | [`GreeterModule`] contract and [`NativeGreeter`] |
//! | [`protocol`] | Handshake, inbound messages and diagnostic sinks |
//! | [`transport`] | Connection, supervisor and greeting server |
//! | [`view`] | [`App`] component and UI tree |

// ============================================================================
// Modules
// ============================================================================

/// Client entry point.
///
/// Use [`Client::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for connections and click chains.
pub mod identifiers;

/// Greeter module contract.
pub mod module;

/// Handshake text, inbound message type and sinks.
pub mod protocol;

/// WebSocket transport layer.
pub mod transport;

/// Logo view and click chains.
pub mod view;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder, ClientOptions, Session};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ChainId, ConnectionId};

// Module types
pub use module::{GreeterModule, NativeGreeter, greet_message};

// Protocol types
pub use protocol::{DEFAULT_HANDSHAKE, DiagnosticSink, InboundMessage, MemorySink, TracingSink};

// Transport types
pub use transport::{
    Connection, ConnectionOptions, ConnectionState, GreetingServer, ReconnectPolicy, ServerHandle,
    Supervisor, SupervisorHandle,
};

// View types
pub use view::{App, ChainHandle, ChainState, ClickOutcome, ClickPolicy, Node, ViewOptions, render};
