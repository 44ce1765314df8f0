//! Client entry point.
//!
//! Composes the view and the connection from one set of options.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Validated configuration; opens connections and creates the view |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`ClientOptions`] | Serializable settings with defaults |
//! | [`Session`] | A running view plus supervised connection |
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use smart_factory_client::{Client, NativeGreeter, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = Client::builder().endpoint("ws://localhost:8080").build()?;
//! let session = client.start(Arc::new(NativeGreeter::new()));
//!
//! if let Some(chain) = session.app.click().into_handle() {
//!     println!("{}", chain.join().await?);
//! }
//!
//! session.shutdown().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Client and session.
pub mod core;

/// Serializable client settings.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::{Client, Session};
pub use options::{ClientOptions, DEFAULT_ENDPOINT};
