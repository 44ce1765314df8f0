//! Error types for the smart factory client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use smart_factory_client::{Client, Result};
//!
//! async fn example(client: &Client) -> Result<()> {
//!     let connection = client.connect().await?;
//!     connection.send_text("ping").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Transport | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`], [`Error::RetriesExhausted`] |
//! | Module | [`Error::ModuleInit`], [`Error::ModuleNotInitialized`], [`Error::ModuleCall`], [`Error::ChainAborted`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::ChainId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the connection cannot be established or a send fails.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection attempt timed out.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// WebSocket connection closed.
    ///
    /// Returned when operating on a connection whose event loop has ended.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Supervisor gave up reconnecting.
    #[error("Gave up after {attempts} consecutive connection failures")]
    RetriesExhausted {
        /// Number of consecutive failed attempts.
        attempts: u32,
    },

    // ========================================================================
    // Module Errors
    // ========================================================================
    /// The greeter module's initializer failed.
    #[error("Module initialization failed: {message}")]
    ModuleInit {
        /// Description of the initialization failure.
        message: String,
    },

    /// A module function was called before initialization completed.
    #[error("Module not initialized")]
    ModuleNotInitialized,

    /// A module function call failed.
    #[error("Module call failed: {message}")]
    ModuleCall {
        /// Description of the call failure.
        message: String,
    },

    /// A click chain task was cancelled or panicked.
    #[error("Chain {chain_id} aborted")]
    ChainAborted {
        /// The chain that did not complete.
        chain_id: ChainId,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Endpoint URL parse error.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a retries exhausted error.
    #[inline]
    pub fn retries_exhausted(attempts: u32) -> Self {
        Self::RetriesExhausted { attempts }
    }

    /// Creates a module initialization error.
    #[inline]
    pub fn module_init(message: impl Into<String>) -> Self {
        Self::ModuleInit {
            message: message.into(),
        }
    }

    /// Creates a module call error.
    #[inline]
    pub fn module_call(message: impl Into<String>) -> Self {
        Self::ModuleCall {
            message: message.into(),
        }
    }

    /// Creates a chain aborted error.
    #[inline]
    pub fn chain_aborted(chain_id: ChainId) -> Self {
        Self::ChainAborted { chain_id }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectionTimeout { .. })
    }

    /// Returns `true` if this is a transport failure.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::RetriesExhausted { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is a greeter module failure.
    #[inline]
    #[must_use]
    pub fn is_module_error(&self) -> bool {
        matches!(
            self,
            Self::ModuleInit { .. }
                | Self::ModuleNotInitialized
                | Self::ModuleCall { .. }
                | Self::ChainAborted { .. }
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::ModuleInit { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
