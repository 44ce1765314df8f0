//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`Client`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use smart_factory_client::{Client, ReconnectPolicy};
//!
//! # fn example() -> smart_factory_client::Result<()> {
//! let client = Client::builder()
//!     .endpoint("ws://localhost:8080")
//!     .connect_timeout(Duration::from_secs(5))
//!     .reconnect(ReconnectPolicy::default().with_max_attempts(10))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::protocol::{DiagnosticSink, TracingSink};
use crate::transport::{ReconnectPolicy, duration_to_millis};
use crate::view::ClickPolicy;

use super::core::Client;
use super::options::ClientOptions;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder. Every setting starts
/// at its [`ClientOptions`] default.
#[derive(Clone, Default)]
pub struct ClientBuilder {
    /// Accumulated options.
    options: ClientOptions,
    /// Receiver for inbound messages. Defaults to [`TracingSink`].
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("options", &self.options)
            .field("custom_sink", &self.sink.is_some())
            .finish()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new builder with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every setting with `options`.
    ///
    /// Useful after [`ClientOptions::from_file`].
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the WebSocket endpoint.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - `ws://` or `wss://` URL (e.g., "ws://localhost:8080")
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.options.endpoint = endpoint.into();
        self
    }

    /// Sets the text sent once per opened connection.
    #[inline]
    #[must_use]
    pub fn handshake(mut self, handshake: impl Into<String>) -> Self {
        self.options.handshake = handshake.into();
        self
    }

    /// Sets the argument passed to `greet` on click.
    #[inline]
    #[must_use]
    pub fn greet_target(mut self, target: impl Into<String>) -> Self {
        self.options.greet_target = target.into();
        self
    }

    /// Sets the logo image source.
    #[inline]
    #[must_use]
    pub fn logo_path(mut self, path: impl Into<String>) -> Self {
        self.options.logo_path = path.into();
        self
    }

    /// Sets the upper bound on a single connect attempt.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout_ms = duration_to_millis(timeout);
        self
    }

    /// Sets how clicks behave while a chain is pending.
    #[inline]
    #[must_use]
    pub fn click_policy(mut self, policy: ClickPolicy) -> Self {
        self.options.click_policy = policy;
        self
    }

    /// Sets the reconnect policy for supervised connections.
    #[inline]
    #[must_use]
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.options.reconnect = policy;
        self
    }

    /// Sets the receiver for inbound messages.
    #[inline]
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`](crate::Error::Url) if the endpoint is not a URL
    /// - [`Error::Config`](crate::Error::Config) if the endpoint scheme is
    ///   wrong, the timeout is zero or the reconnect policy is inconsistent
    pub fn build(self) -> Result<Client> {
        self.options.validate()?;
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        Client::new(self.options, sink)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::Error;
    use crate::protocol::MemorySink;

    #[test]
    fn test_new_uses_defaults() {
        let builder = ClientBuilder::new();
        assert_eq!(builder.options, ClientOptions::default());
        assert!(builder.sink.is_none());
    }

    #[test]
    fn test_setters() {
        let builder = ClientBuilder::new()
            .endpoint("ws://127.0.0.1:9000")
            .handshake("ping")
            .greet_target("Factory")
            .logo_path("logo.png")
            .connect_timeout(Duration::from_millis(250))
            .click_policy(ClickPolicy::Concurrent)
            .reconnect(ReconnectPolicy::disabled());

        assert_eq!(builder.options.endpoint, "ws://127.0.0.1:9000");
        assert_eq!(builder.options.handshake, "ping");
        assert_eq!(builder.options.greet_target, "Factory");
        assert_eq!(builder.options.logo_path, "logo.png");
        assert_eq!(builder.options.connect_timeout_ms, 250);
        assert_eq!(builder.options.click_policy, ClickPolicy::Concurrent);
        assert!(!builder.options.reconnect.enabled);
    }

    #[test]
    fn test_sink_is_kept() {
        let builder = ClientBuilder::new().sink(Arc::new(MemorySink::new()));
        assert!(builder.sink.is_some());
        assert!(format!("{builder:?}").contains("custom_sink: true"));
    }

    #[test]
    fn test_build_valid() {
        let client = ClientBuilder::new().endpoint("ws://127.0.0.1:9000").build();
        assert!(client.is_ok());
    }

    #[test]
    fn test_build_rejects_bad_scheme() {
        let result = ClientBuilder::new().endpoint("ftp://127.0.0.1").build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_build_rejects_zero_timeout() {
        let result = ClientBuilder::new().connect_timeout(Duration::ZERO).build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_sub_millisecond_timeout_rounds_up() {
        let builder = ClientBuilder::new().connect_timeout(Duration::from_micros(300));
        assert_eq!(builder.options.connect_timeout_ms, 1);
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_options_replaces_all() {
        let options = ClientOptions {
            greet_target: "Line 2".into(),
            ..ClientOptions::default()
        };
        let builder = ClientBuilder::new().greet_target("ignored").options(options.clone());
        assert_eq!(builder.options, options);
    }
}
