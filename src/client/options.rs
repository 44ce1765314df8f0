//! Client configuration.
//!
//! [`ClientOptions`] carries every setting the client needs and can be
//! deserialized from JSON. Missing fields take their defaults.
//!
//! # Example
//!
//! ```
//! use smart_factory_client::ClientOptions;
//!
//! # fn example() -> smart_factory_client::Result<()> {
//! let options = ClientOptions::from_json_str(r#"{ "endpoint": "ws://10.0.0.5:9000" }"#)?;
//! assert_eq!(options.handshake, "Hello, World");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::module::DEFAULT_GREET_TARGET;
use crate::protocol::DEFAULT_HANDSHAKE;
use crate::transport::{ConnectionOptions, ReconnectPolicy};
use crate::view::{ClickPolicy, DEFAULT_LOGO_PATH, ViewOptions};

// ============================================================================
// Constants
// ============================================================================

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8080";

/// Default connect timeout in milliseconds.
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 30_000;

// ============================================================================
// ClientOptions
// ============================================================================

/// Settings for a [`Client`](super::Client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// WebSocket endpoint (`ws://` or `wss://`).
    pub endpoint: String,

    /// Text sent once when a connection opens.
    pub handshake: String,

    /// Argument passed to `greet` on click.
    pub greet_target: String,

    /// Image source for the logo.
    pub logo_path: String,

    /// Upper bound on a single connect attempt, in milliseconds.
    pub connect_timeout_ms: u64,

    /// Behaviour of clicks while a chain is pending.
    pub click_policy: ClickPolicy,

    /// Reconnect behaviour for supervised connections.
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            handshake: DEFAULT_HANDSHAKE.to_string(),
            greet_target: DEFAULT_GREET_TARGET.to_string(),
            logo_path: DEFAULT_LOGO_PATH.to_string(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            click_policy: ClickPolicy::default(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl ClientOptions {
    /// Parses options from a JSON document and validates them.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the document is malformed
    /// - [`Error::Config`] if a value is out of range
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reads options from a JSON file and validates them.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the file cannot be read
    /// - [`Error::Json`] if the file is malformed
    /// - [`Error::Config`] if a value is out of range
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl ClientOptions {
    /// Parses and checks the endpoint.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the endpoint is not a URL
    /// - [`Error::Config`] if the scheme is not `ws`/`wss` or the host is missing
    pub fn endpoint_url(&self) -> Result<Url> {
        let url = Url::parse(&self.endpoint)?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::config(format!(
                "Endpoint scheme must be ws or wss, got '{}'.\n\
                 Example: \"endpoint\": \"{DEFAULT_ENDPOINT}\"",
                url.scheme()
            )));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(Error::config(format!(
                "Endpoint has no host: {}",
                self.endpoint
            )));
        }

        Ok(url)
    }

    /// Returns the connect timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Builds per-connection options.
    ///
    /// # Errors
    ///
    /// Same as [`ClientOptions::endpoint_url`].
    pub fn connection_options(&self) -> Result<ConnectionOptions> {
        Ok(ConnectionOptions::new(self.endpoint_url()?)
            .with_handshake(self.handshake.clone())
            .with_connect_timeout(self.connect_timeout()))
    }

    /// Builds view options.
    #[must_use]
    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            greet_target: self.greet_target.clone(),
            logo_path: self.logo_path.clone(),
            click_policy: self.click_policy,
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientOptions {
    /// Checks every setting.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] or [`Error::Config`] for a bad endpoint
    /// - [`Error::Config`] for a zero timeout or inconsistent reconnect policy
    pub fn validate(&self) -> Result<()> {
        self.endpoint_url()?;

        if self.connect_timeout_ms == 0 {
            return Err(Error::config(
                "connect_timeout_ms must be greater than zero.\n\
                 Example: \"connect_timeout_ms\": 30000",
            ));
        }

        self.reconnect.validate()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::default();

        assert_eq!(options.endpoint, "ws://localhost:8080");
        assert_eq!(options.handshake, "Hello, World");
        assert_eq!(options.greet_target, "WebAssembly");
        assert_eq!(options.click_policy, ClickPolicy::IgnoreWhilePending);
        assert!(options.reconnect.enabled);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let options = ClientOptions::from_json_str("{}").unwrap();
        assert_eq!(options, ClientOptions::default());
    }

    #[test]
    fn test_partial_json() {
        let options = ClientOptions::from_json_str(
            r#"{
                "endpoint": "wss://factory.example:443/ws",
                "click_policy": "concurrent",
                "reconnect": { "max_attempts": 5 }
            }"#,
        )
        .unwrap();

        assert_eq!(options.endpoint, "wss://factory.example:443/ws");
        assert_eq!(options.click_policy, ClickPolicy::Concurrent);
        assert_eq!(options.reconnect.max_attempts, Some(5));
        assert_eq!(options.reconnect.initial_delay_ms, 500);
    }

    #[test]
    fn test_malformed_json() {
        let result = ClientOptions::from_json_str("{ endpoint");
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_rejects_http_scheme() {
        let options = ClientOptions {
            endpoint: "http://localhost:8080".into(),
            ..ClientOptions::default()
        };
        assert!(matches!(options.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_rejects_unparseable_endpoint() {
        let options = ClientOptions {
            endpoint: "not a url".into(),
            ..ClientOptions::default()
        };
        assert!(matches!(options.validate(), Err(Error::Url(_))));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let options = ClientOptions {
            connect_timeout_ms: 0,
            ..ClientOptions::default()
        };
        assert!(matches!(options.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_rejects_bad_reconnect_policy() {
        let result = ClientOptions::from_json_str(r#"{ "reconnect": { "max_attempts": 0 } }"#);
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_connection_options() {
        let options = ClientOptions {
            handshake: "ping".into(),
            connect_timeout_ms: 1_500,
            ..ClientOptions::default()
        };
        let connection = options.connection_options().unwrap();

        assert_eq!(connection.endpoint.as_str(), "ws://localhost:8080/");
        assert_eq!(connection.handshake, "ping");
        assert_eq!(connection.connect_timeout, Duration::from_millis(1_500));
    }

    #[test]
    fn test_view_options() {
        let options = ClientOptions {
            greet_target: "Factory".into(),
            ..ClientOptions::default()
        };
        let view = options.view_options();

        assert_eq!(view.greet_target, "Factory");
        assert_eq!(view.logo_path, DEFAULT_LOGO_PATH);
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "greet_target": "Line 4" }}"#).unwrap();

        let options = ClientOptions::from_file(file.path()).unwrap();
        assert_eq!(options.greet_target, "Line 4");
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ClientOptions::from_file(dir.path().join("absent.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_serialize_roundtrip_shape() {
        let json = serde_json::to_value(ClientOptions::default()).unwrap();
        assert_eq!(json["click_policy"], "ignore_while_pending");
        assert_eq!(json["connect_timeout_ms"], 30_000);
    }
}
