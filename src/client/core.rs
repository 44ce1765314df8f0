//! Client composition.
//!
//! A [`Client`] wires the two independent halves together at process start:
//! the connection to the factory endpoint and the logo view. Neither half
//! waits on the other; a click works while the endpoint is unreachable and
//! inbound messages keep flowing while a chain is pending.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::module::GreeterModule;
use crate::protocol::DiagnosticSink;
use crate::transport::{Connection, ConnectionOptions, Supervisor, SupervisorHandle};
use crate::view::App;

use super::builder::ClientBuilder;
use super::options::ClientOptions;

// ============================================================================
// Client
// ============================================================================

/// Validated client configuration plus the diagnostic sink.
///
/// Cheap to clone; every connection opened by a client (or its clones)
/// reports to the same sink.
#[derive(Clone)]
pub struct Client {
    /// Validated settings.
    options: ClientOptions,
    /// Pre-parsed connection settings.
    connection: ConnectionOptions,
    /// Receiver for inbound messages.
    sink: Arc<dyn DiagnosticSink>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.connection.endpoint.as_str())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client from already-loaded options.
    ///
    /// # Errors
    ///
    /// Returns the first validation error from [`ClientOptions::validate`].
    pub(crate) fn new(options: ClientOptions, sink: Arc<dyn DiagnosticSink>) -> Result<Self> {
        let connection = options.connection_options()?;
        Ok(Self {
            options,
            connection,
            sink,
        })
    }

    /// Returns the client settings.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Returns the per-connection settings.
    #[inline]
    #[must_use]
    pub fn connection_options(&self) -> &ConnectionOptions {
        &self.connection
    }

    /// Opens a single connection without reconnecting.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`](crate::Error::ConnectionTimeout) if the
    ///   upgrade does not finish in time
    /// - [`Error::Connection`](crate::Error::Connection) if the endpoint refuses
    pub async fn connect(&self) -> Result<Connection> {
        Connection::connect(&self.connection, Arc::clone(&self.sink)).await
    }

    /// Starts a supervised connection using the configured reconnect policy.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn supervise(&self) -> SupervisorHandle {
        Supervisor::new(
            self.connection.clone(),
            self.options.reconnect.clone(),
            Arc::clone(&self.sink),
        )
        .spawn()
    }

    /// Creates the view around `module`.
    #[must_use]
    pub fn app(&self, module: Arc<dyn GreeterModule>) -> App {
        App::new(module, self.options.view_options())
    }

    /// Starts both halves.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(&self, module: Arc<dyn GreeterModule>) -> Session {
        info!(endpoint = %self.connection.endpoint, "Starting client");
        Session {
            app: self.app(module),
            connection: self.supervise(),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// A running client: the view and its supervised connection.
pub struct Session {
    /// The logo view.
    pub app: App,
    /// The supervised connection.
    pub connection: SupervisorHandle,
}

impl Session {
    /// Stops the connection and waits for it to end.
    ///
    /// Chains already started keep running to completion.
    ///
    /// # Errors
    ///
    /// Returns the supervisor's result; see [`SupervisorHandle::join`].
    pub async fn shutdown(self) -> Result<()> {
        self.connection.stop();
        self.connection.join().await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use tokio::net::TcpListener;
    use tokio::time::{sleep, timeout};

    use crate::error::Error;
    use crate::module::NativeGreeter;
    use crate::protocol::MemorySink;
    use crate::transport::{GreetingServer, ReconnectPolicy, ServerHandle};

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    async fn server() -> ServerHandle {
        GreetingServer::bind(LOCALHOST, 0).await.unwrap().serve()
    }

    fn client(endpoint: String, sink: &MemorySink) -> Client {
        Client::builder()
            .endpoint(endpoint)
            .connect_timeout(Duration::from_secs(2))
            .reconnect(ReconnectPolicy::default().with_initial_delay(Duration::from_millis(20)))
            .sink(Arc::new(sink.clone()))
            .build()
            .unwrap()
    }

    async fn wait_for_len(sink: &MemorySink, len: usize) {
        timeout(Duration::from_secs(5), async {
            while sink.len() < len {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    /// Endpoint nothing is listening on.
    async fn dead_endpoint() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("ws://127.0.0.1:{port}")
    }

    #[tokio::test]
    async fn test_handshake_reply_reaches_sink() {
        let server = server().await;
        let sink = MemorySink::new();
        let client = client(server.ws_url(), &sink);

        let connection = client.connect().await.unwrap();
        wait_for_len(&sink, 1).await;

        assert_eq!(sink.payloads(), vec!["Hello, Hello, World!"]);
        assert_eq!(sink.records()[0].connection, connection.id());
        assert_eq!(server.replies_sent(), 1);

        server.stop().await;
    }

    #[tokio::test]
    async fn test_sent_text_is_greeted() {
        let server = server().await;
        let sink = MemorySink::new();
        let client = client(server.ws_url(), &sink);

        let connection = client.connect().await.unwrap();
        connection.send_text("Line 3").await.unwrap();
        wait_for_len(&sink, 2).await;

        assert_eq!(sink.payloads(), vec!["Hello, Hello, World!", "Hello, Line 3!"]);

        server.stop().await;
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let sink = MemorySink::new();
        let client = client(dead_endpoint().await, &sink);

        let result = client.connect().await;

        assert!(result.as_ref().is_err_and(Error::is_connection_error));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_session_click_and_connection() {
        let server = server().await;
        let sink = MemorySink::new();
        let client = client(server.ws_url(), &sink);

        let session = client.start(Arc::new(NativeGreeter::new()));
        assert!(session.connection.wait_for_connections(1).await);

        let greeting = session.app.click().into_handle().unwrap().join().await.unwrap();
        wait_for_len(&sink, 1).await;

        assert_eq!(greeting, "Hello, WebAssembly!");
        assert_eq!(sink.payloads(), vec!["Hello, Hello, World!"]);

        session.shutdown().await.unwrap();
        server.stop().await;
    }

    #[tokio::test]
    async fn test_click_works_without_endpoint() {
        let sink = MemorySink::new();
        let client = Client::builder()
            .endpoint(dead_endpoint().await)
            .reconnect(ReconnectPolicy::disabled())
            .sink(Arc::new(sink.clone()))
            .build()
            .unwrap();

        let session = client.start(Arc::new(NativeGreeter::new()));
        let greeting = session.app.click().into_handle().unwrap().join().await.unwrap();

        assert_eq!(greeting, "Hello, WebAssembly!");
        assert!(session.connection.join().await.is_err());
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_app_uses_configured_target() {
        let client = Client::builder().greet_target("Line 7").build().unwrap();
        let app = client.app(Arc::new(NativeGreeter::new()));

        let greeting = app.click().into_handle().unwrap().join().await.unwrap();

        assert_eq!(greeting, "Hello, Line 7!");
    }

    #[tokio::test]
    async fn test_session_reconnects_after_drop() {
        let server = server().await;
        let sink = MemorySink::new();
        let client = client(server.ws_url(), &sink);

        let session = client.start(Arc::new(NativeGreeter::new()));
        assert!(session.connection.wait_for_connections(1).await);
        wait_for_len(&sink, 1).await;

        // Drop the live connection from the client side; the supervisor
        // opens a new one and greets again.
        if let Some(connection) = session.connection.current() {
            connection.shutdown();
        }
        assert!(session.connection.wait_for_connections(2).await);
        wait_for_len(&sink, 2).await;

        assert_eq!(
            sink.payloads(),
            vec!["Hello, Hello, World!", "Hello, Hello, World!"]
        );

        session.shutdown().await.unwrap();
        server.stop().await;
    }
}
