//! WebSocket connection and event loop.
//!
//! This module opens the outbound connection to the endpoint, sends the
//! handshake once the transport is ready and forwards every inbound text
//! frame to a [`DiagnosticSink`].
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - The handshake send (on-open), exactly once
//! - Incoming frames, forwarded to the sink in arrival order
//! - Outgoing text from [`Connection::send_text`]
//! - Error and close reporting through [`ConnectionState`]

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::{DEFAULT_HANDSHAKE, DiagnosticSink, InboundMessage};

// ============================================================================
// Constants
// ============================================================================

/// Default bound on the connection attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Functions
// ============================================================================

/// Converts `duration` to whole milliseconds for config fields.
///
/// Rounds a non-zero sub-millisecond remainder up and saturates at `u64::MAX`,
/// so a short non-zero duration never becomes zero.
#[must_use]
pub fn duration_to_millis(duration: Duration) -> u64 {
    let millis = duration.as_millis();
    let millis = if duration.subsec_nanos() % 1_000_000 != 0 {
        millis.saturating_add(1)
    } else {
        millis
    };
    u64::try_from(millis).unwrap_or(u64::MAX)
}

// ============================================================================
// ConnectionOptions
// ============================================================================

/// Where to connect and what to say first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// WebSocket endpoint (`ws://` or `wss://`).
    pub endpoint: Url,

    /// Payload sent once when the connection opens.
    pub handshake: String,

    /// Maximum time for TCP connect plus WebSocket upgrade.
    pub connect_timeout: Duration,
}

impl ConnectionOptions {
    /// Creates options for `endpoint` with the default handshake and timeout.
    #[inline]
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            handshake: DEFAULT_HANDSHAKE.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets the handshake payload.
    #[inline]
    #[must_use]
    pub fn with_handshake(mut self, handshake: impl Into<String>) -> Self {
        self.handshake = handshake.into();
        self
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle of a single connection.
///
/// `Connecting → Open → Closed | Failed`. A handshake send failure goes
/// straight from `Connecting` to `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport is up, handshake not yet sent.
    Connecting,
    /// Handshake sent; inbound frames are being delivered.
    Open,
    /// Closed by either side.
    Closed,
    /// Transport error.
    Failed(String),
}

impl ConnectionState {
    /// Returns `true` once the event loop has ended.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Send a text frame and report the outcome.
    Send {
        text: String,
        ack: oneshot::Sender<Result<()>>,
    },
    /// Close the socket.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// Handle to one live WebSocket connection.
///
/// Clones share the same event loop. Dropping every handle does not close
/// the socket; the loop keeps delivering inbound frames until the remote
/// end closes or [`Connection::shutdown`] is called.
#[derive(Clone)]
pub struct Connection {
    /// Connection identity.
    id: ConnectionId,
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Latest lifecycle state (written by the event loop).
    state_rx: watch::Receiver<ConnectionState>,
    /// Inbound frames delivered so far.
    received: Arc<AtomicU64>,
    /// Set once the handshake frame has been written.
    handshake_sent: Arc<AtomicBool>,
}

impl Connection {
    /// Opens a connection to `options.endpoint`.
    ///
    /// On success the event loop is already running and will send the
    /// handshake as its first action.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the endpoint does not complete the
    ///   upgrade within `options.connect_timeout`
    /// - [`Error::Connection`] if the TCP connect or upgrade fails
    pub async fn connect(
        options: &ConnectionOptions,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self> {
        debug!(endpoint = %options.endpoint, "Connecting");

        let attempt = tokio_tungstenite::connect_async(options.endpoint.as_str());
        let (ws_stream, _response) = timeout(options.connect_timeout, attempt)
            .await
            .map_err(|_| Error::connection_timeout(duration_to_millis(options.connect_timeout)))?
            .map_err(|e| Error::connection(format!("WebSocket connect failed: {e}")))?;

        let connection = Self::from_stream(ws_stream, options.handshake.clone(), sink);

        info!(
            id = %connection.id,
            endpoint = %options.endpoint,
            "WebSocket connection established"
        );

        Ok(connection)
    }

    /// Wraps an already-established WebSocket stream.
    ///
    /// Spawns the event loop task internally.
    pub fn from_stream<S>(
        ws_stream: S,
        handshake: impl Into<String>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self
    where
        S: Stream<Item = StdResult<Message, WsError>>
            + Sink<Message, Error = WsError>
            + Unpin
            + Send
            + 'static,
    {
        let id = ConnectionId::generate();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let received = Arc::new(AtomicU64::new(0));
        let handshake_sent = Arc::new(AtomicBool::new(false));

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            id,
            handshake.into(),
            command_rx,
            state_tx,
            sink,
            Arc::clone(&received),
            Arc::clone(&handshake_sent),
        ));

        Self {
            id,
            command_tx,
            state_rx,
            received,
            handshake_sent,
        }
    }

    /// Returns the connection id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    /// Returns `true` while the handshake has been sent and the loop runs.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(*self.state_rx.borrow(), ConnectionState::Open)
    }

    /// Returns `true` once the handshake went out, even if the connection
    /// has closed since.
    #[inline]
    #[must_use]
    pub fn handshake_sent(&self) -> bool {
        self.handshake_sent.load(Ordering::Acquire)
    }

    /// Returns the number of inbound frames delivered to the sink.
    #[inline]
    #[must_use]
    pub fn messages_received(&self) -> u64 {
        self.received.load(Ordering::Acquire)
    }

    /// Waits until the connection reaches [`ConnectionState::Open`] or ends.
    pub async fn opened(&self) -> ConnectionState {
        let mut state_rx = self.state_rx.clone();
        match state_rx
            .wait_for(|s| matches!(s, ConnectionState::Open) || s.is_terminal())
            .await
        {
            Ok(state) => state.clone(),
            Err(_) => ConnectionState::Closed,
        }
    }

    /// Waits until the event loop has ended and returns the final state.
    pub async fn closed(&self) -> ConnectionState {
        let mut state_rx = self.state_rx.clone();
        match state_rx.wait_for(ConnectionState::is_terminal).await {
            Ok(state) => state.clone(),
            Err(_) => ConnectionState::Closed,
        }
    }

    /// Sends an additional text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the event loop has ended
    /// - [`Error::Connection`] if the transport rejects the frame
    pub async fn send_text(&self, text: impl Into<String>) -> Result<()> {
        let (ack, ack_rx) = oneshot::channel();

        self.command_tx
            .send(ConnectionCommand::Send {
                text: text.into(),
                ack,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        ack_rx.await.map_err(|_| Error::ConnectionClosed)?
    }

    /// Closes the connection gracefully.
    ///
    /// Not called on drop; cloned handles share the event loop.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Event loop that handles WebSocket I/O.
    #[allow(clippy::too_many_arguments)]
    async fn run_event_loop<S>(
        ws_stream: S,
        id: ConnectionId,
        handshake: String,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        state_tx: watch::Sender<ConnectionState>,
        sink: Arc<dyn DiagnosticSink>,
        received: Arc<AtomicU64>,
        handshake_sent: Arc<AtomicBool>,
    ) where
        S: Stream<Item = StdResult<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        // on-open: the transport is ready, send the handshake once
        if let Err(e) = ws_write.send(Message::Text(handshake.into())).await {
            error!(%id, error = %e, "Failed to send handshake");
            state_tx.send_replace(ConnectionState::Failed(e.to_string()));
            return;
        }
        trace!(%id, "Handshake sent");
        handshake_sent.store(true, Ordering::Release);
        state_tx.send_replace(ConnectionState::Open);

        let mut commands_open = true;

        let final_state = loop {
            tokio::select! {
                // Incoming frames from the endpoint
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            let sequence = received.fetch_add(1, Ordering::AcqRel) + 1;
                            sink.record(&InboundMessage::new(id, sequence, text.as_str()));
                        }

                        Some(Ok(Message::Close(frame))) => {
                            debug!(%id, ?frame, "WebSocket closed by remote");
                            break ConnectionState::Closed;
                        }

                        Some(Err(e)) => {
                            error!(%id, error = %e, "WebSocket error");
                            break ConnectionState::Failed(e.to_string());
                        }

                        None => {
                            debug!(%id, "WebSocket stream ended");
                            break ConnectionState::Closed;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Commands from handles
                command = command_rx.recv(), if commands_open => {
                    match command {
                        Some(ConnectionCommand::Send { text, ack }) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                let message = e.to_string();
                                warn!(%id, error = %message, "Failed to send frame");
                                let _ = ack.send(Err(Error::connection(message.clone())));
                                break ConnectionState::Failed(message);
                            }
                            let _ = ack.send(Ok(()));
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!(%id, "Shutdown command received");
                            let _ = ws_write.close().await;
                            break ConnectionState::Closed;
                        }

                        None => {
                            // All handles dropped; keep serving inbound frames
                            trace!(%id, "Command channel closed");
                            commands_open = false;
                        }
                    }
                }
            }
        };

        debug!(%id, state = ?final_state, "Event loop terminated");
        state_tx.send_replace(final_state);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    use crate::protocol::MemorySink;

    async fn listener() -> (TcpListener, Url) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = Url::parse(&format!("ws://127.0.0.1:{port}")).unwrap();
        (listener, url)
    }

    async fn next_text<S>(ws: &mut S) -> String
    where
        S: Stream<Item = StdResult<Message, WsError>> + Unpin,
    {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text.to_string(),
                Some(Ok(_)) => continue,
                other => panic!("expected text frame, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_CONNECT_TIMEOUT.as_secs(), 30);
    }

    #[test]
    fn test_options_builder() {
        let url = Url::parse("ws://localhost:8080").unwrap();
        let options = ConnectionOptions::new(url.clone())
            .with_handshake("hi")
            .with_connect_timeout(Duration::from_millis(250));

        assert_eq!(options.endpoint, url);
        assert_eq!(options.handshake, "hi");
        assert_eq!(options.connect_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_duration_to_millis() {
        assert_eq!(duration_to_millis(Duration::ZERO), 0);
        assert_eq!(duration_to_millis(Duration::from_micros(1)), 1);
        assert_eq!(duration_to_millis(Duration::from_micros(1_500)), 2);
        assert_eq!(duration_to_millis(Duration::from_millis(250)), 250);
        assert_eq!(duration_to_millis(Duration::MAX), u64::MAX);
    }

    proptest! {
        #[test]
        fn prop_nonzero_duration_never_rounds_to_zero(nanos in 1u64..u64::MAX) {
            let duration = Duration::from_nanos(nanos);
            let millis = duration_to_millis(duration);
            prop_assert!(millis >= 1);
            prop_assert!(Duration::from_millis(millis) >= duration);
        }
    }

    #[test]
    fn test_state_is_terminal() {
        assert!(!ConnectionState::Connecting.is_terminal());
        assert!(!ConnectionState::Open.is_terminal());
        assert!(ConnectionState::Closed.is_terminal());
        assert!(ConnectionState::Failed("x".into()).is_terminal());
    }

    #[tokio::test]
    async fn test_open_sends_exactly_one_handshake() {
        let (listener, url) = listener().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            let first = next_text(&mut ws).await;
            let extra = timeout(Duration::from_millis(200), ws.next()).await;
            (first, extra.is_err())
        });

        let sink = MemorySink::new();
        let connection = Connection::connect(&ConnectionOptions::new(url), Arc::new(sink.clone()))
            .await
            .unwrap();

        assert_eq!(connection.opened().await, ConnectionState::Open);

        let (first, nothing_else) = server.await.unwrap();
        assert_eq!(first, "Hello, World");
        assert!(nothing_else);
        assert!(sink.is_empty());
        assert_eq!(connection.messages_received(), 0);
    }

    #[tokio::test]
    async fn test_inbound_message_reaches_sink_once() {
        let (listener, url) = listener().await;

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            let _ = next_text(&mut ws).await;
            ws.send(Message::Text("X".into())).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let sink = MemorySink::new();
        let connection = Connection::connect(&ConnectionOptions::new(url), Arc::new(sink.clone()))
            .await
            .unwrap();

        assert_eq!(connection.closed().await, ConnectionState::Closed);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].payload.contains('X'));
        assert_eq!(records[0].sequence, 1);
        assert_eq!(records[0].connection, connection.id());
    }

    #[tokio::test]
    async fn test_inbound_messages_preserve_order() {
        let (listener, url) = listener().await;

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            let _ = next_text(&mut ws).await;
            for payload in ["a", "b", "c"] {
                ws.send(Message::Text(payload.into())).await.unwrap();
            }
            ws.close(None).await.unwrap();
        });

        let sink = MemorySink::new();
        let connection = Connection::connect(&ConnectionOptions::new(url), Arc::new(sink.clone()))
            .await
            .unwrap();
        connection.closed().await;

        assert_eq!(sink.payloads(), vec!["a", "b", "c"]);
        let sequences: Vec<u64> = sink.records().iter().map(|m| m.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        assert_eq!(connection.messages_received(), 3);
    }

    #[tokio::test]
    async fn test_send_text_reaches_server() {
        let (listener, url) = listener().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            let first = next_text(&mut ws).await;
            let second = next_text(&mut ws).await;
            (first, second)
        });

        let connection = Connection::connect(
            &ConnectionOptions::new(url).with_handshake("ready"),
            Arc::new(MemorySink::new()),
        )
        .await
        .unwrap();

        tokio_test::assert_ok!(connection.send_text("ping").await);

        let (first, second) = server.await.unwrap();
        assert_eq!(first, "ready");
        assert_eq!(second, "ping");
    }

    #[tokio::test]
    async fn test_shutdown_closes_and_rejects_sends() {
        let (listener, url) = listener().await;

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            while ws.next().await.is_some() {}
        });

        let connection = Connection::connect(&ConnectionOptions::new(url), Arc::new(MemorySink::new()))
            .await
            .unwrap();

        assert_eq!(connection.opened().await, ConnectionState::Open);
        assert!(connection.handshake_sent());

        connection.shutdown();
        assert_eq!(connection.closed().await, ConnectionState::Closed);
        assert!(connection.handshake_sent());

        let result = connection.send_text("late").await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_connect_refused_is_surfaced() {
        let (listener, url) = listener().await;
        drop(listener);

        let result = Connection::connect(&ConnectionOptions::new(url), Arc::new(MemorySink::new())).await;

        let err = result.err().unwrap();
        assert!(matches!(err, Error::Connection { .. }));
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_connect_timeout_when_upgrade_stalls() {
        // Accepts TCP but never answers the upgrade request
        let (listener, url) = listener().await;
        let _held = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let options = ConnectionOptions::new(url).with_connect_timeout(Duration::from_millis(100));
        let result = Connection::connect(&options, Arc::new(MemorySink::new())).await;

        assert!(matches!(result, Err(Error::ConnectionTimeout { timeout_ms: 100 })));
    }

    #[tokio::test]
    async fn test_dropping_handles_keeps_delivering() {
        let (listener, url) = listener().await;
        let (go_tx, go_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            let _ = next_text(&mut ws).await;
            let _ = go_rx.await;
            ws.send(Message::Text("late".into())).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let sink = MemorySink::new();
        let connection = Connection::connect(&ConnectionOptions::new(url), Arc::new(sink.clone()))
            .await
            .unwrap();
        let watcher = connection.state_rx.clone();
        drop(connection);
        go_tx.send(()).unwrap();

        let mut watcher = watcher;
        watcher.wait_for(ConnectionState::is_terminal).await.unwrap();
        assert_eq!(sink.payloads(), vec!["late"]);
    }
}
