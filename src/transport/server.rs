//! Loopback greeting server.
//!
//! A small WebSocket peer for local development and tests. Every text frame
//! it receives is answered with [`greet_message`] of that frame.
//!
//! # Connection Flow
//!
//! 1. Bind to `localhost:PORT` (0 for random)
//! 2. [`GreetingServer::serve`] spawns the accept loop
//! 3. Each client is upgraded to WebSocket and served on its own task
//! 4. [`ServerHandle::shutdown`] closes every peer and stops accepting

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::identifiers::ConnectionId;
use crate::module::greet_message;

// ============================================================================
// Constants
// ============================================================================

/// Pause after a failed accept. Errors such as `EMFILE` repeat immediately.
const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(100);

// ============================================================================
// Types
// ============================================================================

/// Connected peers by connection id.
type PeerMap = FxHashMap<ConnectionId, SocketAddr>;

// ============================================================================
// GreetingServer
// ============================================================================

/// A greeting server that is bound but not yet serving.
///
/// # Example
///
/// ```ignore
/// use std::net::{IpAddr, Ipv4Addr};
/// use smart_factory_client::transport::GreetingServer;
///
/// let server = GreetingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
/// let url = server.ws_url();
/// let handle = server.serve();
///
/// // Connect clients to url...
///
/// handle.shutdown();
/// ```
pub struct GreetingServer {
    /// TCP listener for incoming connections.
    listener: TcpListener,
    /// Address the server is bound to.
    addr: SocketAddr,
}

impl GreetingServer {
    /// Binds the server to the specified address and port.
    ///
    /// Use port 0 to let the OS assign a random available port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if binding fails.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let addr = listener.local_addr()?;

        debug!(%addr, "Greeting server bound");

        Ok(Self { listener, addr })
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Returns the WebSocket URL for this server.
    ///
    /// Format: `ws://{ip}:{port}`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Returns the local socket address.
    #[inline]
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Starts the accept loop.
    pub fn serve(self) -> ServerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let peers: Arc<Mutex<PeerMap>> = Arc::new(Mutex::new(PeerMap::default()));
        let replies = Arc::new(AtomicU64::new(0));

        info!(addr = %self.addr, "Greeting server listening");

        let task = tokio::spawn(Self::accept_loop(
            self.listener,
            shutdown_rx,
            Arc::clone(&peers),
            Arc::clone(&replies),
        ));

        ServerHandle {
            addr: self.addr,
            peers,
            replies,
            shutdown_tx,
            task,
        }
    }

    /// Accepts peers until shutdown.
    async fn accept_loop(
        listener: TcpListener,
        mut shutdown_rx: watch::Receiver<bool>,
        peers: Arc<Mutex<PeerMap>>,
        replies: Arc<AtomicU64>,
    ) {
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            debug!(%addr, "TCP connection accepted");
                            tokio::spawn(Self::serve_peer(
                                stream,
                                addr,
                                shutdown_rx.clone(),
                                Arc::clone(&peers),
                                Arc::clone(&replies),
                            ));
                        }
                        Err(e) => {
                            warn!(error = %e, "Accept failed");
                            if Self::pause_after_accept_error(&mut shutdown_rx).await {
                                break;
                            }
                        }
                    }
                }

                _ = shutdown_rx.changed() => break,
            }
        }

        debug!("Accept loop terminated");
    }

    /// Waits out [`ACCEPT_ERROR_DELAY`]. Returns `true` if shutdown was
    /// requested meanwhile.
    async fn pause_after_accept_error(shutdown_rx: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            () = sleep(ACCEPT_ERROR_DELAY) => false,
            _ = shutdown_rx.changed() => true,
        }
    }

    /// Answers every text frame from one peer.
    async fn serve_peer(
        stream: TcpStream,
        addr: SocketAddr,
        mut shutdown_rx: watch::Receiver<bool>,
        peers: Arc<Mutex<PeerMap>>,
        replies: Arc<AtomicU64>,
    ) {
        let mut ws = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!(%addr, error = %e, "WebSocket upgrade failed");
                return;
            }
        };

        let id = ConnectionId::generate();
        peers.lock().insert(id, addr);
        debug!(%id, %addr, "Peer connected");

        loop {
            tokio::select! {
                message = ws.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            let reply = greet_message(text.as_str());
                            replies.fetch_add(1, Ordering::AcqRel);
                            if let Err(e) = ws.send(Message::Text(reply.into())).await {
                                warn!(%id, error = %e, "Failed to send greeting");
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(e)) => {
                            debug!(%id, error = %e, "Peer error");
                            break;
                        }
                        _ => {}
                    }
                }

                _ = shutdown_rx.changed() => {
                    let _ = ws.close(None).await;
                    break;
                }
            }
        }

        peers.lock().remove(&id);
        debug!(%id, "Peer disconnected");
    }
}

// ============================================================================
// ServerHandle
// ============================================================================

/// Handle to a running greeting server.
///
/// Dropping the handle also stops the server.
pub struct ServerHandle {
    /// Bound address.
    addr: SocketAddr,
    /// Currently connected peers.
    peers: Arc<Mutex<PeerMap>>,
    /// Greetings sent so far.
    replies: Arc<AtomicU64>,
    /// Shutdown signal for the accept loop and every peer.
    shutdown_tx: watch::Sender<bool>,
    /// Accept loop task.
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Returns the bound address.
    #[inline]
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the WebSocket URL for this server.
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Returns the number of connected peers.
    #[inline]
    #[must_use]
    pub fn connected_peers(&self) -> usize {
        self.peers.lock().len()
    }

    /// Returns the number of greetings sent.
    #[inline]
    #[must_use]
    pub fn replies_sent(&self) -> u64 {
        self.replies.load(Ordering::Acquire)
    }

    /// Stops accepting and closes every peer.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Shuts down and waits for the accept loop to exit.
    pub async fn stop(self) {
        self.shutdown();
        let _ = self.task.await;
        info!(addr = %self.addr, "Greeting server stopped");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::Ipv4Addr;

    use tokio::time::{Instant, timeout};

    async fn bind() -> GreetingServer {
        GreetingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind should succeed")
    }

    #[tokio::test]
    async fn test_server_bind_random_port() {
        let server = bind().await;

        assert!(server.port() > 0);
        assert!(server.ws_url().starts_with("ws://127.0.0.1:"));
    }

    #[tokio::test]
    async fn test_server_ws_url_format() {
        let server = bind().await;

        let expected = format!("ws://127.0.0.1:{}", server.port());
        assert_eq!(server.ws_url(), expected);
        assert_eq!(server.local_addr().ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[tokio::test]
    async fn test_server_answers_with_greeting() {
        let server = bind().await;
        let url = server.ws_url();
        let handle = server.serve();

        let (mut ws, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
        ws.send(Message::Text("WebAssembly\n".into())).await.unwrap();

        let reply = timeout(Duration::from_secs(2), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert_eq!(reply, Message::Text("Hello, WebAssembly!".into()));
        assert_eq!(handle.replies_sent(), 1);
        assert_eq!(handle.connected_peers(), 1);

        handle.stop().await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_peers() {
        let server = bind().await;
        let url = server.ws_url();
        let handle = server.serve();

        let (mut ws, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
        ws.send(Message::Text("a".into())).await.unwrap();
        let _ = ws.next().await;

        handle.shutdown();

        let closed = timeout(Duration::from_secs(2), async {
            loop {
                match ws.next().await {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
        })
        .await;
        assert!(closed.is_ok());
    }

    #[tokio::test]
    async fn test_accept_error_pauses_before_retry() {
        let (_shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let started = Instant::now();
        let stop = GreetingServer::pause_after_accept_error(&mut shutdown_rx).await;

        assert!(!stop);
        assert!(started.elapsed() >= ACCEPT_ERROR_DELAY);
    }

    #[tokio::test]
    async fn test_accept_error_pause_ends_on_shutdown() {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        shutdown_tx.send_replace(true);

        let stop = timeout(
            ACCEPT_ERROR_DELAY / 2,
            GreetingServer::pause_after_accept_error(&mut shutdown_rx),
        )
        .await
        .unwrap();

        assert!(stop);
    }
}
