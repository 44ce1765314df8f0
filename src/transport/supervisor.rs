//! Supervised connection with bounded reconnect backoff.
//!
//! The supervisor owns successive [`Connection`]s to one endpoint. When a
//! connection closes or fails it waits, then opens a new one, which sends
//! its own handshake.
//!
//! # Backoff
//!
//! The wait before retry `n` (1-based count of consecutive failures) is
//! `min(initial_delay * multiplier^(n-1), max_delay)`. A connection counts
//! as opened once its handshake has been sent; that resets the count, so a
//! drop after a healthy session waits `initial_delay`. An upgrade that
//! succeeds but closes before the handshake goes out is a failure.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::protocol::DiagnosticSink;

use super::connection::{Connection, ConnectionOptions, ConnectionState, duration_to_millis};

// ============================================================================
// Constants
// ============================================================================

/// Default first retry delay.
const DEFAULT_INITIAL_DELAY_MS: u64 = 500;

/// Default cap on the retry delay.
const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Default backoff multiplier.
const DEFAULT_MULTIPLIER: u32 = 2;

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Reconnect behaviour for a [`Supervisor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Reconnect at all. When `false` the supervisor ends with the first
    /// connection.
    pub enabled: bool,

    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,

    /// Upper bound on any retry delay, in milliseconds.
    pub max_delay_ms: u64,

    /// Growth factor between consecutive failures.
    pub multiplier: u32,

    /// Consecutive failed connects before giving up. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            multiplier: DEFAULT_MULTIPLIER,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// A policy that never reconnects.
    #[inline]
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Sets the first retry delay.
    #[inline]
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay_ms = duration_to_millis(delay);
        self
    }

    /// Sets the delay cap.
    #[inline]
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay_ms = duration_to_millis(delay);
        self
    }

    /// Sets the growth factor.
    #[inline]
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the consecutive-failure limit.
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Returns the wait before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = u64::from(self.multiplier.saturating_pow(exponent));
        let millis = self
            .initial_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(millis)
    }

    /// Validates the policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the multiplier is zero, the cap is below
    /// the initial delay, or `max_attempts` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.multiplier == 0 {
            return Err(Error::config("reconnect multiplier must be at least 1"));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(Error::config(format!(
                "reconnect max_delay_ms ({}) is below initial_delay_ms ({})",
                self.max_delay_ms, self.initial_delay_ms
            )));
        }
        if self.max_attempts == Some(0) {
            return Err(Error::config("reconnect max_attempts must be at least 1"));
        }
        Ok(())
    }
}

// ============================================================================
// Supervisor
// ============================================================================

/// Keeps a connection to one endpoint alive.
pub struct Supervisor {
    /// Per-connection options.
    options: ConnectionOptions,
    /// Retry policy.
    policy: ReconnectPolicy,
    /// Sink shared by every connection.
    sink: Arc<dyn DiagnosticSink>,
}

impl Supervisor {
    /// Creates a supervisor. Nothing connects until [`Supervisor::spawn`].
    #[must_use]
    pub fn new(
        options: ConnectionOptions,
        policy: ReconnectPolicy,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            options,
            policy,
            sink,
        }
    }

    /// Starts the retry loop on the tokio runtime.
    pub fn spawn(self) -> SupervisorHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (opened_tx, opened_rx) = watch::channel(0_u32);
        let current: Arc<Mutex<Option<Connection>>> = Arc::new(Mutex::new(None));

        let task = tokio::spawn(self.run(stop_rx, opened_tx, Arc::clone(&current)));

        SupervisorHandle {
            stop_tx,
            opened_rx,
            current,
            task,
        }
    }

    /// Connect, wait for the end, back off, repeat.
    async fn run(
        self,
        mut stop_rx: watch::Receiver<bool>,
        opened_tx: watch::Sender<u32>,
        current: Arc<Mutex<Option<Connection>>>,
    ) -> Result<()> {
        let mut failures: u32 = 0;

        loop {
            if *stop_rx.borrow() {
                return Ok(());
            }

            let attempt = tokio::select! {
                result = Connection::connect(&self.options, Arc::clone(&self.sink)) => result,
                _ = stop_rx.changed() => return Ok(()),
            };

            // Only a connection that got its handshake out counts as opened
            let attempt = match attempt {
                Ok(connection) => {
                    let state = tokio::select! {
                        state = connection.opened() => state,
                        _ = stop_rx.changed() => {
                            connection.shutdown();
                            return Ok(());
                        }
                    };
                    if connection.handshake_sent() {
                        Ok(connection)
                    } else {
                        Err(match state {
                            ConnectionState::Failed(message) => Error::connection(message),
                            _ => Error::ConnectionClosed,
                        })
                    }
                }
                Err(e) => Err(e),
            };

            match attempt {
                Ok(connection) => {
                    failures = 0;
                    *current.lock() = Some(connection.clone());
                    opened_tx.send_modify(|n| *n += 1);

                    let final_state = tokio::select! {
                        state = connection.closed() => state,
                        _ = stop_rx.changed() => {
                            connection.shutdown();
                            connection.closed().await;
                            current.lock().take();
                            debug!("Supervisor stopped");
                            return Ok(());
                        }
                    };
                    current.lock().take();

                    if !self.policy.enabled {
                        return match final_state {
                            ConnectionState::Failed(message) => Err(Error::connection(message)),
                            _ => Ok(()),
                        };
                    }

                    warn!(
                        id = %connection.id(),
                        state = ?final_state,
                        "Connection lost, reconnecting"
                    );
                }

                Err(e) => {
                    if !self.policy.enabled {
                        return Err(e);
                    }

                    failures = failures.saturating_add(1);
                    warn!(
                        endpoint = %self.options.endpoint,
                        attempt = failures,
                        error = %e,
                        "Connect attempt failed"
                    );

                    if let Some(max) = self.policy.max_attempts
                        && failures >= max
                    {
                        info!(attempts = failures, "Giving up reconnecting");
                        return Err(Error::retries_exhausted(failures));
                    }
                }
            }

            let delay = self.policy.delay_for(failures.max(1));
            debug!(delay_ms = duration_to_millis(delay), "Backing off");

            tokio::select! {
                () = sleep(delay) => {}
                _ = stop_rx.changed() => return Ok(()),
            }
        }
    }
}

// ============================================================================
// SupervisorHandle
// ============================================================================

/// Handle to a running [`Supervisor`].
///
/// Dropping the handle stops the supervisor.
pub struct SupervisorHandle {
    /// Stop signal.
    stop_tx: watch::Sender<bool>,
    /// Count of connections opened so far.
    opened_rx: watch::Receiver<u32>,
    /// The live connection, if any.
    current: Arc<Mutex<Option<Connection>>>,
    /// Retry loop task.
    task: JoinHandle<Result<()>>,
}

impl SupervisorHandle {
    /// Returns the live connection, if one is open.
    #[must_use]
    pub fn current(&self) -> Option<Connection> {
        self.current.lock().clone()
    }

    /// Returns how many connections have been opened so far.
    #[inline]
    #[must_use]
    pub fn connections_opened(&self) -> u32 {
        *self.opened_rx.borrow()
    }

    /// Waits until at least `count` connections have been opened.
    ///
    /// Returns `false` if the supervisor ended first.
    pub async fn wait_for_connections(&self, count: u32) -> bool {
        let mut opened_rx = self.opened_rx.clone();
        opened_rx.wait_for(|n| *n >= count).await.is_ok()
    }

    /// Returns `true` once the retry loop has ended.
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Asks the retry loop to stop and close the live connection.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Waits for the retry loop to end and returns its outcome.
    ///
    /// # Errors
    ///
    /// - [`Error::RetriesExhausted`] if `max_attempts` was reached
    /// - [`Error::Connection`] if reconnect is disabled and the connection failed
    pub async fn join(self) -> Result<()> {
        let Self { stop_tx, task, .. } = self;
        let result = task
            .await
            .map_err(|e| Error::connection(format!("supervisor task failed: {e}")))?;
        drop(stop_tx);
        result
    }
}

// ============================================================================
// Tests
// ============================================================================
