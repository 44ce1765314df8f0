//! App component and click chains.
//!
//! [`render`] is a pure function of [`ViewProps`]. [`App`] owns the greeter
//! module and turns clicks into chains:
//!
//! ```text
//! click ──► module.init().await ──ok──► module.greet(target) ──► Ready
//!                               └─err─► Failed                (greet never runs)
//! ```
//!
//! The only suspension point is `init().await`. There is no timeout: an
//! initializer that never completes leaves the chain in `Initializing`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::ChainId;
use crate::module::{DEFAULT_GREET_TARGET, GreeterModule};

use super::tree::{Action, Node};

// ============================================================================
// Constants
// ============================================================================

/// Logo image location.
pub const DEFAULT_LOGO_PATH: &str = "WebAssembly_Logo.svg";

// ============================================================================
// Render
// ============================================================================

/// Inputs to [`render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewProps {
    /// Image source for the logo.
    pub logo_path: String,
    /// Render the button as disabled.
    pub disabled: bool,
}

impl Default for ViewProps {
    fn default() -> Self {
        Self {
            logo_path: DEFAULT_LOGO_PATH.to_string(),
            disabled: false,
        }
    }
}

/// Builds the view tree.
///
/// Pure and synchronous: the same props always yield the same tree.
#[must_use]
pub fn render(props: &ViewProps) -> Node {
    let logo = Node::element("img")
        .with_class("App-logo")
        .with_attr("src", props.logo_path.as_str())
        .with_attr("alt", "logo");

    let mut button = Node::element("button")
        .with_class("spin")
        .with_on_click(Action::Greet);
    if props.disabled {
        button = button.with_attr("disabled", "disabled");
    }

    Node::element("div")
        .with_class("App")
        .with_child(
            Node::element("header")
                .with_class("App-header")
                .with_child(button.with_child(logo)),
        )
}

// ============================================================================
// ClickPolicy
// ============================================================================

/// What a click does while an earlier chain is still pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickPolicy {
    /// The button is disabled while a chain is pending; clicks are ignored.
    #[default]
    IgnoreWhilePending,
    /// Every click starts its own chain; chains may overlap.
    Concurrent,
}

// ============================================================================
// ViewOptions
// ============================================================================

/// Configuration for an [`App`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewOptions {
    /// Argument passed to `greet`.
    pub greet_target: String,
    /// Image source for the logo.
    pub logo_path: String,
    /// Overlapping click behaviour.
    pub click_policy: ClickPolicy,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            greet_target: DEFAULT_GREET_TARGET.to_string(),
            logo_path: DEFAULT_LOGO_PATH.to_string(),
            click_policy: ClickPolicy::default(),
        }
    }
}

// ============================================================================
// ChainState
// ============================================================================

/// Latest observable chain outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainState {
    /// No click yet.
    Idle,
    /// A chain is waiting on `init`.
    Initializing,
    /// `greet` returned this greeting.
    Ready(String),
    /// `init` or `greet` failed.
    Failed(String),
}

impl fmt::Display for ChainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Initializing => f.write_str("initializing"),
            Self::Ready(greeting) => write!(f, "ready: {greeting}"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

// ============================================================================
// ClickOutcome / ChainHandle
// ============================================================================

/// Result of [`App::click`].
#[derive(Debug)]
pub enum ClickOutcome {
    /// A new chain was started.
    Started(ChainHandle),
    /// The click was dropped because a chain is pending.
    Ignored,
}

impl ClickOutcome {
    /// Returns `true` if a chain was started.
    #[inline]
    #[must_use]
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started(_))
    }

    /// Returns the chain handle, if any.
    #[inline]
    #[must_use]
    pub fn into_handle(self) -> Option<ChainHandle> {
        match self {
            Self::Started(handle) => Some(handle),
            Self::Ignored => None,
        }
    }
}

/// Handle to a running click chain.
///
/// Dropping the handle does not cancel the chain.
#[derive(Debug)]
pub struct ChainHandle {
    /// Chain identity.
    chain_id: ChainId,
    /// Chain task.
    task: JoinHandle<Result<String>>,
}

impl ChainHandle {
    /// Returns the chain id.
    #[inline]
    #[must_use]
    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    /// Returns `true` once the chain has finished.
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancels the chain.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Waits for the chain and returns the greeting.
    ///
    /// # Errors
    ///
    /// - [`Error::ModuleInit`] if the initializer failed
    /// - [`Error::ModuleCall`] or [`Error::ModuleNotInitialized`] if `greet` failed
    /// - [`Error::ChainAborted`] if the chain was cancelled or panicked
    pub async fn join(self) -> Result<String> {
        let Self { chain_id, task } = self;
        task.await.map_err(|_| Error::chain_aborted(chain_id))?
    }
}

// ============================================================================
// App
// ============================================================================

/// Latest chain outcome and the chain it belongs to.
struct LatestChain {
    /// Most recently started chain.
    owner: Option<ChainId>,
    /// Outcome as last published.
    state: ChainState,
}

/// Internal shared state for an app.
struct AppInner {
    /// External greeter module.
    module: Arc<dyn GreeterModule>,
    /// View configuration.
    options: ViewOptions,
    /// Latest chain outcome. Only the newest chain may publish.
    latest: Mutex<LatestChain>,
    /// Chains started and not yet finished.
    pending: AtomicUsize,
    /// Last issued chain id.
    last_chain: AtomicU64,
}

/// The logo button component.
///
/// Cloning shares the same module and state.
#[derive(Clone)]
pub struct App {
    inner: Arc<AppInner>,
}

impl App {
    /// Creates an app around `module`.
    #[must_use]
    pub fn new(module: Arc<dyn GreeterModule>, options: ViewOptions) -> Self {
        Self {
            inner: Arc::new(AppInner {
                module,
                options,
                latest: Mutex::new(LatestChain {
                    owner: None,
                    state: ChainState::Idle,
                }),
                pending: AtomicUsize::new(0),
                last_chain: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the view options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ViewOptions {
        &self.inner.options
    }

    /// Returns the outcome of the most recently started chain.
    ///
    /// Older chains that finish later do not overwrite it.
    #[must_use]
    pub fn state(&self) -> ChainState {
        self.inner.latest.lock().state.clone()
    }

    /// Returns the number of chains still running.
    #[inline]
    #[must_use]
    pub fn pending_chains(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Returns `true` if clicks are currently ignored.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.inner.options.click_policy == ClickPolicy::IgnoreWhilePending
            && self.pending_chains() > 0
    }

    /// Current props for [`render`].
    #[must_use]
    pub fn props(&self) -> ViewProps {
        ViewProps {
            logo_path: self.inner.options.logo_path.clone(),
            disabled: self.is_disabled(),
        }
    }

    /// Renders the current view.
    #[must_use]
    pub fn render(&self) -> Node {
        render(&self.props())
    }

    /// Handles a click on the button.
    ///
    /// Must be called from within a tokio runtime.
    pub fn click(&self) -> ClickOutcome {
        let chain_id = {
            // Check and reserve under the lock so two clicks cannot both
            // pass the pending check.
            let mut latest = self.inner.latest.lock();
            if self.inner.options.click_policy == ClickPolicy::IgnoreWhilePending
                && self.inner.pending.load(Ordering::Acquire) > 0
            {
                debug!("Click ignored, chain pending");
                return ClickOutcome::Ignored;
            }
            self.inner.pending.fetch_add(1, Ordering::AcqRel);

            let chain_id = ChainId::new(self.inner.last_chain.fetch_add(1, Ordering::AcqRel) + 1);
            latest.owner = Some(chain_id);
            latest.state = ChainState::Initializing;
            chain_id
        };

        let pending = PendingGuard {
            inner: Arc::clone(&self.inner),
            chain_id,
        };
        let inner = Arc::clone(&self.inner);

        debug!(%chain_id, "Chain started");

        let task = tokio::spawn(async move {
            let _pending = pending;
            inner.run_chain(chain_id).await
        });

        ClickOutcome::Started(ChainHandle { chain_id, task })
    }
}

impl AppInner {
    /// init, then greet.
    async fn run_chain(&self, chain_id: ChainId) -> Result<String> {
        if let Err(e) = self.module.init().await {
            let e = if e.is_module_error() {
                e
            } else {
                Error::module_init(e.to_string())
            };
            warn!(%chain_id, error = %e, "Module initialization failed");
            self.publish(chain_id, ChainState::Failed(e.to_string()));
            return Err(e);
        }

        match self.module.greet(&self.options.greet_target) {
            Ok(greeting) => {
                info!(%chain_id, %greeting, "Chain completed");
                self.publish(chain_id, ChainState::Ready(greeting.clone()));
                Ok(greeting)
            }
            Err(e) => {
                warn!(%chain_id, error = %e, "Greet failed");
                self.publish(chain_id, ChainState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Records `state` unless a newer chain has started since `chain_id`.
    fn publish(&self, chain_id: ChainId, state: ChainState) {
        let mut latest = self.latest.lock();
        if latest.owner.is_some_and(|owner| owner > chain_id) {
            debug!(%chain_id, "Stale chain outcome dropped");
            return;
        }
        latest.state = state;
    }
}

/// Releases a pending slot when the chain ends.
///
/// A chain dropped before publishing (abort or panic) is marked failed.
struct PendingGuard {
    inner: Arc<AppInner>,
    chain_id: ChainId,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        {
            let mut latest = self.inner.latest.lock();
            if latest.owner == Some(self.chain_id) && latest.state == ChainState::Initializing {
                let reason = Error::chain_aborted(self.chain_id).to_string();
                warn!(chain_id = %self.chain_id, "Chain ended without an outcome");
                latest.state = ChainState::Failed(reason);
            }
        }
        self.inner.pending.fetch_sub(1, Ordering::AcqRel);
    }
}

// ============================================================================
// Tests
// ============================================================================
