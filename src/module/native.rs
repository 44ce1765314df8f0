//! In-process greeter.
//!
//! Implements [`GreeterModule`] without any external runtime. `init` can be
//! given a load delay to stand in for fetching and compiling a binary module.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::transport::duration_to_millis;

use super::{GreeterModule, greet_message};

// ============================================================================
// NativeGreeter
// ============================================================================

/// Greeter that answers with [`greet_message`].
#[derive(Debug, Default)]
pub struct NativeGreeter {
    /// Simulated load time for `init`.
    load_delay: Duration,
    /// Set once any `init` has completed.
    initialized: AtomicBool,
    /// Number of `init` calls started.
    init_calls: AtomicU64,
}

impl NativeGreeter {
    /// Creates a greeter whose `init` completes immediately.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a greeter whose `init` takes `load_delay`.
    #[inline]
    #[must_use]
    pub fn with_load_delay(load_delay: Duration) -> Self {
        Self {
            load_delay,
            ..Self::default()
        }
    }

    /// Returns `true` once `init` has completed.
    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Returns the number of `init` calls started.
    #[inline]
    #[must_use]
    pub fn init_calls(&self) -> u64 {
        self.init_calls.load(Ordering::Acquire)
    }
}

#[async_trait]
impl GreeterModule for NativeGreeter {
    async fn init(&self) -> Result<()> {
        let call = self.init_calls.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(call, delay_ms = duration_to_millis(self.load_delay), "Initializing greeter");

        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }

        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    fn greet(&self, name: &str) -> Result<String> {
        if !self.is_initialized() {
            return Err(Error::ModuleNotInitialized);
        }

        let greeting = greet_message(name);
        info!(%greeting, "Greeting");
        Ok(greeting)
    }
}

// ============================================================================
// Tests
// ============================================================================
