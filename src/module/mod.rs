//! Greeter module contract.
//!
//! The view talks to an external computational module through two functions:
//! an asynchronous initializer and a synchronous `greet`. [`GreeterModule`]
//! captures that contract so the click chain can be driven by any backend.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `native` | In-process implementation of the contract |

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// In-process greeter.
pub mod native;

// ============================================================================
// Re-exports
// ============================================================================

pub use native::NativeGreeter;

// ============================================================================
// Constants
// ============================================================================

/// Argument passed to [`GreeterModule::greet`] by the view.
pub const DEFAULT_GREET_TARGET: &str = "WebAssembly";

// ============================================================================
// GreeterModule
// ============================================================================

/// An external module exposing `init` and `greet`.
///
/// `greet` must only be called after `init` has completed successfully.
#[async_trait]
pub trait GreeterModule: Send + Sync {
    /// Prepares the module. Completion is the signal the caller chains on.
    async fn init(&self) -> Result<()>;

    /// Greets `name` and returns the greeting text.
    fn greet(&self, name: &str) -> Result<String>;
}

// ============================================================================
// Functions
// ============================================================================

/// Builds the greeting for `name`.
///
/// Trailing whitespace (including a line terminator) is dropped.
///
/// ```
/// use smart_factory_client::module::greet_message;
///
/// assert_eq!(greet_message("WebAssembly\n"), "Hello, WebAssembly!");
/// ```
#[must_use]
pub fn greet_message(name: &str) -> String {
    format!("Hello, {}!", name.trim_end())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_greet_message() {
        assert_eq!(greet_message("WebAssembly"), "Hello, WebAssembly!");
    }

    #[test]
    fn test_greet_message_trims_trailing_newline() {
        assert_eq!(greet_message("Bob\r\n"), "Hello, Bob!");
    }

    #[test]
    fn test_greet_message_keeps_leading_whitespace() {
        assert_eq!(greet_message("  Bob"), "Hello,   Bob!");
    }

    #[test]
    fn test_default_target() {
        assert_eq!(DEFAULT_GREET_TARGET, "WebAssembly");
    }

    proptest! {
        #[test]
        fn prop_greeting_wraps_trimmed_name(name in "[a-zA-Z0-9 ]{0,32}", tail in "[ \t\r\n]{0,4}") {
            let input = format!("{name}{tail}");
            let greeting = greet_message(&input);
            prop_assert!(greeting.starts_with("Hello, "));
            prop_assert!(greeting.ends_with('!'));
            prop_assert_eq!(&greeting["Hello, ".len()..greeting.len() - 1], name.trim_end());
        }
    }
}
