//! View component.
//!
//! Renders the logo button and runs the greeter chain on click.
//!
//! # Tree
//!
//! ```text
//! div.App
//! └── header.App-header
//!     └── button.spin        (on_click = greet)
//!         └── img.App-logo   (src = logo, alt = "logo")
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `app` | [`App`] component, click chains and [`render`] |
//! | `tree` | [`Node`] values and markup |

// ============================================================================
// Submodules
// ============================================================================

/// App component and click chains.
pub mod app;

/// UI tree values.
pub mod tree;

// ============================================================================
// Re-exports
// ============================================================================

pub use app::{
    App, ChainHandle, ChainState, ClickOutcome, ClickPolicy, DEFAULT_LOGO_PATH, ViewOptions,
    ViewProps, render,
};
pub use tree::{Action, Node};
