//! Greeting client.
//!
//! Demonstrates:
//! - Loading client options from a JSON file or flags
//! - Starting the view and the supervised connection together
//! - Clicking the logo and reading the greeting
//! - Inbound messages logged by the tracing sink
//!
//! Usage:
//!   cargo run --example greeting_server
//!   cargo run --example greeting_client
//!   cargo run --example greeting_client -- --endpoint ws://127.0.0.1:9000
//!   cargo run --example greeting_client -- --config client.json --no-wait

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::Args;
use smart_factory_client::{Client, ClientOptions, NativeGreeter};
use tokio::time::timeout;

// ============================================================================
// Constants
// ============================================================================

/// Simulated module download and compile time.
const MODULE_LOAD_DELAY: Duration = Duration::from_millis(250);

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    println!("=== Greeting Client ===\n");

    // ========================================================================
    // Configure
    // ========================================================================

    let options = match &args.config {
        Some(path) => ClientOptions::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ClientOptions::default(),
    };

    let mut builder = Client::builder().options(options);
    if let Some(endpoint) = args.endpoint {
        builder = builder.endpoint(endpoint);
    }
    let client = builder.build()?;

    println!("[1] Endpoint: {}", client.options().endpoint);

    // ========================================================================
    // Start
    // ========================================================================

    let module = Arc::new(NativeGreeter::with_load_delay(MODULE_LOAD_DELAY));
    let session = client.start(module);

    println!("[2] View:");
    println!("    {}", serde_json::to_string(&session.app.render())?);

    let connected = timeout(Duration::from_secs(5), session.connection.wait_for_connections(1))
        .await
        .unwrap_or(false);
    if connected {
        println!("    ✓ Connected, handshake sent");
    } else {
        println!("    ✗ Not connected yet (the view still works)");
    }

    // ========================================================================
    // Click
    // ========================================================================

    println!("\n[3] Clicking logo...");

    if let Some(chain) = session.app.click().into_handle() {
        println!("    Rendered while pending:");
        println!("    {}", serde_json::to_string(&session.app.render())?);

        let greeting = chain.join().await?;
        println!("    ✓ {greeting}");
    }

    // ========================================================================
    // Exit
    // ========================================================================

    common::wait_for_exit(args.no_wait).await;

    session.shutdown().await?;
    println!("\n=== Done ===");

    Ok(())
}
