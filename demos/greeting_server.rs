//! Greeting server.
//!
//! Demonstrates:
//! - Binding the greeting server on localhost
//! - Answering every text frame with "Hello, {text}!"
//!
//! Usage:
//!   cargo run --example greeting_server
//!   cargo run --example greeting_server -- --port 9000
//!   cargo run --example greeting_server -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr};

use anyhow::Context;
use common::Args;
use smart_factory_client::GreetingServer;

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
    println!("=== Greeting Server ===\n");

    let server = GreetingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), args.port)
        .await
        .with_context(|| format!("failed to bind port {}", args.port))?;

    println!("[1] Listening on {}", server.ws_url());
    let handle = server.serve();

    common::wait_for_exit(args.no_wait).await;

    println!("\n[2] Shutting down...");
    println!("    Peers connected: {}", handle.connected_peers());
    println!("    Replies sent:    {}", handle.replies_sent());
    handle.stop().await;
    println!("    ✓ Stopped");

    Ok(())
}
