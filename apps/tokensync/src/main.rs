//! # tokensync - Design Token Relay and Sync Tool
//!
//! The main binary for the tokensync token translation engine.
//!
//! This application provides:
//! - Relay HTTP API server (axum-based)
//! - CLI interface for import/export/diff/publish operations
//!
//! ## Usage
//!
//! ```bash
//! # Start the relay server
//! tokensync serve --host 0.0.0.0 --port 8787
//!
//! # CLI operations
//! tokensync import -f tokens.json
//! tokensync export -o out.json
//! tokensync publish
//! ```

use clap::Parser;
use tokensync::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing — TOKENSYNC_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("TOKENSYNC_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tokensync=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the tokensync startup banner.
fn print_banner() {
    println!(
        r#"
  ████████╗ ██████╗ ██╗  ██╗███████╗██╗   ██╗███╗   ██╗ ██████╗
  ╚══██╔══╝██╔═══██╗██║ ██╔╝██╔════╝╚██╗ ██╔╝████╗  ██║██╔════╝
     ██║   ██║   ██║█████╔╝ ███████╗ ╚████╔╝ ██╔██╗ ██║██║
     ██║   ██║   ██║██╔═██╗ ╚════██║  ╚██╔╝  ██║╚██╗██║██║
     ██║   ╚██████╔╝██║  ██╗███████║   ██║   ██║ ╚████║╚██████╗
     ╚═╝    ╚═════╝ ╚═╝  ╚═╝╚══════╝   ╚═╝   ╚═╝  ╚═══╝ ╚═════╝

  Design Token Relay v{}

  Deterministic • Idempotent • Diffable
"#,
        env!("CARGO_PKG_VERSION")
    );
}
