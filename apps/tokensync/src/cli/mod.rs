//! # TokenSync CLI Module
//!
//! This module implements the CLI interface for TokenSync.
//!
//! ## Available Commands
//!
//! - `serve` - Start the relay HTTP server
//! - `status` - Show store status
//! - `import` - Import a token file into the store
//! - `export` - Export the store as a canonical token payload
//! - `diff` - Diff the current export against a baseline
//! - `publish` - Publish the current export through the relay
//! - `history` - List published versions from the relay
//! - `init` - Initialize a new store and optionally relay settings

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokensync_core::TokenSyncError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// TokenSync - Deterministic design token sync
///
/// Parses token trees, reconciles them into a typed variable store, and
/// publishes canonical exports through a relay.
#[derive(Parser, Debug)]
#[command(name = "tokensync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the variable store file
    #[arg(short = 'S', long, global = true, default_value = "tokensync.store.json")]
    pub store: PathBuf,

    /// Directory for relay settings and the last-published baseline
    #[arg(short = 'D', long, global = true, default_value = ".tokensync")]
    pub state_dir: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the relay HTTP server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8787")]
        port: u16,
    },

    /// Show store status
    Status,

    /// Import a token file into the store
    Import {
        /// Path to the token JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Export the store as a canonical token payload
    Export {
        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Mode selector (mode name or id; per-collection default when omitted)
        #[arg(short, long)]
        mode: Option<String>,

        /// Produce a valid empty payload instead of failing on an empty store
        #[arg(long)]
        allow_empty: bool,
    },

    /// Diff the current export against a baseline
    Diff {
        /// Baseline token file (defaults to the last published payload)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Publish the current export through the configured relay
    Publish {
        /// Mode selector for the published export
        #[arg(short, long)]
        mode: Option<String>,
    },

    /// List published versions from the relay
    History {
        /// Number of versions to fetch
        #[arg(short, long, default_value = "12")]
        limit: usize,
    },

    /// Initialize a new store and optionally relay settings
    Init {
        /// Force initialization even if the store exists
        #[arg(short, long)]
        force: bool,

        /// Relay base URL
        #[arg(long)]
        relay_url: Option<String>,

        /// Relay project id
        #[arg(long)]
        project_id: Option<String>,

        /// Relay publish key (a saved key is kept when omitted)
        #[arg(long)]
        publish_key: Option<String>,

        /// Publish environment
        #[arg(long)]
        environment: Option<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), TokenSyncError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Serve { host, port }) => cmd_serve(&host, port).await,
        Some(Commands::Status) => cmd_status(&cli.store, json_mode),
        Some(Commands::Import { file }) => cmd_import(&cli.store, json_mode, &file),
        Some(Commands::Export {
            output,
            mode,
            allow_empty,
        }) => cmd_export(&cli.store, output.as_deref(), mode.as_deref(), allow_empty),
        Some(Commands::Diff { file }) => {
            cmd_diff(&cli.store, &cli.state_dir, json_mode, file.as_deref())
        }
        Some(Commands::Publish { mode }) => {
            cmd_publish(&cli.store, &cli.state_dir, json_mode, mode.as_deref()).await
        }
        Some(Commands::History { limit }) => cmd_history(&cli.state_dir, json_mode, limit).await,
        Some(Commands::Init {
            force,
            relay_url,
            project_id,
            publish_key,
            environment,
        }) => cmd_init(
            &cli.store,
            &cli.state_dir,
            force,
            relay_url,
            project_id,
            publish_key,
            environment,
        ),
        None => {
            // No subcommand - show status by default
            cmd_status(&cli.store, json_mode)
        }
    }
}
