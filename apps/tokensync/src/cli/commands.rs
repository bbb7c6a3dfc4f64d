//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use crate::client::RelayClient;
use crate::settings::{self, RelaySettings, RelaySettingsInput};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokensync_core::{
    ExportOptions, MemoryStore, TokenSyncError, VariableStore, build_change_log, export_tokens,
    import_tokens, strip_volatile,
};

/// Relay settings file inside the state directory.
const SETTINGS_FILE: &str = "settings.toml";

/// Baseline payload cached by the last successful publish.
const BASELINE_FILE: &str = "last-published.json";

/// Maximum token file size (20 MB).
///
/// This prevents memory exhaustion from malicious or accidental large files.
const MAX_TOKEN_FILE_SIZE: u64 = 20 * 1024 * 1024;

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Current UTC time as an ISO-8601 string with millisecond precision.
fn now_iso() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// Read a token JSON file after validating its size.
fn read_token_file(path: &Path) -> Result<Value, TokenSyncError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| TokenSyncError::Io(format!("read {}: {e}", path.display())))?;
    if metadata.len() > MAX_TOKEN_FILE_SIZE {
        return Err(TokenSyncError::Io(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_TOKEN_FILE_SIZE
        )));
    }
    let text = std::fs::read_to_string(path)
        .map_err(|e| TokenSyncError::Io(format!("read {}: {e}", path.display())))?;
    Ok(serde_json::from_str(&text)?)
}

/// Load the store, starting empty when the file does not exist yet.
fn load_or_create_store(path: &Path) -> Result<MemoryStore, TokenSyncError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(MemoryStore::new()),
        Err(e) => {
            return Err(TokenSyncError::Io(format!(
                "read store {}: {e}",
                path.display()
            )));
        }
    };
    Ok(serde_json::from_str(&text)?)
}

/// Persist the store as pretty JSON.
fn save_store(path: &Path, store: &MemoryStore) -> Result<(), TokenSyncError> {
    let text = serde_json::to_string_pretty(store)?;
    std::fs::write(path, text)
        .map_err(|e| TokenSyncError::Io(format!("write store {}: {e}", path.display())))
}

fn settings_path(state_dir: &Path) -> PathBuf {
    state_dir.join(SETTINGS_FILE)
}

fn baseline_path(state_dir: &Path) -> PathBuf {
    state_dir.join(BASELINE_FILE)
}

/// Load relay settings or explain how to configure them.
fn require_settings(state_dir: &Path) -> Result<RelaySettings, TokenSyncError> {
    settings::load_settings(&settings_path(state_dir))?.ok_or_else(|| {
        TokenSyncError::Config(
            "Relay is not configured. Run 'tokensync init --relay-url <url> --project-id <id> --publish-key <key>' first."
                .to_string(),
        )
    })
}

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Start the relay HTTP server.
pub async fn cmd_serve(host: &str, port: u16) -> Result<(), TokenSyncError> {
    let state = api::AppState::from_env();

    println!("TokenSync Relay Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Projects: {}", state.projects.len());
    println!();
    println!("Endpoints:");
    println!("  GET  /health          - Health check");
    println!("  POST /publish-tokens  - Publish a token payload");
    println!("  GET  /live-tokens     - Read published tokens");
    println!("  GET  /version-history - List published versions");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, state).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show store status.
pub fn cmd_status(store_path: &Path, json_mode: bool) -> Result<(), TokenSyncError> {
    let store = load_or_create_store(store_path)?;
    let collections = store.collections()?;
    let variables = store.variables()?;

    if json_mode {
        let output = serde_json::json!({
            "store": store_path.to_string_lossy(),
            "collections": collections.len(),
            "variables": variables.len(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Store: {}", store_path.display());
    println!("  Collections: {}", collections.len());
    println!("  Variables:   {}", variables.len());
    for collection in &collections {
        let count = variables
            .iter()
            .filter(|variable| variable.collection == collection.id)
            .count();
        println!(
            "  - {} ({} variables, {} modes)",
            collection.name,
            count,
            collection.modes.len()
        );
    }
    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Import a token file into the store.
pub fn cmd_import(store_path: &Path, json_mode: bool, file: &Path) -> Result<(), TokenSyncError> {
    let payload = read_token_file(file)?;
    let mut store = load_or_create_store(store_path)?;
    let result = import_tokens(&mut store, &payload)?;
    save_store(store_path, &store)?;

    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Imported into collection '{}'", result.collection);
    println!(
        "  {} tokens ({} created, {} updated, {} replaced, {} skipped)",
        result.imported, result.created, result.updated, result.replaced, result.skipped
    );
    for warning in &result.warnings {
        println!("  warning: {}", warning);
    }
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Export the store as a canonical token payload.
pub fn cmd_export(
    store_path: &Path,
    output: Option<&Path>,
    mode: Option<&str>,
    allow_empty: bool,
) -> Result<(), TokenSyncError> {
    let store = load_or_create_store(store_path)?;
    let options = ExportOptions {
        mode: mode.map(ToString::to_string),
        allow_empty,
        exported_at: now_iso(),
    };
    let payload = export_tokens(&store, &options)?;
    let text = serde_json::to_string_pretty(&payload)?;

    match output {
        Some(path) => {
            std::fs::write(path, &text)
                .map_err(|e| TokenSyncError::Io(format!("write {}: {e}", path.display())))?;
            println!("Exported to {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

// =============================================================================
// DIFF COMMAND
// =============================================================================

/// Diff the current export against a baseline payload.
pub fn cmd_diff(
    store_path: &Path,
    state_dir: &Path,
    json_mode: bool,
    file: Option<&Path>,
) -> Result<(), TokenSyncError> {
    let store = load_or_create_store(store_path)?;
    let options = ExportOptions {
        mode: None,
        allow_empty: true,
        exported_at: now_iso(),
    };
    let current = strip_volatile(&export_tokens(&store, &options)?);

    let baseline = match file {
        Some(path) => Some(strip_volatile(&read_token_file(path)?)),
        None => {
            let cached = baseline_path(state_dir);
            if cached.exists() {
                Some(strip_volatile(&read_token_file(&cached)?))
            } else {
                None
            }
        }
    };

    let log = build_change_log(baseline.as_ref(), &current);

    if json_mode {
        println!("{}", serde_json::to_string_pretty(&log)?);
        return Ok(());
    }

    println!("{}", log.summary);
    for line in &log.lines {
        println!("  {}", line);
    }
    Ok(())
}

// =============================================================================
// PUBLISH COMMAND
// =============================================================================

/// Publish the current export through the configured relay, then cache the
/// payload as the diff baseline.
pub async fn cmd_publish(
    store_path: &Path,
    state_dir: &Path,
    json_mode: bool,
    mode: Option<&str>,
) -> Result<(), TokenSyncError> {
    let relay_settings = require_settings(state_dir)?;
    let store = load_or_create_store(store_path)?;
    let options = ExportOptions {
        mode: mode.map(ToString::to_string),
        allow_empty: false,
        exported_at: now_iso(),
    };
    let payload = export_tokens(&store, &options)?;

    let client = RelayClient::new();
    let result = client.publish(&relay_settings, &payload, "cli").await?;

    // Cache the published payload so the next diff runs against it.
    std::fs::create_dir_all(state_dir)
        .map_err(|e| TokenSyncError::Io(format!("create {}: {e}", state_dir.display())))?;
    let baseline = baseline_path(state_dir);
    let text = serde_json::to_string_pretty(&strip_volatile(&payload))?;
    std::fs::write(&baseline, text)
        .map_err(|e| TokenSyncError::Io(format!("write {}: {e}", baseline.display())))?;

    if json_mode {
        let output = serde_json::json!({
            "versionId": result.version_id,
            "message": result.message,
            "referenceUrl": result.reference_url,
            "changed": result.changed,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", result.message);
    if !result.version_id.is_empty() {
        println!("  Version:   {}", result.version_id);
    }
    if let Some(reference) = &result.reference_url {
        println!("  Reference: {}", reference);
    }
    Ok(())
}

// =============================================================================
// HISTORY COMMAND
// =============================================================================

/// List published versions from the relay.
pub async fn cmd_history(
    state_dir: &Path,
    json_mode: bool,
    limit: usize,
) -> Result<(), TokenSyncError> {
    let relay_settings = require_settings(state_dir)?;
    let client = RelayClient::new();
    let history = client
        .version_history(&relay_settings, limit.clamp(1, 50))
        .await?;

    if json_mode {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    println!(
        "History for {} ({}), path {} - {} versions",
        history.project_id, history.environment, history.path, history.count
    );
    for item in &history.items {
        println!(
            "  {}  {}  {}",
            item.version_id,
            item.published_at.as_deref().unwrap_or("-"),
            item.commit_message
        );
    }
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new empty store and optionally save relay settings.
pub fn cmd_init(
    store_path: &Path,
    state_dir: &Path,
    force: bool,
    relay_url: Option<String>,
    project_id: Option<String>,
    publish_key: Option<String>,
    environment: Option<String>,
) -> Result<(), TokenSyncError> {
    if store_path.exists() && !force {
        return Err(TokenSyncError::Config(format!(
            "Store already exists at {}. Use --force to overwrite.",
            store_path.display()
        )));
    }
    save_store(store_path, &MemoryStore::new())?;
    println!("Initialized empty store at {}", store_path.display());

    let has_relay_input = relay_url.is_some()
        || project_id.is_some()
        || publish_key.is_some()
        || environment.is_some();
    if has_relay_input {
        let path = settings_path(state_dir);
        let existing = settings::load_settings(&path)?;
        let saved_key = existing.map(|s| s.publish_key).unwrap_or_default();
        let input = RelaySettingsInput {
            relay_url,
            project_id,
            publish_key,
            environment,
        };
        let normalized = settings::normalize_settings(&input, &saved_key)?;
        settings::save_settings(&path, &normalized)?;
        println!("Relay settings saved to {}", path.display());
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
