//! # Relay Settings
//!
//! TOML-persisted settings for the CLI publish path: relay URL, project id,
//! publish key, environment. Normalization trims every field, requires the
//! relay URL and project id, and keeps a previously saved publish key when
//! the incoming one is blank so operators can edit settings without
//! re-entering the secret.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokensync_core::TokenSyncError;

/// Default environment when none is configured.
pub const DEFAULT_ENVIRONMENT: &str = "dev";

// =============================================================================
// SETTINGS TYPES
// =============================================================================

/// Normalized relay settings, as persisted in the settings TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaySettings {
    pub relay_url: String,
    pub project_id: String,
    pub publish_key: String,
    pub environment: String,
}

/// Raw settings input before normalization. All fields optional so partial
/// updates (e.g. changing the environment without retyping the key) work.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelaySettingsInput {
    pub relay_url: Option<String>,
    pub project_id: Option<String>,
    pub publish_key: Option<String>,
    pub environment: Option<String>,
}

// =============================================================================
// NORMALIZATION
// =============================================================================

/// Validate and normalize raw settings input.
///
/// A blank incoming publish key falls back to `existing_publish_key`; the
/// relay URL and project id are required after trimming.
pub fn normalize_settings(
    input: &RelaySettingsInput,
    existing_publish_key: &str,
) -> Result<RelaySettings, TokenSyncError> {
    let relay_url_input = input.relay_url.as_deref().unwrap_or("").trim().to_string();
    let project_id = input.project_id.as_deref().unwrap_or("").trim().to_string();
    let environment = input
        .environment
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_string();
    let publish_key_input = input
        .publish_key
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_string();
    let publish_key = if publish_key_input.is_empty() {
        existing_publish_key.to_string()
    } else {
        publish_key_input
    };

    if relay_url_input.is_empty() {
        return Err(TokenSyncError::Config("Relay URL is required.".to_string()));
    }
    if project_id.is_empty() {
        return Err(TokenSyncError::Config("Project ID is required.".to_string()));
    }
    if publish_key.is_empty() {
        return Err(TokenSyncError::Config(
            "Publish key is required.".to_string(),
        ));
    }

    Ok(RelaySettings {
        relay_url: normalize_relay_url(&relay_url_input),
        project_id,
        publish_key,
        environment: if environment.is_empty() {
            DEFAULT_ENVIRONMENT.to_string()
        } else {
            environment
        },
    })
}

/// Strip trailing slashes; a bare Vercel deployment host gets `/api`
/// appended because its endpoints live under that prefix.
pub fn normalize_relay_url(relay_url_input: &str) -> String {
    let relay_url = relay_url_input.trim_end_matches('/');
    if is_bare_vercel_host(relay_url) {
        format!("{relay_url}/api")
    } else {
        relay_url.to_string()
    }
}

/// True for `https://<host>.vercel.app` with no path, case-insensitively.
fn is_bare_vercel_host(url: &str) -> bool {
    let lowered = url.to_ascii_lowercase();
    let Some(host) = lowered.strip_prefix("https://") else {
        return false;
    };
    !host.is_empty() && !host.contains('/') && host.ends_with(".vercel.app")
}

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Load settings from a TOML file, `None` when the file does not exist.
pub fn load_settings(path: &Path) -> Result<Option<RelaySettings>, TokenSyncError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(TokenSyncError::Io(format!(
                "read settings {}: {e}",
                path.display()
            )));
        }
    };
    let settings: RelaySettings = toml::from_str(&text)
        .map_err(|e| TokenSyncError::Config(format!("invalid settings file: {e}")))?;
    Ok(Some(settings))
}

/// Persist settings as TOML, creating the parent directory if needed.
pub fn save_settings(path: &Path, settings: &RelaySettings) -> Result<(), TokenSyncError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| TokenSyncError::Io(format!("create {}: {e}", parent.display())))?;
    }
    let text = toml::to_string_pretty(settings)
        .map_err(|e| TokenSyncError::Config(format!("serialize settings: {e}")))?;
    std::fs::write(path, text)
        .map_err(|e| TokenSyncError::Io(format!("write settings {}: {e}", path.display())))
}

// =============================================================================
// TESTS
// =============================================================================
