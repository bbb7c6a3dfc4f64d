//! # API Request/Response Types
//!
//! JSON structures for the relay HTTP API. Field names are camelCase on the
//! wire, matching what publishing clients send and expect back.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokensync_core::VersionEntry;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub projects_loaded: usize,
}

impl HealthResponse {
    pub fn new(projects_loaded: usize) -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            projects_loaded,
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Uniform error body: `{ "error": "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

// =============================================================================
// PUBLISH REQUEST/RESPONSE
// =============================================================================

/// Publish request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishTokensRequest {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub publish_key: String,
    #[serde(default)]
    pub environment: String,
    /// Free-form origin tag from the publishing client.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub file_key: Option<String>,
    #[serde(default)]
    pub payload: Option<Value>,
}

impl PublishTokensRequest {
    /// Trimmed environment, defaulting to `dev`.
    pub fn environment(&self) -> String {
        let trimmed = self.environment.trim();
        if trimmed.is_empty() {
            "dev".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

/// Publish response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishTokensResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_url: Option<String>,
    pub changed: bool,
}

impl PublishTokensResponse {
    pub fn published(version_id: String, reference_url: Option<String>) -> Self {
        Self {
            version_id: Some(version_id),
            message: "Published successfully.".to_string(),
            reference_url,
            changed: true,
        }
    }

    pub fn unchanged(reference_url: Option<String>) -> Self {
        Self {
            version_id: None,
            message: "No changes to publish.".to_string(),
            reference_url,
            changed: false,
        }
    }
}

// =============================================================================
// VERSION HISTORY
// =============================================================================

/// One published version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionItem {
    pub version_id: String,
    pub commit_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_url: Option<String>,
}

impl From<VersionEntry> for VersionItem {
    fn from(entry: VersionEntry) -> Self {
        Self {
            version_id: entry.version_id,
            commit_message: entry.message,
            published_at: entry.published_at,
            reference_url: entry.reference_url,
        }
    }
}

/// Version history response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionHistoryResponse {
    pub project_id: String,
    pub environment: String,
    pub path: String,
    pub count: usize,
    pub items: Vec<VersionItem>,
}

// =============================================================================
// QUERY PARAMETERS
// =============================================================================

/// Query parameters for `/live-tokens` and `/version-history`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl ProjectQuery {
    /// Trimmed environment, defaulting to `dev`.
    pub fn environment(&self) -> String {
        let trimmed = self.environment.trim();
        if trimmed.is_empty() {
            "dev".to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// History page size clamped to [1, 50], defaulting to 12.
    pub fn limit(&self) -> usize {
        let raw = self.limit.unwrap_or(12);
        raw.clamp(1, 50) as usize
    }
}

// =============================================================================
// TESTS
// =============================================================================
