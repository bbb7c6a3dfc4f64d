//! # Relay HTTP Client
//!
//! Wrapper around the relay REST API used by the publish and history
//! commands. HTTP failures are translated into the operator-facing messages
//! the CLI prints verbatim.

use crate::api::VersionHistoryResponse;
use crate::settings::RelaySettings;
use serde_json::{Value, json};
use tokensync_core::TokenSyncError;

// =============================================================================
// RESULT TYPE
// =============================================================================

/// Outcome of a relay publish, tolerant of sparse relay responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayPublishResult {
    pub version_id: String,
    pub message: String,
    pub reference_url: Option<String>,
    pub changed: Option<bool>,
}

// =============================================================================
// ERROR MESSAGES
// =============================================================================

/// Truncate long relay error bodies to keep CLI output readable.
fn truncate_relay_message(message: &str) -> String {
    if message.chars().count() > 240 {
        let head: String = message.chars().take(240).collect();
        format!("{head}...")
    } else {
        message.to_string()
    }
}

/// Map an HTTP failure to the message shown to the operator.
fn build_relay_http_error_message(
    status_code: u16,
    backend_message: &str,
    endpoint: &str,
) -> String {
    let lowered = backend_message.to_lowercase();
    if status_code == 401 || status_code == 403 || lowered.contains("unauthorized") {
        return "Publish failed: unauthorized. Check project ID and publish key.".to_string();
    }
    if status_code == 404 {
        return format!(
            "Publish failed: relay endpoint not found (404) at {endpoint}. For Vercel, use Relay URL ending with /api."
        );
    }
    if status_code >= 500 {
        return format!(
            "Publish failed: relay server error ({status_code}). {}",
            truncate_relay_message(backend_message)
        );
    }
    format!(
        "Publish failed ({status_code}): {}",
        truncate_relay_message(backend_message)
    )
}

// =============================================================================
// CLIENT
// =============================================================================

/// HTTP client for the relay endpoints.
#[derive(Debug, Clone, Default)]
pub struct RelayClient {
    http: reqwest::Client,
}

impl RelayClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// POST `/publish-tokens`.
    pub async fn publish(
        &self,
        settings: &RelaySettings,
        payload: &Value,
        source: &str,
    ) -> Result<RelayPublishResult, TokenSyncError> {
        let endpoint = format!("{}/publish-tokens", settings.relay_url);
        let body = json!({
            "projectId": settings.project_id,
            "publishKey": settings.publish_key,
            "environment": settings.environment,
            "source": source,
            "fileKey": Value::Null,
            "payload": payload,
        });

        let response = self
            .http
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                TokenSyncError::Relay(format!(
                    "Publish failed: could not reach relay at {endpoint}. Check Relay URL and network access. ({})",
                    truncate_relay_message(&e.to_string())
                ))
            })?;

        let status = response.status();
        let raw_text = response.text().await.unwrap_or_default();
        let data: Value = serde_json::from_str(&raw_text).unwrap_or_else(|_| json!({}));

        if !status.is_success() {
            let backend_message = data["error"]
                .as_str()
                .map(ToString::to_string)
                .or_else(|| {
                    if raw_text.is_empty() {
                        None
                    } else {
                        Some(raw_text.clone())
                    }
                })
                .unwrap_or_else(|| format!("Relay request failed ({status})."));
            return Err(TokenSyncError::Relay(build_relay_http_error_message(
                status.as_u16(),
                &backend_message,
                &endpoint,
            )));
        }

        Ok(RelayPublishResult {
            version_id: data["versionId"].as_str().unwrap_or_default().to_string(),
            message: data["message"]
                .as_str()
                .unwrap_or("Published successfully.")
                .to_string(),
            reference_url: data["referenceUrl"].as_str().map(ToString::to_string),
            changed: data["changed"].as_bool(),
        })
    }

    /// GET `/version-history`.
    pub async fn version_history(
        &self,
        settings: &RelaySettings,
        limit: usize,
    ) -> Result<VersionHistoryResponse, TokenSyncError> {
        let endpoint = format!("{}/version-history", settings.relay_url);
        let response = self
            .http
            .get(&endpoint)
            .query(&[
                ("projectId", settings.project_id.as_str()),
                ("environment", settings.environment.as_str()),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                TokenSyncError::Relay(format!(
                    "History failed: could not reach relay at {endpoint}. ({})",
                    truncate_relay_message(&e.to_string())
                ))
            })?;

        let status = response.status();
        let raw_text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let data: Value = serde_json::from_str(&raw_text).unwrap_or_else(|_| json!({}));
            let backend_message = data["error"].as_str().unwrap_or(raw_text.as_str());
            return Err(TokenSyncError::Relay(format!(
                "History failed ({status}): {}",
                truncate_relay_message(backend_message)
            )));
        }

        serde_json::from_str(&raw_text)
            .map_err(|e| TokenSyncError::Relay(format!("History failed: invalid response: {e}")))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_key_hint() {
        let expected = "Publish failed: unauthorized. Check project ID and publish key.";
        assert_eq!(
            build_relay_http_error_message(401, "nope", "https://r/publish-tokens"),
            expected
        );
        assert_eq!(
            build_relay_http_error_message(403, "nope", "https://r/publish-tokens"),
            expected
        );
        // The word alone is enough, whatever the status code.
        assert_eq!(
            build_relay_http_error_message(400, "Unauthorized publish key.", "e"),
            expected
        );
    }

    #[test]
    fn missing_endpoint_mentions_the_url() {
        let message = build_relay_http_error_message(404, "", "https://demo.vercel.app/publish-tokens");
        assert!(message.contains("https://demo.vercel.app/publish-tokens"));
        assert!(message.contains("/api"));
    }

    #[test]
    fn server_errors_carry_truncated_backend_message() {
        let long = "x".repeat(300);
        let message = build_relay_http_error_message(500, &long, "e");
        assert!(message.starts_with("Publish failed: relay server error (500)."));
        assert!(message.ends_with("..."));
        assert!(message.len() < 300);
    }

    #[test]
    fn short_messages_are_not_truncated() {
        assert_eq!(truncate_relay_message("short"), "short");
    }
}
