//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers. Publish-key
//! verification happens here, against the per-project configuration, and
//! every write goes through the idempotent write-if-changed path.

use super::{
    AppState, ProjectConfig, auth, github,
    types::{
        ErrorResponse, HealthResponse, ProjectQuery, PublishTokensRequest, PublishTokensResponse,
        VersionHistoryResponse, VersionItem,
    },
};
use crate::remote::LocalDirRemote;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tokensync_core::{TokenRemote, extract_version_id, version_id_from_timestamp};

// =============================================================================
// RESPONSE HELPERS
// =============================================================================

fn json_error(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(msg))).into_response()
}

/// Current UTC time as an ISO-8601 string with millisecond precision.
fn now_iso() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// Look up a project or produce the uniform 404 body.
fn find_project<'a>(state: &'a AppState, project_id: &str) -> Result<&'a ProjectConfig, Response> {
    state
        .projects
        .get(project_id)
        .ok_or_else(|| json_error(StatusCode::NOT_FOUND, "Unknown projectId."))
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse::new(state.projects.len()))
}

// =============================================================================
// PUBLISH HANDLER
// =============================================================================

/// Publish a token payload into a project's target.
pub async fn publish_handler(
    State(state): State<AppState>,
    Json(request): Json<PublishTokensRequest>,
) -> Response {
    let project_id = request.project_id.trim();
    let publish_key = request.publish_key.trim();
    if project_id.is_empty() || publish_key.is_empty() {
        return json_error(
            StatusCode::BAD_REQUEST,
            "projectId and publishKey are required.",
        );
    }
    let Some(payload) = request.payload.as_ref().filter(|p| p.is_object()) else {
        return json_error(StatusCode::BAD_REQUEST, "payload is required.");
    };

    let project = match find_project(&state, project_id) {
        Ok(project) => project,
        Err(response) => return response,
    };
    if !auth::verify_publish_key(&project.publish_key, publish_key) {
        tracing::warn!(
            event = "auth_failure",
            project = project_id,
            "Publish rejected: invalid publish key"
        );
        return json_error(StatusCode::UNAUTHORIZED, "Unauthorized publish key.");
    }

    let environment = request.environment();
    let path = project.target_path(&environment);
    let content = match serde_json::to_string_pretty(payload) {
        Ok(text) => text,
        Err(e) => {
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialize payload: {e}"),
            );
        }
    };
    let version_id = version_id_from_timestamp(&now_iso());
    let message = format!("chore(tokens): {project_id} {environment} {version_id}");

    if let Some(root) = project.local_root() {
        // Serialize local writes so two concurrent publishes cannot race
        // the history index.
        let _guard = state.local_guard.lock().await;
        let mut remote = LocalDirRemote::new(root);
        return match remote.write_if_changed(&path, &content, &message) {
            Ok(outcome) if outcome.changed => {
                tracing::info!(project = project_id, %environment, %version_id, "published");
                Json(PublishTokensResponse::published(
                    version_id,
                    outcome.reference_url,
                ))
                .into_response()
            }
            Ok(outcome) => {
                Json(PublishTokensResponse::unchanged(outcome.reference_url)).into_response()
            }
            Err(e) => json_error(StatusCode::BAD_GATEWAY, e.to_string()),
        };
    }

    let target = match project.github_target(&environment, state.github_token.as_deref()) {
        Ok(target) => target,
        Err(e) => return json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    match state.github.put_content(&target, &message, &content).await {
        Ok(outcome) if outcome.changed => {
            tracing::info!(project = project_id, %environment, %version_id, "published");
            let reference_url = outcome.commit_url.or_else(|| {
                outcome
                    .commit_sha
                    .as_deref()
                    .map(|sha| github::raw_url(&target, sha))
            });
            Json(PublishTokensResponse::published(version_id, reference_url)).into_response()
        }
        Ok(_) => {
            let reference_url = Some(github::raw_url(&target, &target.branch));
            Json(PublishTokensResponse::unchanged(reference_url)).into_response()
        }
        Err(e) => json_error(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

// =============================================================================
// LIVE TOKENS HANDLER
// =============================================================================

/// Read the currently published token file for a project/environment.
pub async fn live_tokens_handler(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> Response {
    let project_id = query.project_id.trim();
    if project_id.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "projectId is required.");
    }
    let project = match find_project(&state, project_id) {
        Ok(project) => project,
        Err(response) => return response,
    };
    let environment = query.environment();
    let path = project.target_path(&environment);

    let content = if let Some(root) = project.local_root() {
        match LocalDirRemote::new(root).read_current(&path) {
            Ok(Some(content)) => content,
            Ok(None) => {
                return json_error(
                    StatusCode::NOT_FOUND,
                    "No published tokens for this project and environment.",
                );
            }
            Err(e) => return json_error(StatusCode::BAD_GATEWAY, e.to_string()),
        }
    } else {
        let target = match project.github_target(&environment, state.github_token.as_deref()) {
            Ok(target) => target,
            Err(e) => return json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };
        match state.github.fetch_content(&target).await {
            Ok(Some(meta)) => match meta.content {
                Some(content) => content,
                None => {
                    return json_error(
                        StatusCode::BAD_GATEWAY,
                        "GitHub response did not include token content.",
                    );
                }
            },
            Ok(None) => {
                return json_error(
                    StatusCode::NOT_FOUND,
                    "No published tokens for this project and environment.",
                );
            }
            Err(e) => return json_error(StatusCode::BAD_GATEWAY, e.to_string()),
        }
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(parsed) => (
            [(axum::http::header::CACHE_CONTROL, "no-store")],
            Json(parsed),
        )
            .into_response(),
        Err(e) => json_error(
            StatusCode::BAD_GATEWAY,
            format!("Published token file is not valid JSON: {e}"),
        ),
    }
}

// =============================================================================
// VERSION HISTORY HANDLER
// =============================================================================

/// List published versions for a project/environment, most recent first.
pub async fn version_history_handler(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> Response {
    let project_id = query.project_id.trim();
    if project_id.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "projectId is required.");
    }
    let project = match find_project(&state, project_id) {
        Ok(project) => project,
        Err(response) => return response,
    };
    let environment = query.environment();
    let path = project.target_path(&environment);
    let limit = query.limit();

    let items: Vec<VersionItem> = if let Some(root) = project.local_root() {
        match LocalDirRemote::new(root).history(&path, limit) {
            Ok(entries) => entries.into_iter().map(VersionItem::from).collect(),
            Err(e) => return json_error(StatusCode::BAD_GATEWAY, e.to_string()),
        }
    } else {
        let target = match project.github_target(&environment, state.github_token.as_deref()) {
            Ok(target) => target,
            Err(e) => return json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };
        match state.github.list_commits(&target, limit).await {
            Ok(commits) => commits
                .into_iter()
                .map(|commit| VersionItem {
                    version_id: extract_version_id(&commit.message)
                        .or_else(|| short_sha_version(&commit.sha))
                        .unwrap_or_else(|| "unversioned".to_string()),
                    commit_message: commit.message,
                    published_at: commit.date,
                    reference_url: commit.html_url,
                })
                .collect(),
            Err(e) => return json_error(StatusCode::BAD_GATEWAY, e.to_string()),
        }
    };

    let response = VersionHistoryResponse {
        project_id: project_id.to_string(),
        environment,
        path,
        count: items.len(),
        items,
    };
    (
        [(axum::http::header::CACHE_CONTROL, "no-store")],
        Json(response),
    )
        .into_response()
}

/// `c<sha7>` fallback identifier for commits without a version marker.
fn short_sha_version(sha: &str) -> Option<String> {
    if sha.is_empty() {
        None
    } else {
        Some(format!("c{}", &sha[..sha.len().min(7)]))
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
    fn short_sha_versions() {
        assert_eq!(
            short_sha_version("0123456789abcdef").as_deref(),
            Some("c0123456")
        );
        assert_eq!(short_sha_version("ab").as_deref(), Some("cab"));
        assert_eq!(short_sha_version(""), None);
    }
}
