//! # GitHub Target Adapter
//!
//! Thin wrapper over the GitHub contents and commits APIs, used by relay
//! projects that publish into a repository instead of a local directory.
//!
//! Writes are idempotent: the current file content is fetched first and the
//! commit is skipped when the canonical content already matches.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};
use tokensync_core::{TokenSyncError, content_equal};

const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";

// =============================================================================
// TARGET AND RESULT TYPES
// =============================================================================

/// One GitHub-backed publish target.
#[derive(Debug, Clone)]
pub struct GitHubTarget {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub path: String,
    pub token: String,
}

/// Current state of the target file.
#[derive(Debug, Clone)]
pub struct ContentMeta {
    pub sha: Option<String>,
    pub content: Option<String>,
}

/// Result of a write-if-changed commit.
#[derive(Debug, Clone)]
pub struct PutOutcome {
    pub changed: bool,
    pub commit_sha: Option<String>,
    pub commit_url: Option<String>,
}

/// One commit touching the target file.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub sha: String,
    pub message: String,
    pub date: Option<String>,
    pub html_url: Option<String>,
}

// =============================================================================
// CLIENT
// =============================================================================

/// Async GitHub API client.
#[derive(Debug, Clone, Default)]
pub struct GitHubClient {
    http: reqwest::Client,
}

impl GitHubClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn request(
        &self,
        method: reqwest::Method,
        url: &str,
        token: &str,
    ) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .header("User-Agent", concat!("tokensync/", env!("CARGO_PKG_VERSION")));
        if !token.is_empty() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Fetch the current content and blob sha, `None` when the file does not
    /// exist on the branch yet.
    pub async fn fetch_content(
        &self,
        target: &GitHubTarget,
    ) -> Result<Option<ContentMeta>, TokenSyncError> {
        let url = contents_url(target);
        let response = self
            .request(reqwest::Method::GET, &url, &target.token)
            .send()
            .await
            .map_err(|e| TokenSyncError::Remote(format!("GitHub read failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(TokenSyncError::Remote(format!(
                "GitHub read failed ({status}): {text}"
            )));
        }

        let payload: Value = serde_json::from_str(&text)?;
        let sha = payload["sha"].as_str().map(ToString::to_string);
        let content = match (payload["content"].as_str(), payload["encoding"].as_str()) {
            (Some(encoded), Some("base64")) => decode_base64(encoded).ok(),
            _ => None,
        };
        Ok(Some(ContentMeta { sha, content }))
    }

    /// Commit new file content unless the current content already matches
    /// canonically.
    pub async fn put_content(
        &self,
        target: &GitHubTarget,
        message: &str,
        content: &str,
    ) -> Result<PutOutcome, TokenSyncError> {
        let existing = self.fetch_content(target).await?;
        if let Some(meta) = &existing {
            if let Some(current) = &meta.content {
                if content_equal(current, content) {
                    return Ok(PutOutcome {
                        changed: false,
                        commit_sha: None,
                        commit_url: None,
                    });
                }
            }
        }

        let mut body = json!({
            "message": message,
            "content": BASE64.encode(content.as_bytes()),
            "branch": target.branch,
        });
        if let Some(sha) = existing.and_then(|meta| meta.sha) {
            body["sha"] = Value::String(sha);
        }

        let url = contents_url(target);
        let response = self
            .request(reqwest::Method::PUT, &url, &target.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| TokenSyncError::Remote(format!("GitHub write failed: {e}")))?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(TokenSyncError::Remote(format!(
                "GitHub write failed ({status}): {text}"
            )));
        }

        let payload: Value = serde_json::from_str(&text)?;
        Ok(PutOutcome {
            changed: true,
            commit_sha: payload["commit"]["sha"].as_str().map(ToString::to_string),
            commit_url: payload["commit"]["html_url"]
                .as_str()
                .map(ToString::to_string),
        })
    }

    /// List the most recent commits touching the target file.
    pub async fn list_commits(
        &self,
        target: &GitHubTarget,
        limit: usize,
    ) -> Result<Vec<CommitInfo>, TokenSyncError> {
        let url = format!(
            "{GITHUB_API_BASE}/repos/{}/{}/commits",
            encode_segment(&target.owner),
            encode_segment(&target.repo),
        );
        let response = self
            .request(reqwest::Method::GET, &url, &target.token)
            .query(&[
                ("sha", target.branch.as_str()),
                ("path", target.path.as_str()),
                ("per_page", &limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| TokenSyncError::Remote(format!("GitHub history failed: {e}")))?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(TokenSyncError::Remote(format!(
                "GitHub history failed ({status}): {text}"
            )));
        }

        let payload: Value = serde_json::from_str(&text)?;
        let commits = payload.as_array().cloned().unwrap_or_default();
        Ok(commits
            .iter()
            .map(|commit| CommitInfo {
                sha: commit["sha"].as_str().unwrap_or_default().to_string(),
                message: first_line(commit["commit"]["message"].as_str().unwrap_or_default()),
                date: commit["commit"]["committer"]["date"]
                    .as_str()
                    .or_else(|| commit["commit"]["author"]["date"].as_str())
                    .map(ToString::to_string),
                html_url: commit["html_url"].as_str().map(ToString::to_string),
            })
            .collect())
    }
}

// =============================================================================
// URL AND CONTENT HELPERS
// =============================================================================

/// Raw content URL for a revision (commit sha or branch name).
#[must_use]
pub fn raw_url(target: &GitHubTarget, revision: &str) -> String {
    let encoded_path: Vec<String> = target.path.split('/').map(encode_segment).collect();
    format!(
        "https://raw.githubusercontent.com/{}/{}/{}/{}",
        encode_segment(&target.owner),
        encode_segment(&target.repo),
        encode_segment(revision),
        encoded_path.join("/"),
    )
}

fn contents_url(target: &GitHubTarget) -> String {
    let encoded_path: Vec<String> = target.path.split('/').map(encode_segment).collect();
    format!(
        "{GITHUB_API_BASE}/repos/{}/{}/contents/{}?ref={}",
        encode_segment(&target.owner),
        encode_segment(&target.repo),
        encoded_path.join("/"),
        encode_segment(&target.branch),
    )
}

/// Percent-encode one URL segment (everything but RFC 3986 unreserved bytes).
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Decode GitHub's newline-wrapped base64 content field.
fn decode_base64(encoded: &str) -> Result<String, TokenSyncError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| TokenSyncError::Remote(format!("invalid base64 content: {e}")))?;
    String::from_utf8(bytes).map_err(|e| TokenSyncError::Remote(format!("invalid utf8: {e}")))
}

fn first_line(message: &str) -> String {
    message.lines().next().unwrap_or_default().trim().to_string()
}

// =============================================================================
// TESTS
// =============================================================================
