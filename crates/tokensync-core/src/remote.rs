//! # Token Remote
//!
//! The remote capability consumed by the publish path, plus the in-memory
//! implementation used as the test double.
//!
//! Writes are idempotent: the remote compares canonical content and reports
//! `changed: false` instead of recording an identical version.

use crate::canonical;
use crate::diff;
use crate::export::{self, ExportOptions};
use crate::store::VariableStore;
use crate::types::{ChangeLog, TokenSyncError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// =============================================================================
// TOKENREMOTE TRAIT
// =============================================================================

/// Outcome of an idempotent remote write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOutcome {
    /// False when the stored content already matched canonically.
    pub changed: bool,
    /// Durable reference to the stored artifact, when the remote has one.
    pub reference_url: Option<String>,
}

/// One prior version of the remote token file, most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version_id: String,
    pub message: String,
    pub published_at: Option<String>,
    pub reference_url: Option<String>,
}

/// Read/write access to the canonical token file in a remote store.
///
/// Implementations map their own failures into [`TokenSyncError::Remote`].
pub trait TokenRemote {
    /// Current content of the file, or `None` when it does not exist yet.
    fn read_current(&self, path: &str) -> Result<Option<String>, TokenSyncError>;

    /// Write the content unless it already matches canonically.
    fn write_if_changed(
        &mut self,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<WriteOutcome, TokenSyncError>;

    /// Prior versions of the file, most recent first, capped at `limit`.
    fn history(&self, path: &str, limit: usize) -> Result<Vec<VersionEntry>, TokenSyncError>;
}

// =============================================================================
// VERSION IDENTIFIERS
// =============================================================================

/// Derive the `v<digits>` version identifier from an ISO-8601 timestamp.
#[must_use]
pub fn version_id_from_timestamp(timestamp: &str) -> String {
    let digits: String = timestamp.chars().filter(char::is_ascii_digit).collect();
    format!("v{digits}")
}

/// Extract a version identifier from a commit message: a word of the form
/// `v` followed by at least fourteen digits.
#[must_use]
pub fn extract_version_id(message: &str) -> Option<String> {
    message
        .split_whitespace()
        .find(|word| {
            word.len() >= 15
                && word.starts_with('v')
                && word[1..].bytes().all(|b| b.is_ascii_digit())
        })
        .map(ToString::to_string)
}

// =============================================================================
// MEMORYREMOTE
// =============================================================================

/// In-memory [`TokenRemote`] recording writes and serving history.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    files: BTreeMap<String, String>,
    history: BTreeMap<String, Vec<VersionEntry>>,
    sequence: u64,
}

impl MemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenRemote for MemoryRemote {
    fn read_current(&self, path: &str) -> Result<Option<String>, TokenSyncError> {
        Ok(self.files.get(path).cloned())
    }

    fn write_if_changed(
        &mut self,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<WriteOutcome, TokenSyncError> {
        if let Some(existing) = self.files.get(path) {
            if canonical::content_equal(existing, content) {
                let reference_url = self
                    .history
                    .get(path)
                    .and_then(|entries| entries.first())
                    .and_then(|entry| entry.reference_url.clone());
                return Ok(WriteOutcome {
                    changed: false,
                    reference_url,
                });
            }
        }

        self.sequence += 1;
        let version_id = extract_version_id(message)
            .unwrap_or_else(|| format!("c{:07}", self.sequence));
        let reference_url = format!("memory://{path}@{version_id}");
        self.files.insert(path.to_string(), content.to_string());
        self.history.entry(path.to_string()).or_default().insert(
            0,
            VersionEntry {
                version_id,
                message: message.to_string(),
                published_at: None,
                reference_url: Some(reference_url.clone()),
            },
        );
        Ok(WriteOutcome {
            changed: true,
            reference_url: Some(reference_url),
        })
    }

    fn history(&self, path: &str, limit: usize) -> Result<Vec<VersionEntry>, TokenSyncError> {
        let entries = self.history.get(path).cloned().unwrap_or_default();
        Ok(entries.into_iter().take(limit).collect())
    }
}

// =============================================================================
// PUBLISH
// =============================================================================

/// Identity of one publish operation.
#[derive(Debug, Clone, Copy)]
pub struct PublishRequest<'a> {
    pub project: &'a str,
    pub environment: &'a str,
    /// Remote path of the canonical token file.
    pub path: &'a str,
    /// ISO-8601 timestamp supplied by the caller; also the version id seed.
    pub exported_at: &'a str,
}

/// Result surfaced to the publish caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub version_id: String,
    pub message: String,
    pub reference_url: Option<String>,
    pub changed: bool,
    pub change_log: ChangeLog,
}

/// Export the store, strip the volatile timestamp, and write the canonical
/// payload to the remote if it changed.
///
/// The change log is computed against the remote's current content; when the
/// write reports no change it collapses to the no-changes form.
pub fn publish<S: VariableStore, R: TokenRemote>(
    store: &S,
    remote: &mut R,
    request: &PublishRequest<'_>,
) -> Result<PublishOutcome, TokenSyncError> {
    let exported = export::export_tokens(
        store,
        &ExportOptions {
            mode: None,
            allow_empty: false,
            exported_at: request.exported_at.to_string(),
        },
    )?;
    let payload = canonical::strip_volatile(&exported);
    let content = format!("{}\n", serde_json::to_string_pretty(&payload)?);

    let previous = remote
        .read_current(request.path)?
        .and_then(|text| serde_json::from_str::<Value>(&text).ok());
    let mut change_log = diff::build_change_log(previous.as_ref(), &payload);

    let version_id = version_id_from_timestamp(request.exported_at);
    let message = format!(
        "chore(tokens): {} {} {version_id}",
        request.project, request.environment
    );
    let outcome = remote.write_if_changed(request.path, &content, &message)?;
    if !outcome.changed {
        change_log = ChangeLog::unchanged();
    }

    Ok(PublishOutcome {
        version_id,
        message,
        reference_url: outcome.reference_url,
        changed: outcome.changed,
        change_log,
    })
}

// =============================================================================
// TESTS
// =============================================================================
