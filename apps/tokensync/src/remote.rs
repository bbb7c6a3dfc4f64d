//! # Local Directory Remote
//!
//! [`TokenRemote`] implementation over a plain directory. Used by the relay
//! server's localPath projects and by the integration tests.
//!
//! Writes are idempotent via canonical content comparison, and every change
//! is recorded in a JSON history index next to the token files so
//! version-history works without a hosting provider.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tokensync_core::{
    TokenRemote, TokenSyncError, VersionEntry, WriteOutcome, content_equal, extract_version_id,
};

/// File name of the history index inside the remote's root directory.
const HISTORY_INDEX_FILE: &str = ".tokensync-history.json";

// =============================================================================
// HISTORY INDEX
// =============================================================================

/// Persisted write history, one entry list per relative file path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct HistoryIndex {
    sequence: u64,
    entries: BTreeMap<String, Vec<VersionEntry>>,
}

// =============================================================================
// LOCALDIRREMOTE
// =============================================================================

/// A token remote rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalDirRemote {
    root: PathBuf,
}

impl LocalDirRemote {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Join a relative file path onto the root, rejecting traversal.
    fn resolve(&self, path: &str) -> Result<PathBuf, TokenSyncError> {
        let relative = Path::new(path);
        let traversal = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if path.trim().is_empty() || traversal {
            return Err(TokenSyncError::Remote(format!(
                "invalid remote path {path:?}"
            )));
        }
        Ok(self.root.join(relative))
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(HISTORY_INDEX_FILE)
    }

    fn load_index(&self) -> Result<HistoryIndex, TokenSyncError> {
        let text = match std::fs::read_to_string(self.index_path()) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(HistoryIndex::default());
            }
            Err(e) => return Err(TokenSyncError::Remote(format!("read history index: {e}"))),
        };
        serde_json::from_str(&text)
            .map_err(|e| TokenSyncError::Remote(format!("parse history index: {e}")))
    }

    fn save_index(&self, index: &HistoryIndex) -> Result<(), TokenSyncError> {
        std::fs::create_dir_all(&self.root)
            .map_err(|e| TokenSyncError::Remote(format!("create remote root: {e}")))?;
        let text = serde_json::to_string_pretty(index)?;
        std::fs::write(self.index_path(), text)
            .map_err(|e| TokenSyncError::Remote(format!("write history index: {e}")))
    }

    fn reference_for(&self, absolute: &Path) -> String {
        format!("file:{}", absolute.display())
    }
}

impl TokenRemote for LocalDirRemote {
    fn read_current(&self, path: &str) -> Result<Option<String>, TokenSyncError> {
        let absolute = self.resolve(path)?;
        match std::fs::read_to_string(&absolute) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TokenSyncError::Remote(format!(
                "read {}: {e}",
                absolute.display()
            ))),
        }
    }

    fn write_if_changed(
        &mut self,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<WriteOutcome, TokenSyncError> {
        let absolute = self.resolve(path)?;
        let reference_url = self.reference_for(&absolute);

        if let Some(existing) = self.read_current(path)? {
            if content_equal(&existing, content) {
                return Ok(WriteOutcome {
                    changed: false,
                    reference_url: Some(reference_url),
                });
            }
        }

        if let Some(parent) = absolute.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TokenSyncError::Remote(format!("create {}: {e}", parent.display())))?;
        }
        std::fs::write(&absolute, content)
            .map_err(|e| TokenSyncError::Remote(format!("write {}: {e}", absolute.display())))?;

        let mut index = self.load_index()?;
        index.sequence += 1;
        let version_id =
            extract_version_id(message).unwrap_or_else(|| format!("c{:07}", index.sequence));
        index.entries.entry(path.to_string()).or_default().insert(
            0,
            VersionEntry {
                version_id,
                message: message.to_string(),
                published_at: Some(chrono::Utc::now().to_rfc3339()),
                reference_url: Some(reference_url.clone()),
            },
        );
        self.save_index(&index)?;

        Ok(WriteOutcome {
            changed: true,
            reference_url: Some(reference_url),
        })
    }

    fn history(&self, path: &str, limit: usize) -> Result<Vec<VersionEntry>, TokenSyncError> {
        let index = self.load_index()?;
        let entries = index.entries.get(path).cloned().unwrap_or_default();
        Ok(entries.into_iter().take(limit).collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
