//! # tokensync-core
//!
//! The deterministic token translation and reconciliation engine - THE LOGIC.
//!
//! This crate parses arbitrary nested token trees, infers and coerces each
//! leaf to a concrete value type, resolves alias references into a
//! consistent graph against store entries, exports the store back into a
//! canonical nested tree, and computes stable structural diffs between two
//! token trees.
//!
//! ## Architectural Constraints
//!
//! - Pure Rust: no async, no network dependencies, no clock
//! - Deterministic: `BTreeMap` only, explicit sorting, no randomness
//! - Capability-driven: the variable store and the token remote are traits
//!   threaded into every operation; there is no ambient global handle
//!
//! ## Control Flow
//!
//! Import path: parser → inferencer → alias resolver → store.
//! Publish path: store → exporter → diff engine → remote.

// =============================================================================
// MODULES
// =============================================================================

pub mod alias;
pub mod canonical;
pub mod diff;
pub mod export;
pub mod import;
pub mod infer;
pub mod parser;
pub mod primitives;
pub mod remote;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    ChangeLog, Collection, CollectionId, ImportResult, Mode, ModeId, PendingAlias, Rgba, Token,
    TokenSyncError, TokenType, Variable, VariableId, VariableValue,
};

// =============================================================================
// RE-EXPORTS: Engine Operations
// =============================================================================

pub use alias::{AliasReference, parse_alias_reference, resolve_alias_source};
pub use canonical::{
    SnapshotEntry, canonicalize, content_equal, snapshot, stable_serialize, strip_volatile,
    trees_equal,
};
pub use diff::build_change_log;
pub use export::{ExportOptions, export_tokens};
pub use import::import_tokens;
pub use infer::{coerce_value, infer_token_type, parse_color, parse_number_string};
pub use parser::parse_tokens;

// =============================================================================
// RE-EXPORTS: Capabilities
// =============================================================================

pub use remote::{
    MemoryRemote, PublishOutcome, PublishRequest, TokenRemote, VersionEntry, WriteOutcome,
    extract_version_id, publish, version_id_from_timestamp,
};
pub use store::{MemoryStore, VariableStore};
