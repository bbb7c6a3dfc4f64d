//! # Core Type Definitions
//!
//! All shared types for the tokensync engine:
//! - Parsed token representations (`Token`, `PendingAlias`)
//! - Resolved value types (`TokenType`, `Rgba`, `VariableValue`)
//! - Store entities and identifiers (`Collection`, `Variable`, id newtypes)
//! - Operation results (`ImportResult`, `ChangeLog`)
//! - Error types (`TokenSyncError`)
//!
//! ## Determinism Guarantees
//!
//! All collection-valued fields use `BTreeMap` so iteration order is fixed
//! by key order, never by insertion or hashing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// STORE IDENTIFIERS
// =============================================================================

/// Unique identifier for a variable collection in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollectionId(pub u64);

/// Unique identifier for a variable in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariableId(pub u64);

/// Unique identifier for a mode within a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModeId(pub u64);

// =============================================================================
// TOKEN TYPES & VALUES
// =============================================================================

/// The three concrete value types a token can resolve to.
///
/// Every stored variable has exactly one of these; a token whose literal
/// cannot be classified is skipped with a warning, never stored untyped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TokenType {
    Color,
    Number,
    Text,
}

impl TokenType {
    /// Default interchange type tag used on export when the variable carries
    /// no recorded raw type.
    #[must_use]
    pub const fn default_tag(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Number => "number",
            Self::Text => "string",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Color => write!(f, "color"),
            Self::Number => write!(f, "number"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// An RGBA color with all channels in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    /// Create a color from raw channel values. Channels are not clamped here;
    /// parsing clamps before construction.
    #[must_use]
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Fully transparent black, the value of the `transparent` keyword.
    #[must_use]
    pub const fn transparent() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Render as lowercase hex: `#rrggbb`, or `#rrggbbaa` when alpha < 1.
    #[must_use]
    pub fn to_hex(self) -> String {
        let channel = |value: f64| -> u32 {
            let clamped = value.clamp(0.0, 1.0);
            (clamped * 255.0).round() as u32
        };
        let (r, g, b, a) = (
            channel(self.r),
            channel(self.g),
            channel(self.b),
            channel(self.a),
        );
        if a == 0xff {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

/// A value held by a store variable for one mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariableValue {
    Color(Rgba),
    Number(f64),
    Text(String),
    /// Direct link to another variable's resolved value.
    Alias(VariableId),
}

// =============================================================================
// PARSED TOKENS
// =============================================================================

/// A named leaf extracted from the interchange tree.
///
/// Immutable after parse; one per tree leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Path segments from the tree root to the leaf.
    pub path: Vec<String>,
    /// The path joined by `/`; unique within one parse pass.
    pub name: String,
    /// Explicit type hint from the leaf's `$type`/`type` key, if any.
    pub raw_type: Option<String>,
    /// The leaf's literal value, uninterpreted.
    pub value: serde_json::Value,
}

impl Token {
    /// Create a token; the name is derived from the path.
    #[must_use]
    pub fn new(path: Vec<String>, raw_type: Option<String>, value: serde_json::Value) -> Self {
        let name = path.join("/");
        Self {
            path,
            name,
            raw_type,
            value,
        }
    }
}

/// A token whose literal value matched the alias syntax `{...}`.
///
/// Created during the import pass; consumed on resolution or dropped with a
/// warning when the fixed point stalls.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAlias {
    pub token: Token,
    /// Segments of the referenced name, split on `/` or `.`.
    pub reference_path: Vec<String>,
    /// The original `{...}` text.
    pub raw_reference: String,
    /// The text inside the braces.
    pub reference_inner: String,
}

// =============================================================================
// STORE ENTITIES
// =============================================================================

/// A named variant of values within one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mode {
    pub id: ModeId,
    pub name: String,
}

/// A named grouping of variables; the token tree's top-level segment.
///
/// Every collection has at least one mode and `default_mode` always names
/// one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub modes: Vec<Mode>,
    pub default_mode: ModeId,
}

/// A stored variable: one resolved type, one value per mode.
///
/// `raw_type` and `complex_json` are the opaque per-variable metadata the
/// exporter uses to round-trip interchange type tags and structured text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub id: VariableId,
    pub name: String,
    pub collection: CollectionId,
    pub resolved_type: TokenType,
    pub values_by_mode: BTreeMap<ModeId, VariableValue>,
    pub raw_type: String,
    pub complex_json: bool,
}

// =============================================================================
// OPERATION RESULTS
// =============================================================================

/// Aggregate outcome of one import pass.
///
/// `imported = created + updated + replaced`. Per-token issues land in
/// `warnings`; they never abort the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub collection: String,
    pub imported: usize,
    pub created: usize,
    pub updated: usize,
    pub replaced: usize,
    pub skipped: usize,
    pub warnings: Vec<String>,
}

/// Ordered, capped report of token differences between two payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLog {
    pub summary: String,
    pub lines: Vec<String>,
    pub added: usize,
    pub changed: usize,
    pub removed: usize,
}

impl ChangeLog {
    /// The canonical "nothing differs" change log.
    #[must_use]
    pub fn unchanged() -> Self {
        Self {
            summary: "No token changes detected.".to_string(),
            lines: Vec::new(),
            added: 0,
            changed: 0,
            removed: 0,
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Errors surfaced by engine operations.
///
/// Structural and adapter failures abort the operation. Per-token issues are
/// never errors; they aggregate into [`ImportResult::warnings`].
#[derive(Debug, Error)]
pub enum TokenSyncError {
    /// The payload cannot be interpreted as a token tree at all.
    #[error("invalid tokens payload: {0}")]
    InvalidPayload(String),

    /// Export found zero exportable variables and empty output was not allowed.
    #[error("no exportable variables found in default modes")]
    NothingToExport,

    /// A store adapter operation failed.
    #[error("store operation failed: {0}")]
    Store(String),

    /// A remote adapter operation failed.
    #[error("remote operation failed: {0}")]
    Remote(String),

    /// JSON (de)serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io failure: {0}")]
    Io(String),

    /// Settings or project configuration is missing or invalid.
    #[error("{0}")]
    Config(String),

    /// A relay HTTP call failed; the message is shown to the operator as-is.
    #[error("{0}")]
    Relay(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn token_name_joins_path_with_slash() {
        let token = Token::new(
            vec!["color".to_string(), "brand".to_string()],
            None,
            serde_json::Value::Null,
        );
        assert_eq!(token.name, "color/brand");
    }

    #[test]
    fn opaque_hex_omits_alpha() {
        let color = Rgba::new(0.2, 0.4, 0.6, 1.0);
        assert_eq!(color.to_hex(), "#336699");
    }

    #[test]
    fn translucent_hex_includes_alpha() {
        let color = Rgba::new(0.0, 0.0, 0.0, 0.5);
        assert_eq!(color.to_hex(), "#00000080");
    }

    #[test]
    fn hex_clamps_out_of_range_channels() {
        let color = Rgba::new(2.0, -1.0, 0.0, 1.0);
        assert_eq!(color.to_hex(), "#ff0000");
    }

    #[test]
    fn default_tags_match_interchange_names() {
        assert_eq!(TokenType::Color.default_tag(), "color");
        assert_eq!(TokenType::Number.default_tag(), "number");
        assert_eq!(TokenType::Text.default_tag(), "string");
    }

    #[test]
    fn unchanged_change_log_has_exact_summary() {
        let log = ChangeLog::unchanged();
        assert_eq!(log.summary, "No token changes detected.");
        assert!(log.lines.is_empty());
    }
}
