//! # Engine Constants
//!
//! Fixed values compiled into the tokensync CORE.
//!
//! The engine starts with zero data but fixed rules. These constants are
//! immutable at runtime; anything configurable lives in the app layer.

/// Schema version stamped into every exported payload (`$schemaVersion`).
///
/// Increment this when making breaking changes to the interchange tree.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Format tag stamped into every exported payload (`$format`).
pub const EXPORT_FORMAT: &str = "tokensync-v1";

/// Source tag stamped into every exported payload (`$source`).
pub const EXPORT_SOURCE: &str = "tokensync";

/// Collection used when an import payload does not name one.
pub const DEFAULT_COLLECTION_NAME: &str = "Tokens";

/// Root-level payload field excluded from all equality and diff comparisons.
///
/// The export timestamp changes on every export, so two otherwise identical
/// payloads must compare equal with this field removed.
pub const VOLATILE_EXPORT_FIELD: &str = "$exportedAt";

/// Pixel multiplier applied to `rem`/`em` suffixed numeric tokens.
pub const REM_BASE_PX: f64 = 16.0;

/// Maximum number of lines in a publish change log before truncation.
///
/// Lines beyond the cap collapse into a single `...and N more` marker.
pub const MAX_CHANGE_LOG_LINES: usize = 40;

/// Maximum visible characters for a single value rendering in a change line.
pub const MAX_CHANGE_VALUE_CHARS: usize = 72;

/// Keys that never start a token path segment during tree descent.
///
/// `$`-prefixed keys are also reserved; see [`crate::parser::is_reserved_key`].
pub const RESERVED_LEAF_KEYS: [&str; 5] = ["type", "$type", "value", "$value", "description"];

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn rem_base_is_sixteen() {
        // "1rem" must scale to 16 pixels
        assert!((REM_BASE_PX - 16.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reserved_keys_cover_both_spellings() {
        assert!(RESERVED_LEAF_KEYS.contains(&"value"));
        assert!(RESERVED_LEAF_KEYS.contains(&"$value"));
        assert!(RESERVED_LEAF_KEYS.contains(&"type"));
        assert!(RESERVED_LEAF_KEYS.contains(&"$type"));
    }
}
