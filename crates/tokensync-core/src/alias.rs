//! # Alias Resolver
//!
//! Resolves token values that are textual references to other tokens.
//!
//! Candidate generation and lookup are separate pure functions so the
//! tie-break order stays independently testable. Precedence: unscoped names
//! in the target collection, then cross-collection scoped names, then the
//! exactly-one-suffix-match uniqueness fallback. Ambiguous fallback matches
//! are rejected, never guessed.

use crate::types::VariableId;
use serde_json::Value;
use std::collections::BTreeMap;

/// A parsed `{...}` reference, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasReference {
    /// Segments of the inner text, split on `/` if present, else `.`.
    pub path: Vec<String>,
    /// The original trimmed `{...}` text.
    pub raw: String,
    /// The trimmed text inside the braces.
    pub inner: String,
}

/// Parse a token literal as an alias reference.
///
/// Returns `None` for anything that is not a string of the exact form
/// `{<non-empty path>}`.
#[must_use]
pub fn parse_alias_reference(value: &Value) -> Option<AliasReference> {
    let trimmed = value.as_str()?.trim();
    let inner = trimmed.strip_prefix('{')?.strip_suffix('}')?.trim();
    if inner.is_empty() {
        return None;
    }

    let separator = if inner.contains('/') { '/' } else { '.' };
    let path: Vec<String> = inner
        .split(separator)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(ToString::to_string)
        .collect();
    if path.is_empty() {
        return None;
    }

    Some(AliasReference {
        path,
        raw: trimmed.to_string(),
        inner: inner.to_string(),
    })
}

/// Scoped index key for a variable: `collectionName/variableName`.
#[must_use]
pub fn scoped_variable_key(collection_name: &str, variable_name: &str) -> String {
    format!("{collection_name}/{variable_name}")
}

fn push_candidate(candidates: &mut Vec<String>, candidate: &str) {
    let trimmed = candidate.trim();
    if trimmed.is_empty() || candidates.iter().any(|existing| existing == trimmed) {
        return;
    }
    candidates.push(trimmed.to_string());
}

/// Ordered, de-duplicated name candidates for lookup in the target
/// collection.
///
/// The raw inner text and both joinings of the path come first; if the inner
/// text or the first path segment carries the target collection's own name
/// as a prefix, the stripped forms follow.
#[must_use]
pub fn candidate_names(
    reference_path: &[String],
    reference_inner: &str,
    target_collection: &str,
) -> Vec<String> {
    let mut candidates = Vec::new();
    push_candidate(&mut candidates, reference_inner);
    push_candidate(&mut candidates, &reference_path.join("/"));
    push_candidate(&mut candidates, &reference_path.join("."));

    let dot_prefix = format!("{target_collection}.");
    let slash_prefix = format!("{target_collection}/");
    if let Some(suffix) = reference_inner.strip_prefix(&dot_prefix) {
        push_candidate(&mut candidates, suffix);
    }
    if let Some(suffix) = reference_inner.strip_prefix(&slash_prefix) {
        push_candidate(&mut candidates, suffix);
    }
    if reference_path.len() > 1 && reference_path[0] == target_collection {
        push_candidate(&mut candidates, &reference_path[1..].join("/"));
        push_candidate(&mut candidates, &reference_path[1..].join("."));
    }

    candidates
}

/// Ordered, de-duplicated `collection/name` candidates for the global scoped
/// index.
///
/// Derived from treating the first path segment as a collection name, then
/// from every known collection whose name prefixes the inner text.
#[must_use]
pub fn scoped_candidates(
    reference_path: &[String],
    reference_inner: &str,
    collection_names: &[String],
) -> Vec<String> {
    let mut candidates = Vec::new();

    if reference_path.len() > 1
        && collection_names.contains(&reference_path[0])
    {
        let collection = &reference_path[0];
        let rest = &reference_path[1..];
        push_candidate(
            &mut candidates,
            &scoped_variable_key(collection, &rest.join("/")),
        );
        push_candidate(
            &mut candidates,
            &scoped_variable_key(collection, &rest.join(".")),
        );
    }

    for collection in collection_names {
        let dot_prefix = format!("{collection}.");
        if let Some(suffix) = reference_inner.strip_prefix(&dot_prefix) {
            if !suffix.trim().is_empty() {
                push_candidate(&mut candidates, &scoped_variable_key(collection, suffix));
            }
        }
        let slash_prefix = format!("{collection}/");
        if let Some(suffix) = reference_inner.strip_prefix(&slash_prefix) {
            if !suffix.trim().is_empty() {
                push_candidate(&mut candidates, &scoped_variable_key(collection, suffix));
            }
        }
    }

    candidates
}

/// Find a unique suffix match in the scoped index: among all scoped names,
/// exactly one ending in `/<candidate>` wins; more than one is ambiguous and
/// yields nothing.
fn unique_suffix_match(
    candidate: &str,
    by_scoped_name: &BTreeMap<String, VariableId>,
) -> Option<VariableId> {
    let suffix = format!("/{candidate}");
    let mut found: Option<VariableId> = None;
    for (scoped_name, id) in by_scoped_name {
        if !scoped_name.ends_with(&suffix) {
            continue;
        }
        if found.is_some() {
            return None;
        }
        found = Some(*id);
    }
    found
}

/// Resolve an alias reference against the current store indices.
///
/// Returns the source variable's id, or `None` when the reference does not
/// resolve in this pass (the caller defers it to the next pass).
#[must_use]
pub fn resolve_alias_source(
    reference_path: &[String],
    reference_inner: &str,
    target_collection: &str,
    by_name_in_target: &BTreeMap<String, VariableId>,
    by_scoped_name: &BTreeMap<String, VariableId>,
    collection_names: &[String],
) -> Option<VariableId> {
    let candidates = candidate_names(reference_path, reference_inner, target_collection);
    for candidate in &candidates {
        if let Some(id) = by_name_in_target.get(candidate) {
            return Some(*id);
        }
    }

    for scoped in scoped_candidates(reference_path, reference_inner, collection_names) {
        if let Some(id) = by_scoped_name.get(&scoped) {
            return Some(*id);
        }
    }

    for candidate in &candidates {
        if let Some(id) = unique_suffix_match(candidate, by_scoped_name) {
            return Some(id);
        }
    }

    None
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn segments(parts: &[&str]) -> Vec<String> {
        parts.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parses_dot_separated_reference() {
        let reference = parse_alias_reference(&json!("{color.brand}")).unwrap();
        assert_eq!(reference.path, segments(&["color", "brand"]));
        assert_eq!(reference.raw, "{color.brand}");
        assert_eq!(reference.inner, "color.brand");
    }

    #[test]
    fn slash_separator_wins_when_present() {
        let reference = parse_alias_reference(&json!("{color/brand.primary}")).unwrap();
        assert_eq!(reference.path, segments(&["color", "brand.primary"]));
    }

    #[test]
    fn rejects_non_alias_values() {
        assert!(parse_alias_reference(&json!("#336699")).is_none());
        assert!(parse_alias_reference(&json!("{}")).is_none());
        assert!(parse_alias_reference(&json!("{  }")).is_none());
        assert!(parse_alias_reference(&json!(42)).is_none());
        assert!(parse_alias_reference(&json!("{...}")).is_some());
    }

    #[test]
    fn trims_whitespace_around_reference_and_segments() {
        let reference = parse_alias_reference(&json!("  { color . brand }  ")).unwrap();
        assert_eq!(reference.path, segments(&["color", "brand"]));
        assert_eq!(reference.raw, "{ color . brand }");
    }

    #[test]
    fn candidates_are_ordered_and_deduplicated() {
        let path = segments(&["color", "brand"]);
        let candidates = candidate_names(&path, "color.brand", "Tokens");
        assert_eq!(candidates, vec!["color.brand", "color/brand"]);
    }

    #[test]
    fn target_collection_prefix_is_stripped() {
        let path = segments(&["Tokens", "color", "brand"]);
        let candidates = candidate_names(&path, "Tokens.color.brand", "Tokens");
        assert_eq!(
            candidates,
            vec![
                "Tokens.color.brand",
                "Tokens/color/brand",
                "color.brand",
                "color/brand",
            ]
        );
    }

    #[test]
    fn scoped_candidates_from_first_segment_collection() {
        let path = segments(&["Base", "color", "brand"]);
        let collections = segments(&["Base", "Tokens"]);
        let scoped = scoped_candidates(&path, "Base.color.brand", &collections);
        // The prefix-derived candidate duplicates a first-segment form and is
        // dropped by de-duplication.
        assert_eq!(scoped, vec!["Base/color/brand", "Base/color.brand"]);
    }

    #[test]
    fn same_collection_match_wins_over_scoped() {
        let mut in_target = BTreeMap::new();
        in_target.insert("color/brand".to_string(), VariableId(1));
        let mut scoped = BTreeMap::new();
        scoped.insert("Base/color/brand".to_string(), VariableId(2));
        scoped.insert("Tokens/color/brand".to_string(), VariableId(1));

        let path = segments(&["color", "brand"]);
        let resolved = resolve_alias_source(
            &path,
            "color.brand",
            "Tokens",
            &in_target,
            &scoped,
            &segments(&["Base", "Tokens"]),
        );
        assert_eq!(resolved, Some(VariableId(1)));
    }

    #[test]
    fn scoped_match_wins_over_uniqueness_fallback() {
        let in_target = BTreeMap::new();
        let mut scoped = BTreeMap::new();
        scoped.insert("Base/color/brand".to_string(), VariableId(2));

        let path = segments(&["Base", "color", "brand"]);
        let resolved = resolve_alias_source(
            &path,
            "Base.color.brand",
            "Tokens",
            &in_target,
            &scoped,
            &segments(&["Base", "Tokens"]),
        );
        assert_eq!(resolved, Some(VariableId(2)));
    }

    #[test]
    fn unique_suffix_fallback_accepts_single_match() {
        let in_target = BTreeMap::new();
        let mut scoped = BTreeMap::new();
        scoped.insert("Base/color/brand".to_string(), VariableId(7));
        scoped.insert("Base/color/other".to_string(), VariableId(8));

        let path = segments(&["color", "brand"]);
        let resolved = resolve_alias_source(
            &path,
            "color.brand",
            "Tokens",
            &in_target,
            &scoped,
            &segments(&["Base"]),
        );
        assert_eq!(resolved, Some(VariableId(7)));
    }

    #[test]
    fn ambiguous_suffix_fallback_is_rejected() {
        let in_target = BTreeMap::new();
        let mut scoped = BTreeMap::new();
        scoped.insert("Base/color/brand".to_string(), VariableId(7));
        scoped.insert("Theme/color/brand".to_string(), VariableId(8));

        let path = segments(&["color", "brand"]);
        let resolved = resolve_alias_source(
            &path,
            "color.brand",
            "Tokens",
            &in_target,
            &scoped,
            &segments(&["Base", "Theme"]),
        );
        assert_eq!(resolved, None);
    }

    #[test]
    fn unresolvable_reference_yields_none() {
        let resolved = resolve_alias_source(
            &segments(&["missing"]),
            "missing",
            "Tokens",
            &BTreeMap::new(),
            &BTreeMap::new(),
            &[],
        );
        assert_eq!(resolved, None);
    }
}
