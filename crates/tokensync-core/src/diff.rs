//! # Diff Engine
//!
//! Computes an ordered, capped list of added/changed/removed token paths
//! between two canonical payloads, plus a one-line summary.
//!
//! Line order is always the added block, then changed, then removed, each
//! internally path-sorted. A type-tag change wins the classification over a
//! value change at the same path.

use crate::canonical::{self, SnapshotEntry};
use crate::primitives::{MAX_CHANGE_LOG_LINES, MAX_CHANGE_VALUE_CHARS};
use crate::types::ChangeLog;
use serde_json::Value;
use std::collections::BTreeMap;

/// Human-readable rendering of a stable-serialized token value.
///
/// Bare strings shed their quotes; scalars render plainly; structured values
/// keep their JSON form. Unparseable input passes through unchanged.
fn readable_change_value(serialized: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<Value>(serialized) else {
        return serialized.to_string();
    };
    match parsed {
        Value::String(text) => text,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Collapse whitespace and truncate to the change-line budget.
fn compact_change_value(value: &str) -> String {
    let cleaned = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.chars().count() <= MAX_CHANGE_VALUE_CHARS {
        return cleaned;
    }
    let truncated: String = cleaned.chars().take(MAX_CHANGE_VALUE_CHARS).collect();
    format!("{truncated}...")
}

fn cap_lines(mut lines: Vec<String>) -> Vec<String> {
    if lines.len() > MAX_CHANGE_LOG_LINES {
        let overflow = lines.len() - MAX_CHANGE_LOG_LINES;
        lines.truncate(MAX_CHANGE_LOG_LINES);
        lines.push(format!("...and {overflow} more"));
    }
    lines
}

fn baseline_change_log(current: &BTreeMap<String, SnapshotEntry>) -> ChangeLog {
    let lines: Vec<String> = current.keys().map(|path| format!("+ {path}")).collect();
    ChangeLog {
        summary: format!("Initial publish baseline created ({} tokens).", current.len()),
        added: lines.len(),
        changed: 0,
        removed: 0,
        lines: cap_lines(lines),
    }
}

/// Build the publish change log between the previously published payload and
/// the current one.
///
/// `None` for the previous payload means this is the first publish; every
/// current path is reported as added and the summary states the baseline
/// token count.
#[must_use]
pub fn build_change_log(previous: Option<&Value>, current: &Value) -> ChangeLog {
    let current_map = canonical::snapshot(current);
    let Some(previous_payload) = previous else {
        return baseline_change_log(&current_map);
    };
    let previous_map = canonical::snapshot(previous_payload);

    let mut added: Vec<String> = Vec::new();
    let mut changed: Vec<String> = Vec::new();
    let mut removed: Vec<String> = Vec::new();

    let mut all_paths: Vec<&String> = previous_map.keys().chain(current_map.keys()).collect();
    all_paths.sort();
    all_paths.dedup();

    for path in all_paths {
        match (previous_map.get(path), current_map.get(path)) {
            (None, Some(_)) => added.push(path.clone()),
            (Some(_), None) => removed.push(path.clone()),
            (Some(before), Some(after)) => {
                if before.type_tag != after.type_tag {
                    changed.push(format!(
                        "{path}\ttype:{}\ttype:{}",
                        before.type_tag, after.type_tag
                    ));
                } else if before.value_serialized != after.value_serialized {
                    let before_value =
                        compact_change_value(&readable_change_value(&before.value_serialized));
                    let after_value =
                        compact_change_value(&readable_change_value(&after.value_serialized));
                    changed.push(format!("{path}\t{before_value}\t{after_value}"));
                }
            }
            (None, None) => {}
        }
    }

    if added.is_empty() && changed.is_empty() && removed.is_empty() {
        return ChangeLog::unchanged();
    }

    let mut lines: Vec<String> = Vec::new();
    lines.extend(added.iter().map(|path| format!("+ {path}")));
    lines.extend(changed.iter().map(|line| format!("~ {line}")));
    lines.extend(removed.iter().map(|path| format!("- {path}")));

    ChangeLog {
        summary: format!(
            "Changes: +{} / ~{} / -{}",
            added.len(),
            changed.len(),
            removed.len()
        ),
        added: added.len(),
        changed: changed.len(),
        removed: removed.len(),
        lines: cap_lines(lines),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(type_tag: &str, value: Value) -> Value {
        json!({ "type": type_tag, "value": value })
    }

    #[test]
    fn first_publish_reports_baseline() {
        let current = json!({
            "color": { "brand": leaf("color", json!("#336699")) },
            "size": { "sm": leaf("number", json!(4)) }
        });
        let log = build_change_log(None, &current);
        assert_eq!(log.summary, "Initial publish baseline created (2 tokens).");
        assert_eq!(log.added, 2);
        assert_eq!(log.lines, vec!["+ color/brand", "+ size/sm"]);
    }

    #[test]
    fn identical_payloads_report_no_changes() {
        let payload = json!({ "color": { "brand": leaf("color", json!("#336699")) } });
        let log = build_change_log(Some(&payload), &payload);
        assert_eq!(log, ChangeLog::unchanged());
    }

    #[test]
    fn key_order_does_not_produce_changes() {
        let previous: Value =
            serde_json::from_str(r#"{"a": {"value": 1, "type": "number"}, "b": {"value": 2}}"#)
                .unwrap();
        let current: Value =
            serde_json::from_str(r#"{"b": {"value": 2}, "a": {"type": "number", "value": 1}}"#)
                .unwrap();
        let log = build_change_log(Some(&previous), &current);
        assert_eq!(log.summary, "No token changes detected.");
    }

    #[test]
    fn classifies_added_changed_removed_in_block_order() {
        let previous = json!({
            "kept": leaf("number", json!(1)),
            "edited": leaf("number", json!(2)),
            "dropped": leaf("number", json!(3))
        });
        let current = json!({
            "kept": leaf("number", json!(1)),
            "edited": leaf("number", json!(5)),
            "fresh": leaf("number", json!(4))
        });
        let log = build_change_log(Some(&previous), &current);
        assert_eq!(log.summary, "Changes: +1 / ~1 / -1");
        assert_eq!(
            log.lines,
            vec!["+ fresh", "~ edited\t2\t5", "- dropped"]
        );
    }

    #[test]
    fn type_change_wins_over_value_change() {
        let previous = json!({ "t": leaf("number", json!(8)) });
        let current = json!({ "t": leaf("string", json!("8")) });
        let log = build_change_log(Some(&previous), &current);
        assert_eq!(log.lines, vec!["~ t\ttype:number\ttype:string"]);
    }

    #[test]
    fn missing_type_tags_compare_as_unknown() {
        let previous = json!({ "t": { "value": 1 } });
        let current = json!({ "t": leaf("number", json!(1)) });
        let log = build_change_log(Some(&previous), &current);
        assert_eq!(log.lines, vec!["~ t\ttype:unknown\ttype:number"]);
    }

    #[test]
    fn long_values_are_collapsed_and_truncated() {
        let long = "x".repeat(100);
        let previous = json!({ "t": leaf("string", json!("short   \n value")) });
        let current = json!({ "t": leaf("string", Value::String(long.clone())) });
        let log = build_change_log(Some(&previous), &current);
        let line = &log.lines[0];
        assert!(line.contains("short value"));
        assert!(line.contains(&format!("{}...", "x".repeat(72))));
    }

    #[test]
    fn line_cap_appends_overflow_marker() {
        let mut tokens = serde_json::Map::new();
        for index in 0..45 {
            tokens.insert(format!("token{index:02}"), leaf("number", json!(index)));
        }
        let current = Value::Object(tokens);
        let log = build_change_log(None, &current);
        assert_eq!(log.added, 45);
        assert_eq!(log.lines.len(), MAX_CHANGE_LOG_LINES + 1);
        assert_eq!(log.lines[MAX_CHANGE_LOG_LINES], "...and 5 more");
    }
}
