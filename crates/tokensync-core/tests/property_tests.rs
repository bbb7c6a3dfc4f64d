//! # Property-Based Tests
//!
//! Determinism and termination invariants for the engine, verified with
//! proptest: canonicalization stability, diff axioms, alias fixed-point
//! convergence and order-independence, and parser/coercion laws.

use proptest::collection::{btree_map, vec};
use proptest::prelude::*;
use serde_json::{Map, Value, json};
use tokensync_core::{
    ExportOptions, MemoryStore, build_change_log, canonicalize, export_tokens, import_tokens,
    parse_color, parse_number_string, stable_serialize, strip_volatile, trees_equal,
};

// =============================================================================
// GENERATORS
// =============================================================================

/// Arbitrary JSON scalars plus shallow arrays and objects.
fn arb_json() -> impl Strategy<Value = Value> {
    let scalar = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1_000_000i64..1_000_000).prop_map(Value::from),
        "[a-z #0-9]{0,12}".prop_map(Value::String),
    ];
    scalar.prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            vec(inner.clone(), 0..4).prop_map(Value::Array),
            btree_map("[a-z]{1,6}", inner, 0..4).prop_map(|entries| {
                Value::Object(entries.into_iter().collect::<Map<String, Value>>())
            }),
        ]
    })
}

/// A flat token payload: unique leaf names mapped to typed scalar leaves.
/// Names carry a fixed prefix so they never collide with reserved keys.
fn arb_token_payload() -> impl Strategy<Value = Value> {
    btree_map(
        "k[a-z]{1,7}",
        prop_oneof![
            (0u8..=255, 0u8..=255, 0u8..=255)
                .prop_map(|(r, g, b)| json!({ "type": "color", "value": format!("#{r:02x}{g:02x}{b:02x}") })),
            (-10_000i32..10_000)
                .prop_map(|n| json!({ "type": "number", "value": n })),
            "[a-zA-Z ]{0,16}".prop_map(|s| json!({ "type": "string", "value": s })),
        ],
        1..12,
    )
    .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<String, Value>>()))
}

fn export_options() -> ExportOptions {
    ExportOptions {
        mode: None,
        allow_empty: true,
        exported_at: "2026-01-01T00:00:00.000Z".to_string(),
    }
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Canonicalization is idempotent.
    #[test]
    fn canonicalize_idempotent(value in arb_json()) {
        let once = canonicalize(&value);
        let twice = canonicalize(&once);
        prop_assert_eq!(once, twice);
    }

    /// Object key order never affects the canonical serialization.
    #[test]
    fn canonical_serialization_ignores_key_order(
        entries in btree_map("[a-z]{1,6}", arb_json(), 1..8)
    ) {
        let forward: Map<String, Value> =
            entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let reversed: Map<String, Value> =
            entries.iter().rev().map(|(k, v)| (k.clone(), v.clone())).collect();
        prop_assert_eq!(
            stable_serialize(&Value::Object(forward)),
            stable_serialize(&Value::Object(reversed))
        );
    }

    /// Diffing any token payload against itself reports nothing.
    #[test]
    fn self_diff_is_empty(payload in arb_token_payload()) {
        let log = build_change_log(Some(&payload), &payload);
        prop_assert_eq!(log.summary.as_str(), "No token changes detected.");
        prop_assert_eq!(log.added + log.changed + log.removed, 0);
    }

    /// Diffing against an absent previous payload counts every leaf.
    #[test]
    fn baseline_diff_counts_all_leaves(payload in arb_token_payload()) {
        let leaf_count = payload.as_object().map_or(0, Map::len);
        let log = build_change_log(None, &payload);
        prop_assert_eq!(log.added, leaf_count);
        prop_assert_eq!(log.changed, 0);
        prop_assert_eq!(log.removed, 0);
    }

    /// Every parsed token ends up either imported or skipped; the import
    /// pass terminates and never loses a token.
    #[test]
    fn import_accounts_for_every_token(payload in arb_token_payload()) {
        let leaf_count = payload.as_object().map_or(0, Map::len);
        let mut store = MemoryStore::new();
        let result = import_tokens(&mut store, &payload).expect("import");
        prop_assert_eq!(result.imported + result.skipped, leaf_count);
        prop_assert_eq!(result.imported, result.created + result.updated + result.replaced);
    }

    /// An alias chain resolves regardless of token order, and the exports
    /// of any two import orders are canonically identical.
    #[test]
    fn alias_resolution_is_order_independent(
        chain_len in 2usize..8,
        shuffle_keys in vec(any::<u32>(), 8)
    ) {
        // t0 holds a concrete color; every t(i) aliases t(i-1).
        let mut leaves: Vec<(String, Value)> = vec![
            ("t0".to_string(), json!({ "type": "color", "value": "#336699" })),
        ];
        for index in 1..chain_len {
            leaves.push((
                format!("t{index}"),
                json!({ "value": format!("{{t{}}}", index - 1) }),
            ));
        }

        let forward: Map<String, Value> = leaves.iter().cloned().collect();
        let mut shuffled = leaves.clone();
        shuffled.sort_by_key(|(name, _)| {
            let position = leaves.iter().position(|(n, _)| n == name).unwrap_or(0);
            shuffle_keys.get(position).copied().unwrap_or(0)
        });
        let permuted: Map<String, Value> = shuffled.into_iter().collect();

        let mut store_a = MemoryStore::new();
        let result_a = import_tokens(&mut store_a, &Value::Object(forward)).expect("import a");
        let mut store_b = MemoryStore::new();
        let result_b = import_tokens(&mut store_b, &Value::Object(permuted)).expect("import b");

        prop_assert_eq!(result_a.created, chain_len);
        prop_assert_eq!(result_b.created, chain_len);
        prop_assert_eq!(result_a.skipped, 0);
        prop_assert_eq!(result_b.skipped, 0);

        let export_a = export_tokens(&store_a, &export_options()).expect("export a");
        let export_b = export_tokens(&store_b, &export_options()).expect("export b");
        prop_assert!(trees_equal(
            &strip_volatile(&export_a),
            &strip_volatile(&export_b)
        ));
    }

    /// A fully circular alias set always terminates with every token
    /// skipped and warned, never imported.
    #[test]
    fn circular_aliases_always_terminate(cycle_len in 2usize..10) {
        let mut leaves = Map::new();
        for index in 0..cycle_len {
            let next = (index + 1) % cycle_len;
            leaves.insert(
                format!("t{index}"),
                json!({ "value": format!("{{t{next}}}") }),
            );
        }
        let mut store = MemoryStore::new();
        let result = import_tokens(&mut store, &Value::Object(leaves)).expect("import");
        prop_assert_eq!(result.skipped, cycle_len);
        prop_assert_eq!(result.imported, 0);
        prop_assert_eq!(result.warnings.len(), cycle_len);
    }

    /// Pixel-suffixed integers parse to themselves; percent divides by 100.
    #[test]
    fn number_suffix_laws(amount in -10_000i32..10_000) {
        prop_assert_eq!(
            parse_number_string(&format!("{amount}px")),
            Some(f64::from(amount))
        );
        prop_assert_eq!(
            parse_number_string(&format!("{amount}")),
            Some(f64::from(amount))
        );
        let percent = parse_number_string(&format!("{amount}%")).expect("percent");
        prop_assert!((percent - f64::from(amount) / 100.0).abs() < 1e-9);
    }

    /// Six-digit hex colors survive a parse/render round trip unchanged.
    #[test]
    fn hex_color_round_trip(r in 0u8..=255, g in 0u8..=255, b in 0u8..=255) {
        let rendered = format!("#{r:02x}{g:02x}{b:02x}");
        let parsed = parse_color(&rendered).expect("parse");
        prop_assert_eq!(parsed.to_hex(), rendered);
    }
}
