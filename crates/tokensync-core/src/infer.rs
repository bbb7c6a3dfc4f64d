//! # Type Inferencer / Coercer
//!
//! Decides the concrete value type for a token from its explicit type hint
//! or from heuristic inspection of its literal value, and converts the
//! literal into the store's native value representation.
//!
//! Pure classification and conversion. Failures are reported as per-token
//! reason strings, never as errors; the import loop continues to the next
//! token.

use crate::primitives::REM_BASE_PX;
use crate::types::{Rgba, TokenType, VariableValue};
use serde_json::Value;

// =============================================================================
// TYPE HINT CLASSIFICATION
// =============================================================================

/// Normalize a raw type keyword: lowercase with `-` removed, so
/// `borderRadius`, `border-radius` and `borderradius` all land on one key.
fn normalize_keyword(raw_type: &str) -> String {
    raw_type
        .chars()
        .filter(|c| *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Classify an explicit type hint into a concrete value type.
///
/// Returns `None` for absent or unrecognized hints; the caller then falls
/// back to value inspection.
#[must_use]
pub fn infer_from_raw_type(raw_type: Option<&str>) -> Option<TokenType> {
    let normalized = normalize_keyword(raw_type?);
    match normalized.as_str() {
        "color" => Some(TokenType::Color),
        "number" | "dimension" | "spacing" | "sizing" | "borderradius" | "borderwidth"
        | "opacity" => Some(TokenType::Number),
        "string" | "fontfamily" | "fontfamilies" | "fontweight" | "fontweights" | "textcase"
        | "textdecoration" | "strokestyle" | "borderstyle" | "duration" | "cubicbezier"
        | "typography" | "boxshadow" | "shadow" | "border" | "composition" => {
            Some(TokenType::Text)
        }
        _ => None,
    }
}

/// Raw types whose text values round-trip as structured JSON on export.
#[must_use]
pub fn is_complex_token_type(raw_type: &str) -> bool {
    matches!(
        normalize_keyword(raw_type).as_str(),
        "typography" | "boxshadow" | "shadow" | "border" | "composition"
    )
}

/// Determine a token's value type from its hint, else from its literal.
///
/// Heuristic order: numeric literal, color-parseable string, number-parseable
/// string, any other string. Everything else is unresolvable.
#[must_use]
pub fn infer_token_type(raw_type: Option<&str>, value: &Value) -> Option<TokenType> {
    if let Some(from_hint) = infer_from_raw_type(raw_type) {
        return Some(from_hint);
    }
    if value.is_number() {
        return Some(TokenType::Number);
    }
    if let Some(text) = value.as_str() {
        if parse_color(text).is_some() {
            return Some(TokenType::Color);
        }
        if parse_number_string(text).is_some() {
            return Some(TokenType::Number);
        }
        return Some(TokenType::Text);
    }
    None
}

// =============================================================================
// COLOR PARSING
// =============================================================================

fn hex_pair(high: u8, low: u8) -> Option<f64> {
    let value = (high as char).to_digit(16)? * 16 + (low as char).to_digit(16)?;
    Some(f64::from(value) / 255.0)
}

fn parse_hex_color(digits: &[u8]) -> Option<Rgba> {
    match digits.len() {
        3 | 4 => {
            let r = hex_pair(digits[0], digits[0])?;
            let g = hex_pair(digits[1], digits[1])?;
            let b = hex_pair(digits[2], digits[2])?;
            let a = if digits.len() == 4 {
                hex_pair(digits[3], digits[3])?
            } else {
                1.0
            };
            Some(Rgba::new(r, g, b, a))
        }
        6 | 8 => {
            let r = hex_pair(digits[0], digits[1])?;
            let g = hex_pair(digits[2], digits[3])?;
            let b = hex_pair(digits[4], digits[5])?;
            let a = if digits.len() == 8 {
                hex_pair(digits[6], digits[7])?
            } else {
                1.0
            };
            Some(Rgba::new(r, g, b, a))
        }
        _ => None,
    }
}

fn parse_rgb_functional(value: &str) -> Option<Rgba> {
    let lowered = value.to_lowercase();
    let inner = lowered
        .strip_prefix("rgba(")
        .or_else(|| lowered.strip_prefix("rgb("))?
        .strip_suffix(')')?;

    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }

    let mut channels = Vec::with_capacity(4);
    for part in &parts {
        channels.push(part.parse::<f64>().ok()?);
    }
    let alpha = if channels.len() == 4 { channels[3] } else { 1.0 };

    Some(Rgba::new(
        (channels[0] / 255.0).clamp(0.0, 1.0),
        (channels[1] / 255.0).clamp(0.0, 1.0),
        (channels[2] / 255.0).clamp(0.0, 1.0),
        alpha.clamp(0.0, 1.0),
    ))
}

/// Parse a color literal.
///
/// Accepts `#RGB`/`#RGBA`/`#RRGGBB`/`#RRGGBBAA`, the keyword `transparent`,
/// and `rgb()`/`rgba()` with RGB channels scaled from `[0, 255]` and alpha
/// clamped to `[0, 1]`.
#[must_use]
pub fn parse_color(input: &str) -> Option<Rgba> {
    let value = input.trim();
    if value.eq_ignore_ascii_case("transparent") {
        return Some(Rgba::transparent());
    }

    if let Some(digits) = value.strip_prefix('#') {
        if digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return parse_hex_color(digits.as_bytes());
        }
        return None;
    }

    parse_rgb_functional(value)
}

// =============================================================================
// NUMBER PARSING
// =============================================================================

/// A plain decimal: optional leading `-`, digits, optional `.digits`.
/// No exponents, no leading dot.
fn is_plain_decimal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() {
        return false;
    }
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let fraction = parts.next();
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match fraction {
        None => true,
        Some(f) => !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()),
    }
}

fn parse_plain_decimal(text: &str) -> Option<f64> {
    if !is_plain_decimal(text) {
        return None;
    }
    text.parse::<f64>().ok()
}

/// Parse a numeric string, optionally suffixed `px`, `rem`, `em` or `%`.
///
/// `px` passes through, `rem`/`em` scale by [`REM_BASE_PX`], `%` divides
/// by 100.
#[must_use]
pub fn parse_number_string(input: &str) -> Option<f64> {
    let value = input.trim().to_lowercase();

    // "rem" must be checked before "em": "1rem" ends with both.
    for (suffix, scale) in [
        ("px", 1.0),
        ("rem", REM_BASE_PX),
        ("em", REM_BASE_PX),
        ("%", 0.01),
    ] {
        if let Some(head) = value.strip_suffix(suffix) {
            let amount = parse_plain_decimal(head.trim_end())?;
            return Some(amount * scale);
        }
    }

    parse_plain_decimal(&value)
}

// =============================================================================
// VALUE COERCION
// =============================================================================

/// Convert a token literal into the store's native value representation.
///
/// The boolean flags a complex text value: one that was JSON-serialized from
/// structured data and must round-trip back on export. On failure, returns a
/// human-readable reason for the per-token warning.
pub fn coerce_value(
    resolved_type: TokenType,
    value: &Value,
) -> Result<(VariableValue, bool), String> {
    match resolved_type {
        TokenType::Color => {
            let Some(text) = value.as_str() else {
                return Err("color value must be a string.".to_string());
            };
            let color = parse_color(text)
                .ok_or_else(|| format!("could not parse color \"{text}\"."))?;
            Ok((VariableValue::Color(color), false))
        }
        TokenType::Number => {
            let numeric = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(text) => parse_number_string(text),
                _ => None,
            };
            let Some(amount) = numeric else {
                return Err(
                    "number value must be numeric (e.g. 8, \"8\", \"8px\", \"0.5rem\")."
                        .to_string(),
                );
            };
            Ok((VariableValue::Number(amount), false))
        }
        TokenType::Text => match value {
            Value::String(text) => Ok((VariableValue::Text(text.clone()), false)),
            Value::Number(n) => Ok((VariableValue::Text(n.to_string()), false)),
            Value::Bool(b) => Ok((VariableValue::Text(b.to_string()), false)),
            Value::Null => Ok((VariableValue::Text("null".to_string()), false)),
            other => match serde_json::to_string(other) {
                Ok(serialized) => Ok((VariableValue::Text(serialized), true)),
                Err(error) => Err(format!("could not serialize complex value. {error}")),
            },
        },
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

    fn assert_rgba(actual: Rgba, r: f64, g: f64, b: f64, a: f64) {
        assert!((actual.r - r).abs() < 1e-9, "r: {} vs {}", actual.r, r);
        assert!((actual.g - g).abs() < 1e-9, "g: {} vs {}", actual.g, g);
        assert!((actual.b - b).abs() < 1e-9, "b: {} vs {}", actual.b, b);
        assert!((actual.a - a).abs() < 1e-9, "a: {} vs {}", actual.a, a);
    }

    #[test]
    fn short_hex_expands_to_full() {
        let color = parse_color("#fff").unwrap();
        assert_eq!(color.to_hex(), "#ffffff");
        assert_rgba(color, 1.0, 1.0, 1.0, 1.0);
    }

    #[test]
    fn four_digit_hex_carries_alpha() {
        let color = parse_color("#f000").unwrap();
        assert_rgba(color, 1.0, 0.0, 0.0, 0.0);
    }

    #[test]
    fn full_hex_parses_channels() {
        assert_rgba(parse_color("#336699").unwrap(), 0.2, 0.4, 0.6, 1.0);
        assert_rgba(
            parse_color("#33669980").unwrap(),
            0.2,
            0.4,
            0.6,
            128.0 / 255.0,
        );
    }

    #[test]
    fn transparent_keyword_is_clear_black() {
        assert_rgba(parse_color("transparent").unwrap(), 0.0, 0.0, 0.0, 0.0);
        assert_rgba(parse_color("  TRANSPARENT  ").unwrap(), 0.0, 0.0, 0.0, 0.0);
    }

    #[test]
    fn rgba_functional_half_alpha_black() {
        assert_rgba(parse_color("rgba(0,0,0,0.5)").unwrap(), 0.0, 0.0, 0.0, 0.5);
    }

    #[test]
    fn rgb_channels_scale_and_clamp() {
        assert_rgba(parse_color("rgb(255, 0, 510)").unwrap(), 1.0, 0.0, 1.0, 1.0);
        assert_rgba(parse_color("rgba(0, 0, 0, 7)").unwrap(), 0.0, 0.0, 0.0, 1.0);
    }

    #[test]
    fn malformed_colors_are_rejected() {
        assert!(parse_color("abc").is_none());
        assert!(parse_color("#12345").is_none());
        assert!(parse_color("#gggggg").is_none());
        assert!(parse_color("rgb(1,2)").is_none());
        assert!(parse_color("rgb(a,b,c)").is_none());
    }

    #[test]
    fn pixel_suffix_passes_through() {
        assert_eq!(parse_number_string("8px"), Some(8.0));
        assert_eq!(parse_number_string(" -2.5px "), Some(-2.5));
    }

    #[test]
    fn rem_and_em_scale_by_base() {
        assert_eq!(parse_number_string("1rem"), Some(16.0));
        assert_eq!(parse_number_string("0.5rem"), Some(8.0));
        assert_eq!(parse_number_string("2em"), Some(32.0));
    }

    #[test]
    fn percent_divides_by_hundred() {
        assert_eq!(parse_number_string("50%"), Some(0.5));
    }

    #[test]
    fn plain_decimals_parse() {
        assert_eq!(parse_number_string("8"), Some(8.0));
        assert_eq!(parse_number_string("-0.25"), Some(-0.25));
    }

    #[test]
    fn garbage_numbers_are_rejected() {
        assert_eq!(parse_number_string("abc"), None);
        assert_eq!(parse_number_string(".5"), None);
        assert_eq!(parse_number_string("1e3"), None);
        assert_eq!(parse_number_string("px"), None);
        assert_eq!(parse_number_string("8pt"), None);
    }

    #[test]
    fn hint_families_classify() {
        assert_eq!(infer_from_raw_type(Some("color")), Some(TokenType::Color));
        assert_eq!(
            infer_from_raw_type(Some("borderRadius")),
            Some(TokenType::Number)
        );
        assert_eq!(
            infer_from_raw_type(Some("border-radius")),
            Some(TokenType::Number)
        );
        assert_eq!(
            infer_from_raw_type(Some("fontFamily")),
            Some(TokenType::Text)
        );
        assert_eq!(infer_from_raw_type(Some("shadow")), Some(TokenType::Text));
        assert_eq!(infer_from_raw_type(Some("mystery")), None);
        assert_eq!(infer_from_raw_type(None), None);
    }

    #[test]
    fn heuristics_inspect_literals() {
        assert_eq!(infer_token_type(None, &json!(4)), Some(TokenType::Number));
        assert_eq!(
            infer_token_type(None, &json!("#336699")),
            Some(TokenType::Color)
        );
        assert_eq!(
            infer_token_type(None, &json!("8px")),
            Some(TokenType::Number)
        );
        assert_eq!(
            infer_token_type(None, &json!("hello")),
            Some(TokenType::Text)
        );
        assert_eq!(infer_token_type(None, &json!({"x": 1})), None);
    }

    #[test]
    fn explicit_hint_wins_over_heuristics() {
        // "#336699" looks like a color but the hint says string.
        assert_eq!(
            infer_token_type(Some("string"), &json!("#336699")),
            Some(TokenType::Text)
        );
    }

    #[test]
    fn color_coercion_requires_string() {
        let err = coerce_value(TokenType::Color, &json!(42)).unwrap_err();
        assert!(err.contains("must be a string"));
    }

    #[test]
    fn text_coercion_stringifies_scalars() {
        let (value, complex) = coerce_value(TokenType::Text, &json!(12)).unwrap();
        assert_eq!(value, VariableValue::Text("12".to_string()));
        assert!(!complex);

        let (value, _) = coerce_value(TokenType::Text, &json!(true)).unwrap();
        assert_eq!(value, VariableValue::Text("true".to_string()));

        let (value, _) = coerce_value(TokenType::Text, &serde_json::Value::Null).unwrap();
        assert_eq!(value, VariableValue::Text("null".to_string()));
    }

    #[test]
    fn structured_text_is_flagged_complex() {
        let (value, complex) =
            coerce_value(TokenType::Text, &json!({"weight": 700, "size": 16})).unwrap();
        assert!(complex);
        let VariableValue::Text(serialized) = value else {
            panic!("expected text value");
        };
        assert!(serialized.contains("\"weight\""));
    }

    #[test]
    fn complex_raw_types_detected() {
        assert!(is_complex_token_type("typography"));
        assert!(is_complex_token_type("boxShadow"));
        assert!(is_complex_token_type("box-shadow"));
        assert!(!is_complex_token_type("color"));
        assert!(!is_complex_token_type(""));
    }
}
