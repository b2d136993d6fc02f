//! Lenient JSON for analyzer output.
//!
//! Python's `json` module emits `NaN`, `Infinity` and `-Infinity` for
//! non-finite floats. Those tokens are not JSON, so they are rewritten to
//! `null` before parsing. String contents are never touched.

use serde_json::Value;

const NON_FINITE_TOKENS: &[&str] = &["-Infinity", "Infinity", "NaN"];

/// Replace bare non-finite number tokens outside strings with `null`.
pub fn sanitize_non_finite(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut rest = raw;

    while let Some(c) = rest.chars().next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            rest = &rest[c.len_utf8()..];
            continue;
        }

        if c == '"' {
            in_string = true;
            out.push(c);
            rest = &rest[1..];
            continue;
        }

        if let Some(token) = NON_FINITE_TOKENS.iter().find(|t| rest.starts_with(*t)) {
            out.push_str("null");
            rest = &rest[token.len()..];
            continue;
        }

        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    out
}

/// Parse analyzer stdout, tolerating non-finite tokens.
pub fn parse_lenient(raw: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(&sanitize_non_finite(raw))
}

/// Numeric field lookup where missing, `null` or malformed values read as 0.
pub fn number_or_zero(object: &serde_json::Map<String, Value>, key: &str) -> f64 {
    match object.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}
