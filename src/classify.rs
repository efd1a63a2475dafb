//! Value classification: Empty / ValidJson / ValidLegacySerialized / Invalid.
//!
//! Order is fixed and short-circuits:
//! 1. NULL, the false-sentinel and "" -> Empty
//! 2. parses as JSON (bare scalars included) -> ValidJson
//! 3. parses as PHP serialize() -> ValidLegacySerialized
//! 4. otherwise Invalid with the unserialize error text
//!
//! Values matching both grammars (e.g. "0") are JSON, i.e. already migrated.

use serde::de::IgnoredAny;

use crate::consts::{EMPTY_VALUE_REASON, JSON_MAX_DEPTH};
use crate::phpser;
use crate::row::Value;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    Empty,
    ValidJson,
    ValidLegacySerialized,
    Invalid(String),
}

impl Classification {
    /// Empty and Invalid end up in the validation report.
    pub fn is_violation(&self) -> bool {
        matches!(self, Classification::Empty | Classification::Invalid(_))
    }

    /// Report text for violations, None for valid values.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Classification::Empty => Some(EMPTY_VALUE_REASON),
            Classification::Invalid(r) => Some(r.as_str()),
            Classification::ValidJson | Classification::ValidLegacySerialized => None,
        }
    }
}

pub fn classify(value: &Value) -> Classification {
    if value.is_empty() {
        return Classification::Empty;
    }
    match value.to_bytes() {
        Some(raw) => classify_bytes(&raw),
        None => Classification::Empty,
    }
}

/// Classification of a raw field value.
pub fn classify_bytes(raw: &[u8]) -> Classification {
    if raw.is_empty() {
        return Classification::Empty;
    }
    if is_json(raw) {
        return Classification::ValidJson;
    }
    match phpser::unserialize(raw) {
        Ok(_) => Classification::ValidLegacySerialized,
        Err(e) => Classification::Invalid(e.to_string()),
    }
}

/// Full JSON grammar, any top-level value, UTF-8 enforced.
///
/// Syntax only: numbers are not range-checked (`1e400` is JSON) and nesting is limited
/// to `JSON_MAX_DEPTH` like `json_decode`, not to serde_json's recursion limit.
pub fn is_json(raw: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(raw) else {
        return false;
    };
    serde_json::from_str::<IgnoredAny>(text).is_ok() && json_depth(text) <= JSON_MAX_DEPTH
}

/// Deepest array/object nesting of a syntactically valid document.
fn json_depth(text: &str) -> usize {
    let (mut depth, mut max) = (0usize, 0usize);
    let (mut in_str, mut escaped) = (false, false);
    for b in text.bytes() {
        if in_str {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_str = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_str = true,
            b'[' | b'{' => {
                depth += 1;
                max = max.max(depth);
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empties() {
        assert_eq!(classify(&Value::Null), Classification::Empty);
        assert_eq!(classify(&Value::Missing), Classification::Empty);
        assert_eq!(classify(&Value::text("")), Classification::Empty);
        assert_eq!(classify_bytes(b""), Classification::Empty);
    }

    #[test]
    fn json_wins_ties() {
        // bare scalars never reach the legacy parser
        for s in ["0", "5", "null", "true", "\"x\"", "[]", "{\"a\":1}", " 1 "] {
            assert_eq!(classify(&Value::text(s)), Classification::ValidJson, "{s}");
        }
    }

    #[test]
    fn brackets_inside_strings_do_not_count() {
        assert_eq!(json_depth("[\"[[[\\\"\", {\"a\": []}]"), 3);
        assert_eq!(json_depth("7"), 0);
    }

    #[test]
    fn numbers_from_the_store_are_json() {
        assert_eq!(classify(&Value::Integer(12)), Classification::ValidJson);
        assert_eq!(classify(&Value::Real(0.25)), Classification::ValidJson);
    }

    #[test]
    fn legacy_only() {
        for s in ["a:0:{}", "s:0:\"\";", "i:5;", "N;", "b:1;"] {
            assert_eq!(
                classify(&Value::text(s)),
                Classification::ValidLegacySerialized,
                "{s}"
            );
        }
    }

    #[test]
    fn invalid_carries_reason() {
        let c = classify(&Value::text("not valid"));
        assert_eq!(
            c,
            Classification::Invalid("unserialize(): Error at offset 0 of 9 bytes".to_string())
        );
        assert!(c.is_violation());
        assert_eq!(c.reason(), Some("unserialize(): Error at offset 0 of 9 bytes"));
    }

    #[test]
    fn blobs_use_raw_bytes() {
        // invalid UTF-8 is never JSON but can still be a serialized string
        let mut raw = b"s:1:\"".to_vec();
        raw.push(0xff);
        raw.extend_from_slice(b"\";");
        assert_eq!(
            classify(&Value::Blob(raw)),
            Classification::ValidLegacySerialized
        );
        assert!(matches!(
            classify(&Value::Blob(vec![0xff, 0xfe])),
            Classification::Invalid(_)
        ));
    }
}
