//! Opaque analysis documents.
//!
//! Queries and responses are open-ended JSON objects. The broker never
//! interprets engine semantics; the only fields it touches are the
//! correlation `id` (echoed unchanged by the engine), the `error` marker,
//! and the `isDuringSearch` flag used by the delivery mode. Everything
//! else passes through untouched, in the order it arrived.

use serde_json::Value;

/// An ordered string-keyed JSON object, the wire unit in both directions.
///
/// `serde_json`'s `preserve_order` feature keeps insertion order so
/// documents round-trip byte-for-byte apart from whitespace.
pub type Document = serde_json::Map<String, Value>;

/// Key the engine echoes to correlate responses with queries.
pub const ID_FIELD: &str = "id";

/// Key marking a per-request engine failure.
pub const ERROR_FIELD: &str = "error";

/// Key set on in-progress (streaming) analysis lines.
pub const DURING_SEARCH_FIELD: &str = "isDuringSearch";

/// Extract the correlation id, if present and a string.
pub fn correlation_id(document: &Document) -> Option<&str> {
    document.get(ID_FIELD).and_then(Value::as_str)
}

/// Set the correlation id, replacing any existing value.
pub fn set_correlation_id(document: &mut Document, id: impl Into<String>) {
    document.insert(ID_FIELD.to_string(), Value::String(id.into()));
}

/// Whether the document carries a per-request `error` field.
///
/// Such documents are well-formed responses; surfacing the error is the
/// facade's concern, not the broker's.
pub fn has_error(document: &Document) -> bool {
    document.contains_key(ERROR_FIELD)
}

/// Whether this is an in-progress line (`isDuringSearch: true`).
///
/// Absent or non-boolean counts as terminal, matching the engine's
/// documented behavior of sending `isDuringSearch: false` on the final
/// line only.
pub fn is_during_search(document: &Document) -> bool {
    document
        .get(DURING_SEARCH_FIELD)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn correlation_id_requires_string() {
        let d = doc(json!({"id": "q1"}));
        assert_eq!(correlation_id(&d), Some("q1"));

        let d = doc(json!({"id": 42}));
        assert_eq!(correlation_id(&d), None);

        let d = doc(json!({"moveInfos": []}));
        assert_eq!(correlation_id(&d), None);
    }

    #[test]
    fn set_correlation_id_overwrites() {
        let mut d = doc(json!({"id": "old", "komi": 7.5}));
        set_correlation_id(&mut d, "new");
        assert_eq!(correlation_id(&d), Some("new"));
        assert_eq!(d.get("komi"), Some(&json!(7.5)));
    }

    #[test]
    fn error_and_search_markers() {
        let d = doc(json!({"id": "q1", "error": "bad rules"}));
        assert!(has_error(&d));

        let d = doc(json!({"id": "q1", "isDuringSearch": true}));
        assert!(is_during_search(&d));

        let d = doc(json!({"id": "q1", "isDuringSearch": false}));
        assert!(!is_during_search(&d));

        let d = doc(json!({"id": "q1"}));
        assert!(!has_error(&d));
        assert!(!is_during_search(&d));
    }
}
