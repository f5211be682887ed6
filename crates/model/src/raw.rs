//! The on-disk JSON shape.
//!
//! The file stores "known updates" and "archived DLC" maps as a list holding
//! zero or one object. That list is a persistence quirk, not a sequence, so it
//! lives here and nowhere else: [`unwrap_singleton`] turns whatever the file
//! contains into a plain map, and [`RawTitle`] wraps maps back up on the way
//! out.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const KEY_TITLES: &str = "Titles";
pub const KEY_TITLE_NAME: &str = "Title Name";
pub const KEY_CONTENT_IDS: &str = "Content IDs";
pub const KEY_TITLE_UPDATES: &str = "Title Updates";
pub const KEY_KNOWN_UPDATES: &str = "Title Updates Known";
pub const KEY_ARCHIVED: &str = "Archived";

/// One title entry exactly as written to disk.
///
/// Field order here is the field order in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawTitle {
    #[serde(rename = "Title Name")]
    pub title_name: String,
    #[serde(rename = "Content IDs")]
    pub content_ids: Vec<String>,
    #[serde(rename = "Title Updates")]
    pub title_updates: Vec<String>,
    #[serde(rename = "Title Updates Known")]
    pub known_updates: Vec<BTreeMap<String, String>>,
    #[serde(rename = "Archived")]
    pub archived: Vec<BTreeMap<String, String>>,
}

/// The whole file as written to disk; titles sorted by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawDatabase {
    #[serde(rename = "Titles")]
    pub titles: BTreeMap<String, RawTitle>,
}

/// Wrap a map in the singleton-list convention: `[]` when empty, `[map]`
/// otherwise. Never a bare object, never `[{}]`.
pub fn wrap_singleton(map: BTreeMap<String, String>) -> Vec<BTreeMap<String, String>> {
    match map.is_empty() {
        true => Vec::new(),
        false => vec![map],
    }
}

/// Read a singleton-list field back into a flat list of entries.
///
/// - absent, `null` or `[]` → empty
/// - `[{..}]` → that object
/// - `[{..}, {..}]` (malformed) → all objects merged, later keys win
/// - `{..}` (bare object) → that object
///
/// Non-object list items and non-list, non-object values are ignored.
/// Values are coerced to text.
pub fn unwrap_singleton(value: Option<&Value>) -> Vec<(String, String)> {
    let mut merged: Map<String, Value> = Map::new();
    match value {
        Some(Value::Array(items)) => {
            for item in items {
                if let Value::Object(object) = item {
                    merged.extend(object.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
        },
        Some(Value::Object(object)) => merged = object.clone(),
        _ => {},
    }
    merged.into_iter().map(|(k, v)| (k, value_to_text(&v))).collect()
}

/// Read a list field; anything that isn't a list counts as empty.
pub fn list_field<'a>(object: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    match object.get(key) {
        Some(Value::Array(items)) => items,
        _ => &[],
    }
}

/// Text of a JSON scalar, without quotes for strings.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const AAAA: &str = "aaaaaaaaaaaaaaaa";

    #[test]
    fn test_unwrap_single() {
        let value = json!([{ AAAA: "Foo" }]);
        assert_eq!(unwrap_singleton(Some(&value)), vec![(AAAA.to_string(), "Foo".to_string())]);
    }

    #[test]
    fn test_unwrap_empty() {
        assert!(unwrap_singleton(Some(&json!([]))).is_empty());
        assert!(unwrap_singleton(Some(&json!(null))).is_empty());
        assert!(unwrap_singleton(None).is_empty());
        assert!(unwrap_singleton(Some(&json!("nope"))).is_empty());
    }

    #[test]
    fn test_unwrap_bare_object() {
        let value = json!({ AAAA: "Foo" });
        assert_eq!(unwrap_singleton(Some(&value)), vec![(AAAA.to_string(), "Foo".to_string())]);
    }

    #[test]
    fn test_unwrap_merges_later_wins() {
        let value = json!([{ "a": "1", "b": "2" }, "skip me", { "b": "3" }]);
        let mut entries = unwrap_singleton(Some(&value));
        entries.sort();
        assert_eq!(
            entries,
            vec![("a".to_string(), "1".to_string()), ("b".to_string(), "3".to_string())]
        );
    }

    #[test]
    fn test_values_coerced_to_text() {
        let value = json!([{ "a": 12, "b": true, "c": null }]);
        let mut entries = unwrap_singleton(Some(&value));
        entries.sort();
        assert_eq!(entries[0].1, "12");
        assert_eq!(entries[1].1, "true");
        assert_eq!(entries[2].1, "");
    }

    #[test]
    fn test_wrap_singleton() {
        assert!(wrap_singleton(BTreeMap::new()).is_empty());
        let map = BTreeMap::from([("k".to_string(), "v".to_string())]);
        assert_eq!(wrap_singleton(map.clone()), vec![map]);
    }

    #[test]
    fn test_raw_title_field_order() {
        let raw = RawTitle {
            title_name: "Halo".to_string(),
            content_ids: vec![],
            title_updates: vec![],
            known_updates: vec![],
            archived: vec![],
        };
        let json = serde_json::to_string(&raw).unwrap();
        assert_eq!(
            json,
            r#"{"Title Name":"Halo","Content IDs":[],"Title Updates":[],"Title Updates Known":[],"Archived":[]}"#
        );
    }
}
