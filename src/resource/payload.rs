//! Request/response payload shaping
//!
//! The remote APIs reject explicit `null` for optional fields, so request bodies
//! are scrubbed with [`filter_nil_values`] before they go on the wire.

use serde_json::{Map, Value};

/// Recursively drop `null` values
///
/// - `null` object fields and `null` list items are removed.
/// - A nested object or list that ends up empty is dropped from its parent
///   object.
/// - Objects inside lists are filtered but kept even when they end up empty,
///   so `[null, {"g": null}]` becomes `[{}]`.
pub fn filter_nil_values(map: &Map<String, Value>) -> Map<String, Value> {
    let mut result = Map::new();

    for (key, value) in map {
        match value {
            Value::Null => {}
            Value::Object(inner) => {
                let filtered = filter_nil_values(inner);
                if !filtered.is_empty() {
                    result.insert(key.clone(), Value::Object(filtered));
                }
            }
            Value::Array(items) => {
                let filtered = filter_list(items);
                if !filtered.is_empty() {
                    result.insert(key.clone(), Value::Array(filtered));
                }
            }
            other => {
                result.insert(key.clone(), other.clone());
            }
        }
    }

    result
}

fn filter_list(items: &[Value]) -> Vec<Value> {
    items
        .iter()
        .filter(|item| !item.is_null())
        .map(|item| match item {
            Value::Object(inner) => Value::Object(filter_nil_values(inner)),
            other => other.clone(),
        })
        .collect()
}

/// Filter any JSON value; non-objects pass through unchanged
pub fn filter_nil_value(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(filter_nil_values(&map)),
        other => other,
    }
}

/// Wrap `body` under `key` (`{key: body}`)
pub fn wrap(body: Value, key: Option<&str>) -> Value {
    match key {
        Some(key) => {
            let mut map = Map::new();
            map.insert(key.to_string(), body);
            Value::Object(map)
        }
        None => body,
    }
}

/// Take the value under `key` when present, otherwise return `body` as is
pub fn unwrap(body: Value, key: Option<&str>) -> Value {
    let Some(key) = key else {
        return body;
    };
    match body {
        Value::Object(mut map) => match map.remove(key) {
            Some(inner) => inner,
            None => Value::Object(map),
        },
        other => other,
    }
}

/// Stringify an id-like JSON value (strings and numbers)
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_documented_example() {
        let input = as_map(json!({
            "a": 1,
            "b": null,
            "c": {"d": null, "e": 2},
            "f": [null, {"g": null}]
        }));
        let filtered = filter_nil_values(&input);
        assert_eq!(Value::Object(filtered), json!({"a": 1, "c": {"e": 2}, "f": [{}]}));
    }

    // Empty containers as object values are dropped rather than sent as {} / [].
    // Kept deliberately: it matches what the remote APIs have been fed so far.
    #[test]
    fn test_empty_containers_dropped_from_objects() {
        let input = as_map(json!({"x": {"y": null}, "l": [null], "keep": 0}));
        assert_eq!(Value::Object(filter_nil_values(&input)), json!({"keep": 0}));
    }

    #[test]
    fn test_explicit_empty_containers_dropped() {
        let input = as_map(json!({"tags": [], "meta": {}, "flag": false, "name": ""}));
        assert_eq!(
            Value::Object(filter_nil_values(&input)),
            json!({"flag": false, "name": ""})
        );
    }

    #[test]
    fn test_nested_lists_of_scalars_kept() {
        let input = as_map(json!({"ports": [22, null, 443], "deep": {"x": {"y": [1]}}}));
        assert_eq!(
            Value::Object(filter_nil_values(&input)),
            json!({"ports": [22, 443], "deep": {"x": {"y": [1]}}})
        );
    }

    #[test]
    fn test_wrap_and_unwrap() {
        let body = json!({"name": "n"});
        let wrapped = wrap(body.clone(), Some("network"));
        assert_eq!(wrapped, json!({"network": {"name": "n"}}));
        assert_eq!(unwrap(wrapped, Some("network")), body);
        assert_eq!(unwrap(body.clone(), Some("network")), body);
        assert_eq!(wrap(body.clone(), None), body);
    }

    #[test]
    fn test_id_string() {
        assert_eq!(id_string(&json!("abc")), Some("abc".to_string()));
        assert_eq!(id_string(&json!(42)), Some("42".to_string()));
        assert_eq!(id_string(&json!("")), None);
        assert_eq!(id_string(&json!(null)), None);
    }
}
