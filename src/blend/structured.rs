//! Tree merge for yaml / json / toml fragments.
//!
//! Fragments of all three formats parse into one canonical tree
//! (`serde_json::Value`) and fold left-to-right under the target's map and
//! array rules. The accumulator owns its tree outright; admitting a fragment
//! moves its values in, so no sharing exists between documents.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::{ArrayMerge, Format, MapMerge, StructuredRules};

use super::{read_utf8, BlendError};

/// Merge `files` under `rules` and serialize in `format`.
///
/// Whitespace-only fragments are no-ops; when every fragment is empty the
/// result is an empty mapping. The output ends with one trailing newline.
pub fn blend_structured(
    format: Format,
    rules: &StructuredRules,
    files: &[PathBuf],
) -> Result<String, BlendError> {
    let mut acc = Value::Null;

    for path in files {
        let text = read_utf8(path)?;
        if text.trim().is_empty() {
            continue;
        }

        let doc = parse_fragment(format, path, &text)?;
        acc = merge_value(acc, doc, rules);
    }

    if acc.is_null() {
        acc = Value::Object(serde_json::Map::new());
    }

    serialize(format, &acc)
}

fn parse_fragment(format: Format, path: &Path, text: &str) -> Result<Value, BlendError> {
    let parse_err = |detail: String| BlendError::Parse {
        path: path.to_path_buf(),
        detail,
    };

    match format {
        Format::Yaml => serde_yaml::from_str(text).map_err(|e| parse_err(e.to_string())),
        Format::Json => serde_json::from_str(text).map_err(|e| parse_err(e.to_string())),
        Format::Toml => {
            let value: toml::Value = toml::from_str(text).map_err(|e| parse_err(e.to_string()))?;
            Ok(toml_to_tree(value))
        }
        other => Err(parse_err(format!(
            "format {other} has no structured blender"
        ))),
    }
}

/// Accumulating merge. `base` is the accumulator so far, `next` the incoming
/// fragment; both are owned and the result reuses their allocations.
fn merge_value(base: Value, next: Value, rules: &StructuredRules) -> Value {
    if base.is_null() {
        return next;
    }
    if next.is_null() {
        return base;
    }

    match (base, next) {
        (Value::Object(base_map), Value::Object(next_map)) => match rules.maps {
            MapMerge::Replace => Value::Object(next_map),
            MapMerge::Deep => {
                let mut out = base_map;
                for (key, incoming) in next_map {
                    let merged = match out.remove(&key) {
                        Some(existing) => merge_value(existing, incoming, rules),
                        None => incoming,
                    };
                    out.insert(key, merged);
                }
                Value::Object(out)
            }
        },

        (Value::Array(base_arr), Value::Array(next_arr)) => match rules.arrays {
            ArrayMerge::Append => {
                let mut out = base_arr;
                out.extend(next_arr);
                Value::Array(out)
            }
            ArrayMerge::UniqueAppend => Value::Array(unique_append(base_arr, next_arr)),
            ArrayMerge::Replace => Value::Array(next_arr),
        },

        // Type mismatch: the later value wins.
        (_, next) => next,
    }
}

/// Concatenate with scalar dedup. Composite elements are never keyed and keep
/// their position.
fn unique_append(base: Vec<Value>, next: Vec<Value>) -> Vec<Value> {
    let mut out = Vec::with_capacity(base.len() + next.len());
    let mut seen = HashSet::new();

    for item in base.into_iter().chain(next) {
        if let Some(key) = scalar_key(&item) {
            if !seen.insert(key) {
                continue;
            }
        }
        out.push(item);
    }
    out
}

/// Type-tagged identity for scalar dedup, so `1` (integer) and `"1"` (string)
/// never collide.
fn scalar_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("n:".to_string()),
        Value::Bool(b) => Some(if *b { "b:1" } else { "b:0" }.to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(format!("i:{i}"))
            } else if let Some(u) = n.as_u64() {
                Some(format!("u:{u}"))
            } else {
                n.as_f64().map(|f| format!("f:{f}"))
            }
        }
        Value::String(s) => Some(format!("s:{s}")),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn serialize(format: Format, value: &Value) -> Result<String, BlendError> {
    let ser_err = |detail: String| BlendError::Serialize { detail };

    let mut out = match format {
        Format::Yaml => serde_yaml::to_string(value).map_err(|e| ser_err(e.to_string()))?,
        Format::Json => serde_json::to_string_pretty(value).map_err(|e| ser_err(e.to_string()))?,
        Format::Toml => {
            let tree = tree_to_toml(value)?;
            if !tree.is_table() {
                return Err(ser_err("TOML output requires a top-level table".into()));
            }
            toml::to_string(&tree).map_err(|e| ser_err(e.to_string()))?
        }
        other => return Err(ser_err(format!("format {other} has no structured blender"))),
    };

    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

fn toml_to_tree(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_tree).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_tree(v)))
                .collect(),
        ),
    }
}

fn tree_to_toml(value: &Value) -> Result<toml::Value, BlendError> {
    let ser_err = |detail: &str| BlendError::Serialize {
        detail: detail.to_string(),
    };

    match value {
        Value::Null => Err(ser_err("TOML cannot represent null")),
        Value::Bool(b) => Ok(toml::Value::Boolean(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(toml::Value::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(toml::Value::Float(f))
            } else {
                Err(ser_err("integer out of TOML range"))
            }
        }
        Value::String(s) => Ok(toml::Value::String(s.clone())),
        Value::Array(items) => Ok(toml::Value::Array(
            items.iter().map(tree_to_toml).collect::<Result<_, _>>()?,
        )),
        Value::Object(map) => Ok(toml::Value::Table(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), tree_to_toml(v)?)))
                .collect::<Result<_, BlendError>>()?,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules(maps: MapMerge, arrays: ArrayMerge) -> StructuredRules {
        StructuredRules { maps, arrays }
    }

    #[test]
    fn deep_merge_unions_keys_recursively() {
        let base = json!({"a": {"x": 1, "y": 2}, "keep": true});
        let next = json!({"a": {"y": 3, "z": 4}});

        let merged = merge_value(base, next, &rules(MapMerge::Deep, ArrayMerge::Replace));
        assert_eq!(merged, json!({"a": {"x": 1, "y": 3, "z": 4}, "keep": true}));
    }

    #[test]
    fn replace_maps_takes_later_map_whole() {
        let base = json!({"a": {"x": 1}});
        let next = json!({"a": {"z": 9}});

        let merged = merge_value(base, next, &rules(MapMerge::Replace, ArrayMerge::Replace));
        assert_eq!(merged, json!({"a": {"z": 9}}));
    }

    #[test]
    fn type_mismatch_later_wins() {
        let base = json!({"v": [1, 2]});
        let next = json!({"v": "scalar"});

        let merged = merge_value(base, next, &rules(MapMerge::Deep, ArrayMerge::Append));
        assert_eq!(merged, json!({"v": "scalar"}));
    }

    #[test]
    fn unique_append_dedupes_scalars_only() {
        let base = json!([1, "1", {"k": 1}]);
        let next = json!([1, "1", {"k": 1}, 2]);

        let merged = merge_value(base, next, &rules(MapMerge::Deep, ArrayMerge::UniqueAppend));
        // Composite elements are kept even when equal; scalars dedupe.
        assert_eq!(merged, json!([1, "1", {"k": 1}, {"k": 1}, 2]));
    }

    #[test]
    fn scalar_keys_are_type_tagged() {
        assert_eq!(scalar_key(&json!(1)).unwrap(), "i:1");
        assert_eq!(scalar_key(&json!("1")).unwrap(), "s:1");
        assert_eq!(scalar_key(&json!(1.5)).unwrap(), "f:1.5");
        assert_eq!(scalar_key(&json!(true)).unwrap(), "b:1");
        assert_eq!(scalar_key(&json!(null)).unwrap(), "n:");
        assert_eq!(scalar_key(&json!(u64::MAX)).unwrap(), format!("u:{}", u64::MAX));
        assert!(scalar_key(&json!([1])).is_none());
        assert!(scalar_key(&json!({"a": 1})).is_none());
    }

    #[test]
    fn null_fragment_is_identity() {
        let base = json!({"a": 1});
        assert_eq!(
            merge_value(base.clone(), Value::Null, &rules(MapMerge::Deep, ArrayMerge::Replace)),
            base
        );
        assert_eq!(
            merge_value(Value::Null, base.clone(), &rules(MapMerge::Deep, ArrayMerge::Replace)),
            base
        );
    }

    #[test]
    fn json_serialization_has_stable_key_order() {
        let value = json!({"zebra": 1, "apple": 2, "mango": 3});
        let out = serialize(Format::Json, &value).unwrap();

        let apple = out.find("apple").unwrap();
        let mango = out.find("mango").unwrap();
        let zebra = out.find("zebra").unwrap();
        assert!(apple < mango && mango < zebra, "{out}");
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn toml_datetime_round_trips_as_string() {
        let tree = toml_to_tree(toml::from_str("when = 1979-05-27T07:32:00Z").unwrap());
        assert_eq!(tree, json!({"when": "1979-05-27T07:32:00Z"}));
    }
}
