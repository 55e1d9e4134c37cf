//! Deep merge of parsed YAML documents.
//!
//! Mappings are merged key by key, later documents winning. Sequences and
//! scalars replace whatever was there; they are never merged element-wise.

use crate::error::{Error, Result};
use crate::value::{describe, key_label};
use serde_yaml::Value;

/// Deep merge two YAML values, with `src` taking precedence over `dst`.
///
/// - Mappings are merged recursively: keys in `src` override keys in `dst`,
///   keys only in `dst` are kept
/// - Sequences, strings, numbers and booleans in `src` replace `dst` entirely
/// - Null on either side means "not specified" and yields the other side
/// - A mapping on one side and a non-null non-mapping on the other is a
///   [`Error::MergeConflict`]
///
/// # Example
/// ```
/// use yaml_layers::merge::deep_merge;
///
/// let dst: serde_yaml::Value = serde_yaml::from_str("server: {port: 8080, host: localhost}").unwrap();
/// let src: serde_yaml::Value = serde_yaml::from_str("server: {port: 9000}").unwrap();
/// let merged = deep_merge(dst, src).unwrap();
/// assert_eq!(merged["server"]["port"], 9000);
/// assert_eq!(merged["server"]["host"], "localhost");
/// ```
pub fn deep_merge(dst: Value, src: Value) -> Result<Value> {
    let mut path = Vec::new();
    merge_at(dst, src, &mut path)
}

/// Merge multiple values in order, with later values taking precedence.
///
/// Equivalent to folding [`deep_merge`] over the list starting from null, so
/// an empty list yields `Value::Null`.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Result<Value> {
    values.into_iter().try_fold(Value::Null, deep_merge)
}

fn merge_at(dst: Value, src: Value, path: &mut Vec<String>) -> Result<Value> {
    match (dst, src) {
        (dst, Value::Null) => Ok(dst),
        (Value::Null, src) => Ok(src),
        (Value::Mapping(mut dst_map), Value::Mapping(src_map)) => {
            for (key, src_value) in src_map {
                match dst_map.get_mut(&key) {
                    Some(slot) => {
                        let dst_value = std::mem::replace(slot, Value::Null);
                        path.push(key_label(&key));
                        let merged = merge_at(dst_value, src_value, path);
                        path.pop();
                        *slot = merged?;
                    }
                    None => {
                        dst_map.insert(key, src_value);
                    }
                }
            }
            Ok(Value::Mapping(dst_map))
        }
        (dst @ Value::Mapping(_), src) | (dst, src @ Value::Mapping(_)) => {
            Err(Error::MergeConflict {
                path: path.join("."),
                dst: describe(&dst),
                src: describe(&src),
            })
        }
        (_, src) => Ok(src),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_merge_simple_objects() {
        let result = deep_merge(yaml("{a: 1, b: 2}"), yaml("{b: 3, c: 4}")).unwrap();
        assert_eq!(result, yaml("{a: 1, b: 3, c: 4}"));
    }

    #[test]
    fn test_merge_nested_objects() {
        let dst = yaml(
            r#"
server:
  host: localhost
  port: 8080
debug: true
"#,
        );
        let src = yaml("server: {port: 9000}");
        let result = deep_merge(dst, src).unwrap();
        assert_eq!(
            result,
            yaml("{server: {host: localhost, port: 9000}, debug: true}")
        );
    }

    #[test]
    fn test_deep_merge_law() {
        let result = deep_merge(yaml("a: {x: 1, y: 2}"), yaml("a: {y: 9, z: 3}")).unwrap();
        assert_eq!(result, yaml("a: {x: 1, y: 9, z: 3}"));
    }

    #[test]
    fn test_arrays_replaced_not_merged() {
        let result = deep_merge(yaml("items: [1, 2, 3]"), yaml("items: [4, 5]")).unwrap();
        assert_eq!(result, yaml("items: [4, 5]"));
    }

    #[test]
    fn test_scalar_and_array_overwrite_law() {
        for dst in ["1", "text", "[1, 2]", "~"] {
            for src in ["2", "other", "[3]"] {
                assert_eq!(deep_merge(yaml(dst), yaml(src)).unwrap(), yaml(src));
            }
        }
    }

    #[test]
    fn test_null_preserves_dst() {
        let result = deep_merge(yaml("{a: 1, b: {c: 2}}"), yaml("{a: null, b: {c: ~}}")).unwrap();
        assert_eq!(result, yaml("{a: 1, b: {c: 2}}"));
    }

    #[test]
    fn test_null_dst_is_filled() {
        let result = deep_merge(yaml("{a: ~}"), yaml("{a: {b: 1}}")).unwrap();
        assert_eq!(result, yaml("a: {b: 1}"));
    }

    #[test]
    fn test_both_absent() {
        assert_eq!(deep_merge(Value::Null, Value::Null).unwrap(), Value::Null);
        assert_eq!(deep_merge_all(Vec::new()).unwrap(), Value::Null);
    }

    #[test]
    fn test_deep_nested_merge() {
        let dst = yaml("level1: {level2: {level3: {a: 1, b: 2}}}");
        let src = yaml("level1: {level2: {level3: {b: 3, c: 4}}}");
        let result = deep_merge(dst, src).unwrap();
        assert_eq!(result, yaml("level1: {level2: {level3: {a: 1, b: 3, c: 4}}}"));
    }

    #[test]
    fn test_merge_all() {
        let values = vec![yaml("{a: 1}"), yaml("{b: 2}"), yaml("{a: 3, c: 4}")];
        let result = deep_merge_all(values).unwrap();
        assert_eq!(result, yaml("{a: 3, b: 2, c: 4}"));
    }

    #[test]
    fn test_merge_all_is_left_fold() {
        let a = yaml("{a: {x: 1}, keep: a}");
        let b = yaml("{a: {y: 2}, list: [1]}");
        let c = yaml("{a: {x: 3}, list: [2, 3]}");
        let folded = deep_merge_all(vec![a.clone(), b.clone(), c.clone()]).unwrap();
        let nested = deep_merge(deep_merge(a, b).unwrap(), c).unwrap();
        assert_eq!(folded, nested);
    }

    #[test]
    fn test_merge_single_document_unchanged() {
        let doc = yaml("{a: [1, 2], b: {c: d}}");
        assert_eq!(deep_merge_all(vec![doc.clone()]).unwrap(), doc);
    }

    #[test]
    fn test_non_string_keys_merge() {
        let result = deep_merge(yaml("{1: one, true: yes}"), yaml("{1: uno}")).unwrap();
        assert_eq!(result, yaml("{1: uno, true: yes}"));
    }

    #[test]
    fn test_primitive_replaced_by_object_conflicts() {
        let err = deep_merge(yaml("{a: 1}"), yaml("x")).unwrap_err();
        assert!(matches!(err, Error::MergeConflict { .. }));

        let err = deep_merge(yaml("x"), yaml("{a: 1}")).unwrap_err();
        assert!(matches!(err, Error::MergeConflict { .. }));
    }

    #[test]
    fn test_conflict_reports_path_and_both_values() {
        let dst = yaml("server: {tls: {enabled: true}}");
        let src = yaml("server: {tls: [cert.pem]}");
        match deep_merge(dst, src).unwrap_err() {
            Error::MergeConflict { path, dst, src } => {
                assert_eq!(path, "server.tls");
                assert_eq!(dst, r#"mapping {"enabled":true}"#);
                assert_eq!(src, r#"sequence ["cert.pem"]"#);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
