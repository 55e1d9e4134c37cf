//! Classification and rendering helpers for parsed YAML values.
//!
//! The parser yields `serde_yaml::Value`. Everything downstream only ever
//! distinguishes three shapes (mapping, sequence, anything else) plus the
//! absent value, which YAML spells as `null`.

use serde_yaml::Value;

/// Shape of a node in the lookup tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A scalar or null; never has children.
    Value,
    /// A mapping; one child per entry.
    Object,
    /// A sequence; one child per element.
    Array,
}

impl NodeKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Mapping(_) => NodeKind::Object,
            Value::Sequence(_) => NodeKind::Array,
            Value::Null
            | Value::Bool(_)
            | Value::Number(_)
            | Value::String(_)
            | Value::Tagged(_) => NodeKind::Value,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Value => write!(f, "value"),
            NodeKind::Object => write!(f, "object"),
            NodeKind::Array => write!(f, "array"),
        }
    }
}

/// Drop YAML tags recursively, keeping the tagged value.
///
/// `!secret foo` becomes `foo`, so merge and lookup never see
/// `Value::Tagged`.
pub fn strip_tags(value: Value) -> Value {
    match value {
        Value::Tagged(tagged) => strip_tags(tagged.value),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(strip_tags).collect()),
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| (strip_tags(k), strip_tags(v)))
                .collect(),
        ),
        scalar => scalar,
    }
}

/// Render a mapping key as the text label used for lookups.
///
/// A null key is labeled `null`, the way YAML spells it, so `null: x` is
/// found at path `null`.
pub fn key_label(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Tagged(tagged) => key_label(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => render(key),
    }
}

/// Short type name used in diagnostics.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// One-line rendering of a value, e.g. for error messages.
pub fn render(value: &Value) -> String {
    // JSON keeps it on one line but rejects composite keys; YAML doesn't.
    serde_json::to_string(value).unwrap_or_else(|_| {
        serde_yaml::to_string(value)
            .map(|s| s.trim_end().replace('\n', " "))
            .unwrap_or_else(|_| format!("{:?}", value))
    })
}

/// Type name plus rendering, e.g. `mapping {"a":1}`.
pub fn describe(value: &Value) -> String {
    format!("{} {}", type_name(value), render(value))
}
