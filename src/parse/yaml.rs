//! YAML flattening into dotted keys

use crate::domain::{ConfigValue, FlatConfigMap};
use crate::error::Result;
use serde::Deserialize;
use serde_yaml::Value;

/// Parse YAML text and flatten every document into one map.
///
/// Spring files often hold several `---` separated profile documents; later documents
/// overwrite keys from earlier ones.
pub fn parse_yaml(text: &str) -> Result<FlatConfigMap> {
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    let mut map = FlatConfigMap::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(document)?;
        map.extend(flatten_yaml(&value, ""));
    }
    Ok(map)
}

/// Walk a parsed YAML graph, joining nested mapping keys with dots.
///
/// Scalars and sequences become leaves; sequences are not indexed into. A root that is not a
/// mapping yields an empty map.
pub fn flatten_yaml(value: &Value, prefix: &str) -> FlatConfigMap {
    let mut out = FlatConfigMap::new();
    if let Value::Mapping(mapping) = strip_tag(value) {
        for (k, v) in mapping {
            let Some(segment) = key_segment(k) else {
                continue;
            };
            let key = if prefix.is_empty() { segment } else { format!("{prefix}.{segment}") };
            match strip_tag(v) {
                Value::Mapping(_) => out.extend(flatten_yaml(v, &key)),
                leaf => {
                    out.insert(key, leaf_value(leaf));
                }
            }
        }
    }
    out
}

fn strip_tag(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => strip_tag(&tagged.value),
        other => other,
    }
}

fn key_segment(key: &Value) -> Option<String> {
    match strip_tag(key) {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        _ => None,
    }
}

fn leaf_value(value: &Value) -> ConfigValue {
    match strip_tag(value) {
        Value::Null => ConfigValue::Null,
        Value::Bool(b) => ConfigValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => ConfigValue::Integer(i),
            None => ConfigValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => ConfigValue::Text(s.clone()),
        Value::Sequence(items) => ConfigValue::Sequence(items.iter().map(leaf_value).collect()),
        other => ConfigValue::Text(serde_json::to_string(other).unwrap_or_default()),
    }
}
