//! Core data types shared across the pipeline

use crate::document::NodeId;
use crate::normalize::{key_variants, sanitize_key};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Whether a rendered diff line was added, removed, or left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineClassification {
    Added,
    Removed,
    Context,
}

impl LineClassification {
    /// Parse the diff renderer's `data-line-type` value. Anything unknown counts as context.
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_uppercase()).as_deref() {
            Some("ADDED") => LineClassification::Added,
            Some("REMOVED") => LineClassification::Removed,
            _ => LineClassification::Context,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LineClassification::Added => "ADDED",
            LineClassification::Removed => "REMOVED",
            LineClassification::Context => "CONTEXT",
        }
    }
}

/// Which detector produced a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// `@Value("${key}")`
    Value,
    /// A constant whose string literal looks like a property key.
    ConstLiteral,
    /// `@ConfigurationProperties(prefix = "...")`
    ConfigurationPropertiesPrefix,
}

impl ReferenceKind {
    pub fn label(self) -> &'static str {
        match self {
            ReferenceKind::Value => "@Value key",
            ReferenceKind::ConstLiteral => "Constant key",
            ReferenceKind::ConfigurationPropertiesPrefix => "@ConfigurationProperties prefix",
        }
    }
}

/// A configuration key found on one diff line during a single scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedReference {
    pub kind: ReferenceKind,
    /// Sanitized dotted key (or prefix for [`ReferenceKind::ConfigurationPropertiesPrefix`]).
    pub key: String,
    /// Constant identifier the key was resolved through, when one was seen on the line.
    pub source_token: Option<String>,
    /// The rendered line (`<tr>` when present, otherwise the code cell).
    pub line_element: NodeId,
    pub classification: LineClassification,
}

/// A changed `application*.{properties,yml,yaml}` file with the raw URLs for each side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigFileCandidate {
    pub display_name: String,
    pub file_path: String,
    pub before_url: Option<String>,
    pub after_url: Option<String>,
    pub fallback_url: Option<String>,
}

impl ConfigFileCandidate {
    /// File name used to pick the parser.
    pub fn file_name(&self) -> &str {
        self.file_path.rsplit('/').next().unwrap_or(&self.file_path)
    }
}

/// A leaf value from a configuration file.
///
/// `.properties` files only ever produce [`ConfigValue::Text`]; YAML keeps its scalar types.
/// Sequences are kept whole rather than flattened into indexed keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Text(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
    Null,
    Sequence(Vec<ConfigValue>),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Text(s) => f.write_str(s),
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Integer(i) => write!(f, "{i}"),
            ConfigValue::Float(x) => write!(f, "{x}"),
            ConfigValue::Null => f.write_str("null"),
            ConfigValue::Sequence(items) => {
                let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
                f.write_str(&rendered.join(","))
            }
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

/// Dotted key to leaf value, for one side of the review.
pub type FlatConfigMap = BTreeMap<String, ConfigValue>;

/// The two flattened views of the changed configuration files.
///
/// `before` is built from the source branch (the first branch lozenge in the review header)
/// and is the map shown for added and context lines. `after` is built from the destination
/// branch, or the repository default when that side cannot be fetched, and is what removed
/// lines would be resolved against.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DualConfig {
    pub before: FlatConfigMap,
    pub after: FlatConfigMap,
}

/// Which of the two maps to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Before,
    After,
}

impl Side {
    /// The side consulted for a line of the given classification.
    pub fn for_line(classification: LineClassification) -> Self {
        match classification {
            LineClassification::Removed => Side::After,
            LineClassification::Added | LineClassification::Context => Side::Before,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Side::Before => Side::After,
            Side::After => Side::Before,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::Before => "source branch",
            Side::After => "target branch",
        }
    }
}

impl DualConfig {
    /// Rebuild both maps with sanitized keys.
    pub fn normalized(self) -> Self {
        let sanitize = |map: FlatConfigMap| -> FlatConfigMap {
            map.into_iter().map(|(k, v)| (sanitize_key(&k), v)).collect()
        };
        DualConfig { before: sanitize(self.before), after: sanitize(self.after) }
    }

    pub fn side(&self, side: Side) -> &FlatConfigMap {
        match side {
            Side::Before => &self.before,
            Side::After => &self.after,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut FlatConfigMap {
        match side {
            Side::Before => &mut self.before,
            Side::After => &mut self.after,
        }
    }

    /// Look a key up on one side, falling back to relaxed case spellings.
    pub fn lookup(&self, side: Side, key: &str) -> Option<&ConfigValue> {
        let map = self.side(side);
        key_variants(key).iter().find_map(|candidate| map.get(candidate))
    }

    /// Every key on either side that equals `prefix` or sits beneath it, in any of the
    /// relaxed spellings [`DualConfig::lookup`] accepts.
    pub fn keys_under(&self, prefix: &str) -> Vec<&str> {
        let prefixes: Vec<(String, String)> = key_variants(prefix)
            .into_iter()
            .map(|variant| {
                let nested = format!("{variant}.");
                (variant, nested)
            })
            .collect();
        let mut keys: Vec<&str> = self
            .before
            .keys()
            .chain(self.after.keys())
            .map(String::as_str)
            .filter(|k| {
                prefixes
                    .iter()
                    .any(|(exact, nested)| *k == exact.as_str() || k.starts_with(nested.as_str()))
            })
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_defaults_to_context() {
        assert_eq!(LineClassification::from_attribute(Some("ADDED")), LineClassification::Added);
        assert_eq!(
            LineClassification::from_attribute(Some("removed")),
            LineClassification::Removed
        );
        assert_eq!(LineClassification::from_attribute(Some("???")), LineClassification::Context);
        assert_eq!(LineClassification::from_attribute(None), LineClassification::Context);
    }

    #[test]
    fn lookup_uses_relaxed_spellings() {
        let mut dual = DualConfig::default();
        dual.before.insert("app.my-flag".into(), ConfigValue::from("on"));
        assert_eq!(dual.lookup(Side::Before, "app.myFlag"), Some(&ConfigValue::from("on")));
        assert_eq!(dual.lookup(Side::After, "app.myFlag"), None);
    }

    #[test]
    fn keys_under_matches_prefix_boundaries() {
        let mut dual = DualConfig::default();
        dual.before.insert("app.feature.enabled".into(), ConfigValue::Bool(true));
        dual.after.insert("app.feature.enabled".into(), ConfigValue::Bool(false));
        dual.after.insert("app.featureX".into(), ConfigValue::Bool(false));
        dual.after.insert("app.feature".into(), ConfigValue::from("x"));
        assert_eq!(dual.keys_under("app.feature"), vec!["app.feature", "app.feature.enabled"]);
    }

    #[test]
    fn keys_under_accepts_relaxed_prefix() {
        let mut dual = DualConfig::default();
        dual.before.insert("app.my-feature.enabled".into(), ConfigValue::Bool(true));
        dual.after.insert("app.my_feature.timeout".into(), ConfigValue::Integer(5));
        dual.after.insert("app.other.enabled".into(), ConfigValue::Bool(false));
        assert_eq!(
            dual.keys_under("app.myFeature"),
            vec!["app.my-feature.enabled", "app.my_feature.timeout"]
        );
    }

    #[test]
    fn sequence_display_joins_items() {
        let seq = ConfigValue::Sequence(vec![ConfigValue::from("a"), ConfigValue::Integer(2)]);
        assert_eq!(seq.to_string(), "a,2");
    }
}
