//! Configuration file parsing (`.properties`, YAML) into flat dotted maps

pub mod properties;
#[cfg(feature = "yaml")]
pub mod yaml;

pub use properties::parse_properties;
#[cfg(feature = "yaml")]
pub use yaml::{flatten_yaml, parse_yaml};

use crate::domain::FlatConfigMap;
use crate::error::{Error, Result};

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Properties,
    Yaml,
}

impl ConfigFormat {
    /// Pick a format from a file name's extension (case-insensitive).
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".properties") {
            Some(ConfigFormat::Properties)
        } else if lower.ends_with(".yml") || lower.ends_with(".yaml") {
            Some(ConfigFormat::Yaml)
        } else {
            None
        }
    }
}

/// Parse `text` in the given format.
#[cfg_attr(feature = "yaml", allow(unused_variables))]
pub fn parse_config(format: ConfigFormat, text: &str, name: &str) -> Result<FlatConfigMap> {
    match format {
        ConfigFormat::Properties => Ok(parse_properties(text)),
        #[cfg(feature = "yaml")]
        ConfigFormat::Yaml => parse_yaml(text),
        #[cfg(not(feature = "yaml"))]
        ConfigFormat::Yaml => Err(Error::YamlUnavailable(name.to_string())),
    }
}

/// Parse a fetched file by name, logging and skipping anything that cannot be read.
pub fn parse_config_text(name: &str, text: &str) -> Option<FlatConfigMap> {
    let Some(format) = ConfigFormat::from_file_name(name) else {
        tracing::debug!("No parser for {name}; skipping");
        return None;
    };

    match parse_config(format, text, name) {
        Ok(map) => Some(map),
        Err(err @ Error::YamlUnavailable(_)) => {
            tracing::warn!("{err}");
            None
        }
        Err(err) => {
            tracing::warn!("Failed to parse {name}: {err}");
            None
        }
    }
}
