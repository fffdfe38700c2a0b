//! Secret masking for tooltip values

use crate::domain::ConfigValue;
use once_cell::sync::Lazy;
use regex::Regex;

/// Shown in place of a secret value.
pub const MASK: &str = "••••••";

static SECRET_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)password|secret|token|apikey|api_key").expect("valid regex"));

/// Whether a key names something that should not be displayed.
pub fn is_secret_key(key: &str) -> bool {
    SECRET_KEY.is_match(key)
}

/// The text to display for `key`'s value.
///
/// Absent values stay absent so the caller can render "Not set"; masking only hides values that
/// exist.
pub fn display_value(key: &str, value: Option<&ConfigValue>, mask_secrets: bool) -> Option<String> {
    let value = value?;
    if mask_secrets && is_secret_key(key) {
        Some(MASK.to_string())
    } else {
        Some(value.to_string())
    }
}
