//! Hover tooltip content for a marker

use crate::config::Settings;
use crate::document::html::escape_text as escape_html;
use crate::domain::{DetectedReference, DualConfig, ReferenceKind, Side};
use crate::redact::display_value;
use serde::Serialize;

/// Prefix summaries list at most this many keys.
pub const PREFIX_ROW_LIMIT: usize = 15;

pub const NOT_SET: &str = "Not set";

/// One key's values on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueRow {
    pub key: String,
    /// Value on the side the line is read against, or "Not set".
    pub primary: String,
    /// Value on the opposite side, only when it exists and differs.
    pub other: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tooltip {
    pub title: String,
    pub kind: ReferenceKind,
    pub primary_label: &'static str,
    pub other_label: &'static str,
    pub rows: Vec<ValueRow>,
    /// Keys left out of a prefix summary.
    pub hidden: usize,
}

impl Tooltip {
    pub fn for_reference(reference: &DetectedReference, dual: &DualConfig, settings: &Settings) -> Self {
        let side = Side::for_line(reference.classification);
        let (rows, hidden) = match reference.kind {
            ReferenceKind::ConfigurationPropertiesPrefix => {
                let keys = dual.keys_under(&reference.key);
                let hidden = keys.len().saturating_sub(PREFIX_ROW_LIMIT);
                let rows = keys
                    .into_iter()
                    .take(PREFIX_ROW_LIMIT)
                    .map(|key| value_row(key, side, dual, settings))
                    .collect();
                (rows, hidden)
            }
            ReferenceKind::Value | ReferenceKind::ConstLiteral => {
                (vec![value_row(&reference.key, side, dual, settings)], 0)
            }
        };

        Tooltip {
            title: format!("{}: {}", reference.kind.label(), reference.key),
            kind: reference.kind,
            primary_label: side.label(),
            other_label: side.other().label(),
            rows,
            hidden,
        }
    }

    /// Plain text for a native `title` attribute.
    pub fn to_text(&self) -> String {
        let mut lines = vec![self.title.clone()];
        match self.kind {
            ReferenceKind::ConfigurationPropertiesPrefix => {
                if self.rows.is_empty() {
                    lines.push(format!("{}: {NOT_SET}", self.primary_label));
                }
                for row in &self.rows {
                    let mut line = format!("{}: {}", row.key, row.primary);
                    if let Some(other) = &row.other {
                        line.push_str(&format!(" ({}: {other})", self.other_label));
                    }
                    lines.push(line);
                }
                if self.hidden > 0 {
                    lines.push(format!("… {} more", self.hidden));
                }
            }
            ReferenceKind::Value | ReferenceKind::ConstLiteral => {
                for row in &self.rows {
                    lines.push(format!("{}: {}", self.primary_label, row.primary));
                    if let Some(other) = &row.other {
                        lines.push(format!("{}: {other}", self.other_label));
                    }
                }
            }
        }
        lines.join("\n")
    }

    /// Markup for a styled tooltip box.
    pub fn to_html(&self) -> String {
        let mut html = format!(r#"<div class="ckf-title">{}</div>"#, escape_html(&self.title));
        let row = |label: &str, value: &str| {
            format!(
                r#"<div class="ckf-row"><span class="ckf-label">{}:</span><span>{}</span></div>"#,
                escape_html(label),
                escape_html(value)
            )
        };
        match self.kind {
            ReferenceKind::ConfigurationPropertiesPrefix => {
                if self.rows.is_empty() {
                    html.push_str(&row(self.primary_label, NOT_SET));
                }
                for value in &self.rows {
                    let shown = match &value.other {
                        Some(other) => format!("{} ({}: {other})", value.primary, self.other_label),
                        None => value.primary.clone(),
                    };
                    html.push_str(&row(&value.key, &shown));
                }
                if self.hidden > 0 {
                    html.push_str(&format!(r#"<div class="ckf-more">… {} more</div>"#, self.hidden));
                }
            }
            ReferenceKind::Value | ReferenceKind::ConstLiteral => {
                for value in &self.rows {
                    html.push_str(&row(self.primary_label, &value.primary));
                    if let Some(other) = &value.other {
                        html.push_str(&row(self.other_label, other));
                    }
                }
            }
        }
        html
    }
}

/// Both sides of one key. The other side only shows when its raw value differs.
fn value_row(key: &str, side: Side, dual: &DualConfig, settings: &Settings) -> ValueRow {
    let primary = dual.lookup(side, key);
    let other = dual.lookup(side.other(), key);
    let other = match (primary, other) {
        (Some(p), Some(o)) if p == o => None,
        (_, other) => display_value(key, other, settings.mask_secrets),
    };
    ValueRow {
        key: key.to_string(),
        primary: display_value(key, primary, settings.mask_secrets)
            .unwrap_or_else(|| NOT_SET.to_string()),
        other,
    }
}
