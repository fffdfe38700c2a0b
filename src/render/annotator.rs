//! Inline markers for detected references

use super::tooltip::Tooltip;
use crate::config::{HighlightMode, Settings};
use crate::detect::lines::OWN_NODES;
use crate::document::{Document, NodeId, SelectorList};
use crate::domain::{DetectedReference, DualConfig, LineClassification, ReferenceKind};
use crate::error::{Error, Result};
use crate::normalize::sanitize_key;
use once_cell::sync::Lazy;
use serde::Serialize;

pub const MARKER_CLASS: &str = "ckf-highlight";

static MARKERS: Lazy<SelectorList> =
    Lazy::new(|| SelectorList::parse(".ckf-highlight").expect("valid selector"));

/// How a marker was put into the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Wrapped around the display string.
    Wrapped,
    /// Wrapped around a `${...}` placeholder because the display string was not found.
    Placeholder,
    /// Appended to the end of the line.
    Appended,
}

/// One marker written during a pass.
#[derive(Debug, Clone, Serialize)]
pub struct Annotation {
    pub key: String,
    pub display: String,
    pub kind: ReferenceKind,
    pub classification: LineClassification,
    pub line_element: NodeId,
    pub marker: NodeId,
    pub placement: Placement,
    pub tooltip: Tooltip,
}

/// The text a marker should wrap for `reference`.
pub fn display_string(reference: &DetectedReference, settings: &Settings) -> String {
    match (settings.highlight_mode, &reference.source_token) {
        (HighlightMode::SourceToken, Some(token)) => token.clone(),
        _ => sanitize_key(&reference.key),
    }
}

/// Write a marker for every reference that is not on a removed line.
///
/// Running twice over the same references adds nothing the second time.
pub fn annotate<D: Document + ?Sized>(
    doc: &mut D,
    references: &[DetectedReference],
    dual: &DualConfig,
    settings: &Settings,
) -> Result<Vec<Annotation>> {
    let mut annotations = Vec::new();

    for reference in references {
        if reference.classification == LineClassification::Removed {
            continue;
        }
        let key = sanitize_key(&reference.key);
        let shown = display_string(reference, settings);
        let container = reference.line_element;

        if has_marker(doc, container, &shown) {
            tracing::debug!("Marker for {shown} already present on {container}");
            continue;
        }

        let tooltip = Tooltip::for_reference(reference, dual, settings);
        let (marker, placement) = place_marker(doc, container, &shown)?;

        doc.set_attribute(marker, "data-key", &key);
        doc.set_attribute(marker, "data-ckf-kind", reference.kind.label());
        doc.set_attribute(marker, "data-ckf-line", reference.classification.as_str());
        if let Some(row) = tooltip.rows.first() {
            doc.set_attribute(marker, "data-ckf-value", &row.primary);
            if let Some(other) = &row.other {
                doc.set_attribute(marker, "data-ckf-other", other);
            }
        }
        doc.set_attribute(marker, "title", &tooltip.to_text());

        annotations.push(Annotation {
            key,
            display: shown,
            kind: reference.kind,
            classification: reference.classification,
            line_element: container,
            marker,
            placement,
            tooltip,
        });
    }

    tracing::info!("Annotated {} references", annotations.len());
    Ok(annotations)
}

fn has_marker<D: Document + ?Sized>(doc: &D, container: NodeId, display: &str) -> bool {
    doc.query_selector_all(container, &MARKERS)
        .into_iter()
        .any(|marker| doc.attribute(marker, "data-display") == Some(display))
}

/// First text node under `container` whose text satisfies `find`, skipping our own nodes.
fn find_text<D, F>(doc: &D, container: NodeId, find: F) -> Option<(NodeId, usize, usize)>
where
    D: Document + ?Sized,
    F: Fn(&str) -> Option<(usize, usize)>,
{
    doc.text_nodes(container)
        .into_iter()
        .filter(|node| doc.closest(*node, &OWN_NODES).is_none())
        .find_map(|node| doc.text(node).and_then(&find).map(|(start, end)| (node, start, end)))
}

fn placeholder_span(text: &str) -> Option<(usize, usize)> {
    let start = text.find("${")?;
    let end = text[start..].find('}')? + start + 1;
    Some((start, end))
}

fn new_marker<D: Document + ?Sized>(doc: &mut D, display: &str, role: &str, text: &str) -> NodeId {
    let marker = doc.create_element("span");
    doc.set_attribute(marker, "class", MARKER_CLASS);
    doc.set_attribute(marker, "data-ckf", role);
    doc.set_attribute(marker, "data-display", display);
    let inner = doc.create_text(text);
    doc.append_child(marker, inner);
    marker
}

fn place_marker<D: Document + ?Sized>(
    doc: &mut D,
    container: NodeId,
    display: &str,
) -> Result<(NodeId, Placement)> {
    let reader: &D = doc;
    let found = find_text(reader, container, |text| {
        text.find(display).map(|start| (start, start + display.len()))
    })
    .map(|hit| (hit, Placement::Wrapped))
    .or_else(|| {
        find_text(reader, container, placeholder_span).map(|hit| (hit, Placement::Placeholder))
    });

    let Some(((node, start, end), placement)) = found else {
        let marker = new_marker(doc, display, "value-appended", display);
        doc.append_child(container, marker);
        return Ok((marker, Placement::Appended));
    };

    let full = doc.text(node).unwrap_or_default().to_string();
    let Some(parent) = doc.parent(node) else {
        return Err(Error::Detached(node.0));
    };
    let marker = new_marker(doc, display, "value-highlight", &full[start..end]);
    split_around(doc, parent, node, marker, &full[..start], &full[end..])?;
    Ok((marker, placement))
}

/// Replace `node` with `before`, `marker`, `after`, dropping empty text pieces.
fn split_around<D: Document + ?Sized>(
    doc: &mut D,
    parent: NodeId,
    node: NodeId,
    marker: NodeId,
    before: &str,
    after: &str,
) -> Result<()> {
    if after.is_empty() {
        doc.replace_child(parent, marker, node)?;
    } else {
        let after = doc.create_text(after);
        doc.replace_child(parent, after, node)?;
        doc.insert_before(parent, marker, after)?;
    }
    if !before.is_empty() {
        let before = doc.create_text(before);
        doc.insert_before(parent, before, marker)?;
    }
    Ok(())
}
