//! Locating rendered diff lines and classifying them

use crate::document::{Document, NodeId, SelectorList};
use crate::domain::LineClassification;
use once_cell::sync::Lazy;
use regex::Regex;

fn selector(text: &str) -> SelectorList {
    SelectorList::parse(text).expect("valid selector")
}

/// Code cells as the diff renderer marks them, most specific first.
pub static CODE_LINES: Lazy<SelectorList> =
    Lazy::new(|| selector("td.diff-line, td[data-line-type], .udiff-line, .diff-line"));
static TYPED_CELL: Lazy<SelectorList> = Lazy::new(|| selector("td[data-line-type]"));
static TYPED_ROW: Lazy<SelectorList> = Lazy::new(|| selector("tr[data-line-type]"));
static ROW: Lazy<SelectorList> = Lazy::new(|| selector("tr"));
/// Anything this crate injected into the page.
pub static OWN_NODES: Lazy<SelectorList> = Lazy::new(|| selector("[data-ckf]"));
/// Markers appended to the end of a line when no text could be wrapped.
pub static APPENDED_MARKERS: Lazy<SelectorList> =
    Lazy::new(|| selector("[data-ckf=\"value-appended\"]"));

static DIFF_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+\-]\s?").expect("valid regex"));

/// One candidate code line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    /// The matched code cell.
    pub node: NodeId,
    /// Where markers for this line live: the enclosing row, or the cell itself.
    pub element: NodeId,
    pub classification: LineClassification,
    /// Trimmed text with any unified-diff marker removed.
    pub text: String,
}

/// Every code line on the page that was not injected by us, in document order.
pub fn candidate_lines<D: Document + ?Sized>(doc: &D) -> Vec<DiffLine> {
    doc.query_selector_all(doc.root(), &CODE_LINES)
        .into_iter()
        .filter(|node| doc.closest(*node, &OWN_NODES).is_none())
        .map(|node| DiffLine {
            node,
            element: line_element(doc, node),
            classification: classify(doc, node),
            text: strip_diff_marker(line_text(doc, node).trim()).to_string(),
        })
        .collect()
}

/// Count of code lines, used for the page signature.
pub fn count_lines<D: Document + ?Sized>(doc: &D) -> usize {
    doc.query_selector_all(doc.root(), &CODE_LINES).len()
}

/// Read `data-line-type` from the nearest typed cell or row.
pub fn classify<D: Document + ?Sized>(doc: &D, node: NodeId) -> LineClassification {
    let holder = doc
        .closest(node, &TYPED_CELL)
        .or_else(|| doc.closest(node, &TYPED_ROW));
    LineClassification::from_attribute(holder.and_then(|h| doc.attribute(h, "data-line-type")))
}

pub fn line_element<D: Document + ?Sized>(doc: &D, node: NodeId) -> NodeId {
    doc.closest(node, &ROW).unwrap_or(node)
}

/// Text of a line, leaving out markers that were appended rather than wrapped.
pub fn line_text<D: Document + ?Sized>(doc: &D, node: NodeId) -> String {
    doc.text_nodes(node)
        .into_iter()
        .filter(|text| doc.closest(*text, &APPENDED_MARKERS).is_none())
        .filter_map(|text| doc.text(text))
        .collect()
}

/// Drop a leading `+` or `-` (and one following space).
pub fn strip_diff_marker(text: &str) -> &str {
    match DIFF_MARKER.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;

    #[test]
    fn strips_one_marker() {
        assert_eq!(strip_diff_marker("+ @Value(x)"), "@Value(x)");
        assert_eq!(strip_diff_marker("-int a;"), "int a;");
        assert_eq!(strip_diff_marker("  plain"), "  plain");
        assert_eq!(strip_diff_marker("++x"), "+x");
    }

    #[test]
    fn classifies_from_cell_or_row() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let table = doc.element(root, "table", &[]);
        let removed_row = doc.element(table, "tr", &[("data-line-type", "REMOVED")]);
        let removed = doc.element(removed_row, "td", &[("class", "diff-line")]);
        let row = doc.element(table, "tr", &[]);
        let added = doc.element(row, "td", &[("data-line-type", "ADDED")]);
        let loose = doc.element(root, "div", &[("class", "udiff-line")]);

        assert_eq!(classify(&doc, removed), LineClassification::Removed);
        assert_eq!(classify(&doc, added), LineClassification::Added);
        assert_eq!(classify(&doc, loose), LineClassification::Context);
        assert_eq!(line_element(&doc, added), row);
        assert_eq!(line_element(&doc, loose), loose);
    }

    #[test]
    fn candidates_skip_injected_nodes() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let cell = doc.element(root, "div", &[("class", "diff-line")]);
        doc.text_child(cell, "+ int x = 1;");
        let ours = doc.element(root, "div", &[("data-ckf", "tooltip")]);
        doc.element(ours, "div", &[("class", "diff-line")]);

        let lines = candidate_lines(&doc);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "int x = 1;");
    }

    #[test]
    fn appended_markers_are_not_line_text() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let cell = doc.element(root, "div", &[("class", "diff-line")]);
        doc.text_child(cell, "@Value(KEY)");
        let marker = doc.element(
            cell,
            "span",
            &[("class", "ckf-highlight"), ("data-ckf", "value-appended")],
        );
        doc.text_child(marker, "a.b");
        assert_eq!(line_text(&doc, cell), "@Value(KEY)");
    }
}
