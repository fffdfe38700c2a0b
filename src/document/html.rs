//! HTML snapshot loading (tree-sitter-html) and serialization

use super::{Document, MemoryDocument, NodeId, NodeKind};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;
use tree_sitter::{Node, Parser};

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,31});")
        .expect("valid regex")
});

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

/// Parse an HTML snapshot into a [`MemoryDocument`].
///
/// Recovery follows tree-sitter: malformed regions are kept as far as the grammar can make
/// sense of them. Whitespace between nodes is preserved as text so that `text_content` of a
/// diff line matches what the page showed.
pub fn parse_html(text: &str) -> Result<MemoryDocument> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_html::LANGUAGE.into())
        .map_err(|e| Error::Html(e.to_string()))?;
    let tree = parser
        .parse(text, None)
        .ok_or_else(|| Error::Html("parser produced no tree".to_string()))?;

    let mut builder = Builder {
        source: text,
        doc: MemoryDocument::new(),
    };
    let root = tree.root_node();
    let doc_root = builder.doc.root();
    builder.content(root, doc_root, root.start_byte(), root.end_byte());
    tracing::debug!("Parsed HTML snapshot ({} bytes)", text.len());
    Ok(builder.doc)
}

struct Builder<'s> {
    source: &'s str,
    doc: MemoryDocument,
}

impl<'s> Builder<'s> {
    fn slice(&self, node: Node) -> &'s str {
        self.source.get(node.start_byte()..node.end_byte()).unwrap_or_default()
    }

    /// Add the content children of `node` to `parent`, restoring the whitespace between them.
    fn content(&mut self, node: Node, parent: NodeId, start: usize, end: usize) {
        let mut offset = start;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if matches!(child.kind(), "start_tag" | "end_tag" | "self_closing_tag") {
                continue;
            }
            self.gap(parent, offset, child.start_byte());
            self.node(child, parent);
            offset = offset.max(child.end_byte());
        }
        self.gap(parent, offset, end);
    }

    fn gap(&mut self, parent: NodeId, from: usize, to: usize) {
        if from < to {
            if let Some(ws) = self.source.get(from..to) {
                self.doc.push_text(parent, ws);
            }
        }
    }

    fn node(&mut self, node: Node, parent: NodeId) {
        match node.kind() {
            "element" | "script_element" | "style_element" => self.element(node, parent),
            "text" | "entity" => {
                let text = decode_entities(self.slice(node));
                self.doc.push_text(parent, &text);
            }
            "raw_text" => {
                let text = self.slice(node);
                self.doc.push_text(parent, text);
            }
            "comment" => {
                let raw = self.slice(node);
                let body = raw.strip_prefix("<!--").unwrap_or(raw);
                let body = body.strip_suffix("-->").unwrap_or(body);
                self.doc.comment_child(parent, body);
            }
            "ERROR" => self.content(node, parent, node.start_byte(), node.end_byte()),
            _ => {}
        }
    }

    fn element(&mut self, node: Node, parent: NodeId) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        let Some(open) = children
            .iter()
            .find(|c| matches!(c.kind(), "start_tag" | "self_closing_tag"))
        else {
            self.content(node, parent, node.start_byte(), node.end_byte());
            return;
        };

        let mut tag = String::from("div");
        let mut attributes = Vec::new();
        let mut tag_cursor = open.walk();
        for part in open.children(&mut tag_cursor) {
            match part.kind() {
                "tag_name" => tag = self.slice(part).to_ascii_lowercase(),
                "attribute" => attributes.push(self.attribute(part)),
                _ => {}
            }
        }

        let element = self.doc.create_element(&tag);
        for (name, value) in &attributes {
            self.doc.set_attribute(element, name, value);
        }
        self.doc.append_child(parent, element);

        if open.kind() == "self_closing_tag" || VOID_TAGS.contains(&tag.as_str()) {
            return;
        }
        let end = children
            .iter()
            .find(|c| c.kind() == "end_tag")
            .map_or(node.end_byte(), |c| c.start_byte());
        self.content(node, element, open.end_byte(), end);
    }

    fn attribute(&self, node: Node) -> (String, String) {
        let mut name = String::new();
        let mut value = String::new();
        let mut cursor = node.walk();
        for part in node.children(&mut cursor) {
            match part.kind() {
                "attribute_name" => name = self.slice(part).to_ascii_lowercase(),
                "attribute_value" => value = decode_entities(self.slice(part)).into_owned(),
                "quoted_attribute_value" => {
                    let raw = self.slice(part);
                    let inner = raw
                        .get(1..raw.len().saturating_sub(1))
                        .unwrap_or_default();
                    value = decode_entities(inner).into_owned();
                }
                _ => {}
            }
        }
        (name, value)
    }
}

/// Decode named and numeric character references.
///
/// Unknown names are left untouched.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    ENTITY.replace_all(text, |caps: &Captures| {
        let body = &caps[1];
        let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
        } else if let Some(dec) = body.strip_prefix('#') {
            dec.parse::<u32>().ok().and_then(char::from_u32)
        } else {
            named_entity(body)
        };
        decoded.map_or_else(|| caps[0].to_string(), String::from)
    })
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "bull" => '\u{2022}',
        "middot" => '\u{00B7}',
        "copy" => '\u{00A9}',
        _ => return None,
    })
}

pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;").replace('<', "&lt;")
}

/// Serialize the whole document back to HTML.
pub fn to_html(doc: &MemoryDocument) -> String {
    let mut out = String::new();
    for child in doc.children(doc.root()) {
        write_node(doc, *child, false, &mut out);
    }
    out
}

/// Serialize `node` and everything below it.
pub fn outer_html(doc: &MemoryDocument, node: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, node, false, &mut out);
    out
}

fn write_node(doc: &MemoryDocument, node: NodeId, raw: bool, out: &mut String) {
    match doc.kind(node) {
        NodeKind::Document => {
            for child in doc.children(node) {
                write_node(doc, *child, false, out);
            }
        }
        NodeKind::Text => {
            let text = doc.text(node).unwrap_or_default();
            if raw {
                out.push_str(text);
            } else {
                out.push_str(&escape_text(text));
            }
        }
        NodeKind::Comment => {
            out.push_str("<!--");
            out.push_str(doc.text(node).unwrap_or_default());
            out.push_str("-->");
        }
        NodeKind::Element => {
            let tag = doc.tag_name(node).unwrap_or("div");
            out.push('<');
            out.push_str(tag);
            for (name, value) in doc.attributes(node) {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attribute(value));
                out.push('"');
            }
            out.push('>');
            if VOID_TAGS.contains(&tag) {
                return;
            }
            let raw = RAW_TEXT_TAGS.contains(&tag);
            for child in doc.children(node) {
                write_node(doc, *child, raw, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}
