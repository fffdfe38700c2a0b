//! Constant symbol table built from the diff
//!
//! Three passes feed one table:
//!
//! 1. highlighted lines are walked token by token (`NAME`, `=`, `"literal"`),
//! 2. lines without highlight tokens are matched against [`CONST_ASSIGN`], first as written
//!    and then with string concatenations collapsed,
//! 3. a final sweep over generic `pre`/`code` blocks adds constants not seen yet.
//!
//! Later bindings from passes 1 and 2 overwrite earlier ones; pass 3 never overwrites.

use super::lines::{candidate_lines, strip_diff_marker, OWN_NODES};
use crate::document::{Document, NodeId, SelectorList};
use crate::normalize::concat::{join_segments, split_literals, Segment};
use crate::normalize::{collapse_string_concat, sanitize_key};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::BTreeMap;

/// A Java-style constant declaration with a string literal right-hand side.
///
/// The literal must end the expression; `"a." + "b"` only matches once collapsed.
pub static CONST_ASSIGN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\b(?:(?:public|protected|private)\s+)?(?:static\s+)?(?:final\s+)?(?:String|char|int|long|double|float|var)\s+([A-Z0-9_]+)\s*=\s*["']([^"']*)["']\s*(?:[;,)]|//|$)"#,
    )
    .expect("valid regex")
});

const QUOTES: &[char] = &['"', '\''];

static CONSTANT_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9_]+$").expect("valid regex"));
static UPPER_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Z0-9_]+)\b").expect("valid regex"));

static TOKENS: Lazy<SelectorList> = Lazy::new(|| {
    SelectorList::parse(".hl-variable, .hl-operator, .hl-string, .hl-type, .hl-keyword")
        .expect("valid selector")
});
static GENERIC_CODE: Lazy<SelectorList> =
    Lazy::new(|| SelectorList::parse("pre, code").expect("valid selector"));

/// Constant name to literal value, scoped to one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SymbolTable {
    entries: BTreeMap<String, String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replace every known constant on the line with its value.
    ///
    /// Outside literals the value is inserted quoted, so `"${" + K + "}"` folds into one
    /// literal. Inside literals it is inserted bare, so `"${APP_KEY}"` becomes `"${x.y}"`.
    pub fn substitute(&self, text: &str) -> String {
        if self.is_empty() {
            return text.to_string();
        }
        let segments: Vec<Segment> = split_literals(text)
            .into_iter()
            .map(|segment| match segment {
                Segment::Code(code) => Segment::Code(self.replace_tokens(&code, |value| {
                    format!("\"{}\"", value.replace('"', "\\\""))
                })),
                Segment::Literal(inner) => {
                    Segment::Literal(self.replace_tokens(&inner, |value| value.replace('"', "\\\"")))
                }
            })
            .collect();
        join_segments(&segments)
    }

    fn replace_tokens(&self, text: &str, render: impl Fn(&str) -> String) -> String {
        UPPER_TOKEN
            .replace_all(text, |caps: &Captures| match self.get(&caps[1]) {
                Some(value) => render(value),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

/// Match [`CONST_ASSIGN`] directly, then after collapsing concatenations.
///
/// Returns the sanitized `(name, literal)` pair.
pub fn match_constant(text: &str) -> Option<(String, String)> {
    let extract = |caps: Captures| (sanitize_key(&caps[1]), sanitize_key(&caps[2]));
    CONST_ASSIGN.captures(text).map(extract).or_else(|| {
        let collapsed = collapse_string_concat(text);
        CONST_ASSIGN.captures(&collapsed).map(extract)
    })
}

/// Build the table for the current document.
pub fn build_symbol_table<D: Document + ?Sized>(doc: &D) -> SymbolTable {
    let mut table = SymbolTable::new();

    for line in candidate_lines(doc) {
        let tokens = doc.query_selector_all(line.node, &TOKENS);
        if tokens.is_empty() {
            if let Some((name, value)) = match_constant(&line.text) {
                tracing::debug!("Constant (text): {name} = {value}");
                table.insert(name, value);
            }
            continue;
        }
        for (name, value) in bind_tokens(doc, &tokens) {
            tracing::debug!("Constant (tokens): {name} = {value}");
            table.insert(name, value);
        }
    }

    for block in doc.query_selector_all(doc.root(), &GENERIC_CODE) {
        if doc.closest(block, &OWN_NODES).is_some() {
            continue;
        }
        let text = doc.text_content(block);
        for raw in text.lines() {
            let Some((name, value)) = match_constant(strip_diff_marker(raw.trim())) else {
                continue;
            };
            if !table.contains(&name) {
                tracing::debug!("Constant (sweep): {name} = {value}");
                table.insert(name, value);
            }
        }
    }

    tracing::debug!("Collected {} constants", table.len());
    table
}

fn token_text<D: Document + ?Sized>(doc: &D, node: NodeId) -> String {
    doc.text_content(node).trim().to_string()
}

fn strip_quotes(literal: &str) -> &str {
    let literal = literal.strip_prefix(QUOTES).unwrap_or(literal);
    literal.strip_suffix(QUOTES).unwrap_or(literal)
}

/// Walk highlight tokens left to right binding `NAME = "literal"` pairs.
///
/// A string token followed by `+` and another string token is joined with it.
fn bind_tokens<D: Document + ?Sized>(doc: &D, tokens: &[NodeId]) -> Vec<(String, String)> {
    let mut bindings = Vec::new();
    let mut last_variable: Option<String> = None;

    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        i += 1;
        if doc.has_class(token, "hl-variable") {
            last_variable = Some(token_text(doc, token));
            continue;
        }
        if !(doc.has_class(token, "hl-operator") && token_text(doc, token) == "=") {
            continue;
        }
        let Some(name) = last_variable.take() else {
            continue;
        };

        let mut value: Option<String> = None;
        let mut j = i;
        while j < tokens.len() {
            let next = tokens[j];
            let text = token_text(doc, next);
            if doc.has_class(next, "hl-string") {
                value.get_or_insert_with(String::new).push_str(strip_quotes(&text));
                let joined = tokens.get(j + 1).zip(tokens.get(j + 2)).is_some_and(|(op, rhs)| {
                    doc.has_class(*op, "hl-operator")
                        && token_text(doc, *op) == "+"
                        && doc.has_class(*rhs, "hl-string")
                });
                if !joined {
                    break;
                }
                j += 2;
                continue;
            }
            if doc.has_class(next, "hl-operator") && text.contains(';') {
                break;
            }
            j += 1;
        }

        let name = sanitize_key(&name);
        if let Some(value) = value {
            if CONSTANT_NAME.is_match(&name) {
                bindings.push((name, sanitize_key(&value)));
            }
        }
    }
    bindings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;

    fn token_line(doc: &mut MemoryDocument, tokens: &[(&str, &str)]) {
        let root = doc.root();
        let row = doc.element(root, "tr", &[("data-line-type", "ADDED")]);
        let cell = doc.element(row, "td", &[("class", "diff-line")]);
        for (class, text) in tokens {
            let span = doc.element(cell, "span", &[("class", class)]);
            doc.text_child(span, text);
            doc.text_child(cell, " ");
        }
    }

    #[test]
    fn const_regex_matches_declarations() {
        let (name, value) =
            match_constant(r#"private static final String TERMINAL_MAP = "hz.terminal.map";"#).unwrap();
        assert_eq!(name, "TERMINAL_MAP");
        assert_eq!(value, "hz.terminal.map");
        assert!(match_constant(r#"String lower = "a.b";"#).is_none());
        assert!(match_constant("int COUNT = 3;").is_none());
    }

    #[test]
    fn const_regex_needs_collapse_for_concatenation() {
        let text = r#"static final String KEY = "app." + "feature";"#;
        assert!(CONST_ASSIGN.captures(text).is_none());
        assert_eq!(match_constant(text).unwrap().1, "app.feature");
    }

    #[test]
    fn tokens_bind_uppercase_names_only() {
        let mut doc = MemoryDocument::new();
        token_line(
            &mut doc,
            &[
                ("hl-keyword", "private"),
                ("hl-type", "String"),
                ("hl-variable", "PREFIX"),
                ("hl-operator", "="),
                ("hl-string", "\"app.feature\""),
                ("hl-operator", ";"),
            ],
        );
        token_line(
            &mut doc,
            &[("hl-variable", "local"), ("hl-operator", "="), ("hl-string", "\"x.y\"")],
        );
        let table = build_symbol_table(&doc);
        assert_eq!(table.get("PREFIX"), Some("app.feature"));
        assert!(!table.contains("local"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn tokens_join_concatenated_strings() {
        let mut doc = MemoryDocument::new();
        token_line(
            &mut doc,
            &[
                ("hl-variable", "KEY"),
                ("hl-operator", "="),
                ("hl-string", "\"app.\""),
                ("hl-operator", "+"),
                ("hl-string", "'name'"),
                ("hl-operator", ";"),
            ],
        );
        assert_eq!(build_symbol_table(&doc).get("KEY"), Some("app.name"));
    }

    #[test]
    fn semicolon_stops_value_search() {
        let mut doc = MemoryDocument::new();
        token_line(
            &mut doc,
            &[
                ("hl-variable", "KEY"),
                ("hl-operator", "="),
                ("hl-variable", "other"),
                ("hl-operator", ";"),
                ("hl-string", "\"late.value\""),
            ],
        );
        assert!(build_symbol_table(&doc).is_empty());
    }

    #[test]
    fn final_sweep_does_not_overwrite() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let cell = doc.element(root, "div", &[("class", "diff-line")]);
        doc.text_child(cell, r#"+ static final String A = "from.line";"#);
        let pre = doc.element(root, "pre", &[]);
        doc.text_child(
            pre,
            "static final String A = \"from.pre\";\nstatic final String B = \"only.pre\";",
        );

        let table = build_symbol_table(&doc);
        assert_eq!(table.get("A"), Some("from.line"));
        assert_eq!(table.get("B"), Some("only.pre"));
    }

    #[test]
    fn substitute_replaces_code_and_literal_tokens() {
        let mut table = SymbolTable::new();
        table.insert("K", "x.y.z");
        table.insert("APP_KEY", "x.y");
        assert_eq!(
            table.substitute(r#"@Value("${" + K + "}")"#),
            r#"@Value("${" + "x.y.z" + "}")"#
        );
        assert_eq!(table.substitute(r#"@Value("${APP_KEY}") String v;"#), r#"@Value("${x.y}") String v;"#);
        assert_eq!(table.substitute(r#"@Value("${OTHER}")"#), r#"@Value("${OTHER}")"#);
    }
}
