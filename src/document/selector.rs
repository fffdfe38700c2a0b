//! A small CSS selector engine
//!
//! Supports type selectors, `*`, `.class`, `#id`, `[attr]`, `[attr="value"]`, compound
//! selectors, the descendant and `>` combinators, and comma-separated lists. That is everything
//! the diff page queries need; pseudo-classes and sibling combinators are rejected.

use super::{Document, NodeId};
use crate::error::{Error, Result};

/// A parsed, comma-separated list of selectors. Matches when any member matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    source: String,
    selectors: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    /// Left to right; `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`.
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeTest>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttributeTest {
    Exists(String),
    Equals(String, String),
}

impl SelectorList {
    /// Parse a selector list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Selector`] for empty members, unsupported syntax, or unterminated
    /// attribute tests.
    pub fn parse(source: &str) -> Result<Self> {
        let fail = |reason: &str| Error::Selector {
            selector: source.to_string(),
            reason: reason.to_string(),
        };

        let mut selectors = Vec::new();
        for member in split_members(source) {
            let member = member.trim();
            if member.is_empty() {
                return Err(fail("empty selector in list"));
            }
            selectors.push(parse_complex(member).map_err(|reason| fail(&reason))?);
        }

        Ok(Self {
            source: source.to_string(),
            selectors,
        })
    }

    /// The text this list was parsed from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `node` (an element) matches any selector in the list.
    pub fn matches<D: Document + ?Sized>(&self, doc: &D, node: NodeId) -> bool {
        doc.is_element(node)
            && self
                .selectors
                .iter()
                .any(|complex| matches_from(doc, complex, complex.compounds.len() - 1, node))
    }
}

/// Split on commas that are not inside an attribute test.
fn split_members(source: &str) -> Vec<&str> {
    let mut members = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (idx, ch) in source.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                members.push(&source[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    members.push(&source[start..]);
    members
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '-' || ch == '_'
}

fn parse_complex(text: &str) -> std::result::Result<Complex, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0;
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();
    let mut pending: Option<Combinator> = None;

    while pos < chars.len() {
        let ch = chars[pos];
        if ch.is_whitespace() {
            if !compounds.is_empty() && pending.is_none() {
                pending = Some(Combinator::Descendant);
            }
            pos += 1;
            continue;
        }
        if ch == '>' {
            if compounds.is_empty() || pending == Some(Combinator::Child) {
                return Err("`>` without a left-hand selector".to_string());
            }
            pending = Some(Combinator::Child);
            pos += 1;
            continue;
        }

        if !compounds.is_empty() {
            combinators.push(pending.take().ok_or("missing combinator")?);
        }
        let (compound, next) = parse_compound(&chars, pos)?;
        compounds.push(compound);
        pos = next;
        pending = None;
    }

    if pending == Some(Combinator::Child) {
        return Err("dangling `>`".to_string());
    }
    if compounds.is_empty() {
        return Err("empty selector".to_string());
    }
    Ok(Complex {
        compounds,
        combinators,
    })
}

fn read_ident(chars: &[char], mut pos: usize) -> (String, usize) {
    let start = pos;
    while pos < chars.len() && is_ident_char(chars[pos]) {
        pos += 1;
    }
    (chars[start..pos].iter().collect(), pos)
}

fn parse_compound(chars: &[char], mut pos: usize) -> std::result::Result<(Compound, usize), String> {
    let mut compound = Compound::default();
    let begin = pos;

    if chars[pos] == '*' {
        pos += 1;
    } else if is_ident_char(chars[pos]) {
        let (tag, next) = read_ident(chars, pos);
        compound.tag = Some(tag.to_ascii_lowercase());
        pos = next;
    }

    while pos < chars.len() {
        match chars[pos] {
            '.' | '#' => {
                let (name, next) = read_ident(chars, pos + 1);
                if name.is_empty() {
                    return Err(format!("expected a name after `{}`", chars[pos]));
                }
                if chars[pos] == '.' {
                    compound.classes.push(name);
                } else {
                    compound.id = Some(name);
                }
                pos = next;
            }
            '[' => {
                let (test, next) = parse_attribute(chars, pos + 1)?;
                compound.attributes.push(test);
                pos = next;
            }
            c if c.is_whitespace() || c == '>' => break,
            c => return Err(format!("unsupported character `{c}`")),
        }
    }

    if pos == begin {
        return Err(format!("unexpected `{}`", chars[pos]));
    }
    Ok((compound, pos))
}

fn parse_attribute(chars: &[char], pos: usize) -> std::result::Result<(AttributeTest, usize), String> {
    let skip_ws = |mut p: usize| {
        while p < chars.len() && chars[p].is_whitespace() {
            p += 1;
        }
        p
    };

    let pos = skip_ws(pos);
    let (name, pos) = read_ident(chars, pos);
    if name.is_empty() {
        return Err("attribute test without a name".to_string());
    }
    let name = name.to_ascii_lowercase();
    let pos = skip_ws(pos);

    match chars.get(pos) {
        Some(']') => Ok((AttributeTest::Exists(name), pos + 1)),
        Some('=') => {
            let pos = skip_ws(pos + 1);
            let (value, pos) = match chars.get(pos) {
                Some(q @ ('"' | '\'')) => {
                    let end = chars[pos + 1..]
                        .iter()
                        .position(|c| c == q)
                        .ok_or("unterminated attribute value")?;
                    (chars[pos + 1..pos + 1 + end].iter().collect(), pos + end + 2)
                }
                _ => read_ident(chars, pos),
            };
            let pos = skip_ws(pos);
            if chars.get(pos) != Some(&']') {
                return Err("expected `]`".to_string());
            }
            Ok((AttributeTest::Equals(name, value), pos + 1))
        }
        _ => Err("unsupported attribute operator".to_string()),
    }
}

fn compound_matches<D: Document + ?Sized>(doc: &D, compound: &Compound, node: NodeId) -> bool {
    if !doc.is_element(node) {
        return false;
    }
    if let Some(tag) = &compound.tag {
        if doc.tag_name(node) != Some(tag.as_str()) {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if doc.attribute(node, "id") != Some(id.as_str()) {
            return false;
        }
    }
    if !compound.classes.iter().all(|class| doc.has_class(node, class)) {
        return false;
    }
    compound.attributes.iter().all(|test| match test {
        AttributeTest::Exists(name) => doc.attribute(node, name).is_some(),
        AttributeTest::Equals(name, value) => doc.attribute(node, name) == Some(value.as_str()),
    })
}

/// Match `complex.compounds[..=idx]` with `compounds[idx]` anchored at `node`.
fn matches_from<D: Document + ?Sized>(doc: &D, complex: &Complex, idx: usize, node: NodeId) -> bool {
    if !compound_matches(doc, &complex.compounds[idx], node) {
        return false;
    }
    if idx == 0 {
        return true;
    }

    match complex.combinators[idx - 1] {
        Combinator::Child => doc
            .parent(node)
            .is_some_and(|parent| matches_from(doc, complex, idx - 1, parent)),
        Combinator::Descendant => doc
            .ancestors(node)
            .into_iter()
            .any(|ancestor| matches_from(doc, complex, idx - 1, ancestor)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;

    #[test]
    fn parses_lists_and_compounds() {
        let list = SelectorList::parse("ol.files li.file a, ul.files li.file a").unwrap();
        assert_eq!(list.selectors.len(), 2);
        assert_eq!(list.selectors[0].compounds.len(), 3);
        assert_eq!(list.selectors[0].compounds[0].tag.as_deref(), Some("ol"));
        assert_eq!(list.selectors[0].compounds[0].classes, vec!["files".to_string()]);
    }

    #[test]
    fn parses_attribute_tests() {
        let list = SelectorList::parse("td[data-line-type], [data-ckf=\"value-highlight\"]").unwrap();
        assert_eq!(
            list.selectors[0].compounds[0].attributes,
            vec![AttributeTest::Exists("data-line-type".into())]
        );
        assert_eq!(
            list.selectors[1].compounds[0].attributes,
            vec![AttributeTest::Equals("data-ckf".into(), "value-highlight".into())]
        );
    }

    #[test]
    fn rejects_unsupported_syntax() {
        assert!(SelectorList::parse("").is_err());
        assert!(SelectorList::parse("a,,b").is_err());
        assert!(SelectorList::parse("a:hover").is_err());
        assert!(SelectorList::parse("a + b").is_err());
        assert!(SelectorList::parse("[data-x").is_err());
        assert!(SelectorList::parse("div >").is_err());
    }

    #[test]
    fn child_combinator_requires_direct_parent() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let ol = doc.element(root, "ol", &[("class", "files")]);
        let li = doc.element(ol, "li", &[("class", "file")]);
        let div = doc.element(li, "div", &[]);
        let a = doc.element(div, "a", &[("href", "#x")]);

        let descendant = SelectorList::parse("ol.files li.file a").unwrap();
        let child = SelectorList::parse("li.file > a").unwrap();
        assert!(descendant.matches(&doc, a));
        assert!(!child.matches(&doc, a));
        assert!(SelectorList::parse("li > div > a").unwrap().matches(&doc, a));
    }

    #[test]
    fn id_and_universal() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let div = doc.element(root, "div", &[("id", "main")]);
        assert!(SelectorList::parse("#main").unwrap().matches(&doc, div));
        assert!(SelectorList::parse("*").unwrap().matches(&doc, div));
        assert!(!SelectorList::parse("*").unwrap().matches(&doc, root));
    }
}
