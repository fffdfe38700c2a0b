//! Folding of string-literal concatenations
//!
//! Diff lines often spell a property key as `"app." + "feature"` or
//! `"${" + PREFIX + "}"`. Before pattern matching, adjacent literals joined by `+` are merged
//! into one literal so the downstream regexes only ever see a single quoted string.

use once_cell::sync::Lazy;
use regex::Regex;

static VALUE_CONCAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""\$\{\s*"\s*\+\s*([^}]+?)\s*\+\s*"\s*\}""#).expect("valid regex")
});
static QUOTE_PLUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""\s*\+\s*|\s*\+\s*""#).expect("valid regex"));
static BARE_PLUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\+\s*").expect("valid regex"));

/// A piece of a source line: either the body of a quoted literal or anything in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal contents without the surrounding quotes, escapes left as written.
    Literal(String),
    Code(String),
}

impl Segment {
    fn render(&self, out: &mut String) {
        match self {
            Segment::Literal(inner) => {
                out.push('"');
                out.push_str(inner);
                out.push('"');
            }
            Segment::Code(code) => out.push_str(code),
        }
    }
}

/// Split `expr` into quoted literals and the code between them.
///
/// Both `"..."` and `'...'` are recognised, and a backslash escapes the next character inside
/// a literal. A quote with no closing partner is kept as ordinary code.
pub fn split_literals(expr: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut code = String::new();
    let mut chars = expr.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        if ch != '"' && ch != '\'' {
            code.push(ch);
            continue;
        }

        match find_closing_quote(expr, start, ch) {
            Some(end) => {
                if !code.is_empty() {
                    segments.push(Segment::Code(std::mem::take(&mut code)));
                }
                segments.push(Segment::Literal(expr[start + 1..end].to_string()));
                while chars.peek().is_some_and(|(idx, _)| *idx <= end) {
                    chars.next();
                }
            }
            None => code.push(ch),
        }
    }

    if !code.is_empty() {
        segments.push(Segment::Code(code));
    }
    segments
}

fn find_closing_quote(expr: &str, open: usize, quote: char) -> Option<usize> {
    let mut escaped = false;
    for (offset, ch) in expr[open + 1..].char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            return Some(open + 1 + offset);
        }
    }
    None
}

/// Render segments back into source text, every literal double-quoted.
pub fn join_segments(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        segment.render(&mut out);
    }
    out
}

/// Collapse `"a" + "b" + 'c'` into `"abc"`.
///
/// Merging repeats until no `literal + literal` pair remains. Text that is not a literal
/// concatenation passes through unchanged, apart from single-quoted literals being rewritten
/// with double quotes.
pub fn collapse_string_concat(expr: &str) -> String {
    let mut segments = split_literals(expr);
    while merge_adjacent_literals(&mut segments) {}
    join_segments(&segments)
}

/// Merge the first `Literal, "+", Literal` triple. Returns whether anything changed.
fn merge_adjacent_literals(segments: &mut Vec<Segment>) -> bool {
    for i in 0..segments.len().saturating_sub(2) {
        let merged = match (&segments[i], &segments[i + 1], &segments[i + 2]) {
            (Segment::Literal(left), Segment::Code(op), Segment::Literal(right))
                if op.trim() == "+" =>
            {
                format!("{left}{right}")
            }
            _ => continue,
        };
        segments.splice(i..i + 3, [Segment::Literal(merged)]);
        return true;
    }
    false
}

/// Rewrite `"${" + X + "}"` into `"${X}"`.
///
/// `X` may be an identifier or a further concatenation chain; quotes, `+` operators and
/// whitespace inside it are dropped.
pub fn normalize_value_concat(expr: &str) -> String {
    VALUE_CONCAT
        .replace_all(expr, |caps: &regex::Captures<'_>| {
            let inner = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let without_joins = QUOTE_PLUS.replace_all(inner, "");
            let without_plus = BARE_PLUS.replace_all(&without_joins, "");
            let cleaned: String =
                without_plus.chars().filter(|c| *c != '"' && !c.is_whitespace()).collect();
            format!("\"${{{cleaned}}}\"")
        })
        .into_owned()
}
