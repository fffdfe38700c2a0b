//! Key sanitizing and case-variant generation

pub mod concat;

pub use concat::{collapse_string_concat, normalize_value_concat};

use once_cell::sync::Lazy;
use regex::Regex;

static MULTI_DOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").expect("valid regex"));
static SPACED_DOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\.\s*").expect("valid regex"));
static CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z])([A-Z])").expect("valid regex"));

const BOM: char = '\u{FEFF}';
const NBSP: char = '\u{00A0}';
const ZERO_WIDTH: [char; 3] = ['\u{200B}', '\u{200C}', '\u{200D}'];
const QUOTES: &[char] = &['"', '\''];

/// Canonicalize a raw extracted string into a configuration key.
///
/// Strips a leading BOM and zero-width characters, turns non-breaking spaces into plain
/// spaces, trims, removes surrounding quotes, collapses runs of dots and drops whitespace
/// around dots. The pass is repeated until it no longer changes the input, so the result is
/// always a fixed point: `sanitize_key(&sanitize_key(x)) == sanitize_key(x)`.
pub fn sanitize_key(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let next = sanitize_pass(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn sanitize_pass(input: &str) -> String {
    let without_bom = input.strip_prefix(BOM).unwrap_or(input);
    let cleaned: String = without_bom
        .chars()
        .filter(|c| !ZERO_WIDTH.contains(c))
        .map(|c| if c == NBSP { ' ' } else { c })
        .collect();

    let mut s = cleaned.trim();
    if let Some(rest) = s.strip_prefix(QUOTES) {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix(QUOTES) {
        s = rest;
    }

    let collapsed = MULTI_DOT.replace_all(s, ".");
    SPACED_DOT.replace_all(&collapsed, ".").into_owned()
}

/// Produce the case spellings an identifier may take across code and configuration.
///
/// Returns `[kebab, original, snake]`, e.g. `myFlag` gives `["my-flag", "myFlag", "my_flag"]`.
pub fn normalize_key(name: &str) -> [String; 3] {
    let kebab = CAMEL_BOUNDARY.replace_all(name, "$1-$2").to_lowercase();
    let snake = kebab.replace('-', "_");
    [kebab, name.to_string(), snake]
}

/// Candidate spellings of a dotted key for relaxed lookups.
///
/// Each dot segment is rewritten with [`normalize_key`]; the original key always comes first
/// and duplicates are dropped.
pub fn key_variants(key: &str) -> Vec<String> {
    let segments: Vec<[String; 3]> = key.split('.').map(normalize_key).collect();
    let mut variants = vec![key.to_string()];
    for form in [0usize, 2] {
        let candidate =
            segments.iter().map(|forms| forms[form].as_str()).collect::<Vec<_>>().join(".");
        if !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}
