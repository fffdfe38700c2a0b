//! `@ConfigurationProperties` prefix detection

use super::{Candidate, Detector, Strategy, SymbolTable};
use crate::domain::ReferenceKind;
use crate::normalize::collapse_string_concat;
use once_cell::sync::Lazy;
use regex::Regex;

static PREFIX_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"@ConfigurationProperties\s*\(\s*(?:(?:prefix|value)\s*=\s*)?["']([^"']*)["']\s*[,)]"#,
    )
    .expect("valid regex")
});
static PREFIX_CONSTANT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"@ConfigurationProperties\s*\(\s*(?:(?:prefix|value)\s*=\s*)?([A-Z][A-Z0-9_]*)\s*[,)]",
    )
    .expect("valid regex")
});
static PREFIX_ARGUMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@ConfigurationProperties\s*\(.*?\b(?:prefix|value)\s*=\s*([^,)]+)")
        .expect("valid regex")
});

pub struct PrefixDetector;

const STRATEGIES: &[Strategy] = &[literal, resolved, constant, stripped];

impl Detector for PrefixDetector {
    fn kind(&self) -> ReferenceKind {
        ReferenceKind::ConfigurationPropertiesPrefix
    }

    fn applies(&self, line: &str) -> bool {
        line.contains("@ConfigurationProperties")
    }

    fn strategies(&self) -> &'static [Strategy] {
        STRATEGIES
    }

    fn tracks_source_token(&self) -> bool {
        true
    }
}

/// `prefix = "app"`, `value = "app"` or `("app")` as written.
pub fn literal(line: &str, _symbols: &SymbolTable) -> Option<Candidate> {
    PREFIX_LITERAL.captures(line).and_then(|caps| Candidate::new(&caps[1]))
}

/// The literal forms after constant substitution and concatenation folding.
pub fn resolved(line: &str, symbols: &SymbolTable) -> Option<Candidate> {
    let collapsed = collapse_string_concat(&symbols.substitute(line));
    PREFIX_LITERAL.captures(&collapsed).and_then(|caps| Candidate::new(&caps[1]))
}

/// `prefix = CONST` where the constant is known.
pub fn constant(line: &str, symbols: &SymbolTable) -> Option<Candidate> {
    let caps = PREFIX_CONSTANT.captures(line)?;
    let name = &caps[1];
    let value = symbols.get(name)?;
    Candidate::new(value).map(|c| c.with_source_token(name))
}

/// Last resort: drop every quote, `+` and space from the `prefix = ...` argument.
pub fn stripped(line: &str, _symbols: &SymbolTable) -> Option<Candidate> {
    let caps = PREFIX_ARGUMENT.captures(line)?;
    let cleaned: String = caps[1]
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '+') && !c.is_whitespace())
        .collect();
    Candidate::new(&cleaned)
}
