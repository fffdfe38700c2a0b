//! `@Value("${key}")` detection

use super::{Candidate, Detector, Strategy, SymbolTable};
use crate::domain::ReferenceKind;
use crate::normalize::{collapse_string_concat, normalize_value_concat};
use once_cell::sync::Lazy;
use regex::Regex;

/// `@Value("${key}")` or `@Value('${key:default}')`; group 1 is the key.
///
/// Quotes and `+` are not allowed in the key, so unfolded concatenations do not match.
pub static VALUE_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"@Value\s*\(\s*["']\$\{([^}:"'+]+)(?::[^}]*)?\}\s*["']\s*\)"#).expect("valid regex")
});

pub struct ValueDetector;

const STRATEGIES: &[Strategy] = &[resolved];

impl Detector for ValueDetector {
    fn kind(&self) -> ReferenceKind {
        ReferenceKind::Value
    }

    fn applies(&self, line: &str) -> bool {
        line.contains("@Value")
    }

    fn strategies(&self) -> &'static [Strategy] {
        STRATEGIES
    }

    fn tracks_source_token(&self) -> bool {
        true
    }
}

/// The annotation after constant substitution, concatenation folding and `${" + x + "}`
/// normalization. With an empty symbol table this is the line as written.
pub fn resolved(line: &str, symbols: &SymbolTable) -> Option<Candidate> {
    let substituted = symbols.substitute(line);
    let collapsed = normalize_value_concat(&collapse_string_concat(&substituted));
    VALUE_LITERAL.captures(&collapsed).and_then(|caps| Candidate::new(&caps[1]))
}
