//! Constants whose literal value looks like a property key

use super::symbols::CONST_ASSIGN;
use super::{Candidate, Detector, Strategy, SymbolTable};
use crate::domain::ReferenceKind;
use crate::normalize::{collapse_string_concat, sanitize_key};

pub struct ConstantDetector;

const STRATEGIES: &[Strategy] = &[direct, collapsed];

impl Detector for ConstantDetector {
    fn kind(&self) -> ReferenceKind {
        ReferenceKind::ConstLiteral
    }

    fn applies(&self, line: &str) -> bool {
        line.contains('=')
    }

    fn strategies(&self) -> &'static [Strategy] {
        STRATEGIES
    }
}

/// A dotted string with at least one letter: `app.timeout`, not `1.5` or `...`.
pub fn looks_like_property_key(literal: &str) -> bool {
    literal.contains('.') && literal.chars().any(|c| c.is_ascii_alphabetic())
}

fn accept(literal: &str) -> Option<Candidate> {
    let literal = sanitize_key(literal);
    if looks_like_property_key(&literal) {
        Candidate::new(&literal)
    } else {
        None
    }
}

pub fn direct(line: &str, _symbols: &SymbolTable) -> Option<Candidate> {
    CONST_ASSIGN.captures(line).and_then(|caps| accept(&caps[2]))
}

pub fn collapsed(line: &str, _symbols: &SymbolTable) -> Option<Candidate> {
    let collapsed = collapse_string_concat(line);
    CONST_ASSIGN.captures(&collapsed).and_then(|caps| accept(&caps[2]))
}
