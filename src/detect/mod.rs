//! Configuration-key detection over rendered diff lines
//!
//! Each detector is an ordered list of [`Strategy`] functions tried with [`first_match`]. A
//! strategy only sees the line text and the scan's [`SymbolTable`], so every fallback can be
//! exercised on its own.

pub mod constant;
pub mod lines;
pub mod prefix;
pub mod symbols;
pub mod value;

pub use lines::{candidate_lines, DiffLine};
pub use symbols::{build_symbol_table, SymbolTable};

use crate::document::{Document, NodeId};
use crate::domain::{DetectedReference, LineClassification, ReferenceKind};
use crate::normalize::sanitize_key;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

static SOURCE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][A-Z0-9_]*)\b").expect("valid regex"));

/// What a strategy extracted from one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub key: String,
    pub source_token: Option<String>,
}

impl Candidate {
    /// A candidate with a sanitized key, or `None` if nothing is left after sanitizing.
    pub fn new(key: &str) -> Option<Self> {
        let key = sanitize_key(key);
        (!key.is_empty()).then_some(Self { key, source_token: None })
    }

    pub fn with_source_token(mut self, token: impl Into<String>) -> Self {
        self.source_token = Some(token.into());
        self
    }
}

/// One extraction attempt over a line.
pub type Strategy = fn(&str, &SymbolTable) -> Option<Candidate>;

/// Try `strategies` in order and return the first hit.
pub fn first_match(strategies: &[Strategy], line: &str, symbols: &SymbolTable) -> Option<Candidate> {
    strategies.iter().find_map(|strategy| strategy(line, symbols))
}

/// A line-local detector.
pub trait Detector {
    fn kind(&self) -> ReferenceKind;

    /// Cheap pre-check before any strategy runs.
    fn applies(&self, line: &str) -> bool;

    fn strategies(&self) -> &'static [Strategy];

    /// Whether hits should carry the constant identifier seen on the line.
    fn tracks_source_token(&self) -> bool {
        false
    }

    fn detect(&self, line: &str, symbols: &SymbolTable) -> Option<Candidate> {
        if !self.applies(line) {
            return None;
        }
        let mut candidate = first_match(self.strategies(), line, symbols)?;
        if self.tracks_source_token() && candidate.source_token.is_none() {
            candidate.source_token = source_token(line, symbols);
        }
        Some(candidate)
    }
}

/// The detectors in the order their results are reported.
pub fn detectors() -> [&'static dyn Detector; 3] {
    [&value::ValueDetector, &constant::ConstantDetector, &prefix::PrefixDetector]
}

/// The most plausible constant identifier a line refers to.
///
/// Single letters count only when they are known constants. One present in the symbol table
/// wins, otherwise the first candidate.
pub fn source_token(line: &str, symbols: &SymbolTable) -> Option<String> {
    let candidates: Vec<&str> = SOURCE_TOKEN
        .captures_iter(line)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .filter(|token| token.len() > 1 || symbols.contains(token))
        .collect();
    candidates
        .iter()
        .find(|token| symbols.contains(token))
        .or_else(|| candidates.first())
        .map(|token| token.to_string())
}

/// Everything one detection pass produced.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub symbols: SymbolTable,
    pub references: Vec<DetectedReference>,
    pub lines_scanned: usize,
    /// Removed lines that were looked at and dropped.
    pub removed_lines_skipped: usize,
}

/// Build the symbol table, run every detector over every line, and deduplicate.
///
/// References on removed lines never make it into the result.
pub fn detect_all<D: Document + ?Sized>(doc: &D) -> Detection {
    let symbols = build_symbol_table(doc);
    let lines = candidate_lines(doc);

    let (removed, live): (Vec<&DiffLine>, Vec<&DiffLine>) = lines
        .iter()
        .filter(|line| !line.text.is_empty())
        .partition(|line| line.classification == LineClassification::Removed);

    let mut references = Vec::new();
    for detector in detectors() {
        for line in &live {
            if let Some(candidate) = detector.detect(&line.text, &symbols) {
                tracing::debug!(
                    "{} ({}): {}",
                    detector.kind().label(),
                    line.classification.as_str(),
                    candidate.key
                );
                references.push(DetectedReference {
                    kind: detector.kind(),
                    key: candidate.key,
                    source_token: candidate.source_token,
                    line_element: line.element,
                    classification: line.classification,
                });
            }
        }
    }

    let references = dedupe(references);
    tracing::info!(
        "Detected {} references on {} lines ({} removed lines skipped)",
        references.len(),
        live.len(),
        removed.len()
    );

    Detection {
        symbols,
        references,
        lines_scanned: lines.len(),
        removed_lines_skipped: removed.len(),
    }
}

/// Keep the first reference for each (line element, sanitized key) pair.
pub fn dedupe(references: Vec<DetectedReference>) -> Vec<DetectedReference> {
    let mut seen: HashMap<NodeId, HashSet<String>> = HashMap::new();
    references
        .into_iter()
        .filter_map(|mut reference| {
            reference.key = sanitize_key(&reference.key);
            seen.entry(reference.line_element)
                .or_default()
                .insert(reference.key.clone())
                .then_some(reference)
        })
        .collect()
}
