//! Scan report JSON

use super::annotator::Annotation;
use crate::detect::SymbolTable;
use crate::domain::{ConfigFileCandidate, DetectedReference};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

pub const REPORT_SCHEMA_VERSION: &str = "1.0";

/// Everything one completed scan found and wrote.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub schema_version: &'static str,
    pub generated_at: DateTime<Utc>,
    pub reason: String,
    pub signature: String,
    pub lines_scanned: usize,
    pub removed_lines_skipped: usize,
    pub symbols: SymbolTable,
    pub references: Vec<DetectedReference>,
    pub candidate_files: Vec<ConfigFileCandidate>,
    pub before_keys: usize,
    pub after_keys: usize,
    pub annotations: Vec<Annotation>,
}

impl ScanReport {
    pub fn new(reason: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            generated_at: Utc::now(),
            reason: reason.into(),
            signature: signature.into(),
            lines_scanned: 0,
            removed_lines_skipped: 0,
            symbols: SymbolTable::new(),
            references: Vec::new(),
            candidate_files: Vec::new(),
            before_keys: 0,
            after_keys: 0,
            annotations: Vec::new(),
        }
    }
}

pub fn write_report(report_path: &Path, report: &ScanReport) -> Result<()> {
    if let Some(parent) = report_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report).map_err(std::io::Error::from)?;
    std::fs::write(report_path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::NodeId;
    use crate::domain::{LineClassification, ReferenceKind};
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn writes_pretty_json() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("out").join("report.json");

        let mut report = ScanReport::new("bootstrap", "abc");
        report.symbols.insert("K", "x.y.z");
        report.references.push(DetectedReference {
            kind: ReferenceKind::Value,
            key: "x.y.z".into(),
            source_token: Some("K".into()),
            line_element: NodeId(7),
            classification: LineClassification::Added,
        });
        write_report(&path, &report).expect("write");

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).expect("read")).unwrap();
        assert_eq!(value["schema_version"], json!("1.0"));
        assert_eq!(value["reason"], json!("bootstrap"));
        assert_eq!(value["symbols"], json!({"K": "x.y.z"}));
        assert_eq!(
            value["references"][0],
            json!({
                "kind": "value",
                "key": "x.y.z",
                "source_token": "K",
                "line_element": 7,
                "classification": "ADDED",
            })
        );
        assert!(value["generated_at"].as_str().unwrap().contains('T'));
    }
}
