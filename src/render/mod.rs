//! Output rendering (inline markers, tooltips, reports)

pub mod annotator;
pub mod report;
pub mod tooltip;

pub use annotator::{annotate, Annotation, Placement};
pub use report::{write_report, ScanReport};
pub use tooltip::Tooltip;
