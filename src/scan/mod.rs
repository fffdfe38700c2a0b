//! Scan orchestration: triggers, guards, and the detection pipeline
//!
//! [`Scanner`] owns the [`ScanState`] and turns triggers (bootstrap, navigation, visibility,
//! debounced mutations) into at most one pass at a time over a [`crate::document::Document`].

pub mod scanner;
pub mod state;

pub use scanner::{is_relevant, page_signature, wait_for_selector, ScanOutcome, Scanner};
pub use state::{Debouncer, Phase, Rejection, ScanState, Trigger};
