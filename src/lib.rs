//! Spring configuration-key detection and resolution for code-review diff pages.
//!
//! The pipeline runs over a [`document::Document`]: [`detect`] builds a symbol table and finds
//! key references on the rendered diff lines, [`fetch`] locates and downloads both branch
//! versions of the changed `application*` files, [`parse`] flattens them, and [`render`] writes
//! inline markers with tooltips. [`scan`] ties the steps together behind a reentrancy-guarded
//! state machine.

pub mod config;
pub mod detect;
pub mod document;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod parse;
pub mod redact;
pub mod render;
pub mod scan;
pub mod utils;

pub use error::{Error, Result};
