//! Shared CLI utilities.

use anyhow::{Context, Result};
use config_key_finder::document::html::parse_html;
use config_key_finder::document::MemoryDocument;
use config_key_finder::utils::decode_bytes;
use std::fs;
use std::path::Path;

/// Read a file as text, whatever its encoding.
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Failed reading {}", path.display()))?;
    Ok(decode_bytes(&bytes))
}

/// Load a saved review page.
pub fn read_page(path: &Path) -> Result<MemoryDocument> {
    let html = read_text(path)?;
    parse_html(&html).with_context(|| format!("Failed parsing HTML: {}", path.display()))
}

/// Write `content` to `path`, or stdout when no path is given.
pub fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed creating {}", parent.display()))?;
            }
            fs::write(path, content).with_context(|| format!("Failed writing {}", path.display()))
        }
        None => {
            print!("{content}");
            Ok(())
        }
    }
}
