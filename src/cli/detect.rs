//! Detect command implementation

use anyhow::Result;
use clap::Args;
use config_key_finder::detect::detect_all;
use serde_json::json;
use std::path::PathBuf;

use super::utils::read_page;

#[derive(Args)]
pub struct DetectArgs {
    /// Saved review page
    #[arg(long, value_name = "FILE")]
    pub html: PathBuf,

    /// Print the symbol table and references as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: DetectArgs) -> Result<()> {
    let doc = read_page(&args.html)?;
    let detection = detect_all(&doc);

    if args.json {
        let out = json!({
            "lines_scanned": detection.lines_scanned,
            "removed_lines_skipped": detection.removed_lines_skipped,
            "symbols": detection.symbols,
            "references": detection.references,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if !detection.symbols.is_empty() {
        println!("Symbols:");
        for (name, value) in detection.symbols.iter() {
            println!("  {name} = {value}");
        }
    }
    println!("References:");
    for reference in &detection.references {
        let via = reference
            .source_token
            .as_deref()
            .map(|token| format!(" (via {token})"))
            .unwrap_or_default();
        println!(
            "  [{}] {}: {}{}",
            reference.classification.as_str(),
            reference.kind.label(),
            reference.key,
            via
        );
    }
    println!(
        "Lines scanned: {} ({} removed skipped)",
        detection.lines_scanned, detection.removed_lines_skipped
    );
    Ok(())
}
