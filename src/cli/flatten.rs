//! Flatten command implementation

use anyhow::{Context, Result};
use clap::Args;
use config_key_finder::parse::{parse_config, ConfigFormat};
use std::path::PathBuf;

use super::utils::read_text;

#[derive(Args)]
pub struct FlattenArgs {
    /// A .properties, .yml or .yaml file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

pub fn run(args: FlattenArgs) -> Result<()> {
    let name = args.file.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let Some(format) = ConfigFormat::from_file_name(name) else {
        anyhow::bail!("Unsupported config file: {}", args.file.display());
    };

    let text = read_text(&args.file)?;
    let map = parse_config(format, &text, name)
        .with_context(|| format!("Failed parsing {}", args.file.display()))?;

    for (key, value) in &map {
        println!("{key}={value}");
    }
    Ok(())
}
