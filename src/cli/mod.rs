//! Command-line interface for config-key-finder
//!
//! Provides `annotate`, `detect` and `flatten` subcommands over saved review pages and
//! configuration files.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod annotate;
mod detect;
mod flatten;
mod utils;

/// Annotate code-review diff pages with the values their Spring property keys resolve to
#[derive(Parser)]
#[command(name = "config-key-finder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a saved review page, resolve keys against the changed config files, and annotate it
    Annotate(Box<annotate::AnnotateArgs>),

    /// List the configuration keys found on a saved review page (offline)
    Detect(detect::DetectArgs),

    /// Print a .properties or YAML file as sorted key=value lines
    Flatten(flatten::FlattenArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    match cli.command {
        Commands::Annotate(args) => annotate::run(*args),
        Commands::Detect(args) => detect::run(args),
        Commands::Flatten(args) => flatten::run(args),
    }
}
