//! Annotate command implementation

use anyhow::{Context, Result};
use clap::Args;
use config_key_finder::config::{FileSettingsStore, ScanTimings};
use config_key_finder::document::html::to_html;
use config_key_finder::fetch::{HttpFetcher, PageLocation};
use config_key_finder::render::write_report;
use config_key_finder::scan::{ScanOutcome, Scanner};
use std::path::PathBuf;
use std::time::Duration;

use super::utils::{read_page, write_output};

#[derive(Args)]
pub struct AnnotateArgs {
    /// Saved review page
    #[arg(long, value_name = "FILE")]
    pub html: PathBuf,

    /// URL the page was saved from (origin, project and repository are read from it)
    #[arg(long, value_name = "URL")]
    pub page_url: String,

    /// Settings file (TOML or YAML); CKF_* environment variables override it
    #[arg(short = 's', long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Session cookie sent with raw file requests
    #[arg(long, value_name = "COOKIE", env = "CKF_COOKIE", hide_env_values = true)]
    pub cookie: Option<String>,

    /// Bearer token sent with raw file requests
    #[arg(long, value_name = "TOKEN", env = "CKF_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Where to write the annotated page (stdout if omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write a JSON scan report here
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Per-request timeout for raw file fetches
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    pub timeout_secs: u64,
}

pub fn run(args: AnnotateArgs) -> Result<()> {
    let location = PageLocation::parse(&args.page_url)
        .with_context(|| format!("Not an absolute URL: {}", args.page_url))?;
    let mut doc = read_page(&args.html)?;

    let fetcher = HttpFetcher::new(Duration::from_secs(args.timeout_secs))
        .with_cookie(args.cookie)
        .with_token(args.token);
    let store = FileSettingsStore::new(args.settings);
    // A saved page is complete; nothing to wait for.
    let mut scanner = Scanner::new(location, store, fetcher, ScanTimings::immediate());

    let outcome = scanner.bootstrap(&mut doc);
    write_output(args.output.as_deref(), &to_html(&doc))?;

    match outcome {
        ScanOutcome::Completed(report) => {
            if let Some(path) = &args.report {
                write_report(path, &report)
                    .with_context(|| format!("Failed writing report: {}", path.display()))?;
            }
            eprintln!(
                "Annotated {} of {} references ({} config files, {} source keys, {} target keys)",
                report.annotations.len(),
                report.references.len(),
                report.candidate_files.len(),
                report.before_keys,
                report.after_keys
            );
            Ok(())
        }
        ScanOutcome::Disabled => {
            eprintln!("Annotator disabled in settings; page left unchanged");
            Ok(())
        }
        ScanOutcome::Failed(message) => anyhow::bail!("Scan failed: {message}"),
        other => {
            eprintln!("No scan performed: {other:?}");
            Ok(())
        }
    }
}
