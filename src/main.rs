//! config-key-finder: annotate code-review diff pages with resolved Spring configuration values
//!
//! Reads a saved pull-request page, finds `@Value` keys, property-key constants and
//! `@ConfigurationProperties` prefixes in the diff, fetches the changed `application*`
//! configuration files from both branches, and writes the page back with inline markers.

use anyhow::Result;

mod cli;

fn main() -> Result<()> {
    cli::run()
}
