//! Library error type

use std::path::PathBuf;

/// Errors surfaced by the library.
///
/// Most of the pipeline degrades instead of failing (a missed match or an unreachable file is
/// not an error); these variants cover the places where a caller has to decide what to do.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A CSS selector could not be parsed.
    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    /// The HTML snapshot could not be turned into a document tree.
    #[error("failed to parse HTML: {0}")]
    Html(String),

    /// A YAML configuration file could not be parsed.
    #[cfg(feature = "yaml")]
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The crate was built without the `yaml` feature.
    #[error("YAML support is not compiled in; skipping {0}")]
    YamlUnavailable(String),

    /// Settings could not be extracted from the configured sources.
    #[error("failed to load settings: {0}")]
    Settings(#[from] Box<figment::Error>),

    /// The settings file has an extension we do not know how to read.
    #[error("unsupported settings file extension for {}", path.display())]
    UnsupportedSettingsFormat { path: PathBuf },

    /// Underlying I/O error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Mutation observation could not be installed.
    #[error("mutation observer unavailable: {0}")]
    ObserverUnavailable(String),

    /// A bounded wait expired.
    #[error("timed out after {millis} ms waiting for `{what}`")]
    Timeout { what: String, millis: u128 },

    /// A node mutation required a parent the node does not have.
    #[error("node {0} is detached from the document")]
    Detached(usize),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Settings(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
