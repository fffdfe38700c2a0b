//! Settings file and environment loading

use super::{Settings, SettingsStore};
use crate::error::{Error, Result};
use figment::providers::{Env, Format, Serialized, Toml, Yaml};
use figment::Figment;
use std::path::{Path, PathBuf};

/// Environment variables starting with this override the file, e.g. `CKF_MASKSECRETS=false`.
pub const ENV_PREFIX: &str = "CKF_";

const FIELDS: &[&str] = &["maskSecrets", "missingBehavior", "enableExtension", "highlightMode"];

/// Defaults, then an optional TOML or YAML file, then `CKF_*` variables.
#[derive(Debug, Clone, Default)]
pub struct FileSettingsStore {
    path: Option<PathBuf>,
}

impl FileSettingsStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn figment(&self, defaults: &Settings) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(defaults));

        if let Some(path) = &self.path {
            if path.is_file() {
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("")
                    .to_ascii_lowercase();
                figment = match ext.as_str() {
                    "toml" => figment.merge(Toml::file_exact(path)),
                    "yaml" | "yml" => figment.merge(Yaml::file_exact(path)),
                    _ => return Err(Error::UnsupportedSettingsFormat { path: path.clone() }),
                };
            } else {
                tracing::debug!("Settings file {} not found, using defaults", path.display());
            }
        }

        Ok(figment.merge(settings_env()))
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, defaults: &Settings) -> Result<Settings> {
        Ok(self.figment(defaults)?.extract()?)
    }
}

/// `CKF_MASKSECRETS` and `CKF_MASK_SECRETS` both land on `maskSecrets`.
///
/// `map` turns lowercasing back on, so `lowercase(false)` has to come after it.
fn settings_env() -> Env {
    Env::prefixed(ENV_PREFIX)
        .map(|key| {
            let flat = key.as_str().replace('_', "");
            match FIELDS.iter().find(|field| field.eq_ignore_ascii_case(&flat)) {
                Some(field) => (*field).into(),
                None => key.into(),
            }
        })
        .lowercase(false)
}
