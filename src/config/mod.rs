//! Settings and scan timings
//!
//! Settings are read through a [`SettingsStore`] so the orchestrator never depends on where
//! they live. [`FileSettingsStore`] layers defaults, a settings file, and `CKF_` environment
//! variables with figment.

pub mod loader;

pub use loader::FileSettingsStore;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to show for a key that neither side defines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingBehavior {
    /// Render the marker with a "Not set" tooltip.
    #[default]
    Show,
}

/// Which text a marker wraps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HighlightMode {
    /// The constant identifier the key was resolved through, when one was seen.
    #[default]
    SourceToken,
    /// Always the resolved key.
    ResolvedKey,
}

/// User-facing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub mask_secrets: bool,
    pub missing_behavior: MissingBehavior,
    pub enable_extension: bool,
    pub highlight_mode: HighlightMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mask_secrets: true,
            missing_behavior: MissingBehavior::Show,
            enable_extension: true,
            highlight_mode: HighlightMode::SourceToken,
        }
    }
}

/// Where settings come from.
pub trait SettingsStore {
    /// Read the stored settings, filling anything absent from `defaults`.
    fn get(&self, defaults: &Settings) -> Result<Settings>;
}

/// A store with nothing in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSettings;

impl SettingsStore for DefaultSettings {
    fn get(&self, defaults: &Settings) -> Result<Settings> {
        Ok(defaults.clone())
    }
}

impl<S: SettingsStore + ?Sized> SettingsStore for &S {
    fn get(&self, defaults: &Settings) -> Result<Settings> {
        (**self).get(defaults)
    }
}

/// Fixed intervals the orchestrator works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTimings {
    /// Minimum time between two scan starts.
    pub cooldown: Duration,
    /// Quiet period before a burst of mutations triggers a scan.
    pub debounce: Duration,
    /// Upper bound on waiting for the file list to render.
    pub file_list_timeout: Duration,
    pub file_list_poll: Duration,
    /// Delay before the single retry of a failed observer install.
    pub observer_retry_delay: Duration,
}

impl Default for ScanTimings {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(2000),
            debounce: Duration::from_millis(800),
            file_list_timeout: Duration::from_millis(8000),
            file_list_poll: Duration::from_millis(100),
            observer_retry_delay: Duration::from_millis(1000),
        }
    }
}

impl ScanTimings {
    /// Every interval zero; scans run back to back and nothing waits.
    pub fn immediate() -> Self {
        Self {
            cooldown: Duration::ZERO,
            debounce: Duration::ZERO,
            file_list_timeout: Duration::ZERO,
            file_list_poll: Duration::ZERO,
            observer_retry_delay: Duration::ZERO,
        }
    }
}
