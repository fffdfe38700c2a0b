//! Fetching both branch versions of the changed configuration files
//!
//! Network access goes through [`FetchText`]; [`http::HttpFetcher`] is the real implementation
//! and [`StaticFetcher`] serves canned bodies for tests and offline runs.

pub mod http;
pub mod locate;

pub use http::HttpFetcher;
pub use locate::{find_config_files, read_review_sides, PageLocation};

use crate::domain::{ConfigFileCandidate, DualConfig, FlatConfigMap, Side};
use crate::parse::parse_config_text;
use std::cell::RefCell;
use std::collections::HashMap;

/// Retrieve a URL as text.
///
/// Any failure (transport error, non-2xx status, empty body) is `None`; callers treat that as
/// "no content for this side".
pub trait FetchText {
    fn fetch_text(&self, url: &str, credentialed: bool) -> Option<String>;
}

impl<F: FetchText + ?Sized> FetchText for &F {
    fn fetch_text(&self, url: &str, credentialed: bool) -> Option<String> {
        (**self).fetch_text(url, credentialed)
    }
}

/// Serves bodies from a map and remembers every URL it was asked for.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    bodies: HashMap<String, String>,
    requests: RefCell<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl FetchText for StaticFetcher {
    fn fetch_text(&self, url: &str, _credentialed: bool) -> Option<String> {
        self.requests.borrow_mut().push(url.to_string());
        self.bodies.get(url).filter(|b| !b.is_empty()).cloned()
    }
}

fn fetch<F: FetchText + ?Sized>(fetcher: &F, url: Option<&str>) -> Option<String> {
    fetcher.fetch_text(url?, true)
}

/// Fetch and merge every candidate file on both sides.
///
/// Files are processed in order, source branch first and then the destination. The repository
/// default is fetched only when the destination yields no content; a destination body that
/// does not parse is not replaced. Within one side, later files overwrite keys from earlier ones.
pub fn resolve_dual<F: FetchText + ?Sized>(files: &[ConfigFileCandidate], fetcher: &F) -> DualConfig {
    let mut dual = DualConfig::default();

    for file in files {
        let before = fetch(fetcher, file.before_url.as_deref())
            .and_then(|text| parse_config_text(file.file_name(), &text));
        if let Some(map) = before {
            tracing::debug!("{}: {} keys on the source branch", file.file_path, map.len());
            dual.side_mut(Side::Before).extend(map);
        }

        let after = fetch(fetcher, file.after_url.as_deref())
            .or_else(|| fetch(fetcher, file.fallback_url.as_deref()))
            .and_then(|text| parse_config_text(file.file_name(), &text));
        if let Some(map) = after {
            tracing::debug!("{}: {} keys on the target branch", file.file_path, map.len());
            dual.side_mut(Side::After).extend(map);
        }
    }

    tracing::info!(
        "Resolved {} source-branch keys and {} target-branch keys",
        dual.before.len(),
        dual.after.len()
    );
    dual.normalized()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConfigValue;

    fn candidate(name: &str) -> ConfigFileCandidate {
        ConfigFileCandidate {
            display_name: name.to_string(),
            file_path: format!("src/{name}"),
            before_url: Some(format!("before/{name}")),
            after_url: Some(format!("after/{name}")),
            fallback_url: Some(format!("default/{name}")),
        }
    }

    fn text(map: &FlatConfigMap, key: &str) -> Option<String> {
        map.get(key).map(ConfigValue::to_string)
    }

    #[test]
    fn fills_both_sides_in_order() {
        let fetcher = StaticFetcher::new()
            .with("before/application.properties", "a.b=1\nshared=first")
            .with("after/application.properties", "a.b=2")
            .with("before/application-dev.properties", "shared=second");
        let files = [candidate("application.properties"), candidate("application-dev.properties")];

        let dual = resolve_dual(&files, &fetcher);
        assert_eq!(text(&dual.before, "a.b").as_deref(), Some("1"));
        assert_eq!(text(&dual.before, "shared").as_deref(), Some("second"));
        assert_eq!(text(&dual.after, "a.b").as_deref(), Some("2"));

        assert_eq!(
            fetcher.requests(),
            vec![
                "before/application.properties",
                "after/application.properties",
                "before/application-dev.properties",
                "after/application-dev.properties",
                "default/application-dev.properties",
            ]
        );
    }

    #[test]
    fn falls_back_to_default_branch() {
        let fetcher = StaticFetcher::new().with("default/application.properties", "x=fallback");
        let dual = resolve_dual(&[candidate("application.properties")], &fetcher);
        assert!(dual.before.is_empty());
        assert_eq!(text(&dual.after, "x").as_deref(), Some("fallback"));
    }

    #[test]
    fn failures_degrade_to_empty() {
        let fetcher = StaticFetcher::new().with("before/application.properties", "");
        let dual = resolve_dual(&[candidate("application.properties")], &fetcher);
        assert!(dual.is_empty());
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn unparsable_target_does_not_fall_back() {
        let fetcher = StaticFetcher::new()
            .with("after/application.yml", "app: [1, 2\n")
            .with("default/application.yml", "app:\n  x: 1\n");
        let dual = resolve_dual(&[candidate("application.yml")], &fetcher);
        assert!(dual.after.is_empty());
        assert_eq!(fetcher.requests(), vec!["before/application.yml", "after/application.yml"]);
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn yaml_files_are_flattened() {
        let fetcher = StaticFetcher::new().with("before/application.yml", "app:\n  feature:\n    enabled: true\n");
        let dual = resolve_dual(&[candidate("application.yml")], &fetcher);
        assert_eq!(dual.before.get("app.feature.enabled"), Some(&ConfigValue::Bool(true)));
    }
}
