//! Finding changed configuration files and their raw URLs on a review page

use crate::document::{Document, NodeId, SelectorList};
use crate::domain::ConfigFileCandidate;
use globset::{GlobBuilder, GlobMatcher};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

fn selector(text: &str) -> SelectorList {
    SelectorList::parse(text).expect("valid selector")
}

static HEADER_IN_METADATA: Lazy<SelectorList> =
    Lazy::new(|| selector(".pull-request-metadata .branch-from-to"));
static HEADER: Lazy<SelectorList> = Lazy::new(|| selector(".branch-from-to"));
static LOZENGES: Lazy<SelectorList> = Lazy::new(|| selector(".ref-lozenge"));
static BRANCH_SPAN: Lazy<SelectorList> = Lazy::new(|| selector(".ref-lozenge-content > span"));
static BRANCH_CONTENT: Lazy<SelectorList> = Lazy::new(|| selector(".ref-lozenge-content"));
/// File-tree links in the review's changed-files list.
pub static FILE_ANCHORS: Lazy<SelectorList> =
    Lazy::new(|| selector("ol.files li.file a, ul.files li.file a"));

static MODIFIED_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+has\s+been\s+modified").expect("valid regex"));

static CONFIG_FILE: Lazy<GlobMatcher> = Lazy::new(|| {
    GlobBuilder::new("application*.{properties,yml,yaml}")
        .case_insensitive(true)
        .literal_separator(true)
        .build()
        .expect("valid glob")
        .compile_matcher()
});

/// Origin and default repository of the review page, taken from its URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLocation {
    pub origin: String,
    pub project_key: Option<String>,
    pub repo_slug: Option<String>,
}

impl PageLocation {
    /// Parse `https://host/projects/{KEY}/repos/{slug}/pull-requests/...`.
    ///
    /// Returns `None` only when `page_url` is not an absolute URL. Missing project or
    /// repository segments are logged and left empty.
    pub fn parse(page_url: &str) -> Option<Self> {
        let url = url::Url::parse(page_url).ok()?;
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();
        let after = |marker: &str| {
            segments
                .iter()
                .position(|s| *s == marker)
                .and_then(|i| segments.get(i + 1))
                .map(|s| s.to_string())
        };

        let location = Self {
            origin: url.origin().ascii_serialization(),
            project_key: after("projects"),
            repo_slug: after("repos"),
        };
        if location.project_key.is_none() || location.repo_slug.is_none() {
            tracing::warn!("Cannot read project/repository from {}", url.path());
        }
        Some(location)
    }
}

/// One side of the review as shown in the branch header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BranchSide {
    pub project_key: Option<String>,
    pub repo_slug: Option<String>,
    pub branch: Option<String>,
}

impl BranchSide {
    /// `refs/heads/{branch}` when the branch is known.
    pub fn git_ref(&self) -> Option<String> {
        self.branch.as_ref().map(|b| format!("refs/heads/{b}"))
    }
}

/// Source (`from`) and destination (`to`) branches of the review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewSides {
    pub from: BranchSide,
    pub to: BranchSide,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn read_side<D: Document + ?Sized>(doc: &D, lozenge: NodeId) -> BranchSide {
    let branch = doc
        .query_selector(lozenge, &BRANCH_SPAN)
        .or_else(|| doc.query_selector(lozenge, &BRANCH_CONTENT))
        .and_then(|node| non_empty(Some(doc.text_content(node).as_str())));
    BranchSide {
        project_key: non_empty(doc.attribute(lozenge, "data-project-key")),
        repo_slug: non_empty(doc.attribute(lozenge, "data-repo-slug")),
        branch,
    }
}

/// Read both branch lozenges from the review header.
///
/// The first lozenge is the source branch, the second the destination.
pub fn read_review_sides<D: Document + ?Sized>(doc: &D) -> Option<ReviewSides> {
    let Some(header) = doc
        .query_selector(doc.root(), &HEADER_IN_METADATA)
        .or_else(|| doc.query_selector(doc.root(), &HEADER))
    else {
        tracing::warn!("Review header (.branch-from-to) not found");
        return None;
    };

    let lozenges = doc.query_selector_all(header, &LOZENGES);
    if lozenges.len() < 2 {
        tracing::warn!("Expected 2 branch lozenges, found {}", lozenges.len());
        return None;
    }

    let sides = ReviewSides {
        from: read_side(doc, lozenges[0]),
        to: read_side(doc, lozenges[1]),
    };
    tracing::debug!("Review sides: {sides:?}");
    Some(sides)
}

/// `{origin}/projects/{project}/repos/{repo}/raw/{path}[?at={ref}]`
pub fn build_raw_url(
    origin: &str,
    project_key: &str,
    repo_slug: &str,
    file_path: &str,
    git_ref: Option<&str>,
) -> String {
    let mut url = format!("{origin}/projects/{project_key}/repos/{repo_slug}/raw/{file_path}");
    if let Some(git_ref) = git_ref {
        url.push_str("?at=");
        url.push_str(&urlencoding::encode(git_ref));
    }
    url
}

/// Whether a bare file name is a Spring `application*` configuration file.
pub fn is_config_file_name(name: &str) -> bool {
    CONFIG_FILE.is_match(name)
}

fn display_name<D: Document + ?Sized>(doc: &D, anchor: NodeId, file_path: &str) -> String {
    let label = doc
        .attribute(anchor, "aria-label")
        .filter(|l| !l.is_empty())
        .or_else(|| doc.attribute(anchor, "title"))
        .unwrap_or_default();
    let label = MODIFIED_SUFFIX.split(label).next().unwrap_or_default().trim();
    if label.is_empty() {
        file_path.rsplit('/').next().unwrap_or(file_path).to_string()
    } else {
        label.to_string()
    }
}

/// Build a candidate for every changed `application*.{properties,yml,yaml}` file.
pub fn find_config_files<D: Document + ?Sized>(
    doc: &D,
    location: &PageLocation,
) -> Vec<ConfigFileCandidate> {
    let sides = read_review_sides(doc).unwrap_or_default();
    let anchors = doc.query_selector_all(doc.root(), &FILE_ANCHORS);
    tracing::debug!("File anchors: {}", anchors.len());

    let page_project = location.project_key.as_deref();
    let page_repo = location.repo_slug.as_deref();
    let url_for = |side: Option<&BranchSide>, file_path: &str| -> Option<String> {
        let project = side.and_then(|s| s.project_key.as_deref()).or(page_project)?;
        let repo = side.and_then(|s| s.repo_slug.as_deref()).or(page_repo)?;
        let git_ref = side.and_then(BranchSide::git_ref);
        Some(build_raw_url(&location.origin, project, repo, file_path, git_ref.as_deref()))
    };

    let mut files = Vec::new();
    for anchor in anchors {
        let Some(encoded) = doc.attribute(anchor, "href").and_then(|h| h.strip_prefix('#')) else {
            continue;
        };
        let file_path = urlencoding::decode(encoded)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| encoded.to_string());
        let file_name = file_path.rsplit('/').next().unwrap_or(&file_path);
        if !is_config_file_name(file_name) {
            continue;
        }

        let candidate = ConfigFileCandidate {
            display_name: display_name(doc, anchor, &file_path),
            before_url: url_for(Some(&sides.from), &file_path),
            after_url: url_for(Some(&sides.to), &file_path),
            fallback_url: url_for(None, &file_path),
            file_path,
        };
        tracing::info!("Config file: {}", candidate.file_path);
        files.push(candidate);
    }
    files
}
