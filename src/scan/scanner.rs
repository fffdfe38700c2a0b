//! Scan orchestration over a live document

use super::state::{Debouncer, Rejection, ScanState, Trigger};
use crate::config::{ScanTimings, Settings, SettingsStore};
use crate::detect::lines::{count_lines, CODE_LINES, OWN_NODES};
use crate::detect::detect_all;
use crate::document::{Document, MutationKind, MutationObserver, MutationRecord, NodeId, SelectorList};
use crate::domain::DualConfig;
use crate::error::{Error, Result};
use crate::fetch::locate::FILE_ANCHORS;
use crate::fetch::{find_config_files, resolve_dual, FetchText, PageLocation};
use crate::render::{annotate, ScanReport};
use crate::utils::sha256_hex;
use once_cell::sync::Lazy;
use std::time::{Duration, Instant};

fn selector(text: &str) -> SelectorList {
    SelectorList::parse(text).expect("valid selector")
}

/// The changed-files list; its presence means the review has rendered.
pub static FILE_LIST: Lazy<SelectorList> = Lazy::new(|| selector("ol.files, ul.files"));

/// Added nodes that mean new diff content arrived.
static RELEVANT_NODES: Lazy<SelectorList> =
    Lazy::new(|| selector("ol.files, ul.files, li.file, .diff-view, .js-diff-progressive"));

/// What happened to one trigger.
#[derive(Debug)]
pub enum ScanOutcome {
    /// Dropped by a guard before anything ran.
    Rejected(Rejection),
    /// Settings turned the annotator off.
    Disabled,
    /// The page signature matched the previous scan.
    Unchanged,
    Completed(Box<ScanReport>),
    /// The pass failed; the next trigger starts over.
    Failed(String),
}

impl ScanOutcome {
    pub fn report(&self) -> Option<&ScanReport> {
        match self {
            ScanOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// Runs scans in response to triggers, one at a time.
pub struct Scanner<S, F> {
    location: PageLocation,
    settings: S,
    fetcher: F,
    timings: ScanTimings,
    state: ScanState,
    debouncer: Debouncer,
}

impl<S: SettingsStore, F: FetchText> Scanner<S, F> {
    pub fn new(location: PageLocation, settings: S, fetcher: F, timings: ScanTimings) -> Self {
        Self {
            location,
            settings,
            fetcher,
            timings,
            state: ScanState::new(),
            debouncer: Debouncer::new(timings.debounce),
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// First scan after the page loads, then start watching for mutations.
    ///
    /// A pass that ran has already installed the observer; a rejected one has not.
    pub fn bootstrap<D>(&mut self, doc: &mut D) -> ScanOutcome
    where
        D: Document + MutationObserver + ?Sized,
    {
        let outcome = self.trigger(doc, Trigger::Bootstrap);
        if matches!(outcome, ScanOutcome::Rejected(_)) {
            self.install_observer(doc);
        }
        outcome
    }

    /// Run one scan if the guards allow it.
    ///
    /// Observation is suspended for the duration of the pass and always resumed afterwards.
    pub fn trigger<D>(&mut self, doc: &mut D, trigger: Trigger) -> ScanOutcome
    where
        D: Document + MutationObserver + ?Sized,
    {
        if let Err(rejection) =
            self.state.try_begin(Instant::now(), self.timings.cooldown, doc.is_visible())
        {
            tracing::debug!("Scan skipped ({:?}); reason: {}", rejection, trigger);
            return ScanOutcome::Rejected(rejection);
        }

        tracing::info!("Scan start; reason: {}", trigger);
        doc.disconnect();

        let outcome = match self.run(doc, trigger) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!("Scan failed: {}", err);
                self.state.forget_signature();
                ScanOutcome::Failed(err.to_string())
            }
        };

        self.install_observer(doc);
        self.state.finish();
        tracing::info!("Scan end; reason: {}", trigger);
        outcome
    }

    /// Drain pending mutation records and schedule a debounced scan if any matter.
    pub fn on_mutations<D>(&mut self, doc: &mut D) -> bool
    where
        D: Document + MutationObserver + ?Sized,
    {
        let records = doc.take_records();
        let relevant = is_relevant(doc, &records);
        if relevant {
            tracing::debug!("{} mutations, scheduling scan", records.len());
            self.debouncer.schedule(Instant::now());
        }
        relevant
    }

    /// Run the debounced mutation scan once its quiet period has passed.
    pub fn poll<D>(&mut self, doc: &mut D) -> Option<ScanOutcome>
    where
        D: Document + MutationObserver + ?Sized,
    {
        self.debouncer
            .fire(Instant::now())
            .then(|| self.trigger(doc, Trigger::Mutation))
    }

    /// Scan when the page is shown again; stop observing while it is hidden.
    pub fn on_visibility_change<D>(&mut self, doc: &mut D, visible: bool) -> Option<ScanOutcome>
    where
        D: Document + MutationObserver + ?Sized,
    {
        if visible {
            Some(self.trigger(doc, Trigger::Visibility))
        } else {
            doc.disconnect();
            None
        }
    }

    fn load_settings(&self) -> Settings {
        let defaults = Settings::default();
        self.settings.get(&defaults).unwrap_or_else(|err| {
            tracing::warn!("Using default settings: {}", err);
            defaults
        })
    }

    fn install_observer<D: MutationObserver + ?Sized>(&self, doc: &mut D) {
        if let Err(err) = doc.observe() {
            tracing::warn!("Failed to install observer, retrying: {}", err);
            std::thread::sleep(self.timings.observer_retry_delay);
            if let Err(err) = doc.observe() {
                tracing::error!("Observer install failed after retry: {}", err);
            }
        }
    }

    fn run<D>(&mut self, doc: &mut D, trigger: Trigger) -> Result<ScanOutcome>
    where
        D: Document + ?Sized,
    {
        let settings = self.load_settings();
        if !settings.enable_extension {
            tracing::info!("Annotator disabled in settings");
            return Ok(ScanOutcome::Disabled);
        }

        match wait_for_selector(
            doc,
            &FILE_LIST,
            self.timings.file_list_timeout,
            self.timings.file_list_poll,
        ) {
            Ok(_) => tracing::debug!("File list present"),
            Err(err) => tracing::warn!("{}; scanning what is present", err),
        }

        let signature = page_signature(doc);
        if !self.state.update_signature(&signature) {
            tracing::debug!("Signature unchanged; skipping scan. reason: {}", trigger);
            return Ok(ScanOutcome::Unchanged);
        }
        self.state.passes += 1;

        let detection = detect_all(doc);
        let files = find_config_files(doc, &self.location);
        tracing::info!("Found {} configuration file candidates", files.len());
        let dual = if files.is_empty() {
            DualConfig::default()
        } else {
            resolve_dual(&files, &self.fetcher)
        };

        let annotations = annotate(doc, &detection.references, &dual, &settings)?;

        let mut report = ScanReport::new(trigger.as_str(), signature);
        report.lines_scanned = detection.lines_scanned;
        report.removed_lines_skipped = detection.removed_lines_skipped;
        report.symbols = detection.symbols;
        report.references = detection.references;
        report.candidate_files = files;
        report.before_keys = dual.before.len();
        report.after_keys = dual.after.len();
        report.annotations = annotations;
        Ok(ScanOutcome::Completed(Box::new(report)))
    }
}

/// SHA-256 of the file link hrefs joined with `|`, a `:`, and the code line count.
pub fn page_signature<D: Document + ?Sized>(doc: &D) -> String {
    let hrefs: Vec<&str> = doc
        .query_selector_all(doc.root(), &FILE_ANCHORS)
        .into_iter()
        .map(|anchor| doc.attribute(anchor, "href").unwrap_or_default())
        .collect();
    sha256_hex(&format!("{}:{}", hrefs.join("|"), count_lines(doc)))
}

/// Poll until `selector` matches, refreshing the document between attempts.
pub fn wait_for_selector<D: Document + ?Sized>(
    doc: &mut D,
    selector: &SelectorList,
    timeout: Duration,
    poll: Duration,
) -> Result<NodeId> {
    let started = Instant::now();
    loop {
        if let Some(node) = doc.query_selector(doc.root(), selector) {
            return Ok(node);
        }
        if started.elapsed() >= timeout {
            return Err(Error::Timeout {
                what: selector.as_str().to_string(),
                millis: timeout.as_millis(),
            });
        }
        std::thread::sleep(poll);
        doc.refresh()?;
    }
}

fn is_own<D: Document + ?Sized>(doc: &D, node: NodeId) -> bool {
    doc.is_element(node) && doc.closest(node, &OWN_NODES).is_some()
}

/// Whether any record shows new diff content or a file selection change.
///
/// Records caused by our own markers never count.
pub fn is_relevant<D: Document + ?Sized>(doc: &D, records: &[MutationRecord]) -> bool {
    records.iter().any(|record| {
        if is_own(doc, record.target) {
            return false;
        }
        match &record.kind {
            MutationKind::ChildList { added } => {
                if added.iter().any(|node| is_own(doc, *node)) {
                    return false;
                }
                added.iter().any(|node| {
                    doc.is_element(*node)
                        && (doc.matches(*node, &RELEVANT_NODES)
                            || doc.query_selector(*node, &RELEVANT_NODES).is_some()
                            || doc.query_selector(*node, &CODE_LINES).is_some())
                })
            }
            MutationKind::Attribute { name } => name == "aria-selected",
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultSettings;
    use crate::document::html::parse_html;
    use crate::document::MemoryDocument;
    use crate::fetch::StaticFetcher;

    const PAGE: &str = r##"<div class="branch-from-to">
<span class="ref-lozenge"><span class="ref-lozenge-content"><span>feature/x</span></span></span>
<span class="ref-lozenge"><span class="ref-lozenge-content"><span>main</span></span></span>
</div>
<ol class="files"><li class="file"><a href="#application.properties" aria-label="src/main/resources/application.properties">application.properties</a></li></ol>
<table>
<tr data-line-type="ADDED"><td class="diff-line">+ @Value("${my.flag:true}") boolean flag;</td></tr>
</table>"##;

    fn scanner(fetcher: StaticFetcher) -> Scanner<DefaultSettings, StaticFetcher> {
        let location = PageLocation::parse(
            "https://git.example.com/projects/PRJ/repos/svc/pull-requests/1/diff",
        )
        .unwrap();
        Scanner::new(location, DefaultSettings, fetcher, ScanTimings::immediate())
    }

    #[test]
    fn unchanged_signature_skips_detection() {
        let mut doc = parse_html(PAGE).unwrap();
        let mut scanner = scanner(StaticFetcher::new());

        assert!(matches!(scanner.bootstrap(&mut doc), ScanOutcome::Completed(_)));
        assert!(matches!(scanner.trigger(&mut doc, Trigger::HashChange), ScanOutcome::Unchanged));
        assert_eq!(scanner.state().passes, 1);
        assert!(doc.is_observing());
    }

    #[test]
    fn cooldown_drops_triggers() {
        let mut doc = parse_html(PAGE).unwrap();
        let location = PageLocation::parse("https://git.example.com/projects/PRJ/repos/svc").unwrap();
        let mut scanner =
            Scanner::new(location, DefaultSettings, StaticFetcher::new(), ScanTimings::default());
        assert!(matches!(scanner.trigger(&mut doc, Trigger::Bootstrap), ScanOutcome::Completed(_)));
        assert!(matches!(
            scanner.trigger(&mut doc, Trigger::History),
            ScanOutcome::Rejected(Rejection::Cooldown)
        ));
    }

    #[test]
    fn hidden_page_is_not_scanned() {
        let mut doc = parse_html(PAGE).unwrap();
        doc.set_visible(false);
        let mut scanner = scanner(StaticFetcher::new());
        assert!(matches!(
            scanner.trigger(&mut doc, Trigger::Bootstrap),
            ScanOutcome::Rejected(Rejection::Hidden)
        ));
        assert_eq!(scanner.state().passes, 0);
    }

    #[test]
    fn observer_install_is_retried_once() {
        let mut doc = parse_html(PAGE).unwrap();
        doc.fail_observe_attempts(1);
        let mut scanner = scanner(StaticFetcher::new());
        scanner.bootstrap(&mut doc);
        assert!(doc.is_observing());

        let mut doc = parse_html(PAGE).unwrap();
        doc.fail_observe_attempts(3);
        let mut scanner = self::scanner(StaticFetcher::new());
        assert!(matches!(scanner.bootstrap(&mut doc), ScanOutcome::Completed(_)));
        assert!(!doc.is_observing());
        // two attempts used, the third failure is still pending
        assert!(doc.observe().is_err());
        assert!(doc.observe().is_ok());
    }

    #[test]
    fn rejected_bootstrap_still_observes() {
        let mut doc = parse_html(PAGE).unwrap();
        doc.set_visible(false);
        let mut scanner = scanner(StaticFetcher::new());
        assert!(matches!(scanner.bootstrap(&mut doc), ScanOutcome::Rejected(Rejection::Hidden)));
        assert!(doc.is_observing());
    }

    #[test]
    fn own_markers_do_not_retrigger() {
        let mut doc = parse_html(PAGE).unwrap();
        let mut scanner = scanner(StaticFetcher::new());
        scanner.bootstrap(&mut doc);
        assert!(!scanner.on_mutations(&mut doc));

        let root = doc.root();
        let marker = doc.create_element("span");
        doc.set_attribute(marker, "data-ckf", "value-highlight");
        doc.append_child(root, marker);
        assert!(!scanner.on_mutations(&mut doc));

        let list = doc.create_element("ul");
        doc.set_attribute(list, "class", "files");
        let item = doc.create_element("li");
        doc.set_attribute(item, "class", "file");
        let link = doc.create_element("a");
        doc.set_attribute(link, "href", "#application-dev.yml");
        doc.append_child(item, link);
        doc.append_child(list, item);
        doc.append_child(root, list);
        assert!(scanner.on_mutations(&mut doc));
        assert!(matches!(scanner.poll(&mut doc), Some(ScanOutcome::Completed(_))));
        assert_eq!(scanner.state().passes, 2);
    }

    #[test]
    fn aria_selected_is_relevant() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let item = doc.element(root, "li", &[]);
        let records = vec![MutationRecord {
            target: item,
            kind: MutationKind::Attribute { name: "aria-selected".into() },
        }];
        assert!(is_relevant(&doc, &records));
        let other = vec![MutationRecord {
            target: item,
            kind: MutationKind::Attribute { name: "class".into() },
        }];
        assert!(!is_relevant(&doc, &other));
    }

    #[test]
    fn wait_times_out_softly() {
        let mut doc = MemoryDocument::new();
        let err = wait_for_selector(&mut doc, &FILE_LIST, Duration::ZERO, Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[test]
    fn signature_tracks_files_and_lines() {
        let doc = parse_html(PAGE).unwrap();
        let same = parse_html(PAGE).unwrap();
        assert_eq!(page_signature(&doc), page_signature(&same));
        let more = parse_html(&PAGE.replace(
            "</table>",
            r#"<tr data-line-type="CONTEXT"><td class="diff-line">x</td></tr></table>"#,
        ))
        .unwrap();
        assert_ne!(page_signature(&doc), page_signature(&more));
    }
}
