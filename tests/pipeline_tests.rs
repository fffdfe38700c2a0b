//! End-to-end scans over saved review pages with canned configuration files

use config_key_finder::config::{DefaultSettings, ScanTimings, Settings, SettingsStore};
use config_key_finder::detect::detect_all;
use config_key_finder::document::html::parse_html;
use config_key_finder::document::{Document, MemoryDocument, SelectorList};
use config_key_finder::domain::{LineClassification, ReferenceKind};
use config_key_finder::fetch::{PageLocation, StaticFetcher};
use config_key_finder::redact::MASK;
use config_key_finder::render::ScanReport;
use config_key_finder::scan::{ScanOutcome, Scanner, Trigger};

const PAGE_URL: &str = "https://git.example.com/projects/PRJ/repos/svc/pull-requests/7/diff";
const BEFORE_YML: &str = "https://git.example.com/projects/PRJ/repos/svc/raw/src/main/resources/application.yml?at=refs%2Fheads%2Ffeature%2Fx";
const AFTER_YML: &str = "https://git.example.com/projects/PRJ/repos/svc/raw/src/main/resources/application.yml?at=refs%2Fheads%2Fmain";
const DEFAULT_YML: &str =
    "https://git.example.com/projects/PRJ/repos/svc/raw/src/main/resources/application.yml";

fn review_page(lines: &[(&str, &str)]) -> MemoryDocument {
    let rows: String = lines
        .iter()
        .map(|(kind, code)| {
            format!(r#"<tr data-line-type="{kind}"><td class="diff-line">{code}</td></tr>"#)
        })
        .collect();
    parse_html(&format!(
        r##"<div class="pull-request-metadata"><div class="branch-from-to">
<span class="ref-lozenge"><span class="ref-lozenge-content"><span>feature/x</span></span></span>
<span class="ref-lozenge"><span class="ref-lozenge-content"><span>main</span></span></span>
</div></div>
<ol class="files"><li class="file"><a href="#src%2Fmain%2Fresources%2Fapplication.yml" aria-label="application.yml">application.yml</a></li></ol>
<table class="diff">{rows}</table>"##
    ))
    .expect("page parses")
}

fn scanner<S: SettingsStore>(settings: S, fetcher: StaticFetcher) -> Scanner<S, StaticFetcher> {
    let location = PageLocation::parse(PAGE_URL).expect("page url");
    Scanner::new(location, settings, fetcher, ScanTimings::immediate())
}

fn completed(outcome: ScanOutcome) -> Box<ScanReport> {
    match outcome {
        ScanOutcome::Completed(report) => report,
        other => panic!("expected a completed scan, got {other:?}"),
    }
}

struct FixedSettings(Settings);

impl SettingsStore for FixedSettings {
    fn get(&self, _defaults: &Settings) -> config_key_finder::Result<Settings> {
        Ok(self.0.clone())
    }
}

#[test]
fn value_annotation_with_default_yields_plain_key() {
    let doc = review_page(&[("ADDED", r#"+ @Value("${my.flag:true}") boolean flag;"#)]);
    let detection = detect_all(&doc);
    let keys: Vec<&str> = detection.references.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["my.flag"]);
    assert_eq!(detection.references[0].kind, ReferenceKind::Value);
    assert_eq!(detection.references[0].classification, LineClassification::Added);
}

#[test]
fn constant_indirection_resolves_through_symbol_table() {
    let doc = review_page(&[
        ("ADDED", r#"+ private static final String K = "x.y.z";"#),
        ("CONTEXT", r#"  @Value("${" + K + "}") private String value;"#),
    ]);
    let detection = detect_all(&doc);
    assert_eq!(detection.symbols.get("K"), Some("x.y.z"));

    let value = detection
        .references
        .iter()
        .find(|r| r.kind == ReferenceKind::Value)
        .expect("value reference");
    assert_eq!(value.key, "x.y.z");
    assert_eq!(value.source_token.as_deref(), Some("K"));

    let constant = detection
        .references
        .iter()
        .find(|r| r.kind == ReferenceKind::ConstLiteral)
        .expect("constant reference");
    assert_eq!(constant.key, "x.y.z");
}

#[test]
fn prefix_tooltip_lists_both_sides() {
    let mut doc = review_page(&[(
        "ADDED",
        r#"+ @ConfigurationProperties(prefix = "app.feature")"#,
    )]);
    let fetcher = StaticFetcher::new()
        .with(BEFORE_YML, "app:\n  feature:\n    enabled: true\n")
        .with(AFTER_YML, "app:\n  feature:\n    enabled: false\n");
    let mut scanner = scanner(DefaultSettings, fetcher);

    let report = completed(scanner.bootstrap(&mut doc));
    assert_eq!(scanner.fetcher().requests(), vec![BEFORE_YML.to_string(), AFTER_YML.to_string()]);
    assert_eq!(report.annotations.len(), 1);

    let tooltip = &report.annotations[0].tooltip;
    assert_eq!(tooltip.rows.len(), 1);
    assert_eq!(tooltip.rows[0].key, "app.feature.enabled");
    assert_eq!(tooltip.rows[0].primary, "true");
    assert_eq!(tooltip.rows[0].other.as_deref(), Some("false"));
    similar_asserts::assert_eq!(
        tooltip.to_text(),
        "@ConfigurationProperties prefix: app.feature\napp.feature.enabled: true (target branch: false)"
    );

    let marker = report.annotations[0].marker;
    assert_eq!(doc.text_content(marker), "app.feature");
    assert_eq!(doc.attribute(marker, "data-key"), Some("app.feature"));
}

#[test]
fn unchanged_signature_detects_once() {
    let mut doc = review_page(&[("ADDED", r#"+ @Value("${my.flag}") boolean flag;"#)]);
    let mut scanner = scanner(DefaultSettings, StaticFetcher::new());

    completed(scanner.bootstrap(&mut doc));
    let second = scanner.trigger(&mut doc, Trigger::History);
    assert!(matches!(second, ScanOutcome::Unchanged));
    assert_eq!(scanner.state().passes, 1);

    let markers = SelectorList::parse(".ckf-highlight").unwrap();
    assert_eq!(doc.query_selector_all(doc.root(), &markers).len(), 1);
}

#[test]
fn target_branch_falls_back_to_default() {
    let mut doc = review_page(&[("CONTEXT", r#"  @Value("${app.timeout}") int timeout;"#)]);
    let fetcher = StaticFetcher::new()
        .with(BEFORE_YML, "app:\n  timeout: 30\n")
        .with(DEFAULT_YML, "app:\n  timeout: 10\n");
    let mut scanner = scanner(DefaultSettings, fetcher);

    let report = completed(scanner.bootstrap(&mut doc));
    assert_eq!(report.before_keys, 1);
    assert_eq!(report.after_keys, 1);
    assert_eq!(
        scanner.fetcher().requests(),
        vec![BEFORE_YML.to_string(), AFTER_YML.to_string(), DEFAULT_YML.to_string()]
    );
    let marker = report.annotations[0].marker;
    assert_eq!(doc.attribute(marker, "data-ckf-value"), Some("30"));
    assert_eq!(doc.attribute(marker, "data-ckf-other"), Some("10"));
}

#[test]
fn secrets_are_masked_and_missing_keys_say_not_set() {
    let mut doc = review_page(&[
        ("ADDED", r#"+ @Value("${db.password}") String password;"#),
        ("ADDED", r#"+ @Value("${api.token}") String token;"#),
    ]);
    let fetcher = StaticFetcher::new().with(BEFORE_YML, "db:\n  password: hunter2\n");
    let mut scanner = scanner(DefaultSettings, fetcher);

    let report = completed(scanner.bootstrap(&mut doc));
    let by_key = |key: &str| {
        report
            .annotations
            .iter()
            .find(|a| a.key == key)
            .unwrap_or_else(|| panic!("annotation for {key}"))
    };
    assert_eq!(by_key("db.password").tooltip.rows[0].primary, MASK);
    assert_eq!(by_key("api.token").tooltip.rows[0].primary, "Not set");
    assert!(!config_key_finder::document::html::to_html(&doc).contains("hunter2"));
}

#[test]
fn masking_can_be_turned_off() {
    let mut doc = review_page(&[("ADDED", r#"+ @Value("${db.password}") String password;"#)]);
    let fetcher = StaticFetcher::new().with(BEFORE_YML, "db:\n  password: hunter2\n");
    let settings = FixedSettings(Settings { mask_secrets: false, ..Settings::default() });
    let mut scanner = scanner(settings, fetcher);

    let report = completed(scanner.bootstrap(&mut doc));
    assert_eq!(report.annotations[0].tooltip.rows[0].primary, "hunter2");
}

#[test]
fn removed_lines_are_never_rendered() {
    let mut doc = review_page(&[
        ("REMOVED", r#"- @Value("${old.key}") String old;"#),
        ("ADDED", r#"+ @Value("${new.key}") String new;"#),
    ]);
    let mut scanner = scanner(DefaultSettings, StaticFetcher::new());

    let report = completed(scanner.bootstrap(&mut doc));
    assert_eq!(report.removed_lines_skipped, 1);
    assert!(report.annotations.iter().all(|a| a.classification != LineClassification::Removed));

    let markers = SelectorList::parse(".ckf-highlight").unwrap();
    let keys: Vec<&str> = doc
        .query_selector_all(doc.root(), &markers)
        .into_iter()
        .filter_map(|m| doc.attribute(m, "data-key"))
        .collect();
    assert_eq!(keys, vec!["new.key"]);
}

#[test]
fn disabled_settings_leave_the_page_alone() {
    let mut doc = review_page(&[("ADDED", r#"+ @Value("${my.flag}") boolean flag;"#)]);
    let before = config_key_finder::document::html::to_html(&doc);
    let settings = FixedSettings(Settings { enable_extension: false, ..Settings::default() });
    let mut scanner = scanner(settings, StaticFetcher::new());

    assert!(matches!(scanner.bootstrap(&mut doc), ScanOutcome::Disabled));
    assert_eq!(scanner.state().passes, 0);
    similar_asserts::assert_eq!(config_key_finder::document::html::to_html(&doc), before);
}

#[test]
fn mutation_driven_rescan_picks_up_new_lines() {
    let mut doc = review_page(&[("ADDED", r#"+ @Value("${first.key}") String a;"#)]);
    let mut scanner = scanner(DefaultSettings, StaticFetcher::new());
    completed(scanner.bootstrap(&mut doc));

    let markers = SelectorList::parse(".ckf-highlight").unwrap();
    let table = doc
        .query_selector(doc.root(), &SelectorList::parse("table.diff").unwrap())
        .expect("table");
    let row = doc.element(table, "tr", &[("data-line-type", "ADDED")]);
    let cell = doc.element(row, "td", &[("class", "diff-line")]);
    doc.text_child(cell, r#"+ @Value("${second.key}") String b;"#);

    assert!(scanner.on_mutations(&mut doc));
    let report = completed(scanner.poll(&mut doc).expect("debounced scan"));
    assert_eq!(scanner.state().passes, 2);
    assert_eq!(report.annotations.len(), 1);
    assert_eq!(report.annotations[0].key, "second.key");
    assert_eq!(doc.query_selector_all(doc.root(), &markers).len(), 2);
}
