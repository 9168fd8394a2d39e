//! End-to-end crawl tests against an in-memory copy of the site.
//!
//! The fixture renderer serves canned pages by URL, so these tests cover the
//! whole traversal (discovery, enumeration, retries, skips, limits and
//! record files) without touching the network.

mod common;

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use common::{
    article_href, article_page, code_page, codes_index, drifted_code_page, headerless_law_page,
    law_href, law_index, law_index_url, law_page, quick_harvester, url, FixtureRenderer, Toc,
};
use legalacts_harvester::output::{parse_records, ParsedRecord};
use legalacts_harvester::types::{CrawlPhase, RecordKind};
use legalacts_harvester::{CodesOptions, HarvesterError, LawsOptions};

const DATE: &str = "12.05.2024";

fn read_records(path: &Path, kind: RecordKind) -> Vec<ParsedRecord> {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    parse_records(&content, kind)
}

fn codes_options(dir: &TempDir) -> CodesOptions {
    CodesOptions {
        output_dir: dir.path().to_path_buf(),
        allowlist: None,
        max_articles: None,
    }
}

fn laws_options(dir: &TempDir) -> LawsOptions {
    LawsOptions {
        output_file: dir.path().join("federal_laws.txt"),
        start_page: 1,
        max_pages: None,
        max_laws: None,
    }
}

fn article_url(slug: &str, number: &str) -> String {
    url(&article_href(slug, number))
}

/// Code `slug` with `count` plain articles numbered from 1.
fn with_plain_code(mut renderer: FixtureRenderer, slug: &str, count: usize) -> FixtureRenderer {
    let numbers: Vec<String> = (1..=count).map(|n| n.to_string()).collect();
    let entries: Vec<Toc<'_>> = numbers
        .iter()
        .map(|n| Toc::Article(n.as_str(), "Статья кодекса"))
        .collect();
    renderer = renderer.page(url(&format!("/kodeks/{slug}/")), code_page(slug, &entries));
    for n in &numbers {
        let text = format!("Текст статьи {n}.");
        renderer = renderer.page(
            article_url(slug, n),
            article_page(n, &[text.as_str()], DATE),
        );
    }
    renderer
}

// =============================================================================
// Codes
// =============================================================================

#[test]
fn test_codes_crawl_in_document_order() {
    let renderer = FixtureRenderer::new()
        .page(
            url("/kodeksy/"),
            codes_index(&[("GK-RF", "Гражданский кодекс"), ("UK-RF", "Уголовный кодекс")]),
        )
        .page(
            url("/kodeks/GK-RF/"),
            code_page(
                "GK-RF",
                &[
                    Toc::Section("Раздел I. ОБЩИЕ ПОЛОЖЕНИЯ"),
                    Toc::Chapter("Глава 1. ГРАЖДАНСКОЕ ЗАКОНОДАТЕЛЬСТВО"),
                    Toc::Article("1", "Основные начала"),
                    Toc::Chapter("Глава 2. ЛИЦА"),
                    Toc::Article("17", "Правоспособность"),
                ],
            ),
        )
        .page(
            article_url("GK-RF", "1"),
            article_page("1", &["1. Первый пункт.", "2. Второй пункт."], DATE),
        )
        .page(
            article_url("GK-RF", "17"),
            article_page("17", &["Правоспособность признается."], "01.03.2023"),
        );
    let renderer = with_plain_code(renderer, "UK-RF", 1);

    let dir = TempDir::new().unwrap();
    let mut harvester = quick_harvester(renderer);
    let summary = harvester.run_codes(&codes_options(&dir)).unwrap();

    assert_eq!(summary.records_written, 3);
    assert_eq!(summary.targets_visited, 2);
    assert!(summary.skips.is_empty());

    assert_eq!(
        harvester.renderer().opened(),
        &[
            url("/kodeksy/"),
            url("/kodeks/GK-RF/"),
            article_url("GK-RF", "1"),
            article_url("GK-RF", "17"),
            url("/kodeks/UK-RF/"),
            article_url("UK-RF", "1"),
        ]
    );

    let gk = read_records(&dir.path().join("GK-RF.txt"), RecordKind::Code);
    assert_eq!(gk.len(), 2);
    assert_eq!(gk[0].field("section_number"), Some("I"));
    assert_eq!(gk[0].field("section_name"), Some("ОБЩИЕ ПОЛОЖЕНИЯ"));
    assert_eq!(gk[0].field("chapter_number"), Some("1"));
    assert_eq!(gk[0].field("article_number"), Some("1"));
    assert_eq!(gk[0].field("article_name"), Some("Основные начала"));
    assert_eq!(gk[0].field("updated_at"), Some(DATE));
    // Paragraph breaks survive cleaning
    assert_eq!(gk[0].body, "1. Первый пункт.\n\n2. Второй пункт.");
    assert_eq!(gk[1].field("chapter_name"), Some("ЛИЦА"));
    assert_eq!(gk[1].field("section_number"), Some("I"));
    assert_eq!(gk[1].field("updated_at"), Some("01.03.2023"));

    let uk = read_records(&dir.path().join("UK-RF.txt"), RecordKind::Code);
    assert_eq!(uk.len(), 1);
    assert_eq!(uk[0].field("section_number"), Some(""));
}

#[test]
fn test_code_record_field_order() {
    let renderer = with_plain_code(
        FixtureRenderer::new().page(url("/kodeksy/"), codes_index(&[("NK-RF", "Налоговый")])),
        "NK-RF",
        1,
    );
    let dir = TempDir::new().unwrap();
    quick_harvester(renderer)
        .run_codes(&codes_options(&dir))
        .unwrap();

    let records = read_records(&dir.path().join("NK-RF.txt"), RecordKind::Code);
    let names: Vec<&str> = records[0].fields.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, RecordKind::Code.field_names());

    let content = fs::read_to_string(dir.path().join("NK-RF.txt")).unwrap();
    assert!(content.starts_with("[section_number]\n[section_name]\n"));
    assert!(content.ends_with("\n\nТекст статьи 1.\n"));
}

#[test]
fn test_max_articles_stops_before_next_article() {
    let renderer = with_plain_code(
        FixtureRenderer::new().page(url("/kodeksy/"), codes_index(&[("GK-RF", "Гражданский")])),
        "GK-RF",
        10,
    );
    let dir = TempDir::new().unwrap();
    let mut harvester = quick_harvester(renderer);
    let summary = harvester
        .run_codes(&CodesOptions {
            max_articles: Some(3),
            ..codes_options(&dir)
        })
        .unwrap();

    assert_eq!(summary.records_written, 3);
    assert_eq!(harvester.renderer().opened_count(&article_url("GK-RF", "4")), 0);
    assert_eq!(
        read_records(&dir.path().join("GK-RF.txt"), RecordKind::Code).len(),
        3
    );
}

#[test]
fn test_max_articles_applies_per_code() {
    let renderer = FixtureRenderer::new().page(
        url("/kodeksy/"),
        codes_index(&[("GK-RF", "Гражданский"), ("UK-RF", "Уголовный")]),
    );
    let renderer = with_plain_code(with_plain_code(renderer, "GK-RF", 4), "UK-RF", 4);

    let dir = TempDir::new().unwrap();
    let summary = quick_harvester(renderer)
        .run_codes(&CodesOptions {
            max_articles: Some(2),
            ..codes_options(&dir)
        })
        .unwrap();

    assert_eq!(summary.records_written, 4);
    assert_eq!(
        read_records(&dir.path().join("UK-RF.txt"), RecordKind::Code).len(),
        2
    );
}

#[test]
fn test_transient_failure_is_retried() {
    let renderer = with_plain_code(
        FixtureRenderer::new().page(url("/kodeksy/"), codes_index(&[("GK-RF", "Гражданский")])),
        "GK-RF",
        2,
    )
    .fail_first(article_url("GK-RF", "1"), 1);

    let dir = TempDir::new().unwrap();
    let mut harvester = quick_harvester(renderer);
    let summary = harvester.run_codes(&codes_options(&dir)).unwrap();

    assert_eq!(summary.records_written, 2);
    assert!(summary.skips.is_empty());
    assert_eq!(harvester.renderer().opened_count(&article_url("GK-RF", "1")), 2);
}

#[test]
fn test_empty_article_is_reloaded_then_skipped() {
    let renderer = with_plain_code(
        FixtureRenderer::new().page(url("/kodeksy/"), codes_index(&[("GK-RF", "Гражданский")])),
        "GK-RF",
        3,
    )
    // Only in-page navigation, nothing left after cleaning
    .page(article_url("GK-RF", "2"), article_page("2", &[], DATE));

    let dir = TempDir::new().unwrap();
    let mut harvester = quick_harvester(renderer);
    let summary = harvester.run_codes(&codes_options(&dir)).unwrap();

    assert_eq!(summary.records_written, 2);
    assert_eq!(summary.skips.len(), 1);
    assert_eq!(summary.skips[0].target, "code GK-RF");
    assert_eq!(summary.skips[0].position, 1);
    assert_eq!(summary.skips[0].url, article_url("GK-RF", "2"));
    assert_eq!(harvester.renderer().opened_count(&article_url("GK-RF", "2")), 2);

    let numbers: Vec<String> = read_records(&dir.path().join("GK-RF.txt"), RecordKind::Code)
        .iter()
        .filter_map(|r| r.field("article_number").map(str::to_string))
        .collect();
    assert_eq!(numbers, vec!["1", "3"]);
}

#[test]
fn test_missing_article_page_is_skipped() {
    let renderer = FixtureRenderer::new()
        .page(url("/kodeksy/"), codes_index(&[("GK-RF", "Гражданский")]))
        .page(
            url("/kodeks/GK-RF/"),
            code_page(
                "GK-RF",
                &[Toc::Article("1", "Первая"), Toc::Article("2", "Вторая")],
            ),
        )
        .page(article_url("GK-RF", "2"), article_page("2", &["Текст."], DATE));

    let dir = TempDir::new().unwrap();
    let mut harvester = quick_harvester(renderer);
    let summary = harvester.run_codes(&codes_options(&dir)).unwrap();

    // 404 is not retried
    assert_eq!(harvester.renderer().opened_count(&article_url("GK-RF", "1")), 1);
    assert_eq!(summary.records_written, 1);
    assert_eq!(summary.skips.len(), 1);
    assert!(summary.skips[0].reason.contains("404"));
}

#[test]
fn test_allowlist_limits_codes() {
    let renderer = FixtureRenderer::new().page(
        url("/kodeksy/"),
        codes_index(&[
            ("APK-RF", "Арбитражный"),
            ("GK-RF", "Гражданский"),
            ("UK-RF", "Уголовный"),
        ]),
    );
    let renderer = with_plain_code(with_plain_code(renderer, "APK-RF", 1), "UK-RF", 1);

    let dir = TempDir::new().unwrap();
    let mut harvester = quick_harvester(renderer);
    let summary = harvester
        .run_codes(&CodesOptions {
            allowlist: Some(vec!["UK-RF".to_string(), "APK-RF".to_string()]),
            ..codes_options(&dir)
        })
        .unwrap();

    assert_eq!(summary.targets_visited, 2);
    assert_eq!(harvester.renderer().opened_count(&url("/kodeks/GK-RF/")), 0);
    assert!(dir.path().join("APK-RF.txt").exists());
    assert!(dir.path().join("UK-RF.txt").exists());
    assert!(!dir.path().join("GK-RF.txt").exists());

    // Listing order wins over allow-list order
    let opened = harvester.renderer().opened();
    let apk = opened.iter().position(|u| *u == url("/kodeks/APK-RF/"));
    let uk = opened.iter().position(|u| *u == url("/kodeks/UK-RF/"));
    assert!(apk < uk);
}

#[test]
fn test_unreachable_codes_index_is_fatal() {
    let renderer = FixtureRenderer::new().fail_first(url("/kodeksy/"), 5);

    let dir = TempDir::new().unwrap();
    let mut harvester = quick_harvester(renderer);
    let result = harvester.run_codes(&codes_options(&dir));

    assert!(matches!(
        result,
        Err(HarvesterError::DiscoveryFailed { .. })
    ));
    assert_eq!(harvester.renderer().opened_count(&url("/kodeksy/")), 3);
    assert_eq!(harvester.progress().phase, CrawlPhase::Error);
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[test]
fn test_table_of_contents_drift_skips_code() {
    let renderer = FixtureRenderer::new()
        .page(
            url("/kodeksy/"),
            codes_index(&[("GK-RF", "Гражданский"), ("UK-RF", "Уголовный")]),
        )
        .page(url("/kodeks/GK-RF/"), drifted_code_page());
    let renderer = with_plain_code(renderer, "UK-RF", 2);

    let dir = TempDir::new().unwrap();
    let mut harvester = quick_harvester(renderer);
    let summary = harvester.run_codes(&codes_options(&dir)).unwrap();

    assert_eq!(summary.skips.len(), 1);
    assert_eq!(summary.skips[0].url, url("/kodeks/GK-RF/"));
    assert_eq!(summary.records_written, 2);
    assert!(!dir.path().join("GK-RF.txt").exists());
}

#[test]
fn test_rerun_appends_to_code_file() {
    let dir = TempDir::new().unwrap();
    for _ in 0..2 {
        let renderer = with_plain_code(
            FixtureRenderer::new().page(url("/kodeksy/"), codes_index(&[("GK-RF", "Гражданский")])),
            "GK-RF",
            2,
        );
        quick_harvester(renderer)
            .run_codes(&codes_options(&dir))
            .unwrap();
    }

    assert_eq!(
        read_records(&dir.path().join("GK-RF.txt"), RecordKind::Code).len(),
        4
    );
}

#[test]
fn test_observer_sees_phases() {
    let phases = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&phases);

    let renderer = with_plain_code(
        FixtureRenderer::new().page(url("/kodeksy/"), codes_index(&[("GK-RF", "Гражданский")])),
        "GK-RF",
        1,
    );
    let dir = TempDir::new().unwrap();
    let mut harvester =
        quick_harvester(renderer).on_progress(move |progress| seen.borrow_mut().push(progress.phase));
    harvester.run_codes(&codes_options(&dir)).unwrap();

    let phases = phases.borrow();
    assert_eq!(phases.first(), Some(&CrawlPhase::DiscoveringTargets));
    assert_eq!(phases.last(), Some(&CrawlPhase::Done));
    assert!(phases.contains(&CrawlPhase::EnumeratingChildren));
    assert!(phases.contains(&CrawlPhase::VisitingChild));
    assert_eq!(harvester.progress().written_total, 1);
}

// =============================================================================
// Federal laws
// =============================================================================

/// Law index pages `first..=last`, two laws each, with their law pages.
fn law_site(first: u32, last: u32) -> FixtureRenderer {
    let mut renderer = FixtureRenderer::new();
    for page in first..=last {
        let numbers = [page * 100 + 1, page * 100 + 2];
        renderer = renderer.page(law_index_url(page), law_index(&numbers, last));
        for n in numbers {
            let text = format!("Текст закона {n}.");
            renderer = renderer.page(
                url(&law_href(n)),
                law_page(n, "01.02.2024", &["Статья 1", text.as_str()]),
            );
        }
    }
    renderer
}

#[test]
fn test_laws_crawl_all_pages() {
    let dir = TempDir::new().unwrap();
    let options = laws_options(&dir);
    let mut harvester = quick_harvester(law_site(1, 2));
    let summary = harvester.run_laws(&options).unwrap();

    assert_eq!(summary.records_written, 4);
    assert_eq!(summary.targets_visited, 2);
    assert_eq!(summary.last_page, Some(2));

    let records = read_records(&options.output_file, RecordKind::Law);
    let numbers: Vec<&str> = records
        .iter()
        .filter_map(|r| r.field("law_number"))
        .collect();
    assert_eq!(numbers, vec!["101-ФЗ", "102-ФЗ", "201-ФЗ", "202-ФЗ"]);
    assert_eq!(records[0].field("law_name"), Some("О законе 101"));
    assert_eq!(records[0].field("updated_at"), Some("01.02.2024"));
    // Article headings are content in law bodies
    assert_eq!(records[0].body, "РОССИЙСКАЯ ФЕДЕРАЦИЯ\nСтатья 1\nТекст закона 101.");

    let names: Vec<&str> = records[0].fields.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, RecordKind::Law.field_names());
}

#[test]
fn test_start_page_skips_earlier_pages() {
    let dir = TempDir::new().unwrap();
    let mut harvester = quick_harvester(law_site(5, 6));
    let summary = harvester
        .run_laws(&LawsOptions {
            start_page: 5,
            ..laws_options(&dir)
        })
        .unwrap();

    let opened = harvester.renderer().opened();
    for page in 1..=4 {
        assert!(!opened.contains(&law_index_url(page)), "page {page} opened");
    }
    assert_eq!(opened[0], law_index_url(5));
    assert_eq!(summary.records_written, 4);
    assert_eq!(summary.last_page, Some(6));
}

#[test]
fn test_max_pages_counts_from_start_page() {
    let dir = TempDir::new().unwrap();
    let mut harvester = quick_harvester(law_site(1, 5));
    let summary = harvester
        .run_laws(&LawsOptions {
            start_page: 2,
            max_pages: Some(2),
            ..laws_options(&dir)
        })
        .unwrap();

    assert_eq!(summary.targets_visited, 2);
    assert_eq!(summary.last_page, Some(3));
    assert_eq!(summary.resume_page, Some(4));
    assert_eq!(summary.records_written, 4);
    assert_eq!(harvester.renderer().opened_count(&law_index_url(4)), 0);
}

#[test]
fn test_max_laws_is_global() {
    let dir = TempDir::new().unwrap();
    let mut harvester = quick_harvester(law_site(1, 3));
    let summary = harvester
        .run_laws(&LawsOptions {
            max_laws: Some(3),
            ..laws_options(&dir)
        })
        .unwrap();

    assert_eq!(summary.records_written, 3);
    assert_eq!(summary.last_page, Some(2));
    assert_eq!(summary.resume_page, Some(2));
    assert_eq!(harvester.renderer().opened_count(&url(&law_href(202))), 0);
    assert_eq!(harvester.renderer().opened_count(&law_index_url(3)), 0);
}

#[test]
fn test_resume_after_law_limit_loses_nothing() {
    let dir = TempDir::new().unwrap();
    let options = laws_options(&dir);

    // Cut short on page 2, after 201-ФЗ
    let first = quick_harvester(law_site(1, 3))
        .run_laws(&LawsOptions {
            max_laws: Some(3),
            ..options.clone()
        })
        .unwrap();
    assert_eq!(first.last_page, Some(2));
    assert_eq!(first.resume_page, Some(2));

    let resume_page = first.resume_page.unwrap();
    let second = quick_harvester(law_site(1, 3))
        .run_laws(&LawsOptions {
            start_page: resume_page,
            ..options.clone()
        })
        .unwrap();
    assert_eq!(second.resume_page, Some(4));

    let records = read_records(&options.output_file, RecordKind::Law);
    for n in [101, 102, 201, 202, 301, 302] {
        let number = format!("{n}-ФЗ");
        assert!(
            records.iter().any(|r| r.field("law_number") == Some(number.as_str())),
            "{number} missing after resuming at page {resume_page}"
        );
    }
}

#[test]
fn test_limit_on_page_boundary_resumes_at_next_page() {
    let dir = TempDir::new().unwrap();
    let mut harvester = quick_harvester(law_site(1, 3));
    let summary = harvester
        .run_laws(&LawsOptions {
            max_laws: Some(2),
            ..laws_options(&dir)
        })
        .unwrap();

    assert_eq!(summary.records_written, 2);
    assert_eq!(summary.last_page, Some(1));
    assert_eq!(summary.resume_page, Some(2));
    assert_eq!(harvester.renderer().opened_count(&law_index_url(2)), 0);
}

#[test]
fn test_law_without_header_uses_listing() {
    let renderer = FixtureRenderer::new()
        .page(law_index_url(1), law_index(&[7], 1))
        .page(url(&law_href(7)), headerless_law_page(&["Текст без заголовка."]));

    let dir = TempDir::new().unwrap();
    let options = laws_options(&dir);
    quick_harvester(renderer).run_laws(&options).unwrap();

    let records = read_records(&options.output_file, RecordKind::Law);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].field("law_number"), Some("7-ФЗ"));
    assert_eq!(records[0].field("law_name"), Some("О законе 7"));
    assert_eq!(records[0].field("updated_at"), Some(""));
    assert_eq!(records[0].body, "Текст без заголовка.");

    let content = fs::read_to_string(&options.output_file).unwrap();
    assert!(content.contains("[updated_at]\n\n"));
}

#[test]
fn test_unreadable_start_page_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut harvester = quick_harvester(FixtureRenderer::new());
    let result = harvester.run_laws(&LawsOptions {
        start_page: 3,
        ..laws_options(&dir)
    });

    match result {
        Err(HarvesterError::DiscoveryFailed { target, .. }) => {
            assert_eq!(target, "law index page 3");
        }
        other => panic!("expected discovery failure, got {other:?}"),
    }
    assert!(!dir.path().join("federal_laws.txt").exists());
}

#[test]
fn test_unreadable_later_page_stops_crawl() {
    // Page 1 advertises three pages, page 2 is missing
    let renderer = FixtureRenderer::new()
        .page(law_index_url(1), law_index(&[1], 3))
        .page(url(&law_href(1)), law_page(1, "01.02.2024", &["Текст."]));

    let dir = TempDir::new().unwrap();
    let mut harvester = quick_harvester(renderer);
    let summary = harvester.run_laws(&laws_options(&dir)).unwrap();

    assert_eq!(summary.records_written, 1);
    assert_eq!(summary.last_page, Some(1));
    assert_eq!(summary.skips.len(), 1);
    assert_eq!(summary.skips[0].target, "law index page 2");
    // The failed page is where a follow-up run picks up
    assert_eq!(summary.resume_page, Some(2));
    assert_eq!(harvester.renderer().opened_count(&law_index_url(3)), 0);
    assert_eq!(harvester.progress().phase, CrawlPhase::Done);
}

#[test]
fn test_empty_listing_ends_crawl() {
    let renderer = FixtureRenderer::new().page(law_index_url(1), law_index(&[], 4));

    let dir = TempDir::new().unwrap();
    let mut harvester = quick_harvester(renderer);
    let summary = harvester.run_laws(&laws_options(&dir)).unwrap();

    assert_eq!(summary.records_written, 0);
    assert_eq!(summary.last_page, Some(1));
    assert_eq!(harvester.renderer().opened_count(&law_index_url(2)), 0);
}

#[test]
fn test_start_page_zero_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut harvester = quick_harvester(FixtureRenderer::new());
    let result = harvester.run_laws(&LawsOptions {
        start_page: 0,
        ..laws_options(&dir)
    });

    assert!(matches!(result, Err(HarvesterError::InvalidStartPage(0))));
    assert!(harvester.renderer().opened().is_empty());
}
