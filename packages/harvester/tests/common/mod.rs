//! Shared test support: an in-memory site and a renderer that serves it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use scraper::Html;

use legalacts_harvester::error::{HarvesterError, Result};
use legalacts_harvester::pacing::{Pacer, PacingConfig};
use legalacts_harvester::render::{query_document, ElementHandle, PageHandle, Renderer};
use legalacts_harvester::retry::RetryPolicy;
use legalacts_harvester::Harvester;

pub const BASE: &str = "https://legalacts.ru";

/// Renderer serving fixed pages by absolute URL.
///
/// Unknown URLs answer 404. A URL can be set to time out on its first N
/// loads.
#[derive(Default)]
pub struct FixtureRenderer {
    pages: HashMap<String, String>,
    failures: HashMap<String, u32>,
    opened: Vec<String>,
    generation: u64,
    live: Option<(PageHandle, Html)>,
}

impl FixtureRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    pub fn fail_first(mut self, url: impl Into<String>, times: u32) -> Self {
        self.failures.insert(url.into(), times);
        self
    }

    /// Every URL passed to `open`, in call order.
    pub fn opened(&self) -> &[String] {
        &self.opened
    }

    pub fn opened_count(&self, url: &str) -> usize {
        self.opened.iter().filter(|u| *u == url).count()
    }
}

impl Renderer for FixtureRenderer {
    fn open(&mut self, url: &str) -> Result<PageHandle> {
        self.live = None;
        self.opened.push(url.to_string());

        if let Some(remaining) = self.failures.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(HarvesterError::Navigation {
                    url: url.to_string(),
                    message: "operation timed out".to_string(),
                });
            }
        }

        let html = self.pages.get(url).ok_or_else(|| HarvesterError::HttpStatus {
            url: url.to_string(),
            status: 404,
        })?;

        self.generation += 1;
        let handle = PageHandle::new(url, self.generation);
        self.live = Some((handle.clone(), Html::parse_document(html)));
        Ok(handle)
    }

    fn wait_for(
        &mut self,
        page: &PageHandle,
        selector: &str,
        _timeout: Duration,
    ) -> Result<ElementHandle> {
        let document = match &self.live {
            Some((handle, document)) if handle == page => document,
            _ => {
                return Err(HarvesterError::StalePage {
                    url: page.url().to_string(),
                })
            }
        };
        query_document(document, selector)?.ok_or_else(|| HarvesterError::NotFound {
            selector: selector.to_string(),
            url: page.url().to_string(),
        })
    }

    fn simulate_pointer_movement(&mut self, _page: &PageHandle) -> Result<()> {
        Ok(())
    }

    fn simulate_scroll(&mut self, _page: &PageHandle) -> Result<()> {
        Ok(())
    }
}

/// Harvester without delays and with instant retries.
pub fn quick_harvester<R: Renderer>(renderer: R) -> Harvester<R> {
    Harvester::new(renderer)
        .with_pacer(Pacer::new(PacingConfig::disabled()))
        .with_retry_policy(RetryPolicy::immediate(3))
}

pub fn url(path: &str) -> String {
    format!("{BASE}{path}")
}

pub fn article_href(slug: &str, number: &str) -> String {
    format!("/kodeks/{slug}/statja-{number}/")
}

pub fn law_href(number: u32) -> String {
    format!("/doc/federalnyi-zakon-n-{number}-fz/")
}

pub fn law_index_url(page: u32) -> String {
    if page <= 1 {
        url("/docs/5/")
    } else {
        url(&format!("/docs/5/?page={page}"))
    }
}

fn wrap_center(inner: &str) -> String {
    format!(
        r#"<html><head><title>legalacts</title></head><body>
<div class="main-center-block col-12 col-lg-8">{inner}</div>
</body></html>"#
    )
}

/// Codes index listing `(slug, name)` pairs.
pub fn codes_index(codes: &[(&str, &str)]) -> String {
    let links: String = codes
        .iter()
        .map(|(slug, name)| format!(r#"<a href="/kodeks/{slug}/">{name}</a>"#))
        .collect();
    format!(
        r#"<html><body><div class="main-center-block-linkslist-noleft ps-0">
<a href="/kodeksy/">Все кодексы</a>{links}</div></body></html>"#
    )
}

/// One table-of-contents entry.
pub enum Toc<'a> {
    Section(&'a str),
    Chapter(&'a str),
    Article(&'a str, &'a str),
}

/// Code page with the given table of contents.
pub fn code_page(slug: &str, entries: &[Toc<'_>]) -> String {
    let items: String = entries
        .iter()
        .map(|entry| match entry {
            Toc::Section(title) | Toc::Chapter(title) => {
                format!(r#"<p class="text-start">{title}</p>"#)
            }
            Toc::Article(number, title) => format!(
                r#"<p class="text-start"><a href="{}">Статья {number}. {title}</a></p>"#,
                article_href(slug, number)
            ),
        })
        .collect();
    wrap_center(&format!(r#"<h1>Кодекс {slug}</h1>{items}"#))
}

/// Code page whose table of contents uses markup the crawler does not know.
pub fn drifted_code_page() -> String {
    wrap_center(r#"<ul class="toc"><li><a href="/kodeks/X/statja-1/">Статья 1</a></li></ul>"#)
}

/// Article page with in-page navigation around the text.
pub fn article_page(number: &str, paragraphs: &[&str], date: &str) -> String {
    let body: String = paragraphs.iter().map(|p| format!("<p>{p}</p>")).collect();
    wrap_center(&format!(
        r#"<h1>Статья {number}</h1>
<div class="main-center-block-article-text"><p>&lt;</p><p>Статья {number}</p>{body}<p>&gt;</p></div>
<p>Редакция от {date}</p>"#
    ))
}

/// Law index page listing law numbers, with pagination up to `last_page`.
pub fn law_index(numbers: &[u32], last_page: u32) -> String {
    let items: String = numbers
        .iter()
        .map(|n| {
            format!(
                r#"<div class="pb-4"><a href="{}">Федеральный закон от 01.02.2024 N {n}-ФЗ "О законе {n}"</a></div>"#,
                law_href(*n)
            )
        })
        .collect();
    let pagination: String = (2..=last_page)
        .map(|p| format!(r#"<li class="page-item"><a class="page-link" href="/docs/5/?page={p}">{p}</a></li>"#))
        .collect();
    format!(
        r#"<html><body>
<div class="main-center-block col-12 col-lg-8">{items}</div>
<ul class="pagination">{pagination}</ul>
</body></html>"#
    )
}

/// Law document page.
pub fn law_page(number: u32, updated_at: &str, paragraphs: &[&str]) -> String {
    let body: String = paragraphs
        .iter()
        .map(|p| format!(r#"<p class="pBoth">{p}</p>"#))
        .collect();
    wrap_center(&format!(
        r#"<h1 class="main-center-block-title pb-4">Федеральный закон от {updated_at} N {number}-ФЗ “О законе {number}”</h1>
<p class="pCenter">РОССИЙСКАЯ ФЕДЕРАЦИЯ</p>{body}"#
    ))
}

/// Law document page without a header.
pub fn headerless_law_page(paragraphs: &[&str]) -> String {
    let body: String = paragraphs
        .iter()
        .map(|p| format!(r#"<p class="pBoth">{p}</p>"#))
        .collect();
    wrap_center(&body)
}
