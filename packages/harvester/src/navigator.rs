//! Discovery of targets and enumeration of their nodes.
//!
//! Every page load here runs through the retry executor, and every listing
//! and item page gets humanised once it has rendered. The functions that
//! turn rendered markup into targets and nodes are pure and tested on their
//! own.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use scraper::Html;

use crate::config::{
    selector_timeout, SiteConfig, ARTICLE_TEXT_SELECTOR, CENTER_BLOCK_SELECTOR,
    CENTER_TEXT_SELECTOR, CODES_LIST_SELECTOR, CODE_HREF_PREFIX, LAW_HEADER_SELECTOR,
    LAW_HREF_PREFIX, LAW_ITEM_SELECTOR, LAW_TEXT_SELECTOR, OPTIONAL_SELECTOR_TIMEOUT_SECS,
    PAGINATION_LINKS_SELECTOR, TOC_ITEM_SELECTOR,
};
use crate::error::{HarvesterError, Result};
use crate::extract::{
    parse_law_header, parse_title_number_and_name, starts_with_keyword, ArticlePage, LawPage,
};
use crate::html::{compact_text, parse_selector, select_links, select_texts, Link};
use crate::pacing::Pacer;
use crate::render::{ElementHandle, PageHandle, Renderer};
use crate::retry::{retry_transient, RetryPolicy};
use crate::types::{ArticleNode, CodeTarget, LawNode, OutlineContext};

/// `page=N` in a pagination href.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static PAGE_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]page=(\d+)").expect("valid regex"));

const SECTION_KEYWORD: &str = "Раздел";
const CHAPTER_KEYWORD: &str = "Глава";
const ARTICLE_KEYWORD: &str = "Статья";

/// Laws listed on one index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LawPageListing {
    pub page_number: u32,
    pub laws: Vec<LawNode>,
    /// Pagination links point past this page.
    pub has_next: bool,
}

/// One entry of a code's table of contents, as rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// Entry title (link text when the entry is a link).
    pub text: String,
    /// Link target; empty for plain headings.
    pub href: String,
}

/// What a table-of-contents entry stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TocItem {
    Section { number: String, name: String },
    Chapter { number: String, name: String },
    Article { number: String, name: String, href: String },
    /// Anything else (preambles, appendices, article headings without a link).
    Other,
}

/// Classify a table-of-contents entry by its leading keyword.
#[must_use]
pub fn classify_toc_entry(entry: &TocEntry) -> TocItem {
    let text = entry.text.trim();
    if starts_with_keyword(text, SECTION_KEYWORD) {
        let (number, name) = parse_title_number_and_name(text, SECTION_KEYWORD);
        TocItem::Section { number, name }
    } else if starts_with_keyword(text, CHAPTER_KEYWORD) {
        let (number, name) = parse_title_number_and_name(text, CHAPTER_KEYWORD);
        TocItem::Chapter { number, name }
    } else if starts_with_keyword(text, ARTICLE_KEYWORD) && !entry.href.is_empty() {
        let (number, name) = parse_title_number_and_name(text, ARTICLE_KEYWORD);
        let name = if name.is_empty() {
            text.to_string()
        } else {
            name
        };
        TocItem::Article {
            number,
            name,
            href: entry.href.clone(),
        }
    } else {
        TocItem::Other
    }
}

/// Turn a flat table of contents into article nodes in document order.
///
/// Section and chapter headings update the current [`OutlineContext`],
/// which is copied onto every article that follows.
pub fn articles_from_toc(entries: &[TocEntry], site: &SiteConfig) -> Result<Vec<ArticleNode>> {
    let mut context = OutlineContext::default();
    let mut articles = Vec::new();

    for entry in entries {
        match classify_toc_entry(entry) {
            TocItem::Section { number, name } => context.enter_section(number, name),
            TocItem::Chapter { number, name } => context.enter_chapter(number, name),
            TocItem::Article { number, name, href } => {
                articles.push(ArticleNode {
                    position: articles.len(),
                    context: context.clone(),
                    article_number: number,
                    article_name: name,
                    url: site.absolute_url(&href)?,
                });
            }
            TocItem::Other => {}
        }
    }

    Ok(articles)
}

/// Table-of-contents entries in a rendered centre block.
pub fn toc_entries(document: &Html) -> Result<Vec<TocEntry>> {
    let items = parse_selector(TOC_ITEM_SELECTOR)?;
    let anchor = parse_selector("a")?;

    Ok(document
        .select(&items)
        .map(|item| match item.select(&anchor).next() {
            Some(a) => TocEntry {
                text: compact_text(a),
                href: a.value().attr("href").unwrap_or_default().trim().to_string(),
            },
            None => TocEntry {
                text: compact_text(item),
                href: String::new(),
            },
        })
        .filter(|entry| !entry.text.is_empty() || !entry.href.is_empty())
        .collect())
}

/// Code targets among the links of the codes listing.
pub fn codes_from_links(links: &[Link], site: &SiteConfig) -> Result<Vec<CodeTarget>> {
    links
        .iter()
        .filter(|link| link.href.starts_with(CODE_HREF_PREFIX) && !link.text.is_empty())
        .map(|link| {
            Ok(CodeTarget {
                slug: crate::config::slug_from_href(&link.href),
                name: link.text.clone(),
                url: site.absolute_url(&link.href)?,
            })
        })
        .collect()
}

/// Law nodes among the links of a law index page.
///
/// Number and name are parsed from the link title and used when the law
/// page itself has no header.
pub fn laws_from_links(links: &[Link], page_number: u32, site: &SiteConfig) -> Result<Vec<LawNode>> {
    let mut laws = Vec::new();
    for link in links
        .iter()
        .filter(|link| link.href.starts_with(LAW_HREF_PREFIX) && !link.text.is_empty())
    {
        let listed = parse_law_header(&link.text);
        laws.push(LawNode {
            page_number,
            position: laws.len(),
            url: site.absolute_url(&link.href)?,
            law_number: listed.law_number,
            law_name: listed.law_name,
        });
    }
    Ok(laws)
}

/// Highest page number any pagination link points to (1 when there is none).
#[must_use]
pub fn max_page_number(links: &[Link]) -> u32 {
    links
        .iter()
        .filter_map(|link| PAGE_PARAM.captures(&link.href))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .fold(1, u32::max)
}

/// Loads listing and item pages through a renderer.
///
/// Borrows the run's site addresses, pacer and retry policy; the renderer
/// itself is lent per call by its owner.
#[derive(Debug, Clone, Copy)]
pub struct Navigator<'a> {
    site: &'a SiteConfig,
    pacer: &'a Pacer,
    policy: &'a RetryPolicy,
}

impl<'a> Navigator<'a> {
    #[must_use]
    pub fn new(site: &'a SiteConfig, pacer: &'a Pacer, policy: &'a RetryPolicy) -> Self {
        Self {
            site,
            pacer,
            policy,
        }
    }

    /// Codes listed on the codes index page, in listing order.
    pub fn discover_codes<R: Renderer + ?Sized>(&self, renderer: &mut R) -> Result<Vec<CodeTarget>> {
        let url = self.site.codes_index_url();
        tracing::info!(url = %url, "Discovering codes");

        retry_transient(self.policy, self.pacer, "codes index", || {
            let (_, listing) = self.load(&mut *renderer, &url, CODES_LIST_SELECTOR)?;
            let links = select_links(&listing.fragment(), "a")?;
            let codes = codes_from_links(&links, self.site)?;
            if codes.is_empty() {
                return Err(HarvesterError::NotFound {
                    selector: format!("{CODES_LIST_SELECTOR} a[href^='{CODE_HREF_PREFIX}']"),
                    url: url.clone(),
                });
            }
            Ok(codes)
        })
    }

    /// Laws listed on index page `page_number`, and whether a next page exists.
    pub fn discover_law_page<R: Renderer + ?Sized>(
        &self,
        renderer: &mut R,
        page_number: u32,
    ) -> Result<LawPageListing> {
        let url = self.site.law_index_url(page_number);
        tracing::info!(page = page_number, url = %url, "Discovering laws");

        let what = format!("law index page {page_number}");
        retry_transient(self.policy, self.pacer, &what, || {
            let (page, center) = self.load(&mut *renderer, &url, CENTER_BLOCK_SELECTOR)?;
            let links = select_links(&center.fragment(), LAW_ITEM_SELECTOR)?;
            let laws = laws_from_links(&links, page_number, self.site)?;

            let last_page = match optional_element(&mut *renderer, &page, "body") {
                Some(body) => max_page_number(&select_links(
                    &body.fragment(),
                    PAGINATION_LINKS_SELECTOR,
                )?),
                None => 1,
            };

            Ok(LawPageListing {
                page_number,
                laws,
                has_next: last_page > page_number,
            })
        })
    }

    /// Articles of a code, in table-of-contents order.
    ///
    /// A table of contents without entries is treated like a missing one:
    /// the page layout is not what the crawler expects.
    pub fn list_articles<R: Renderer + ?Sized>(
        &self,
        renderer: &mut R,
        code: &CodeTarget,
    ) -> Result<Vec<ArticleNode>> {
        tracing::info!(code = %code.slug, url = %code.url, "Listing articles");

        let what = format!("table of contents of {}", code.slug);
        retry_transient(self.policy, self.pacer, &what, || {
            let (_, center) = self.load(&mut *renderer, &code.url, CENTER_BLOCK_SELECTOR)?;
            let entries = toc_entries(&center.fragment())?;
            if entries.is_empty() {
                return Err(HarvesterError::NotFound {
                    selector: format!("{CENTER_BLOCK_SELECTOR} {TOC_ITEM_SELECTOR}"),
                    url: code.url.clone(),
                });
            }
            articles_from_toc(&entries, self.site)
        })
    }

    /// Article text and the centre block text that carries its revision date.
    pub fn read_article<R: Renderer + ?Sized>(
        &self,
        renderer: &mut R,
        node: &ArticleNode,
    ) -> Result<ArticlePage> {
        let what = format!("article {}", node.article_number);
        retry_transient(self.policy, self.pacer, &what, || {
            let (page, article) = self.load(&mut *renderer, &node.url, ARTICLE_TEXT_SELECTOR)?;
            let center_text = optional_element(&mut *renderer, &page, CENTER_TEXT_SELECTOR)
                .map(|el| el.text().to_string())
                .unwrap_or_default();
            Ok(ArticlePage {
                text: article.text().to_string(),
                center_text,
            })
        })
    }

    /// Law header and body paragraphs.
    pub fn read_law<R: Renderer + ?Sized>(&self, renderer: &mut R, node: &LawNode) -> Result<LawPage> {
        let what = format!("law {}", node.url);
        retry_transient(self.policy, self.pacer, &what, || {
            let (page, center) = self.load(&mut *renderer, &node.url, CENTER_BLOCK_SELECTOR)?;
            let header = optional_element(&mut *renderer, &page, LAW_HEADER_SELECTOR)
                .map(|el| el.text().trim().to_string())
                .unwrap_or_default();
            Ok(LawPage {
                header,
                paragraphs: select_texts(&center.fragment(), LAW_TEXT_SELECTOR)?,
            })
        })
    }

    /// Open `url`, wait for `selector` and humanise the page.
    fn load<R: Renderer + ?Sized>(
        &self,
        renderer: &mut R,
        url: &str,
        selector: &str,
    ) -> Result<(PageHandle, ElementHandle)> {
        let page = renderer.open(url)?;
        let element = renderer.wait_for(&page, selector, selector_timeout())?;
        self.pacer.humanize(renderer, &page);
        Ok((page, element))
    }
}

/// Probe for an element that may legitimately be absent.
fn optional_element<R: Renderer + ?Sized>(
    renderer: &mut R,
    page: &PageHandle,
    selector: &str,
) -> Option<ElementHandle> {
    match renderer.wait_for(
        page,
        selector,
        Duration::from_secs(OPTIONAL_SELECTOR_TIMEOUT_SECS),
    ) {
        Ok(element) => Some(element),
        Err(e) => {
            tracing::debug!(url = page.url(), selector, error = %e, "Optional element absent");
            None
        }
    }
}
