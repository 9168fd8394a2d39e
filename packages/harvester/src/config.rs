//! Configuration constants and validation functions for the harvester.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use url::Url;

use crate::error::{HarvesterError, Result};

/// Base URL of the legal reference site.
pub const BASE_URL: &str = "https://legalacts.ru";

/// Path of the page listing all law codes.
pub const CODES_INDEX_PATH: &str = "/kodeksy/";

/// Path of the paginated federal law index.
pub const LAWS_INDEX_PATH: &str = "/docs/5/";

/// Href prefix of code links on the codes index page.
pub const CODE_HREF_PREFIX: &str = "/kodeks/";

/// Href prefix of law document links on the law index pages.
pub const LAW_HREF_PREFIX: &str = "/doc/";

/// Container holding the list of codes on the codes index page.
pub const CODES_LIST_SELECTOR: &str = "div.main-center-block-linkslist-noleft.ps-0";

/// Centre column present on every content page.
pub const CENTER_BLOCK_SELECTOR: &str = "div.main-center-block.col-12.col-lg-8";

/// Centre column without the layout classes, used for date lookup.
pub const CENTER_TEXT_SELECTOR: &str = "div.main-center-block";

/// Table-of-contents entries inside the centre column of a code page.
pub const TOC_ITEM_SELECTOR: &str = "p.text-start";

/// Article body on an article page.
pub const ARTICLE_TEXT_SELECTOR: &str = "div.main-center-block-article-text";

/// Law links inside the centre column of a law index page.
pub const LAW_ITEM_SELECTOR: &str = "div.pb-4 a[href^='/doc/']";

/// Pagination links on a law index page.
pub const PAGINATION_LINKS_SELECTOR: &str = "li.page-item a.page-link";

/// Header of a law document page.
pub const LAW_HEADER_SELECTOR: &str = "h1.main-center-block-title.pb-4";

/// Paragraphs that make up the body of a law document.
pub const LAW_TEXT_SELECTOR: &str = "p.pCenter, p.pRight, p.pBoth";

/// Page load timeout in seconds.
pub const NAVIGATION_TIMEOUT_SECS: u64 = 45;

/// Selector wait timeout in seconds.
pub const SELECTOR_TIMEOUT_SECS: u64 = 30;

/// Timeout used when probing for optional elements (law header).
pub const OPTIONAL_SELECTOR_TIMEOUT_SECS: u64 = 3;

/// Default lower bound of the human delay in seconds.
pub const DEFAULT_DELAY_MIN_SECS: f64 = 0.3;

/// Default upper bound of the human delay in seconds.
pub const DEFAULT_DELAY_MAX_SECS: f64 = 1.0;

/// Default number of attempts for every network-dependent step.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Backoff before the first retry in milliseconds.
pub const RETRY_BASE_DELAY_MS: u64 = 1_000;

/// Upper bound of a single backoff in milliseconds.
pub const RETRY_MAX_DELAY_MS: u64 = 6_000;

/// Extra attempts given to a node whose body came back empty.
///
/// An empty article usually means the page was read before the text block
/// finished rendering.
pub const RENDER_RACE_RETRIES: u32 = 1;

/// Default output directory for code files.
pub const DEFAULT_CODES_OUTPUT_DIR: &str = "output";

/// Default output file for federal laws.
pub const DEFAULT_LAWS_OUTPUT_FILE: &str = "output/federal_laws.txt";

/// Accept-Language sent with every request.
pub const ACCEPT_LANGUAGE: &str = "ru-RU,ru;q=0.9,en;q=0.5";

/// Desktop browser user agents, one is picked per session.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
];

/// Code slug pattern: letters (latin), digits and hyphens.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static CODE_SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("valid regex"));

/// Date stamp pattern: DD.MM.YYYY.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DATE_STAMP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}\.\d{2}\.\d{4}$").expect("valid regex"));

/// Selector wait timeout as a `Duration`.
#[must_use]
pub fn selector_timeout() -> Duration {
    Duration::from_secs(SELECTOR_TIMEOUT_SECS)
}

/// Validate human delay bounds given in seconds.
///
/// # Examples
/// ```
/// use legalacts_harvester::config::validate_delay_bounds;
///
/// assert!(validate_delay_bounds(0.3, 1.0).is_ok());
/// assert!(validate_delay_bounds(0.0, 0.0).is_ok());
/// assert!(validate_delay_bounds(2.0, 1.0).is_err());
/// ```
pub fn validate_delay_bounds(min: f64, max: f64) -> Result<()> {
    if min.is_finite() && max.is_finite() && min >= 0.0 && min <= max {
        Ok(())
    } else {
        Err(HarvesterError::InvalidDelayBounds { min, max })
    }
}

/// Validate the law index page to start from.
pub fn validate_start_page(page: u32) -> Result<()> {
    if page >= 1 {
        Ok(())
    } else {
        Err(HarvesterError::InvalidStartPage(page))
    }
}

/// Parse a comma-separated code allow-list.
///
/// Blank entries are ignored. An empty or blank input means "all codes" and
/// yields `None`.
///
/// # Examples
/// ```
/// use legalacts_harvester::config::parse_code_allowlist;
///
/// let slugs = parse_code_allowlist("APK-RF, GK-RF,").unwrap().unwrap();
/// assert_eq!(slugs, vec!["APK-RF".to_string(), "GK-RF".to_string()]);
/// assert!(parse_code_allowlist("  ").unwrap().is_none());
/// assert!(parse_code_allowlist("GK RF").is_err());
/// ```
pub fn parse_code_allowlist(raw: &str) -> Result<Option<Vec<String>>> {
    let mut slugs = Vec::new();
    for slug in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !CODE_SLUG_PATTERN.is_match(slug) {
            return Err(HarvesterError::InvalidCodeSlug(slug.to_string()));
        }
        if !slugs.iter().any(|s: &String| s == slug) {
            slugs.push(slug.to_string());
        }
    }

    Ok(if slugs.is_empty() { None } else { Some(slugs) })
}

/// Validate a DD.MM.YYYY date stamp.
///
/// # Examples
/// ```
/// use legalacts_harvester::config::validate_date_stamp;
///
/// assert!(validate_date_stamp("29.12.2022").is_ok());
/// assert!(validate_date_stamp("31.02.2022").is_err());
/// assert!(validate_date_stamp("2022-12-29").is_err());
/// ```
pub fn validate_date_stamp(stamp: &str) -> Result<()> {
    if !DATE_STAMP_PATTERN.is_match(stamp) {
        return Err(HarvesterError::InvalidDate(stamp.to_string()));
    }

    chrono::NaiveDate::parse_from_str(stamp, "%d.%m.%Y")
        .map_err(|_| HarvesterError::InvalidDate(stamp.to_string()))?;

    Ok(())
}

/// Extract the code slug from a code href.
///
/// # Examples
/// ```
/// use legalacts_harvester::config::slug_from_href;
///
/// assert_eq!(slug_from_href("/kodeks/GK-RF/"), "GK-RF");
/// assert_eq!(slug_from_href("/kodeks/APK-RF/razdel-i/"), "APK-RF");
/// assert_eq!(slug_from_href("GK-RF"), "GK-RF");
/// ```
#[must_use]
pub fn slug_from_href(href: &str) -> String {
    let parts: Vec<&str> = href.trim_matches('/').split('/').collect();
    if parts.len() > 1 {
        parts[1].to_string()
    } else {
        parts.last().copied().unwrap_or_default().to_string()
    }
}

/// Addresses of the site being harvested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    base_url: Url,
}

impl SiteConfig {
    /// Create a site configuration for the given base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|source| HarvesterError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        Ok(Self { base_url })
    }

    /// Base URL as given.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of the codes index page.
    #[must_use]
    pub fn codes_index_url(&self) -> String {
        self.join_path(CODES_INDEX_PATH)
    }

    /// URL of law index page `page` (1-based).
    ///
    /// The first page has no query string, matching the site's own links.
    #[must_use]
    pub fn law_index_url(&self, page: u32) -> String {
        let index = self.join_path(LAWS_INDEX_PATH);
        if page <= 1 {
            index
        } else {
            format!("{index}?page={page}")
        }
    }

    /// Resolve a site-relative href to an absolute URL.
    pub fn absolute_url(&self, href: &str) -> Result<String> {
        self.base_url
            .join(href)
            .map(String::from)
            .map_err(|source| HarvesterError::InvalidUrl {
                url: href.to_string(),
                source,
            })
    }

    fn join_path(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }
}

impl Default for SiteConfig {
    #[allow(clippy::expect_used)] // Static URL that is guaranteed to be valid
    fn default() -> Self {
        Self {
            base_url: Url::parse(BASE_URL).expect("valid base URL"),
        }
    }
}
