//! Code article extraction and table-of-contents title parsing.

use std::sync::LazyLock;

use regex::Regex;

use super::text::clean_body;
use crate::config::validate_date_stamp;
use crate::error::{HarvesterError, Result};
use crate::types::{ArticleNode, CodeRecord};

/// `<number>[.:)] <name>` where number is Roman or dotted/hyphenated decimal.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static NUMBERED_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([IVXLCDM]+|\d+(?:[.\-]\d+)*)[.:)]\s*(.*)$").expect("valid regex")
});

/// A DD.MM.YYYY date anywhere in running text.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
pub(crate) static DATE_IN_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{2}\.\d{2}\.\d{4})\b").expect("valid regex"));

/// Text read from a rendered article page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticlePage {
    /// Rendered text of the article block.
    pub text: String,

    /// Rendered text of the centre column, which carries the revision stamp.
    pub center_text: String,
}

/// Split a heading like "Глава 2. Лица" into its number and name.
///
/// The keyword is matched case-insensitively. Headings without the
/// `<number>.` form fall back to "first word is the number". A title that
/// does not start with the keyword has no number.
///
/// # Examples
/// ```
/// use legalacts_harvester::extract::parse_title_number_and_name;
///
/// assert_eq!(
///     parse_title_number_and_name("Раздел I. ОБЩИЕ ПОЛОЖЕНИЯ", "Раздел"),
///     ("I".to_string(), "ОБЩИЕ ПОЛОЖЕНИЯ".to_string())
/// );
/// assert_eq!(
///     parse_title_number_and_name("Статья 12.1-1. Порядок", "Статья"),
///     ("12.1-1".to_string(), "Порядок".to_string())
/// );
/// ```
#[must_use]
pub fn parse_title_number_and_name(title: &str, keyword: &str) -> (String, String) {
    let title = title.trim();
    let Some(rest) = strip_prefix_ignore_case(title, keyword) else {
        return (String::new(), title.to_string());
    };
    let rest = rest.trim();

    if let Some(caps) = NUMBERED_TITLE.captures(rest) {
        let number = caps.get(1).map_or("", |m| m.as_str()).trim();
        let name = caps.get(2).map_or("", |m| m.as_str()).trim();
        return (number.to_string(), name.to_string());
    }

    let mut parts = rest.splitn(2, char::is_whitespace);
    let number = parts.next().unwrap_or_default().trim();
    let name = parts.next().unwrap_or_default().trim();
    (number.to_string(), name.to_string())
}

/// Whether `text` starts with `keyword`, ignoring case.
#[must_use]
pub fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    strip_prefix_ignore_case(text.trim_start(), keyword).is_some()
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let len = prefix.chars().count();
    if text.chars().count() < len {
        return None;
    }
    let split = text.char_indices().nth(len).map_or(text.len(), |(i, _)| i);
    let (head, rest) = text.split_at(split);
    (head.to_lowercase() == prefix.to_lowercase()).then_some(rest)
}

/// The last valid DD.MM.YYYY date in `text`, or an empty string.
///
/// Article pages show the revision stamp after any dates quoted in the
/// text, so the last one wins.
#[must_use]
pub fn find_last_date(text: &str) -> String {
    DATE_IN_TEXT
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|stamp| validate_date_stamp(stamp).is_ok())
        .last()
        .unwrap_or_default()
        .to_string()
}

/// Build the record for one article.
///
/// Outline context, number and name come from the table of contents; the
/// body and revision date come from the article page. An article whose body
/// is empty after cleaning is an extraction failure.
pub fn extract_article(page: &ArticlePage, node: &ArticleNode) -> Result<CodeRecord> {
    let body = clean_body(&page.text);
    if body.is_empty() {
        return Err(HarvesterError::EmptyBody {
            url: node.url.clone(),
        });
    }

    Ok(CodeRecord {
        section_number: node.context.section_number.clone(),
        section_name: node.context.section_name.clone(),
        chapter_number: node.context.chapter_number.clone(),
        chapter_name: node.context.chapter_name.clone(),
        article_number: node.article_number.clone(),
        article_name: node.article_name.clone(),
        updated_at: find_last_date(&page.center_text),
        body,
    })
}
