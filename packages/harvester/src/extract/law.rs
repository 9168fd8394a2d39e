//! Federal law extraction.

use std::sync::LazyLock;

use regex::Regex;

use super::article::DATE_IN_TEXT;
use super::text::collapse_blank_lines;
use crate::config::validate_date_stamp;
use crate::error::{HarvesterError, Result};
use crate::types::{LawNode, LawRecord};

/// "N 622-ФЗ" or "№ 14.1-ФЗ".
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static PREFIXED_LAW_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:N|№)\s*([0-9]+(?:[.\-][0-9]+)*-ФЗ)").expect("valid regex")
});

/// Bare "622-ФЗ".
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static BARE_LAW_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+(?:[.\-][0-9]+)*-ФЗ)").expect("valid regex"));

/// Quoted law name, tried in order: typographic, guillemets, ASCII.
#[allow(clippy::expect_used)] // Static regexes that are guaranteed to be valid
static QUOTED_NAME: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"“([^”]+)”").expect("valid regex"),
        Regex::new(r"«([^»]+)»").expect("valid regex"),
        Regex::new(r#""([^"]+)""#).expect("valid regex"),
    ]
});

const QUOTE_CHARS: &[char] = &['"', '“', '”', '«', '»'];

/// Text read from a rendered law page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LawPage {
    /// Rendered header text; empty when the page has no header.
    pub header: String,

    /// Rendered text of each body paragraph, in document order.
    pub paragraphs: Vec<String>,
}

/// Metadata parsed from a law header or listing title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LawHeader {
    pub law_number: String,
    pub law_name: String,
    pub updated_at: String,
}

/// Parse law metadata out of header text.
///
/// Every field is optional and comes back empty when it cannot be found.
///
/// # Examples
/// ```
/// use legalacts_harvester::extract::parse_law_header;
///
/// let header = parse_law_header(
///     "Федеральный закон от 29.12.2022 N 622-ФЗ\n\"О внесении изменений в статью 1\"",
/// );
/// assert_eq!(header.law_number, "622-ФЗ");
/// assert_eq!(header.law_name, "О внесении изменений в статью 1");
/// assert_eq!(header.updated_at, "29.12.2022");
/// ```
#[must_use]
pub fn parse_law_header(text: &str) -> LawHeader {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let text = lines.join("\n");

    let updated_at = DATE_IN_TEXT
        .captures_iter(&text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|stamp| validate_date_stamp(stamp).is_ok())
        .unwrap_or_default()
        .to_string();

    let law_number = PREFIXED_LAW_NUMBER
        .captures(&text)
        .or_else(|| BARE_LAW_NUMBER.captures(&text))
        .and_then(|caps| caps.get(1))
        .map_or_else(String::new, |m| m.as_str().to_string());

    let law_name = QUOTED_NAME
        .iter()
        .find_map(|re| re.captures(&text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| {
            lines
                .last()
                .map(|l| l.trim_matches(QUOTE_CHARS).trim().to_string())
                .unwrap_or_default()
        });

    LawHeader {
        law_number,
        law_name,
        updated_at,
    }
}

/// Join non-empty trimmed paragraphs into raw body text.
#[must_use]
pub fn join_paragraphs(paragraphs: &[String]) -> String {
    paragraphs
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the record for one law.
///
/// Header fields win; a field the header does not yield falls back to what
/// the listing link said about the law. Body paragraphs are kept whole,
/// including "Статья N" headings, which are content on law pages.
pub fn extract_law(page: &LawPage, node: &LawNode) -> Result<LawRecord> {
    let body = collapse_blank_lines(&join_paragraphs(&page.paragraphs));
    if body.is_empty() {
        return Err(HarvesterError::EmptyBody {
            url: node.url.clone(),
        });
    }

    let header = parse_law_header(&page.header);
    let law_number = if header.law_number.is_empty() {
        node.law_number.clone()
    } else {
        header.law_number
    };
    let law_name = if header.law_name.is_empty() {
        node.law_name.clone()
    } else {
        header.law_name
    };

    Ok(LawRecord {
        law_number,
        law_name,
        updated_at: header.updated_at,
        body,
    })
}
