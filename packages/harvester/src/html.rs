//! HTML utility functions for selecting elements and reading their text.

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::error::{HarvesterError, Result};

/// Elements whose boundaries break a line in rendered text.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "pre", "section", "table", "tr", "ul",
];

/// Elements separated from their neighbours by a blank line.
const PARAGRAPH_TAGS: &[&str] = &["p"];

/// Elements whose content never shows up as text.
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Parse a CSS selector.
pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| HarvesterError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Rendered text of an element, with line breaks at block boundaries.
///
/// Approximates what a browser reports as `innerText`: text nodes are kept
/// as they are, block elements and `<br>` start a new line, paragraphs are
/// set off by a blank line, hidden elements are dropped, and line breaks at
/// the very end are removed.
///
/// # Examples
/// ```
/// use scraper::Html;
/// use legalacts_harvester::html::inner_text;
///
/// let doc = Html::parse_fragment("<div><p>Статья 1</p><p>Текст <b>статьи</b></p></div>");
/// let text = inner_text(doc.root_element());
/// assert_eq!(text, "Статья 1\n\nТекст статьи");
/// ```
#[must_use]
pub fn inner_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    collect_text(element, &mut text);
    let end = text.trim_end_matches('\n').len();
    text.truncate(end);
    text
}

/// End `out` with at least `count` line breaks, unless nothing is written yet.
fn break_lines(out: &mut String, count: usize) {
    if out.is_empty() {
        return;
    }
    let present = out.chars().rev().take_while(|c| *c == '\n').count();
    for _ in present..count {
        out.push('\n');
    }
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(el) => {
                let name = el.name();
                if HIDDEN_TAGS.contains(&name) {
                    continue;
                }
                let breaks = if PARAGRAPH_TAGS.contains(&name) {
                    2
                } else if BLOCK_TAGS.contains(&name) {
                    1
                } else {
                    0
                };
                break_lines(out, breaks);
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
                break_lines(out, breaks);
            }
            _ => {}
        }
    }
}

/// Text of an element with whitespace runs collapsed to single spaces.
///
/// Used for link titles and headings, where line structure is noise.
#[must_use]
pub fn compact_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// An anchor found in a document: its href and compacted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    pub text: String,
}

/// All anchors matching `selector` in `document`, in document order.
pub fn select_links(document: &Html, selector: &str) -> Result<Vec<Link>> {
    let selector = parse_selector(selector)?;
    Ok(document
        .select(&selector)
        .map(|a| Link {
            href: a.value().attr("href").unwrap_or_default().trim().to_string(),
            text: compact_text(a),
        })
        .collect())
}

/// Rendered text of every element matching `selector`, in document order.
pub fn select_texts(document: &Html, selector: &str) -> Result<Vec<String>> {
    let selector = parse_selector(selector)?;
    Ok(document.select(&selector).map(inner_text).collect())
}
