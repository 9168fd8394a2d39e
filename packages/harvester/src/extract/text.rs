//! Body text cleaning.
//!
//! Rendered article text carries the site's in-page navigation: lone `<` and
//! `>` arrows and "Статья N" links to the neighbouring articles. Those lines
//! are dropped, blank runs are collapsed, and everything else is kept as is.

use std::sync::LazyLock;

use regex::Regex;

/// Lines that are in-page navigation rather than content.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static NAVIGATION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[<>]|Статья\s+(?:\d+(?:[.\-]\d+)*|[IVXLCDM]+)(?:[.:\s].*)?)$")
        .expect("valid regex")
});

/// Whether a trimmed line is a navigation artifact.
#[must_use]
pub fn is_navigation_line(line: &str) -> bool {
    NAVIGATION_LINE.is_match(line)
}

/// Clean rendered body text.
///
/// Lines are trimmed, navigation artifacts removed, runs of blank lines
/// collapsed into one, and the result trimmed. Cleaning is idempotent.
///
/// # Examples
/// ```
/// use legalacts_harvester::extract::clean_body;
///
/// let raw = "<\nСтатья 4\n\n1. Текст статьи.\n\n\n2. Ещё пункт.\n>\n";
/// assert_eq!(clean_body(raw), "1. Текст статьи.\n\n2. Ещё пункт.");
/// ```
#[must_use]
pub fn clean_body(raw: &str) -> String {
    tidy(raw, is_navigation_line)
}

/// Trim lines and collapse blank runs without dropping any content line.
///
/// Used for law bodies, where "Статья N" lines are real headings.
#[must_use]
pub fn collapse_blank_lines(raw: &str) -> String {
    tidy(raw, |_| false)
}

fn tidy(raw: &str, is_noise: impl Fn(&str) -> bool) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut previous_blank = true;

    for line in raw.lines().map(str::trim) {
        if line.is_empty() {
            if !previous_blank {
                out.push("");
            }
            previous_blank = true;
            continue;
        }
        if is_noise(line) {
            continue;
        }
        out.push(line);
        previous_blank = false;
    }

    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }

    out.join("\n")
}
