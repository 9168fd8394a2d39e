//! Core data types for the harvester.
//!
//! Targets are the top-level crawl units (a code, or one page of the law
//! index), nodes are the leaves reached from a target (an article, or a law),
//! and records are what gets written for each node.

use std::fmt;

/// A law code listed on the codes index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTarget {
    /// Slug taken from the code href (e.g., "GK-RF").
    pub slug: String,

    /// Display name as listed (e.g., "Гражданский кодекс РФ").
    pub name: String,

    /// Absolute URL of the code's table of contents.
    pub url: String,
}

/// One page of the federal law index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LawIndexPage {
    /// 1-based page number.
    pub number: u32,

    /// Absolute URL of the page.
    pub url: String,
}

/// A top-level crawl unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Code(CodeTarget),
    LawIndexPage(LawIndexPage),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "code {}", code.slug),
            Self::LawIndexPage(page) => write!(f, "law index page {}", page.number),
        }
    }
}

/// Section and chapter currently in scope while walking a code outline.
///
/// The site renders the nested outline of a code as a flat list: a section
/// heading, then chapter headings, then article links. The context is
/// updated whenever a heading is met and copied onto every article after it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutlineContext {
    pub section_number: String,
    pub section_name: String,
    pub chapter_number: String,
    pub chapter_name: String,
}

impl OutlineContext {
    /// Enter a new section. The previous chapter is no longer in scope.
    pub fn enter_section(&mut self, number: impl Into<String>, name: impl Into<String>) {
        self.section_number = number.into();
        self.section_name = name.into();
        self.chapter_number.clear();
        self.chapter_name.clear();
    }

    /// Enter a new chapter within the current section.
    pub fn enter_chapter(&mut self, number: impl Into<String>, name: impl Into<String>) {
        self.chapter_number = number.into();
        self.chapter_name = name.into();
    }
}

/// An article reached from a code's table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleNode {
    /// Position among the code's articles, in document order.
    pub position: usize,

    /// Outline context the article sits in.
    pub context: OutlineContext,

    /// Article number from the table of contents (e.g., "12.1-1").
    pub article_number: String,

    /// Article name; the full link title when no name could be parsed.
    pub article_name: String,

    /// Absolute URL of the article page.
    pub url: String,
}

/// A law reached from a law index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LawNode {
    /// Index page the law was listed on.
    pub page_number: u32,

    /// Position on that page, in document order.
    pub position: usize,

    /// Absolute URL of the law document.
    pub url: String,

    /// Law number parsed from the listing link (may be empty).
    pub law_number: String,

    /// Law name parsed from the listing link (may be empty).
    pub law_name: String,
}

/// Kind of record, which fixes the metadata field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Code,
    Law,
}

impl RecordKind {
    /// Metadata field names in output order.
    #[must_use]
    pub fn field_names(&self) -> &'static [&'static str] {
        match self {
            Self::Code => &[
                "section_number",
                "section_name",
                "chapter_number",
                "chapter_name",
                "article_number",
                "article_name",
                "updated_at",
            ],
            Self::Law => &["law_number", "law_name", "updated_at"],
        }
    }

    /// First metadata field, which marks the start of a record in a file.
    #[must_use]
    pub fn first_field(&self) -> &'static str {
        self.field_names()[0]
    }
}

/// Record for one article of a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeRecord {
    pub section_number: String,
    pub section_name: String,
    pub chapter_number: String,
    pub chapter_name: String,
    pub article_number: String,
    pub article_name: String,
    /// DD.MM.YYYY or empty.
    pub updated_at: String,
    pub body: String,
}

/// Record for one federal law.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LawRecord {
    pub law_number: String,
    pub law_name: String,
    /// DD.MM.YYYY or empty.
    pub updated_at: String,
    pub body: String,
}

/// The unit of output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Code(CodeRecord),
    Law(LawRecord),
}

impl Record {
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Code(_) => RecordKind::Code,
            Self::Law(_) => RecordKind::Law,
        }
    }

    /// Metadata values paired with their field names, in output order.
    #[must_use]
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        let values: Vec<&str> = match self {
            Self::Code(r) => vec![
                r.section_number.as_str(),
                r.section_name.as_str(),
                r.chapter_number.as_str(),
                r.chapter_name.as_str(),
                r.article_number.as_str(),
                r.article_name.as_str(),
                r.updated_at.as_str(),
            ],
            Self::Law(r) => vec![
                r.law_number.as_str(),
                r.law_name.as_str(),
                r.updated_at.as_str(),
            ],
        };
        self.kind().field_names().iter().copied().zip(values).collect()
    }

    #[must_use]
    pub fn body(&self) -> &str {
        match self {
            Self::Code(r) => &r.body,
            Self::Law(r) => &r.body,
        }
    }
}

/// Phase of the traversal state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Idle,
    DiscoveringTargets,
    EnumeratingChildren,
    VisitingChild,
    Done,
    Error,
}

/// Position of the walker and counters checked against the run limits.
///
/// Owned and mutated by the traversal state machine only. For laws,
/// `page_number` is the resumption point a later run can pass as its
/// start page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlProgress {
    pub phase: CrawlPhase,
    pub target_index: usize,
    pub node_index: usize,
    pub page_number: u32,
    pub pages_visited: u32,
    pub written_in_target: usize,
    pub written_total: usize,
}

impl CrawlProgress {
    /// Fresh progress for a run starting at `start_page` (1 for codes).
    #[must_use]
    pub fn starting_at(start_page: u32) -> Self {
        Self {
            phase: CrawlPhase::Idle,
            target_index: 0,
            node_index: 0,
            page_number: start_page,
            pages_visited: 0,
            written_in_target: 0,
            written_total: 0,
        }
    }

    /// Reset per-target counters when moving to the next target.
    pub fn begin_target(&mut self, target_index: usize) {
        self.target_index = target_index;
        self.node_index = 0;
        self.written_in_target = 0;
    }

    /// Count one written record.
    pub fn record_written(&mut self) {
        self.written_in_target += 1;
        self.written_total += 1;
    }
}

/// A node abandoned without halting the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
    /// Target the node belongs to (e.g., "code GK-RF").
    pub target: String,

    /// Position of the node within its target.
    pub position: usize,

    /// URL of the node, or of the target when the whole target was skipped.
    pub url: String,

    /// Why the node was abandoned.
    pub reason: String,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub records_written: usize,
    pub targets_visited: usize,
    pub skips: Vec<Skip>,
    /// Last law index page that was visited, if any.
    pub last_page: Option<u32>,
    /// Start page for a follow-up law run: the last page again when a limit
    /// cut it short, the page after it when every listed law was visited.
    pub resume_page: Option<u32>,
}
