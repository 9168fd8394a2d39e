//! Record extraction: turn rendered page text into records.
//!
//! Extraction is pure. The navigator reads the page through the renderer
//! and hands over plain text; everything here is testable without a site.

mod article;
mod law;
mod text;

pub use article::{
    extract_article, find_last_date, parse_title_number_and_name, starts_with_keyword,
    ArticlePage,
};
pub use law::{extract_law, join_paragraphs, parse_law_header, LawHeader, LawPage};
pub use text::{clean_body, collapse_blank_lines, is_navigation_line};
