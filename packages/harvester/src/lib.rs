//! Legalacts Harvester - Extract Russian law codes and federal laws from legalacts.ru.
//!
//! This crate walks the site's law codes (section, chapter, article) and its
//! paginated federal law index, and writes every article or law as a record:
//! a block of `[field] value` lines, a blank line and the body text.
//!
//! # Example
//!
//! ```
//! use legalacts_harvester::extract::clean_body;
//! use legalacts_harvester::config;
//!
//! // Validate CLI input
//! assert!(config::parse_code_allowlist("GK-RF,UK-RF").is_ok());
//! assert!(config::validate_delay_bounds(0.3, 1.0).is_ok());
//!
//! // Strip in-page navigation from article text
//! assert_eq!(clean_body("<\nСтатья 2\nТекст статьи.\n>"), "Текст статьи.");
//! ```
//!
//! # Architecture
//!
//! The harvester is organized into several modules:
//!
//! - [`config`]: Configuration constants, site addresses and validation
//! - [`types`]: Core data types (targets, nodes, records, crawl progress)
//! - [`error`]: Error types, failure classification and Result alias
//! - [`html`]: HTML selection and text rendering helpers
//! - [`render`]: Renderer trait and its HTTP and Chromium adapters
//! - [`pacing`]: Human-like delays and simulated interaction
//! - [`retry`]: Bounded retries with backoff
//! - [`navigator`]: Discovery of codes, articles and law index pages
//! - [`extract`]: Record extraction and body text cleaning
//! - [`output`]: Record file writer and reader
//! - [`harvester`]: Traversal state machine
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod harvester;
pub mod html;
pub mod navigator;
pub mod output;
pub mod pacing;
pub mod render;
pub mod retry;
pub mod types;

// Re-export main entry points
pub use harvester::{CodesOptions, Harvester, LawsOptions};

// Re-export commonly used items
pub use error::{FailureKind, HarvesterError, Result};
pub use render::{HttpRenderer, Renderer};
pub use types::{CodeRecord, CrawlSummary, LawRecord, Record, RecordKind};
