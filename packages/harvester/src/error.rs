//! Error types for the harvester.
//!
//! A single `HarvesterError` covers every failure the crawl can hit. Each
//! variant maps to a [`FailureKind`], which is what the retry executor and
//! the traversal state machine use to decide between retrying, skipping a
//! node, and stopping the run.

use thiserror::Error;

/// How a failure should be treated by the crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Temporary condition (timeout, selector not yet present, stale page).
    Transient,

    /// The page rendered but produced no usable content.
    Extraction,

    /// Retrying cannot help.
    Fatal,
}

/// Main error type for the harvester library.
#[derive(Debug, Error)]
pub enum HarvesterError {
    /// Delay bounds are inverted or not finite.
    #[error("Invalid delay bounds: min {min}s must be finite, non-negative and not greater than max {max}s")]
    InvalidDelayBounds { min: f64, max: f64 },

    /// Start page must be 1 or greater.
    #[error("Invalid start page: {0}. Pages are numbered from 1")]
    InvalidStartPage(u32),

    /// Code slug contains characters that never appear in code URLs.
    #[error("Invalid code slug: '{0}'. Expected letters, digits and hyphens (e.g., GK-RF)")]
    InvalidCodeSlug(String),

    /// Date stamp is not a real DD.MM.YYYY date.
    #[error("Invalid date stamp: '{0}'. Expected DD.MM.YYYY")]
    InvalidDate(String),

    /// URL could not be parsed or resolved against the site base.
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// CSS selector could not be parsed.
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// Page could not be loaded (unreachable, connection reset, timeout).
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// Page answered with a non-success status.
    #[error("{url} answered with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// Selector did not match before the timeout.
    #[error("Selector '{selector}' not found on {url}")]
    NotFound { selector: String, url: String },

    /// Page handle refers to a document that is no longer loaded.
    #[error("Page handle for {url} is stale")]
    StalePage { url: String },

    /// Page rendered but its body is empty after cleaning.
    #[error("Empty body after cleaning on {url}")]
    EmptyBody { url: String },

    /// Top-level discovery failed; there is nothing to traverse.
    #[error("Discovery of {target} failed: {source}")]
    DiscoveryFailed {
        target: String,
        #[source]
        source: Box<HarvesterError>,
    },

    /// All retry attempts were used up.
    #[error("Gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<HarvesterError>,
    },

    /// Requested renderer is unavailable or failed to start.
    #[error("Browser error: {0}")]
    Browser(String),

    /// HTTP client could not be built or used.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvesterError {
    /// Classify this error for the retry executor.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Navigation { .. } | Self::NotFound { .. } | Self::StalePage { .. } => {
                FailureKind::Transient
            }
            Self::HttpStatus { status, .. } if *status >= 500 || *status == 429 => {
                FailureKind::Transient
            }
            Self::EmptyBody { .. } => FailureKind::Extraction,
            Self::RetriesExhausted { source, .. } => source.kind(),
            _ => FailureKind::Fatal,
        }
    }

    /// Whether retrying the same action may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind() == FailureKind::Transient
    }
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvesterError>;
