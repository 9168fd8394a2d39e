//! Rendering adapters.
//!
//! The crawl never talks to the network directly. It goes through a
//! [`Renderer`], which loads pages and hands back rendered elements. One
//! renderer instance is one browsing session: it is created by the caller,
//! owned by the [`Harvester`](crate::harvester::Harvester) for the whole run
//! and lent out as `&mut` to the navigator and extractor. Nothing else
//! touches it, so it needs no locking.

mod http;

#[cfg(feature = "browser")]
mod chromium;

use std::time::Duration;

use scraper::Html;

use crate::error::Result;

pub use http::HttpRenderer;

#[cfg(feature = "browser")]
pub use chromium::ChromiumRenderer;

/// A page loaded by a renderer.
///
/// Only the most recently opened page is live; asking a renderer about an
/// older handle fails with [`HarvesterError::StalePage`](crate::error::HarvesterError::StalePage).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHandle {
    url: String,
    generation: u64,
}

impl PageHandle {
    #[must_use]
    pub fn new(url: impl Into<String>, generation: u64) -> Self {
        Self {
            url: url.into(),
            generation,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// An element read from a rendered page.
///
/// Holds the element's outer HTML and rendered text as they were when the
/// selector matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    html: String,
    text: String,
}

impl ElementHandle {
    #[must_use]
    pub fn new(html: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            text: text.into(),
        }
    }

    /// Rendered text of the element.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Outer HTML of the element.
    #[must_use]
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Parse the element's HTML for further selection.
    #[must_use]
    pub fn fragment(&self) -> Html {
        Html::parse_fragment(&self.html)
    }
}

/// Page loading and DOM access for one browsing session.
pub trait Renderer {
    /// Load `url` and make it the live page.
    ///
    /// Fails with `Navigation` when the page is unreachable or times out.
    fn open(&mut self, url: &str) -> Result<PageHandle>;

    /// Wait until `selector` matches on the live page and return the first match.
    ///
    /// Fails with `NotFound` when nothing matches within `timeout`, and with
    /// `StalePage` when `page` is not the live page.
    fn wait_for(
        &mut self,
        page: &PageHandle,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle>;

    /// Move the pointer around the page like a reader would.
    fn simulate_pointer_movement(&mut self, page: &PageHandle) -> Result<()>;

    /// Scroll the page a little.
    fn simulate_scroll(&mut self, page: &PageHandle) -> Result<()>;
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn open(&mut self, url: &str) -> Result<PageHandle> {
        (**self).open(url)
    }

    fn wait_for(
        &mut self,
        page: &PageHandle,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle> {
        (**self).wait_for(page, selector, timeout)
    }

    fn simulate_pointer_movement(&mut self, page: &PageHandle) -> Result<()> {
        (**self).simulate_pointer_movement(page)
    }

    fn simulate_scroll(&mut self, page: &PageHandle) -> Result<()> {
        (**self).simulate_scroll(page)
    }
}

/// Find the first element matching `selector` in a parsed document.
///
/// Shared by renderers that hold the page as parsed HTML.
pub fn query_document(document: &Html, selector: &str) -> Result<Option<ElementHandle>> {
    let parsed = crate::html::parse_selector(selector)?;
    Ok(document
        .select(&parsed)
        .next()
        .map(|el| ElementHandle::new(el.html(), crate::html::inner_text(el))))
}
