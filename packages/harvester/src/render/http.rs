//! Plain HTTP renderer.
//!
//! Fetches pages with a blocking client and parses them with `scraper`.
//! The site serves its content server-side, so the fetched document already
//! contains everything the crawl reads; `wait_for` therefore resolves
//! immediately against the parsed document. There is no pointer or viewport,
//! so the humanisation calls do nothing.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use scraper::Html;

use super::{query_document, ElementHandle, PageHandle, Renderer};
use crate::config::{self, NAVIGATION_TIMEOUT_SECS, USER_AGENTS};
use crate::error::{HarvesterError, Result};

/// Renderer backed by `reqwest`.
pub struct HttpRenderer {
    client: Client,
    generation: u64,
    live: Option<(PageHandle, Html)>,
}

impl HttpRenderer {
    /// Create a renderer with a randomly chosen desktop user agent.
    pub fn new() -> Result<Self> {
        let user_agent = USER_AGENTS[rand::random_range(0..USER_AGENTS.len())];

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(config::ACCEPT_LANGUAGE),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(NAVIGATION_TIMEOUT_SECS))
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;

        tracing::debug!(user_agent, "HTTP renderer ready");

        Ok(Self {
            client,
            generation: 0,
            live: None,
        })
    }

    fn live_document(&self, page: &PageHandle) -> Result<&Html> {
        match &self.live {
            Some((handle, document)) if handle == page => Ok(document),
            _ => Err(HarvesterError::StalePage {
                url: page.url().to_string(),
            }),
        }
    }
}

impl Renderer for HttpRenderer {
    fn open(&mut self, url: &str) -> Result<PageHandle> {
        // Whatever happens next, the previous page is gone.
        self.live = None;

        let response = self.client.get(url).send().map_err(|e| {
            if e.is_builder() {
                HarvesterError::Http(e)
            } else {
                HarvesterError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvesterError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(|e| HarvesterError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        self.generation += 1;
        let handle = PageHandle::new(url, self.generation);
        self.live = Some((handle.clone(), Html::parse_document(&body)));

        Ok(handle)
    }

    fn wait_for(
        &mut self,
        page: &PageHandle,
        selector: &str,
        _timeout: Duration,
    ) -> Result<ElementHandle> {
        let document = self.live_document(page)?;
        query_document(document, selector)?.ok_or_else(|| HarvesterError::NotFound {
            selector: selector.to_string(),
            url: page.url().to_string(),
        })
    }

    fn simulate_pointer_movement(&mut self, page: &PageHandle) -> Result<()> {
        self.live_document(page).map(|_| ())
    }

    fn simulate_scroll(&mut self, page: &PageHandle) -> Result<()> {
        self.live_document(page).map(|_| ())
    }
}
