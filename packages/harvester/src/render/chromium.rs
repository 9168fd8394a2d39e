//! Headless or headed Chromium renderer (feature `browser`).
//!
//! Drives a real browser through the DevTools protocol. The async
//! `chromiumoxide` API is run on a runtime owned by the renderer, so the
//! rest of the crawl stays blocking and sequential.

use std::time::{Duration, Instant};

use chromiumoxide::layout::Point;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

use super::{ElementHandle, PageHandle, Renderer};
use crate::config::{NAVIGATION_TIMEOUT_SECS, USER_AGENTS};
use crate::error::{HarvesterError, Result};

/// Interval between selector probes while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Renderer backed by a Chromium instance.
pub struct ChromiumRenderer {
    runtime: Runtime,
    browser: Browser,
    handler: JoinHandle<()>,
    tab: Page,
    viewport: (u32, u32),
    generation: u64,
    live: Option<PageHandle>,
}

impl ChromiumRenderer {
    /// Launch Chromium and open the single tab used for the whole run.
    pub fn launch(headed: bool) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;

        let width = rand::random_range(1280..=1600);
        let height = rand::random_range(800..=1000);
        let user_agent = USER_AGENTS[rand::random_range(0..USER_AGENTS.len())];

        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .request_timeout(Duration::from_secs(NAVIGATION_TIMEOUT_SECS))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-default-browser-check")
            .arg("--disable-dev-shm-usage")
            .arg("--lang=ru-RU");
        if headed {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(HarvesterError::Browser)?;

        let (browser, tab, handler) = runtime.block_on(async {
            let (browser, mut handler) = Browser::launch(browser_config)
                .await
                .map_err(|e| HarvesterError::Browser(e.to_string()))?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            let tab = browser
                .new_page("about:blank")
                .await
                .map_err(|e| HarvesterError::Browser(e.to_string()))?;
            tab.set_user_agent(user_agent)
                .await
                .map_err(|e| HarvesterError::Browser(e.to_string()))?;

            Ok::<_, HarvesterError>((browser, tab, handler))
        })?;

        tracing::info!(headed, width, height, "Chromium launched");

        Ok(Self {
            runtime,
            browser,
            handler,
            tab,
            viewport: (width, height),
            generation: 0,
            live: None,
        })
    }

    fn ensure_live(&self, page: &PageHandle) -> Result<()> {
        if self.live.as_ref() == Some(page) {
            Ok(())
        } else {
            Err(HarvesterError::StalePage {
                url: page.url().to_string(),
            })
        }
    }
}

impl Renderer for ChromiumRenderer {
    fn open(&mut self, url: &str) -> Result<PageHandle> {
        self.live = None;

        let tab = &self.tab;
        self.runtime
            .block_on(async { tab.goto(url).await.map(|_| ()) })
            .map_err(|e| HarvesterError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        self.generation += 1;
        let handle = PageHandle::new(url, self.generation);
        self.live = Some(handle.clone());
        Ok(handle)
    }

    fn wait_for(
        &mut self,
        page: &PageHandle,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle> {
        self.ensure_live(page)?;

        let tab = &self.tab;
        self.runtime.block_on(async {
            let deadline = Instant::now() + timeout;
            loop {
                if let Ok(element) = tab.find_element(selector).await {
                    let html = element.outer_html().await.ok().flatten().unwrap_or_default();
                    let text = element.inner_text().await.ok().flatten().unwrap_or_default();
                    return Ok(ElementHandle::new(html, text));
                }
                if Instant::now() >= deadline {
                    return Err(HarvesterError::NotFound {
                        selector: selector.to_string(),
                        url: page.url().to_string(),
                    });
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        })
    }

    fn simulate_pointer_movement(&mut self, page: &PageHandle) -> Result<()> {
        self.ensure_live(page)?;

        let (width, height) = self.viewport;
        let x = f64::from(rand::random_range(50..width.saturating_sub(50).max(51)));
        let y = f64::from(rand::random_range(100..height.saturating_sub(100).max(101)));

        let tab = &self.tab;
        self.runtime
            .block_on(async { tab.move_mouse(Point::new(x, y)).await.map(|_| ()) })
            .map_err(|e| HarvesterError::Browser(e.to_string()))
    }

    fn simulate_scroll(&mut self, page: &PageHandle) -> Result<()> {
        self.ensure_live(page)?;

        let delta: u32 = rand::random_range(200..=600);
        let script = format!("window.scrollBy(0, {delta});");

        let tab = &self.tab;
        self.runtime
            .block_on(async { tab.evaluate(script.as_str()).await.map(|_| ()) })
            .map_err(|e| HarvesterError::Browser(e.to_string()))
    }
}

impl Drop for ChromiumRenderer {
    fn drop(&mut self) {
        let browser = &mut self.browser;
        if let Err(e) = self.runtime.block_on(browser.close()) {
            tracing::debug!(error = %e, "Closing Chromium failed");
        }
        self.handler.abort();
    }
}
