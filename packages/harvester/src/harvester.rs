//! Traversal state machine that ties all components together.
//!
//! A [`Harvester`] owns the renderer for the whole run and walks targets and
//! their nodes strictly in order: codes as listed on the index page and
//! their articles in table-of-contents order, or law index pages from the
//! start page upwards and their laws in listing order. Node failures become
//! skips; only an unreachable starting point or an unwritable destination
//! stops the run.

use std::path::{Path, PathBuf};

use crate::config::{validate_start_page, SiteConfig, RENDER_RACE_RETRIES};
use crate::error::{FailureKind, HarvesterError, Result};
use crate::extract::{extract_article, extract_law};
use crate::navigator::Navigator;
use crate::output::{code_destination, RecordWriter};
use crate::pacing::{Pacer, PacingConfig};
use crate::render::Renderer;
use crate::retry::RetryPolicy;
use crate::types::{
    CodeTarget, CrawlPhase, CrawlProgress, CrawlSummary, LawIndexPage, Record, Skip, Target,
};

/// Options of a code crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodesOptions {
    /// Directory receiving one `<slug>.txt` file per code.
    pub output_dir: PathBuf,

    /// Slugs to crawl; `None` crawls every listed code.
    pub allowlist: Option<Vec<String>>,

    /// Records to write per code at most.
    pub max_articles: Option<usize>,
}

/// Options of a federal law crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LawsOptions {
    /// File receiving every law record.
    pub output_file: PathBuf,

    /// First index page to visit (1-based).
    pub start_page: u32,

    /// Index pages to visit at most, counted from the start page.
    pub max_pages: Option<u32>,

    /// Records to write in total at most.
    pub max_laws: Option<usize>,
}

type ProgressObserver = Box<dyn FnMut(&CrawlProgress)>;

/// Collaborators the navigator borrows.
struct Settings {
    site: SiteConfig,
    pacer: Pacer,
    policy: RetryPolicy,
    render_race_retries: u32,
}

impl Settings {
    fn navigator(&self) -> Navigator<'_> {
        Navigator::new(&self.site, &self.pacer, &self.policy)
    }
}

/// Walks codes or federal laws with one renderer session.
pub struct Harvester<R: Renderer> {
    renderer: R,
    settings: Settings,
    writer: RecordWriter,
    progress: CrawlProgress,
    observer: Option<ProgressObserver>,
}

impl<R: Renderer> Harvester<R> {
    /// Harvester with default pacing, retry policy and site.
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            settings: Settings {
                site: SiteConfig::default(),
                pacer: Pacer::new(PacingConfig::default()),
                policy: RetryPolicy::default(),
                render_race_retries: RENDER_RACE_RETRIES,
            },
            writer: RecordWriter::new(),
            progress: CrawlProgress::starting_at(1),
            observer: None,
        }
    }

    #[must_use]
    pub fn with_site(mut self, site: SiteConfig) -> Self {
        self.settings.site = site;
        self
    }

    #[must_use]
    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.settings.pacer = pacer;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.settings.policy = policy;
        self
    }

    /// Extra attempts for a node whose body came back empty.
    #[must_use]
    pub fn with_render_race_retries(mut self, retries: u32) -> Self {
        self.settings.render_race_retries = retries;
        self
    }

    /// Call `observer` on every phase change and written record.
    #[must_use]
    pub fn on_progress(mut self, observer: impl FnMut(&CrawlProgress) + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    #[must_use]
    pub fn progress(&self) -> &CrawlProgress {
        &self.progress
    }

    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Give the renderer back, ending the session.
    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Crawl law codes into one file per code.
    ///
    /// Fails only when the codes index cannot be read or a record cannot be
    /// written.
    pub fn run_codes(&mut self, options: &CodesOptions) -> Result<CrawlSummary> {
        self.progress = CrawlProgress::starting_at(1);
        let mut summary = CrawlSummary::default();

        self.transition(CrawlPhase::DiscoveringTargets);
        let codes = match self.settings.navigator().discover_codes(&mut self.renderer) {
            Ok(codes) => codes,
            Err(source) => {
                self.transition(CrawlPhase::Error);
                return Err(HarvesterError::DiscoveryFailed {
                    target: "codes index".to_string(),
                    source: Box::new(source),
                });
            }
        };
        let codes = select_codes(codes, options.allowlist.as_deref());
        tracing::info!(codes = codes.len(), "Codes selected");

        for (index, code) in codes.iter().enumerate() {
            if index > 0 {
                self.settings.pacer.pace_between_targets();
            }
            self.progress.begin_target(index);
            if let Err(e) = self.crawl_code(code, options, &mut summary) {
                self.transition(CrawlPhase::Error);
                return Err(e);
            }
            summary.targets_visited += 1;
        }

        self.transition(CrawlPhase::Done);
        summary.records_written = self.progress.written_total;
        Ok(summary)
    }

    fn crawl_code(
        &mut self,
        code: &CodeTarget,
        options: &CodesOptions,
        summary: &mut CrawlSummary,
    ) -> Result<()> {
        let target = Target::Code(code.clone()).to_string();

        self.transition(CrawlPhase::EnumeratingChildren);
        let articles = match self
            .settings
            .navigator()
            .list_articles(&mut self.renderer, code)
        {
            Ok(articles) => articles,
            Err(e) => {
                record_skip(summary, &target, 0, &code.url, &e);
                return Ok(());
            }
        };
        tracing::info!(code = %code.slug, articles = articles.len(), "Crawling code");

        let destination = code_destination(&options.output_dir, &code.slug);
        for node in &articles {
            if options
                .max_articles
                .is_some_and(|max| self.progress.written_in_target >= max)
            {
                tracing::info!(code = %code.slug, "Article limit reached");
                break;
            }

            self.progress.node_index = node.position;
            self.transition(CrawlPhase::VisitingChild);

            let outcome = {
                let settings = &self.settings;
                let _pace = settings.pacer.scope();
                acquire(&mut self.renderer, settings, |renderer, navigator| {
                    let page = navigator.read_article(renderer, node)?;
                    extract_article(&page, node)
                })
            };

            match outcome {
                Ok(record) => self.write(&destination, &Record::Code(record))?,
                Err(e) => record_skip(summary, &target, node.position, &node.url, &e),
            }
        }

        tracing::info!(
            code = %code.slug,
            written = self.progress.written_in_target,
            "Code finished"
        );
        Ok(())
    }

    /// Crawl federal laws into a single file, page by page.
    ///
    /// Fails when the start page cannot be read or a record cannot be
    /// written. A later page that cannot be read ends the crawl early, with
    /// the page recorded as a skip.
    pub fn run_laws(&mut self, options: &LawsOptions) -> Result<CrawlSummary> {
        validate_start_page(options.start_page)?;
        self.progress = CrawlProgress::starting_at(options.start_page);
        let mut summary = CrawlSummary::default();

        self.transition(CrawlPhase::DiscoveringTargets);
        let mut page_number = options.start_page;

        while !self.laws_done(options) {
            let index_page = LawIndexPage {
                number: page_number,
                url: self.settings.site.law_index_url(page_number),
            };
            let target = Target::LawIndexPage(index_page.clone()).to_string();
            self.progress.begin_target(self.progress.pages_visited as usize);
            self.progress.page_number = page_number;

            self.transition(CrawlPhase::EnumeratingChildren);
            let listing = match self
                .settings
                .navigator()
                .discover_law_page(&mut self.renderer, page_number)
            {
                Ok(listing) => listing,
                Err(source) if self.progress.pages_visited == 0 => {
                    self.transition(CrawlPhase::Error);
                    return Err(HarvesterError::DiscoveryFailed {
                        target,
                        source: Box::new(source),
                    });
                }
                Err(e) => {
                    tracing::warn!(page = page_number, "Law index page unreadable, stopping");
                    record_skip(&mut summary, &target, 0, &index_page.url, &e);
                    break;
                }
            };

            self.progress.pages_visited += 1;
            summary.targets_visited += 1;
            summary.last_page = Some(page_number);
            summary.resume_page = Some(page_number);

            if listing.laws.is_empty() {
                tracing::info!(page = page_number, "No laws listed, stopping");
                break;
            }

            let mut page_complete = true;
            for node in &listing.laws {
                if options
                    .max_laws
                    .is_some_and(|max| self.progress.written_total >= max)
                {
                    page_complete = false;
                    break;
                }

                self.progress.node_index = node.position;
                self.transition(CrawlPhase::VisitingChild);

                let outcome = {
                    let settings = &self.settings;
                    let _pace = settings.pacer.scope();
                    acquire(&mut self.renderer, settings, |renderer, navigator| {
                        let page = navigator.read_law(renderer, node)?;
                        extract_law(&page, node)
                    })
                };

                match outcome {
                    Ok(record) => {
                        if let Err(e) = self.write(&options.output_file, &Record::Law(record)) {
                            self.transition(CrawlPhase::Error);
                            return Err(e);
                        }
                    }
                    Err(e) => record_skip(&mut summary, &target, node.position, &node.url, &e),
                }
            }

            tracing::info!(
                page = page_number,
                written = self.progress.written_in_target,
                total = self.progress.written_total,
                "Law index page finished"
            );
            if page_complete {
                summary.resume_page = Some(page_number + 1);
            }

            if !listing.has_next {
                tracing::info!(page = page_number, "Last law index page reached");
                break;
            }
            page_number += 1;
            if !self.laws_done(options) {
                self.settings.pacer.pace_between_targets();
            }
        }

        self.transition(CrawlPhase::Done);
        summary.records_written = self.progress.written_total;
        Ok(summary)
    }

    fn laws_done(&self, options: &LawsOptions) -> bool {
        options
            .max_pages
            .is_some_and(|max| self.progress.pages_visited >= max)
            || options
                .max_laws
                .is_some_and(|max| self.progress.written_total >= max)
    }

    fn write(&mut self, destination: &Path, record: &Record) -> Result<()> {
        self.writer.write_record(destination, record)?;
        self.progress.record_written();
        self.notify();
        Ok(())
    }

    fn transition(&mut self, phase: CrawlPhase) {
        if self.progress.phase != phase {
            tracing::debug!(from = ?self.progress.phase, to = ?phase, "Crawl phase");
            self.progress.phase = phase;
        }
        self.notify();
    }

    fn notify(&mut self) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&self.progress);
        }
    }
}

/// Read and extract one node, granting empty bodies a few extra attempts.
///
/// An empty body right after load is usually a render race, so the node is
/// loaded again after a pause before the extraction failure is accepted.
fn acquire<R, T, F>(renderer: &mut R, settings: &Settings, mut attempt: F) -> Result<T>
where
    R: Renderer + ?Sized,
    F: FnMut(&mut R, &Navigator<'_>) -> Result<T>,
{
    let navigator = settings.navigator();
    let mut race_retries = 0;
    loop {
        match attempt(&mut *renderer, &navigator) {
            Err(e)
                if e.kind() == FailureKind::Extraction
                    && race_retries < settings.render_race_retries =>
            {
                race_retries += 1;
                tracing::debug!(error = %e, retry = race_retries, "Empty body, reloading");
                settings.pacer.pace();
            }
            outcome => return outcome,
        }
    }
}

fn record_skip(
    summary: &mut CrawlSummary,
    target: &str,
    position: usize,
    url: &str,
    error: &HarvesterError,
) {
    tracing::warn!(crawl_target = target, position, url, error = %error, "Skipping");
    summary.skips.push(Skip {
        target: target.to_string(),
        position,
        url: url.to_string(),
        reason: error.to_string(),
    });
}

/// Keep listed codes that are allow-listed, in listing order, once each.
fn select_codes(codes: Vec<CodeTarget>, allowlist: Option<&[String]>) -> Vec<CodeTarget> {
    if let Some(allowlist) = allowlist {
        for slug in allowlist {
            if !codes.iter().any(|code| &code.slug == slug) {
                tracing::warn!(slug = %slug, "Requested code is not listed on the index page");
            }
        }
    }

    let mut selected: Vec<CodeTarget> = Vec::new();
    for code in codes {
        let allowed = allowlist.map_or(true, |allow| allow.contains(&code.slug));
        if allowed && !selected.iter().any(|c| c.slug == code.slug) {
            selected.push(code);
        }
    }
    selected
}
