//! Command-line interface for the harvester.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{
    parse_code_allowlist, validate_delay_bounds, validate_start_page, SiteConfig, BASE_URL,
    DEFAULT_CODES_OUTPUT_DIR, DEFAULT_DELAY_MAX_SECS, DEFAULT_DELAY_MIN_SECS,
    DEFAULT_LAWS_OUTPUT_FILE, DEFAULT_MAX_ATTEMPTS,
};
use crate::error::Result;
use crate::harvester::{CodesOptions, Harvester, LawsOptions};
use crate::pacing::{Pacer, PacingConfig};
use crate::render::{HttpRenderer, Renderer};
use crate::retry::RetryPolicy;
use crate::types::{CrawlPhase, CrawlProgress, CrawlSummary};

/// Legalacts Harvester - Extract Russian law codes and federal laws from legalacts.ru.
#[derive(Parser, Debug)]
#[command(name = "legalacts-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log crawl progress (raises the default log level to info)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl law codes, one output file per code.
    Codes {
        /// Directory to store result files
        #[arg(long, default_value = DEFAULT_CODES_OUTPUT_DIR)]
        output_dir: PathBuf,

        /// Comma-separated code slugs to limit the crawl (e.g., APK-RF,GK-RF)
        #[arg(long, default_value = "")]
        codes: String,

        /// Limit number of articles per code
        #[arg(long)]
        max_articles: Option<usize>,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Crawl federal laws into a single output file.
    Laws {
        /// Single output file for all laws
        #[arg(long, default_value = DEFAULT_LAWS_OUTPUT_FILE)]
        output_file: PathBuf,

        /// Limit number of index pages to scan, counted from the start page
        #[arg(long)]
        max_pages: Option<u32>,

        /// Limit number of laws to fetch
        #[arg(long)]
        max_laws: Option<usize>,

        /// Index page to start from (resume point)
        #[arg(long, default_value_t = 1)]
        start_page: u32,

        #[command(flatten)]
        session: SessionArgs,
    },
}

/// Page renderer to drive the crawl with.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    /// Plain HTTP requests, parsed server-side HTML
    Http,
    /// Chromium over DevTools (requires the `browser` feature)
    Chromium,
}

/// Flags shared by both crawl modes.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Run with a visible browser window
    #[arg(long)]
    pub headed: bool,

    /// Page renderer
    #[arg(long, value_enum, default_value_t = RendererKind::Http)]
    pub renderer: RendererKind,

    /// Minimum human delay in seconds
    #[arg(long, default_value_t = DEFAULT_DELAY_MIN_SECS)]
    pub delay_min: f64,

    /// Maximum human delay in seconds
    #[arg(long, default_value_t = DEFAULT_DELAY_MAX_SECS)]
    pub delay_max: f64,

    /// Attempts per page load before giving up on it
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Site to crawl
    #[arg(long, default_value = BASE_URL)]
    pub base_url: String,
}

/// Run the CLI.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Codes {
            output_dir,
            codes,
            max_articles,
            session,
        } => codes_command(output_dir, &codes, max_articles, &session),
        Commands::Laws {
            output_file,
            max_pages,
            max_laws,
            start_page,
            session,
        } => laws_command(
            LawsOptions {
                output_file,
                start_page,
                max_pages,
                max_laws,
            },
            &session,
        ),
    }
}

/// Execute the codes command.
fn codes_command(
    output_dir: PathBuf,
    codes: &str,
    max_articles: Option<usize>,
    session: &SessionArgs,
) -> Result<()> {
    // Validate inputs before opening a session
    let allowlist = parse_code_allowlist(codes)?;
    let site = validate_session(session)?;

    println!(
        "{} codes from {} into {}",
        style("Harvesting").bold(),
        style(site.base_url()).cyan(),
        style(output_dir.display()).green()
    );
    if let Some(slugs) = &allowlist {
        println!("  Codes: {}", slugs.join(", "));
    }
    println!();

    let options = CodesOptions {
        output_dir,
        allowlist,
        max_articles,
    };

    let pb = spinner();
    let mut harvester = build_harvester(session, site, &pb)?;
    let summary = harvester.run_codes(&options);
    pb.finish_and_clear();

    print_summary(&summary?);
    Ok(())
}

/// Execute the laws command.
fn laws_command(options: LawsOptions, session: &SessionArgs) -> Result<()> {
    validate_start_page(options.start_page)?;
    let site = validate_session(session)?;

    println!(
        "{} federal laws from {} into {}",
        style("Harvesting").bold(),
        style(site.base_url()).cyan(),
        style(options.output_file.display()).green()
    );
    println!("  Start page: {}", options.start_page);
    println!();

    let pb = spinner();
    let mut harvester = build_harvester(session, site, &pb)?;
    let summary = harvester.run_laws(&options);
    pb.finish_and_clear();

    let summary = summary?;
    print_summary(&summary);
    if let (Some(last_page), Some(resume_page)) = (summary.last_page, summary.resume_page) {
        println!(
            "  Last page: {} (continue with --start-page {})",
            style(last_page).cyan(),
            resume_page
        );
    }
    Ok(())
}

/// Check the shared flags and resolve the site.
fn validate_session(session: &SessionArgs) -> Result<SiteConfig> {
    validate_delay_bounds(session.delay_min, session.delay_max)?;
    SiteConfig::new(&session.base_url)
}

fn build_harvester(
    session: &SessionArgs,
    site: SiteConfig,
    pb: &ProgressBar,
) -> Result<Harvester<Box<dyn Renderer>>> {
    let renderer = create_renderer(session)?;
    let observer = pb.clone();

    Ok(Harvester::new(renderer)
        .with_site(site)
        .with_pacer(Pacer::new(PacingConfig::from_secs(
            session.delay_min,
            session.delay_max,
        )))
        .with_retry_policy(RetryPolicy::new(session.max_attempts))
        .on_progress(move |progress| observer.set_message(progress_message(progress))))
}

/// Open the renderer session selected on the command line.
pub fn create_renderer(session: &SessionArgs) -> Result<Box<dyn Renderer>> {
    match session.renderer {
        RendererKind::Http => {
            if session.headed {
                tracing::warn!("--headed has no effect with the http renderer");
            }
            Ok(Box::new(HttpRenderer::new()?))
        }
        RendererKind::Chromium => launch_chromium(session.headed),
    }
}

#[cfg(feature = "browser")]
fn launch_chromium(headed: bool) -> Result<Box<dyn Renderer>> {
    Ok(Box::new(crate::render::ChromiumRenderer::launch(headed)?))
}

#[cfg(not(feature = "browser"))]
fn launch_chromium(_headed: bool) -> Result<Box<dyn Renderer>> {
    Err(crate::error::HarvesterError::Browser(
        "this build has no Chromium support; rebuild with --features browser".to_string(),
    ))
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message("Starting...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Spinner line for the current crawl position.
fn progress_message(progress: &CrawlProgress) -> String {
    let activity = match progress.phase {
        CrawlPhase::Idle => "Starting",
        CrawlPhase::DiscoveringTargets => "Discovering targets",
        CrawlPhase::EnumeratingChildren => "Reading listing",
        CrawlPhase::VisitingChild => "Reading item",
        CrawlPhase::Done => "Done",
        CrawlPhase::Error => "Failed",
    };
    format!(
        "{activity} (target {}, page {}, {} records written)",
        progress.target_index + 1,
        progress.page_number,
        progress.written_total
    )
}

fn print_summary(summary: &CrawlSummary) {
    println!(
        "{} {}",
        style("Records written:").green().bold(),
        summary.records_written
    );
    println!("  Targets visited: {}", summary.targets_visited);
    if !summary.skips.is_empty() {
        println!("  Skipped: {}", style(summary.skips.len()).yellow().bold());
        for skip in &summary.skips {
            println!(
                "    {} #{} {}: {}",
                skip.target, skip.position, skip.url, skip.reason
            );
        }
    }
}
