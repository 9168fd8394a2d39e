//! Human-like pacing around navigation.
//!
//! Every page load and read is surrounded by a random delay, and listing and
//! item pages get a few pointer moves and scrolls. Interaction failures are
//! logged and dropped; pacing never fails the crawl.

use std::thread;
use std::time::Duration;

use crate::config::{DEFAULT_DELAY_MAX_SECS, DEFAULT_DELAY_MIN_SECS};
use crate::error::Result;
use crate::render::{PageHandle, Renderer};

/// Bounds of the random delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingConfig {
    pub min: Duration,
    pub max: Duration,
    /// Emit pointer and scroll actions on visited pages.
    pub humanize: bool,
    /// Take any delay at all. Off only for tests and dry runs.
    pub delays: bool,
}

impl PacingConfig {
    /// Bounds in seconds, as given on the command line.
    ///
    /// Call [`validate_delay_bounds`](crate::config::validate_delay_bounds) first;
    /// inverted bounds are swapped here rather than rejected.
    #[must_use]
    pub fn from_secs(min: f64, max: f64) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min: Duration::from_secs_f64(min.max(0.0)),
            max: Duration::from_secs_f64(max.max(0.0)),
            humanize: true,
            delays: true,
        }
    }

    /// No delays and no interaction. Used by tests and dry runs.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
            humanize: false,
            delays: false,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self::from_secs(DEFAULT_DELAY_MIN_SECS, DEFAULT_DELAY_MAX_SECS)
    }
}

/// Produces delays and simulated interaction.
#[derive(Debug, Clone)]
pub struct Pacer {
    config: PacingConfig,
}

impl Pacer {
    #[must_use]
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    /// Draw a delay uniformly from the configured bounds.
    #[must_use]
    pub fn delay(&self) -> Duration {
        if !self.config.delays {
            return Duration::ZERO;
        }
        uniform(self.config.min, self.config.max)
    }

    /// Draw the longer delay taken between two targets.
    #[must_use]
    pub fn target_delay(&self) -> Duration {
        if !self.config.delays {
            return Duration::ZERO;
        }
        let min = (self.config.min.as_secs_f64() * 0.5).max(0.2);
        let max = (self.config.max.as_secs_f64() * 1.2).max(0.8);
        uniform(Duration::from_secs_f64(min), Duration::from_secs_f64(max.max(min)))
    }

    /// Block for a random delay.
    pub fn pace(&self) {
        sleep(self.delay());
    }

    /// Block for the delay taken between two targets.
    pub fn pace_between_targets(&self) {
        sleep(self.target_delay());
    }

    /// Pace once when the returned scope ends.
    ///
    /// Holding the scope across an item visit guarantees the trailing delay
    /// is taken however the visit ends.
    #[must_use = "the delay is taken when the scope is dropped"]
    pub fn scope(&self) -> PaceScope<'_> {
        PaceScope { pacer: self }
    }

    /// Move the pointer and scroll a few times, pausing in between.
    ///
    /// Failures of the interaction calls are swallowed.
    pub fn humanize<R: Renderer + ?Sized>(&self, renderer: &mut R, page: &PageHandle) {
        if !self.config.humanize {
            return;
        }
        if let Err(e) = self.try_humanize(renderer, page) {
            tracing::debug!(url = page.url(), error = %e, "Simulated interaction skipped");
        }
    }

    fn try_humanize<R: Renderer + ?Sized>(&self, renderer: &mut R, page: &PageHandle) -> Result<()> {
        for _ in 0..rand::random_range(2..=4) {
            renderer.simulate_pointer_movement(page)?;
            self.pace();
        }
        for _ in 0..rand::random_range(2..=4) {
            renderer.simulate_scroll(page)?;
            self.pace();
        }
        Ok(())
    }
}

/// Trailing delay taken on drop. See [`Pacer::scope`].
pub struct PaceScope<'a> {
    pacer: &'a Pacer,
}

impl Drop for PaceScope<'_> {
    fn drop(&mut self) {
        self.pacer.pace();
    }
}

fn uniform(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    Duration::from_secs_f64(rand::random_range(min.as_secs_f64()..=max.as_secs_f64()))
}

fn sleep(delay: Duration) {
    if delay.is_zero() {
        return;
    }
    tracing::debug!(delay_ms = delay.as_millis() as u64, "Pacing");
    thread::sleep(delay);
}
