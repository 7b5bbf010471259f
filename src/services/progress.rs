//! Progress reporting service
//!
//! Batch and folder runs report per-item progress through [`ProgressReporter`]
//! so front ends can choose between console lines, a progress bar or silence.

use crate::types::ItemFailure;
use instant::Instant;

/// Stages of a batch or folder run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Scanning inputs before a batch
    BatchInitialization,
    /// Writing the result archive
    Archiving,
    /// All items handled, statistics follow
    BatchFinalization,
}

impl ProcessingStage {
    /// Get a human-readable description of the processing stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::BatchInitialization => "Initializing batch processing",
            ProcessingStage::Archiving => "Writing result archive",
            ProcessingStage::BatchFinalization => "Finalizing batch processing",
        }
    }

    /// Get the typical progress percentage for this stage
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        match self {
            ProcessingStage::BatchInitialization => 5,
            ProcessingStage::Archiving => 90,
            ProcessingStage::BatchFinalization => 100,
        }
    }
}

/// Progress update containing stage and timing information
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub stage: ProcessingStage,
    /// Progress percentage (0-100)
    pub progress: u8,
    pub description: String,
    /// Elapsed time since processing started (milliseconds)
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(stage: ProcessingStage, start_time: Instant) -> Self {
        Self::with_description(stage, stage.description().to_string(), start_time)
    }

    #[must_use]
    pub fn with_description(
        stage: ProcessingStage,
        description: String,
        start_time: Instant,
    ) -> Self {
        Self {
            progress: stage.progress_percentage(),
            elapsed_ms: u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX),
            stage,
            description,
        }
    }
}

/// Statistics for a finished batch or folder run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchProcessingStats {
    pub items_completed: usize,
    pub items_total: usize,
    pub items_failed: usize,
    /// Wall-clock duration of the run in milliseconds
    pub elapsed_ms: u64,
}

impl BatchProcessingStats {
    #[must_use]
    pub fn new(items_total: usize, items_failed: usize, start_time: Instant) -> Self {
        Self {
            items_completed: items_total.saturating_sub(items_failed),
            items_total,
            items_failed,
            elapsed_ms: u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Items per second over the whole run
    #[must_use]
    pub fn processing_rate(&self) -> f64 {
        if self.elapsed_ms == 0 {
            return 0.0;
        }
        self.items_total as f64 / (self.elapsed_ms as f64 / 1000.0)
    }
}

/// Trait for reporting progress during batch and folder operations
pub trait ProgressReporter: Send + Sync {
    /// Report a stage-level progress update
    fn report_progress(&self, update: ProgressUpdate) {
        drop(update);
    }

    /// Report that item `position` of `total` (1-based) is about to be processed
    fn report_item_started(&self, position: usize, total: usize, name: &str);

    /// Report that an item failed; the run continues unless configured otherwise
    fn report_item_failed(&self, failure: &ItemFailure);

    /// Report the end of a run
    fn report_completion(&self, stats: &BatchProcessingStats);
}

/// No-op progress reporter that discards all progress updates
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_item_started(&self, _position: usize, _total: usize, _name: &str) {}

    fn report_item_failed(&self, _failure: &ItemFailure) {}

    fn report_completion(&self, _stats: &BatchProcessingStats) {}
}

/// Console progress reporter printing one line per item
///
/// Item lines go to stdout in the form `Processing image i/N: name`, failures
/// to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    /// Create a new console progress reporter
    ///
    /// # Arguments
    /// * `verbose` - Whether to log stage updates and run statistics
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if self.verbose {
            log::info!(
                "[{}%] {} ({}ms elapsed)",
                update.progress,
                update.description,
                update.elapsed_ms
            );
        }
    }

    fn report_item_started(&self, position: usize, total: usize, name: &str) {
        println!("Processing image {position}/{total}: {name}");
    }

    fn report_item_failed(&self, failure: &ItemFailure) {
        eprintln!("{}", failure_line(failure));
    }

    fn report_completion(&self, stats: &BatchProcessingStats) {
        if self.verbose {
            log::info!(
                "Processed {}/{} images in {}ms ({:.2} images/sec)",
                stats.items_completed,
                stats.items_total,
                stats.elapsed_ms,
                stats.processing_rate()
            );
        }
    }
}

/// Progress reporter driving an `indicatif` progress bar
#[cfg(feature = "cli")]
pub struct IndicatifProgressReporter {
    bar: indicatif::ProgressBar,
}

#[cfg(feature = "cli")]
impl IndicatifProgressReporter {
    #[must_use]
    pub fn new() -> Self {
        let bar = indicatif::ProgressBar::new(0);
        if let Ok(style) = indicatif::ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        Self { bar }
    }
}

#[cfg(feature = "cli")]
impl Default for IndicatifProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "cli")]
impl ProgressReporter for IndicatifProgressReporter {
    fn report_item_started(&self, position: usize, total: usize, name: &str) {
        self.bar.set_length(total as u64);
        self.bar.set_position(position.saturating_sub(1) as u64);
        self.bar.set_message(name.to_string());
    }

    fn report_item_failed(&self, failure: &ItemFailure) {
        self.bar.println(failure_line(failure));
    }

    fn report_completion(&self, stats: &BatchProcessingStats) {
        self.bar.set_position(stats.items_total as u64);
        self.bar.finish_with_message(format!(
            "{} processed, {} failed",
            stats.items_completed, stats.items_failed
        ));
    }
}

fn failure_line(failure: &ItemFailure) -> String {
    match &failure.name {
        Some(name) => format!(
            "Error processing image {} ({name}): {}",
            failure.position, failure.reason
        ),
        None => format!(
            "Error processing image {}: {}",
            failure.position, failure.reason
        ),
    }
}
