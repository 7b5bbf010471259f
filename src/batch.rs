//! Batch orchestration with per-item failure isolation
//!
//! Every item is sent through the remover in input order. Successes are
//! archived under a derived name and the first few are kept for preview;
//! failures are recorded and reported without stopping the batch.

use crate::{
    archive::{ArchiveBuilder, ArchiveDestination},
    config::RemovalConfig,
    error::Result,
    remover::BackgroundRemover,
    services::{BatchProcessingStats, ProcessingStage, ProgressReporter, ProgressUpdate},
    types::{BatchOutcome, ImageItem, ItemFailure, ItemOutcome, ProcessedImage},
};
use instant::Instant;
use std::path::Path;
use tracing::{info_span, instrument};

/// Base name for an item: the file name without directories or extension,
/// or `image_<position>` when no usable name is known
#[must_use]
pub fn derive_base_name(name: Option<&str>, position: usize) -> String {
    name.and_then(|name| Path::new(name).file_stem())
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map_or_else(|| format!("image_{position}"), ToString::to_string)
}

/// Archive entry name for a base name, e.g. `cat` + `_no_bg.png`
#[must_use]
pub fn archive_entry_name(base_name: &str, suffix: &str) -> String {
    format!("{base_name}{suffix}")
}

/// Runs batches of images through a [`BackgroundRemover`]
#[derive(Debug, Clone, Default)]
pub struct BatchProcessor {
    config: RemovalConfig,
}

impl BatchProcessor {
    #[must_use]
    pub fn new(config: RemovalConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &RemovalConfig {
        &self.config
    }

    /// Process every item and package the successes
    ///
    /// An empty input produces an empty outcome with no archive. When no item
    /// succeeds no archive is written either.
    ///
    /// # Errors
    /// Only writing the archive can fail the whole batch; item failures are
    /// recorded in the returned outcome.
    #[instrument(skip_all, fields(items = items.len(), remover = remover.name()))]
    pub fn process<R>(
        &self,
        items: &[ImageItem],
        remover: &mut R,
        destination: &ArchiveDestination,
        reporter: &dyn ProgressReporter,
    ) -> Result<BatchOutcome>
    where
        R: BackgroundRemover + ?Sized,
    {
        let mut outcome = BatchOutcome::default();
        if items.is_empty() {
            log::debug!("Empty batch, nothing to process");
            return Ok(outcome);
        }

        let start = Instant::now();
        let total = items.len();
        let mut archive = ArchiveBuilder::new();
        reporter.report_progress(ProgressUpdate::new(ProcessingStage::BatchInitialization, start));

        for (index, item) in items.iter().enumerate() {
            let position = index + 1;
            let base_name = derive_base_name(item.name.as_deref(), position);
            let entry_name = archive_entry_name(&base_name, &self.config.archive_suffix);
            let display_name = item.name.as_deref().unwrap_or(&base_name);

            let _span = info_span!("batch_item", position, name = display_name).entered();
            reporter.report_item_started(position, total, display_name);

            match remover.remove_background(&item.bytes) {
                Ok(bytes) => {
                    if outcome.previews.len() < self.config.preview_limit {
                        outcome.previews.push(ProcessedImage {
                            name: entry_name.clone(),
                            bytes: bytes.clone(),
                        });
                    }
                    archive.add(entry_name.clone(), bytes);
                    outcome.items.push(ItemOutcome::Processed {
                        position,
                        entry_name,
                    });
                },
                Err(e) => {
                    log::warn!("Error processing image {position}: {e}");
                    let failure = ItemFailure {
                        position,
                        name: item.name.clone(),
                        reason: e.to_string(),
                    };
                    reporter.report_item_failed(&failure);
                    outcome.items.push(ItemOutcome::Failed(failure));
                },
            }
        }

        if archive.is_empty() {
            log::warn!("No images could be processed, skipping archive");
        } else {
            reporter.report_progress(ProgressUpdate::new(ProcessingStage::Archiving, start));
            outcome.archive = Some(archive.finish(destination)?);
        }

        reporter.report_progress(ProgressUpdate::new(ProcessingStage::BatchFinalization, start));
        let stats = BatchProcessingStats::new(total, outcome.failed(), start);
        log::info!(
            "Batch finished: {}/{} images processed",
            stats.items_completed,
            stats.items_total
        );
        reporter.report_completion(&stats);

        Ok(outcome)
    }

    /// Process one item without archiving, naming the result like an entry
    ///
    /// # Errors
    /// Propagates the remover's error.
    pub fn process_single<R>(&self, item: &ImageItem, remover: &mut R) -> Result<ProcessedImage>
    where
        R: BackgroundRemover + ?Sized,
    {
        let base_name = derive_base_name(item.name.as_deref(), 1);
        let bytes = remover.remove_background(&item.bytes)?;
        Ok(ProcessedImage {
            name: archive_entry_name(&base_name, &self.config.archive_suffix),
            bytes,
        })
    }
}
