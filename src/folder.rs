//! Folder mode: process every image in an input directory
//!
//! Results are written to the output directory under the input's own file
//! name, so re-running over the same inputs overwrites earlier outputs.

use crate::{
    config::{FolderConfig, RemovalConfig},
    error::{BgRemovalError, Result},
    remover::BackgroundRemover,
    services::{
        BatchProcessingStats, ImageIOService, ProcessingStage, ProgressReporter, ProgressUpdate,
    },
    types::ItemFailure,
};
use instant::Instant;
use std::path::{Path, PathBuf};
use tracing::{info_span, instrument};

/// List the accepted image files directly inside `dir`, sorted by name
///
/// Subdirectories are not descended into.
///
/// # Errors
/// - The directory cannot be read
pub fn find_image_files(dir: &Path, config: &RemovalConfig) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| BgRemovalError::file_io_error("read input directory", dir, &e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            let path = entry.path();
            if config.is_accepted_extension(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Result of a folder run
#[derive(Debug, Clone, Default)]
pub struct FolderSummary {
    pub output_dir: PathBuf,
    /// Output files written, in processing order
    pub written: Vec<PathBuf>,
    pub failures: Vec<ItemFailure>,
}

impl FolderSummary {
    #[must_use]
    pub fn total(&self) -> usize {
        self.written.len() + self.failures.len()
    }

    #[must_use]
    pub fn processed(&self) -> usize {
        self.written.len()
    }
}

/// Runs a remover over an input directory
#[derive(Debug, Clone, Default)]
pub struct FolderProcessor {
    removal_config: RemovalConfig,
    folder_config: FolderConfig,
}

impl FolderProcessor {
    #[must_use]
    pub fn new(removal_config: RemovalConfig, folder_config: FolderConfig) -> Self {
        Self {
            removal_config,
            folder_config,
        }
    }

    /// Process every accepted file in the input directory
    ///
    /// The output directory is created if missing. A failing file is
    /// reported and skipped unless `fail_fast` is set.
    ///
    /// # Errors
    /// - Input directory unreadable or output directory not creatable
    /// - The first item error when `fail_fast` is set
    #[instrument(skip_all, fields(input = %self.folder_config.input_dir.display()))]
    pub fn process<R>(&self, remover: &mut R, reporter: &dyn ProgressReporter) -> Result<FolderSummary>
    where
        R: BackgroundRemover + ?Sized,
    {
        let start = Instant::now();
        let input_dir = &self.folder_config.input_dir;
        let output_dir = &self.folder_config.output_dir;

        ImageIOService::ensure_directory(output_dir)?;
        let files = find_image_files(input_dir, &self.removal_config)?;
        let total = files.len();
        log::info!(
            "Found {total} images in {} to process",
            input_dir.display()
        );
        reporter.report_progress(ProgressUpdate::new(ProcessingStage::BatchInitialization, start));

        let mut summary = FolderSummary {
            output_dir: output_dir.clone(),
            ..FolderSummary::default()
        };

        for (index, input_path) in files.iter().enumerate() {
            let position = index + 1;
            let file_name = input_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            let _span = info_span!("folder_item", position, name = %file_name).entered();
            reporter.report_item_started(position, total, &file_name);

            let output_path = output_dir.join(&file_name);
            let result = ImageIOService::read_bytes(input_path)
                .and_then(|bytes| remover.remove_background(&bytes))
                .and_then(|output| ImageIOService::write_bytes(&output_path, &output));

            match result {
                Ok(()) => summary.written.push(output_path),
                Err(e) if self.folder_config.fail_fast => {
                    log::error!("Stopping at {}: {e}", input_path.display());
                    return Err(e);
                },
                Err(e) => {
                    log::warn!("Error processing image {position}: {e}");
                    let failure = ItemFailure {
                        position,
                        name: Some(file_name),
                        reason: e.to_string(),
                    };
                    reporter.report_item_failed(&failure);
                    summary.failures.push(failure);
                },
            }
        }

        reporter.report_progress(ProgressUpdate::new(ProcessingStage::BatchFinalization, start));
        reporter.report_completion(&BatchProcessingStats::new(
            total,
            summary.failures.len(),
            start,
        ));
        Ok(summary)
    }
}
