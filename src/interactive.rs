//! Interactive front end logic
//!
//! A session answers one request at a time: either a single upload shown as
//! one transparent image, or several uploads shown as a preview gallery plus
//! a downloadable archive. Errors never escape a request; they become the
//! status message instead.

use crate::{
    archive::ArchiveDestination,
    batch::{archive_entry_name, derive_base_name, BatchProcessor},
    config::RemovalConfig,
    error::{BgRemovalError, Result},
    remover::{remove_background_from_image, BackgroundRemover},
    services::{ImageIOService, NoOpProgressReporter, ProgressReporter},
    types::{ArchiveArtifact, ImageItem, ItemFailure, ProcessedImage},
};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const STATUS_UPLOAD_ONE: &str = "Please upload an image.";
pub const STATUS_UPLOAD_MANY: &str = "Please upload at least one image.";
pub const STATUS_SINGLE_DONE: &str = "Background removed successfully.";
pub const STATUS_NONE_PROCESSED: &str = "No images could be processed.";

/// Processing mode selected by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Single,
    Multiple,
}

impl FromStr for Mode {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "single" | "single image" => Ok(Self::Single),
            "multiple" | "multiple images" => Ok(Self::Multiple),
            other => Err(BgRemovalError::invalid_config(format!(
                "Unknown mode '{other}', expected 'Single Image' or 'Multiple Images'"
            ))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "Single Image"),
            Self::Multiple => write!(f, "Multiple Images"),
        }
    }
}

/// Which inputs and outputs are shown for a mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visibility {
    pub single_input: bool,
    pub multiple_input: bool,
    pub single_output: bool,
    pub gallery: bool,
    pub archive_download: bool,
}

impl Visibility {
    #[must_use]
    pub fn for_mode(mode: Mode) -> Self {
        let single = mode == Mode::Single;
        Self {
            single_input: single,
            multiple_input: !single,
            single_output: single,
            gallery: !single,
            archive_download: !single,
        }
    }
}

/// Everything a front end needs to render the result of one request
#[derive(Debug, Clone, Default)]
pub struct InteractiveResponse {
    /// Single mode result
    pub image: Option<ProcessedImage>,
    /// Multiple mode previews
    pub gallery: Vec<ProcessedImage>,
    pub archive: Option<ArchiveArtifact>,
    pub failures: Vec<ItemFailure>,
    pub status: String,
}

impl InteractiveResponse {
    fn status<S: Into<String>>(status: S) -> Self {
        Self {
            status: status.into(),
            ..Self::default()
        }
    }
}

/// Request handler for the interactive front end
#[derive(Debug, Clone)]
pub struct InteractiveSession {
    batch: BatchProcessor,
    archive_destination: ArchiveDestination,
}

impl InteractiveSession {
    #[must_use]
    pub fn new(config: RemovalConfig, archive_destination: ArchiveDestination) -> Self {
        Self {
            batch: BatchProcessor::new(config),
            archive_destination,
        }
    }

    /// Handle one request with silent progress
    pub fn handle<R>(&self, mode: Mode, uploads: &[ImageItem], remover: &mut R) -> InteractiveResponse
    where
        R: BackgroundRemover + ?Sized,
    {
        self.handle_with_reporter(mode, uploads, remover, &NoOpProgressReporter)
    }

    /// Handle one request, reporting multiple mode progress to `reporter`
    pub fn handle_with_reporter<R>(
        &self,
        mode: Mode,
        uploads: &[ImageItem],
        remover: &mut R,
        reporter: &dyn ProgressReporter,
    ) -> InteractiveResponse
    where
        R: BackgroundRemover + ?Sized,
    {
        log::debug!("Handling {mode} request with {} uploads", uploads.len());
        let response = match mode {
            Mode::Single => self.handle_single(uploads.first(), remover),
            Mode::Multiple => self.handle_multiple(uploads, remover, reporter),
        };
        log::info!("{}", response.status);
        response
    }

    fn handle_single<R>(&self, upload: Option<&ImageItem>, remover: &mut R) -> InteractiveResponse
    where
        R: BackgroundRemover + ?Sized,
    {
        let Some(upload) = upload else {
            return InteractiveResponse::status(STATUS_UPLOAD_ONE);
        };

        match self.remove_single(upload, remover) {
            Ok(image) => InteractiveResponse {
                image: Some(image),
                status: STATUS_SINGLE_DONE.to_string(),
                ..InteractiveResponse::default()
            },
            Err(e) => {
                log::error!("Single image processing failed: {e}");
                InteractiveResponse::status(format!("Error: {e}"))
            },
        }
    }

    fn remove_single<R>(&self, upload: &ImageItem, remover: &mut R) -> Result<ProcessedImage>
    where
        R: BackgroundRemover + ?Sized,
    {
        let image = ImageIOService::load_from_bytes(&upload.bytes)?;
        let result = remove_background_from_image(remover, &image)?;
        let base_name = derive_base_name(upload.name.as_deref(), 1);
        Ok(ProcessedImage {
            name: archive_entry_name(&base_name, &self.batch.config().archive_suffix),
            bytes: ImageIOService::encode_png(&DynamicImage::ImageRgba8(result))?,
        })
    }

    fn handle_multiple<R>(
        &self,
        uploads: &[ImageItem],
        remover: &mut R,
        reporter: &dyn ProgressReporter,
    ) -> InteractiveResponse
    where
        R: BackgroundRemover + ?Sized,
    {
        if uploads.is_empty() {
            return InteractiveResponse::status(STATUS_UPLOAD_MANY);
        }

        match self
            .batch
            .process(uploads, remover, &self.archive_destination, reporter)
        {
            Ok(outcome) => {
                let failures = outcome.failures().cloned().collect();
                let status = if outcome.succeeded() == 0 {
                    STATUS_NONE_PROCESSED.to_string()
                } else {
                    format!(
                        "Successfully processed {} of {} images.",
                        outcome.succeeded(),
                        outcome.total()
                    )
                };
                InteractiveResponse {
                    image: None,
                    gallery: outcome.previews,
                    archive: outcome.archive,
                    failures,
                    status,
                }
            },
            Err(e) => {
                log::error!("Batch processing failed: {e}");
                InteractiveResponse::status(format!("Error: {e}"))
            },
        }
    }
}
