#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # bgcut
//!
//! Background removal for batches of images, with per-item failure
//! isolation and zip packaging of the results.
//!
//! The segmentation itself sits behind the [`BackgroundRemover`] trait:
//! encoded image bytes in, PNG bytes with a transparent background out.
//! [`BackgroundRemovalProcessor`] implements it with an ONNX model run by
//! Tract; any `FnMut(&[u8]) -> Result<Vec<u8>>` closure implements it too.
//!
//! ## Features
//!
//! - **Batch processing**: every successful result goes into a zip archive,
//!   the first few are kept for preview, failing items are recorded and
//!   skipped
//! - **Folder mode**: process every PNG/JPEG in a directory into an output
//!   directory under the same file names
//! - **Interactive core**: single/multiple mode request handling with the
//!   status messages a front end displays
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgcut::{
//!     ArchiveDestination, BackgroundRemovalProcessor, BatchProcessor, ImageItem, ModelSpec,
//!     NoOpProgressReporter, RemovalConfig,
//! };
//!
//! # fn example() -> anyhow::Result<()> {
//! let spec = ModelSpec::new("models/isnet.onnx").with_input_size(1024);
//! let mut processor = BackgroundRemovalProcessor::from_model_spec(&spec)?;
//!
//! let items = vec![
//!     ImageItem::new("cat.jpg", std::fs::read("cat.jpg")?),
//!     ImageItem::new("dog.png", std::fs::read("dog.png")?),
//! ];
//! let outcome = BatchProcessor::new(RemovalConfig::default()).process(
//!     &items,
//!     &mut processor,
//!     &ArchiveDestination::File("processed_images.zip".into()),
//!     &NoOpProgressReporter,
//! )?;
//! println!("{} of {} processed", outcome.succeeded(), outcome.total());
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `tract` (default): Pure Rust ONNX backend
//! - `cli` (default): Command-line interface and progress bar
//! - `tracing-json`: JSON log output for the CLI

pub mod archive;
pub mod backends;
pub mod batch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod folder;
pub mod inference;
pub mod interactive;
pub mod models;
pub mod processor;
pub mod remover;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

pub use archive::{read_entry_names, ArchiveBuilder, ArchiveDestination};
pub use backends::*;
pub use batch::{archive_entry_name, derive_base_name, BatchProcessor};
pub use config::{FolderConfig, RemovalConfig, RemovalConfigBuilder};
pub use error::{BgRemovalError, Result};
pub use folder::{find_image_files, FolderProcessor, FolderSummary};
pub use inference::InferenceBackend;
pub use interactive::{InteractiveResponse, InteractiveSession, Mode, Visibility};
pub use models::{ModelInfo, ModelManager, ModelSpec, PreprocessingConfig};
pub use processor::{BackgroundRemovalProcessor, ProcessingTimings, RemovalResult};
pub use remover::{remove_background_from_image, BackgroundRemover};
pub use services::{
    BatchProcessingStats, ConsoleProgressReporter, ImageIOService, NoOpProgressReporter,
    ProcessingStage, ProgressReporter, ProgressUpdate,
};
pub use types::{
    ArchiveArtifact, BatchOutcome, ImageItem, ItemFailure, ItemOutcome, MaskStatistics,
    ProcessedImage, SegmentationMask,
};
pub use utils::{ImagePreprocessor, Letterbox, PreprocessingOptions};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, spans, TracingConfig, TracingFormat};
