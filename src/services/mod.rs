//! Services separating I/O and progress reporting from processing logic

pub mod io;
pub mod progress;

pub use io::ImageIOService;
#[cfg(feature = "cli")]
pub use progress::IndicatifProgressReporter;
pub use progress::{
    BatchProcessingStats, ConsoleProgressReporter, NoOpProgressReporter, ProcessingStage,
    ProgressReporter, ProgressUpdate,
};
