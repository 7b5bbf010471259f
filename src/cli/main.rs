//! Background removal CLI
//!
//! Folder, single-image and batch front ends over the model-backed
//! processor.

use super::config::CliConfigBuilder;
use crate::{
    archive::ArchiveDestination,
    config::{DEFAULT_ARCHIVE_NAME, DEFAULT_INPUT_DIR, DEFAULT_OUTPUT_DIR},
    folder::FolderProcessor,
    interactive::{InteractiveSession, Mode},
    models::{ModelManager, DEFAULT_INPUT_SIZE},
    processor::BackgroundRemovalProcessor,
    remover::BackgroundRemover,
    services::{
        ConsoleProgressReporter, ImageIOService, IndicatifProgressReporter, ProgressReporter,
    },
    tracing_config::{init_cli_tracing, spans},
    types::{ArchiveArtifact, ImageItem},
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use instant::Instant;
use log::info;
use std::path::{Path, PathBuf};

/// Remove image backgrounds with an ONNX segmentation model
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgcut")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the ONNX segmentation model
    #[arg(short, long, global = true, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Square model input size in pixels
    #[arg(long, global = true, default_value_t = DEFAULT_INPUT_SIZE)]
    pub input_size: u32,

    /// Number of results kept for preview in batch mode
    #[arg(long, global = true, default_value_t = crate::config::DEFAULT_PREVIEW_LIMIT)]
    pub preview_limit: usize,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Explicit tracing filter directive (overrides -v), e.g. "bgcut=debug"
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_filter: Option<String>,

    /// Show a progress bar instead of per-image lines
    #[arg(long, global = true)]
    pub progress_bar: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Process every PNG/JPEG image in a folder
    Folder {
        /// Directory scanned for input images
        #[arg(long, default_value = DEFAULT_INPUT_DIR)]
        input: PathBuf,

        /// Directory receiving same-named outputs (created if missing)
        #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
        output: PathBuf,

        /// Stop at the first failing image
        #[arg(long)]
        fail_fast: bool,
    },

    /// Remove the background of one image
    Single {
        input: PathBuf,

        /// Output PNG path [default: <stem>_no_bg.png beside the input]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Process several images into a preview list and a zip archive
    Batch {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Archive written with every successful result
        #[arg(long, default_value = DEFAULT_ARCHIVE_NAME)]
        archive: PathBuf,
    },

    /// Print information about the configured model and exit
    ShowModel,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Folder { .. } => "folder",
            Self::Single { .. } => "single",
            Self::Batch { .. } => "batch",
            Self::ShowModel => "show-model",
        }
    }
}

pub fn main() -> Result<()> {
    let cli = Cli::parse();
    run(&cli)
}

/// Run a parsed command line
pub fn run(cli: &Cli) -> Result<()> {
    let session_id = init_cli_tracing(cli.verbose, cli.log_filter.as_deref())
        .context("Failed to initialize tracing")?;
    let _session = spans::session(&session_id, cli.command.name()).entered();

    CliConfigBuilder::validate_cli(cli).context("Invalid CLI arguments")?;

    match &cli.command {
        Command::ShowModel => show_model(cli),
        Command::Folder {
            input,
            output,
            fail_fast,
        } => run_folder(cli, input, output, *fail_fast),
        Command::Single { input, output } => run_single(cli, input, output.as_deref()),
        Command::Batch { inputs, archive } => run_batch(cli, inputs, archive),
    }
}

fn create_processor(cli: &Cli) -> Result<BackgroundRemovalProcessor> {
    let model_spec = CliConfigBuilder::model_spec(cli)?;
    let _span = spans::model_loading(&model_spec.display_name()).entered();
    info!("Model: {}", model_spec.path.display());

    let mut processor = BackgroundRemovalProcessor::from_model_spec(&model_spec)
        .context("Failed to create background removal processor")?;
    processor
        .initialize()
        .context("Failed to load segmentation model")?;
    Ok(processor)
}

fn create_reporter(cli: &Cli) -> Box<dyn ProgressReporter> {
    if cli.progress_bar {
        Box::new(IndicatifProgressReporter::new())
    } else {
        Box::new(ConsoleProgressReporter::new(cli.verbose > 0))
    }
}

fn show_model(cli: &Cli) -> Result<()> {
    let model_spec = CliConfigBuilder::model_spec(cli)?;
    let manager = ModelManager::from_spec(&model_spec).context("Invalid model specification")?;
    let model_info = manager.get_info()?;
    let preprocessing = manager.get_preprocessing_config()?;

    println!("Model: {}", model_info.name);
    println!("  Path: {}", model_spec.path.display());
    println!(
        "  Size: {:.2} MB",
        model_info.size_bytes as f64 / (1024.0 * 1024.0)
    );
    println!("  Input shape: {:?}", model_info.input_shape);
    println!("  Output shape: {:?}", model_info.output_shape);
    println!(
        "  Normalization: mean {:?}, std {:?}",
        preprocessing.normalization_mean, preprocessing.normalization_std
    );
    Ok(())
}

fn run_folder(cli: &Cli, input: &Path, output: &Path, fail_fast: bool) -> Result<()> {
    let removal_config = CliConfigBuilder::removal_config(cli)?;
    let folder_config = CliConfigBuilder::folder_config(input, output, fail_fast);
    let mut processor = create_processor(cli)?;
    let reporter = create_reporter(cli);

    let _span = spans::folder_processing(input, output).entered();
    let start_time = Instant::now();
    let summary = FolderProcessor::new(removal_config, folder_config)
        .process(&mut processor, reporter.as_ref())
        .with_context(|| format!("Failed to process folder {}", input.display()))?;

    if summary.total() == 0 {
        println!("No images found in {}", input.display());
    }
    println!("Processed images saved to {}", summary.output_dir.display());
    println!(
        "{} of {} images processed, {} failed",
        summary.processed(),
        summary.total(),
        summary.failures.len()
    );
    info!(
        "Folder run finished in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

fn run_single(cli: &Cli, input: &Path, output: Option<&Path>) -> Result<()> {
    let bytes = ImageIOService::read_bytes(input)?;
    let upload = ImageItem::new(file_name(input), bytes);
    let session = InteractiveSession::new(
        CliConfigBuilder::removal_config(cli)?,
        ArchiveDestination::Memory,
    );
    let mut processor = create_processor(cli)?;

    let response = session.handle(Mode::Single, std::slice::from_ref(&upload), &mut processor);
    let Some(image) = response.image else {
        anyhow::bail!("{}", response.status);
    };

    let output_path = output.map_or_else(
        || input.with_file_name(&image.name),
        Path::to_path_buf,
    );
    ImageIOService::write_bytes(&output_path, &image.bytes)?;
    println!("{}", response.status);
    println!("Saved {}", output_path.display());
    Ok(())
}

fn run_batch(cli: &Cli, inputs: &[PathBuf], archive: &Path) -> Result<()> {
    let uploads = read_uploads(inputs);
    let mut processor = create_processor(cli)?;
    let reporter = create_reporter(cli);

    let _span = spans::batch_processing(uploads.len()).entered();
    process_uploads(cli, &uploads, archive, &mut processor, reporter.as_ref())
}

/// Read every input; an unreadable file becomes an empty upload so the
/// batch records it as a failure at its position and carries on
fn read_uploads(inputs: &[PathBuf]) -> Vec<ImageItem> {
    inputs
        .iter()
        .map(|path| {
            let bytes = ImageIOService::read_bytes(path).unwrap_or_else(|e| {
                log::warn!("Skipping unreadable input {}: {e}", path.display());
                eprintln!("Failed to read {}: {e}", path.display());
                Vec::new()
            });
            ImageItem::new(file_name(path), bytes)
        })
        .collect()
}

fn process_uploads<R>(
    cli: &Cli,
    uploads: &[ImageItem],
    archive: &Path,
    remover: &mut R,
    reporter: &dyn ProgressReporter,
) -> Result<()>
where
    R: BackgroundRemover + ?Sized,
{
    let session = InteractiveSession::new(
        CliConfigBuilder::removal_config(cli)?,
        ArchiveDestination::File(archive.to_path_buf()),
    );
    let response = session.handle_with_reporter(Mode::Multiple, uploads, remover, reporter);

    for preview in &response.gallery {
        println!("Preview: {}", preview.name);
    }
    if let Some(ArchiveArtifact::File { path, entries }) = &response.archive {
        println!("Archive: {} ({entries} images)", path.display());
    }
    println!("{}", response.status);

    if response.archive.is_none() {
        anyhow::bail!("{}", response.status);
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
