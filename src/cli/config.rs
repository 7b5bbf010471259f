//! Conversion of CLI arguments into library configuration

use crate::cli::main_impl::Cli;
use crate::{
    config::{FolderConfig, RemovalConfig},
    models::ModelSpec,
};
use anyhow::{Context, Result};
use std::path::Path;

/// Convert CLI arguments to library configuration
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Model specification from `--model` and `--input-size`
    pub(crate) fn model_spec(cli: &Cli) -> Result<ModelSpec> {
        let path = cli.model.as_ref().context(
            "No model specified. Use --model to point at an ONNX segmentation model file.",
        )?;
        Ok(ModelSpec::new(path).with_input_size(cli.input_size))
    }

    pub(crate) fn removal_config(cli: &Cli) -> Result<RemovalConfig> {
        RemovalConfig::builder()
            .preview_limit(cli.preview_limit)
            .debug(cli.verbose >= 2)
            .build()
            .context("Invalid configuration")
    }

    pub(crate) fn folder_config(input: &Path, output: &Path, fail_fast: bool) -> FolderConfig {
        FolderConfig::new(input, output).with_fail_fast(fail_fast)
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        Self::removal_config(cli)?;
        if !(32..=4096).contains(&cli.input_size) {
            anyhow::bail!(
                "Invalid input size {} (valid range: 32-4096)",
                cli.input_size
            );
        }
        if let Some(model) = &cli.model {
            if !model.is_file() {
                anyhow::bail!("Model file not found: {}", model.display());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("bgcut").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_model_spec_requires_model() {
        let cli = parse(&["show-model"]);
        let err = CliConfigBuilder::model_spec(&cli).unwrap_err();
        assert!(err.to_string().contains("--model"));

        let cli = parse(&["show-model", "--model", "m.onnx", "--input-size", "320"]);
        let spec = CliConfigBuilder::model_spec(&cli).unwrap();
        assert_eq!(spec.path, PathBuf::from("m.onnx"));
        assert_eq!(spec.input_size, 320);
    }

    #[test]
    fn test_removal_config_from_cli() {
        let cli = parse(&["folder", "--preview-limit", "2", "-vv"]);
        let config = CliConfigBuilder::removal_config(&cli).unwrap();
        assert_eq!(config.preview_limit, 2);
        assert!(config.debug);
    }

    #[test]
    fn test_validate_cli() {
        assert!(CliConfigBuilder::validate_cli(&parse(&["folder"])).is_ok());
        assert!(CliConfigBuilder::validate_cli(&parse(&["folder", "--preview-limit", "0"])).is_err());
        assert!(CliConfigBuilder::validate_cli(&parse(&["folder", "--input-size", "8"])).is_err());

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.onnx");
        let cli = parse(&["folder", "--model", missing.to_str().unwrap()]);
        assert!(CliConfigBuilder::validate_cli(&cli).is_err());
    }

    #[test]
    fn test_folder_config() {
        let config = CliConfigBuilder::folder_config(Path::new("in"), Path::new("out"), true);
        assert_eq!(config.input_dir, PathBuf::from("in"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert!(config.fail_fast);
    }
}
