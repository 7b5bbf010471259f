//! Configuration types for batch, folder and interactive processing

use crate::error::{BgRemovalError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Maximum number of results shown without opening the archive
pub const DEFAULT_PREVIEW_LIMIT: usize = 5;

/// Suffix appended to the derived base name of every archive entry
pub const DEFAULT_ARCHIVE_SUFFIX: &str = "_no_bg.png";

/// File name of the archive produced by interactive multiple mode
pub const DEFAULT_ARCHIVE_NAME: &str = "processed_images.zip";

/// Input directory scanned by folder mode
pub const DEFAULT_INPUT_DIR: &str = "Input_images";

/// Output directory written by folder mode
pub const DEFAULT_OUTPUT_DIR: &str = "Output_images";

/// Extensions accepted as input images (compared case-insensitively)
pub const DEFAULT_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Configuration for background removal batches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalConfig {
    /// Number of successful results kept for preview
    pub preview_limit: usize,

    /// Suffix for archive entry names, including the extension
    pub archive_suffix: String,

    /// Accepted input file extensions, lowercase without the dot
    pub extensions: Vec<String>,

    /// Enable debug mode (additional logging)
    pub debug: bool,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            archive_suffix: DEFAULT_ARCHIVE_SUFFIX.to_string(),
            extensions: DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect(),
            debug: false,
        }
    }
}

impl RemovalConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use bgcut::RemovalConfig;
    ///
    /// let config = RemovalConfig::builder()
    ///     .preview_limit(3)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.preview_limit, 3);
    /// ```
    #[must_use]
    pub fn builder() -> RemovalConfigBuilder {
        RemovalConfigBuilder::new()
    }

    /// Check a path's extension against the accepted list (case-insensitive)
    #[must_use]
    pub fn is_accepted_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|accepted| *accepted == ext)
            })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.preview_limit == 0 {
            return Err(BgRemovalError::config_value_error(
                "preview_limit",
                self.preview_limit,
                "1 or more",
                Some(DEFAULT_PREVIEW_LIMIT),
            ));
        }
        if self.archive_suffix.is_empty() || self.archive_suffix.contains(['/', '\\']) {
            return Err(BgRemovalError::invalid_config(format!(
                "Archive suffix must be a non-empty file name fragment, got '{}'",
                self.archive_suffix
            )));
        }
        if self.extensions.is_empty() {
            return Err(BgRemovalError::invalid_config(
                "At least one input extension is required",
            ));
        }
        Ok(())
    }
}

/// Builder for [`RemovalConfig`]
#[derive(Debug, Default)]
pub struct RemovalConfigBuilder {
    config: RemovalConfig,
}

impl RemovalConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn preview_limit(mut self, limit: usize) -> Self {
        self.config.preview_limit = limit;
        self
    }

    #[must_use]
    pub fn archive_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.config.archive_suffix = suffix.into();
        self
    }

    /// Replace the accepted extensions; leading dots are stripped
    #[must_use]
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    pub fn build(self) -> Result<RemovalConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Folder mode configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Stop at the first failing file instead of recording it and continuing
    pub fail_fast: bool,
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            fail_fast: false,
        }
    }
}

impl FolderConfig {
    #[must_use]
    pub fn new<I: Into<PathBuf>, O: Into<PathBuf>>(input_dir: I, output_dir: O) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            fail_fast: false,
        }
    }

    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}
