//! Model specification and loading
//!
//! A model is an ONNX file on disk. Preprocessing parameters default to the
//! `ISNet` values and can be overridden by a `HuggingFace` style
//! `preprocessor_config.json` placed next to the model file.

use crate::error::{BgRemovalError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default square input size used by `ISNet` style models
pub const DEFAULT_INPUT_SIZE: u32 = 1024;

/// Name of the optional preprocessing sidecar file
pub const PREPROCESSOR_CONFIG_FILE: &str = "preprocessor_config.json";

/// Model file location plus the input resolution it expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub path: PathBuf,
    pub input_size: u32,
}

impl ModelSpec {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            input_size: DEFAULT_INPUT_SIZE,
        }
    }

    #[must_use]
    pub fn with_input_size(mut self, input_size: u32) -> Self {
        self.input_size = input_size;
        self
    }

    /// Get a display name for tracing and logging
    #[must_use]
    pub fn display_name(&self) -> String {
        format!(
            "external:{}",
            self.path.file_name().unwrap_or_default().to_string_lossy()
        )
    }
}

/// Image normalization applied before inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Target size as `[height, width]`
    pub target_size: [u32; 2],
    /// Per-channel mean in the 0-1 range
    pub normalization_mean: [f32; 3],
    /// Per-channel standard deviation in the 0-1 range
    pub normalization_std: [f32; 3],
}

impl PreprocessingConfig {
    /// `ISNet` normalization: `(x / 255 - 0.5) / 1.0`
    #[must_use]
    pub fn isnet(input_size: u32) -> Self {
        Self {
            target_size: [input_size, input_size],
            normalization_mean: [0.5, 0.5, 0.5],
            normalization_std: [1.0, 1.0, 1.0],
        }
    }
}

/// Model information and metadata
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
    pub size_bytes: u64,
    pub input_shape: (usize, usize, usize, usize), // NCHW format
    pub output_shape: (usize, usize, usize, usize),
}

/// Resolves a [`ModelSpec`] into model bytes, metadata and preprocessing
#[derive(Debug, Clone)]
pub struct ModelManager {
    spec: ModelSpec,
    preprocessing: PreprocessingConfig,
    size_bytes: u64,
}

impl ModelManager {
    /// Validate the model file and load the optional preprocessing sidecar
    pub fn from_spec(spec: &ModelSpec) -> Result<Self> {
        if !(32..=4096).contains(&spec.input_size) {
            return Err(BgRemovalError::config_value_error(
                "input_size",
                spec.input_size,
                "32-4096",
                Some(DEFAULT_INPUT_SIZE),
            ));
        }

        let metadata = fs::metadata(&spec.path)
            .map_err(|e| BgRemovalError::file_io_error("open model file", &spec.path, &e))?;
        if !metadata.is_file() {
            return Err(BgRemovalError::model(format!(
                "Model path is not a file: {}",
                spec.path.display()
            )));
        }

        let preprocessing = match Self::sidecar_path(&spec.path) {
            Some(sidecar) if sidecar.is_file() => {
                log::debug!("Loading preprocessing config from {}", sidecar.display());
                Self::load_preprocessor_config(&sidecar)?
            },
            _ => PreprocessingConfig::isnet(spec.input_size),
        };

        Ok(Self {
            spec: spec.clone(),
            preprocessing,
            size_bytes: metadata.len(),
        })
    }

    /// Read the raw ONNX model bytes
    pub fn load_model(&self) -> Result<Vec<u8>> {
        fs::read(&self.spec.path)
            .map_err(|e| BgRemovalError::file_io_error("read model file", &self.spec.path, &e))
    }

    pub fn get_info(&self) -> Result<ModelInfo> {
        let [height, width] = self.preprocessing.target_size;
        let (height, width) = (height as usize, width as usize);
        Ok(ModelInfo {
            name: self
                .spec
                .path
                .file_stem()
                .map_or_else(|| "model".to_string(), |s| s.to_string_lossy().to_string()),
            size_bytes: self.size_bytes,
            input_shape: (1, 3, height, width),
            output_shape: (1, 1, height, width),
        })
    }

    pub fn get_preprocessing_config(&self) -> Result<PreprocessingConfig> {
        Ok(self.preprocessing.clone())
    }

    #[must_use]
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn sidecar_path(model_path: &Path) -> Option<PathBuf> {
        model_path
            .parent()
            .map(|dir| dir.join(PREPROCESSOR_CONFIG_FILE))
    }

    /// Parse a `HuggingFace` style preprocessor config
    ///
    /// `image_mean` and `image_std` are given in the 0-255 range and are
    /// converted to the 0-1 range used by the preprocessor.
    fn load_preprocessor_config(path: &Path) -> Result<PreprocessingConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| BgRemovalError::file_io_error("read preprocessor config", path, &e))?;
        let preprocessor: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            BgRemovalError::invalid_config(format!(
                "Failed to parse {}: {e}",
                path.display()
            ))
        })?;

        Ok(PreprocessingConfig {
            target_size: Self::parse_target_size(&preprocessor)?,
            normalization_mean: Self::parse_channels(&preprocessor, "image_mean")?,
            normalization_std: Self::parse_channels(&preprocessor, "image_std")?,
        })
    }

    fn parse_target_size(preprocessor: &serde_json::Value) -> Result<[u32; 2]> {
        let size = preprocessor.get("size").ok_or_else(|| {
            BgRemovalError::invalid_config("Missing size in preprocessor config")
        })?;

        let dimension = |key: &str| -> Result<u32> {
            size.get(key)
                .and_then(serde_json::Value::as_u64)
                .ok_or_else(|| {
                    BgRemovalError::invalid_config(format!("Missing {key} in size config"))
                })?
                .try_into()
                .map_err(|_| BgRemovalError::invalid_config(format!("{key} too large for u32")))
        };

        Ok([dimension("height")?, dimension("width")?])
    }

    fn parse_channels(preprocessor: &serde_json::Value, key: &str) -> Result<[f32; 3]> {
        let values = preprocessor
            .get(key)
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| {
                BgRemovalError::invalid_config(format!("Missing {key} in preprocessor config"))
            })?;

        if values.len() < 3 {
            return Err(BgRemovalError::invalid_config(format!(
                "{key} must have at least 3 values"
            )));
        }

        let mut channels = [0.0f32; 3];
        for (channel, value) in channels.iter_mut().zip(values) {
            let raw = value.as_f64().ok_or_else(|| {
                BgRemovalError::invalid_config(format!("Invalid {key} value: {value}"))
            })?;
            *channel = (raw / 255.0) as f32;
        }
        Ok(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_model_file() {
        let spec = ModelSpec::new("/nonexistent/model.onnx");
        let err = ModelManager::from_spec(&spec).unwrap_err();
        assert!(err.to_string().contains("open model file"));
    }

    #[test]
    fn test_input_size_out_of_range() {
        let spec = ModelSpec::new("model.onnx").with_input_size(8);
        let err = ModelManager::from_spec(&spec).unwrap_err();
        assert!(matches!(err, BgRemovalError::InvalidConfig(_)));
    }

    #[test]
    fn test_default_isnet_preprocessing() {
        let dir = tempdir().unwrap();
        let model_path = dir.path().join("isnet.onnx");
        fs::write(&model_path, b"onnx-bytes").unwrap();

        let manager = ModelManager::from_spec(&ModelSpec::new(&model_path)).unwrap();
        let config = manager.get_preprocessing_config().unwrap();
        assert_eq!(config, PreprocessingConfig::isnet(1024));

        let info = manager.get_info().unwrap();
        assert_eq!(info.name, "isnet");
        assert_eq!(info.size_bytes, 10);
        assert_eq!(info.input_shape, (1, 3, 1024, 1024));
        assert_eq!(manager.load_model().unwrap(), b"onnx-bytes");
    }

    #[test]
    fn test_sidecar_preprocessing_overrides_defaults() {
        let dir = tempdir().unwrap();
        let model_path = dir.path().join("model.onnx");
        fs::write(&model_path, b"onnx").unwrap();
        fs::write(
            dir.path().join(PREPROCESSOR_CONFIG_FILE),
            r#"{"size": {"height": 320, "width": 320},
                "image_mean": [127.5, 127.5, 127.5],
                "image_std": [255.0, 255.0, 255.0]}"#,
        )
        .unwrap();

        let manager = ModelManager::from_spec(&ModelSpec::new(&model_path)).unwrap();
        let config = manager.get_preprocessing_config().unwrap();
        assert_eq!(config.target_size, [320, 320]);
        assert!((config.normalization_mean[0] - 0.5).abs() < 1e-6);
        assert!((config.normalization_std[2] - 1.0).abs() < 1e-6);
        assert_eq!(manager.get_info().unwrap().output_shape, (1, 1, 320, 320));
    }

    #[test]
    fn test_malformed_sidecar_is_rejected() {
        let dir = tempdir().unwrap();
        let model_path = dir.path().join("model.onnx");
        fs::write(&model_path, b"onnx").unwrap();
        fs::write(dir.path().join(PREPROCESSOR_CONFIG_FILE), r#"{"size": {}}"#).unwrap();

        let err = ModelManager::from_spec(&ModelSpec::new(&model_path)).unwrap_err();
        assert!(err.to_string().contains("height"));
    }
}
