//! Tract backend implementation for background removal models
//!
//! Runs an ONNX segmentation model with Tract, a pure Rust inference engine
//! with no external runtime dependencies.

use crate::error::{BgRemovalError, Result};
use crate::inference::InferenceBackend;
use crate::models::{ModelInfo, ModelManager, PreprocessingConfig};
use ndarray::Array4;
use tract_onnx::prelude::*;

/// Type alias for the complex Tract model type to reduce complexity warnings
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

// Use instant crate for cross-platform time compatibility
use instant::{Duration, Instant};

/// Tract backend for running background removal models using pure Rust inference
#[derive(Debug)]
pub struct TractBackend {
    model: Option<TractModel>,
    model_manager: ModelManager,
}

impl TractBackend {
    /// Create an uninitialized backend for the given model
    #[must_use]
    pub fn with_model_manager(model_manager: ModelManager) -> Self {
        Self {
            model: None,
            model_manager,
        }
    }

    fn load_model(&mut self) -> Result<Duration> {
        let model_load_start = Instant::now();

        let model_data = self.model_manager.load_model()?;
        let model_info = self.model_manager.get_info()?;
        let (batch, channels, height, width) = model_info.input_shape;

        log::info!("Initializing Tract backend");
        log::info!("  - Model: {}", model_info.name);
        log::info!(
            "  - Model size: {:.2} MB",
            model_info.size_bytes as f64 / (1024.0 * 1024.0)
        );
        log::debug!("  - Input shape: {:?}", model_info.input_shape);

        let model = onnx()
            .model_for_read(&mut std::io::Cursor::new(model_data))
            .map_err(|e| BgRemovalError::model(format!("Failed to load ONNX model: {e}")))?
            .with_input_fact(0, f32::fact([batch, channels, height, width]).into())
            .map_err(|e| BgRemovalError::model(format!("Failed to set model input shape: {e}")))?
            .into_optimized()
            .map_err(|e| BgRemovalError::model(format!("Failed to optimize model: {e}")))?
            .into_runnable()
            .map_err(|e| {
                BgRemovalError::model(format!("Failed to create runnable model: {e}"))
            })?;

        self.model = Some(model);

        let model_load_time = model_load_start.elapsed();
        log::info!(
            "Tract backend initialized in {}ms",
            model_load_time.as_millis()
        );

        Ok(model_load_time)
    }
}

impl InferenceBackend for TractBackend {
    fn initialize(&mut self) -> Result<Option<Duration>> {
        if self.model.is_some() {
            return Ok(None);
        }

        let model_load_time = self.load_model()?;
        Ok(Some(model_load_time))
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| BgRemovalError::inference("Tract model not initialized"))?;

        log::debug!("Running Tract inference on {:?}", input.shape());
        let inference_start = Instant::now();

        let contiguous = input.as_standard_layout();
        let data = contiguous
            .as_slice()
            .ok_or_else(|| BgRemovalError::inference("Input tensor is not contiguous"))?;
        let input_tensor = Tensor::from_shape(input.shape(), data)
            .map_err(|e| BgRemovalError::inference(format!("Failed to build input tensor: {e}")))?;

        let outputs = model
            .run(tvec![input_tensor.into()])
            .map_err(|e| BgRemovalError::inference(format!("Tract inference failed: {e}")))?;

        let output_tensor = outputs
            .into_iter()
            .next()
            .ok_or_else(|| BgRemovalError::inference("No output tensor found"))?
            .into_arc_tensor();

        let dims = match *output_tensor.shape() {
            [n, c, h, w] => (n, c, h, w),
            ref shape => {
                return Err(BgRemovalError::inference(format!(
                    "Expected 4D output tensor, got {}D",
                    shape.len()
                )))
            },
        };

        let values = output_tensor.as_slice::<f32>().map_err(|e| {
            BgRemovalError::inference(format!("Failed to read output tensor: {e}"))
        })?;
        let output_array = Array4::from_shape_vec(dims, values.to_vec()).map_err(|e| {
            BgRemovalError::inference(format!("Failed to reshape output tensor: {e}"))
        })?;

        log::debug!(
            "Tract inference completed in {}ms, output {:?}",
            inference_start.elapsed().as_millis(),
            output_array.shape()
        );

        Ok(output_array)
    }

    fn is_initialized(&self) -> bool {
        self.model.is_some()
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        self.model_manager
            .get_info()
            .map_or((1, 3, 1024, 1024), |info| info.input_shape)
    }

    fn output_shape(&self) -> (usize, usize, usize, usize) {
        self.model_manager
            .get_info()
            .map_or((1, 1, 1024, 1024), |info| info.output_shape)
    }

    fn get_preprocessing_config(&self) -> Result<PreprocessingConfig> {
        self.model_manager.get_preprocessing_config()
    }

    fn get_model_info(&self) -> Result<ModelInfo> {
        self.model_manager.get_info()
    }
}

#[cfg(all(test, feature = "tract"))]
mod tests {
    use super::*;
    use crate::models::ModelSpec;
    use tempfile::tempdir;

    fn backend_with_file(contents: &[u8], input_size: u32) -> (tempfile::TempDir, TractBackend) {
        let dir = tempdir().unwrap();
        let model_path = dir.path().join("model.onnx");
        std::fs::write(&model_path, contents).unwrap();
        let spec = ModelSpec::new(&model_path).with_input_size(input_size);
        let manager = ModelManager::from_spec(&spec).unwrap();
        (dir, TractBackend::with_model_manager(manager))
    }

    #[test]
    fn test_tract_backend_shapes_follow_model_spec() {
        let (_dir, backend) = backend_with_file(b"not-onnx", 320);

        assert!(!backend.is_initialized());
        assert_eq!(backend.input_shape(), (1, 3, 320, 320));
        assert_eq!(backend.output_shape(), (1, 1, 320, 320));
        assert_eq!(
            backend.get_preprocessing_config().unwrap().target_size,
            [320, 320]
        );
    }

    #[test]
    fn test_tract_backend_rejects_invalid_model() {
        let (_dir, mut backend) = backend_with_file(b"definitely not an onnx graph", 64);

        let err = backend.initialize().unwrap_err();
        assert!(matches!(err, BgRemovalError::Model(_)));
        assert!(!backend.is_initialized());
    }

    #[test]
    fn test_tract_backend_infer_before_initialize() {
        let (_dir, mut backend) = backend_with_file(b"", 64);
        let err = backend.infer(&Array4::zeros((1, 3, 64, 64))).unwrap_err();
        assert!(matches!(err, BgRemovalError::Inference(_)));
    }
}
