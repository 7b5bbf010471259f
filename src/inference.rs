//! Inference backend abstraction

use crate::{
    error::Result,
    models::{ModelInfo, PreprocessingConfig},
};
use ndarray::Array4;

// Use instant crate for cross-platform time compatibility
use instant::Duration;

/// Trait for inference backends that turn an image tensor into a mask tensor
pub trait InferenceBackend {
    /// Initialize the backend, returning the model load time on first call
    ///
    /// # Errors
    /// - Model loading or validation errors
    fn initialize(&mut self) -> Result<Option<Duration>>;

    /// Run inference on a `(1, 3, H, W)` input tensor, producing `(1, 1, H, W)`
    ///
    /// # Errors
    /// - Backend not initialized
    /// - Model inference failures
    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>>;

    /// Get the expected input shape for this backend
    fn input_shape(&self) -> (usize, usize, usize, usize);

    /// Get the expected output shape for this backend
    fn output_shape(&self) -> (usize, usize, usize, usize);

    /// Get preprocessing configuration for this backend
    ///
    /// # Errors
    /// - Model manager not available
    fn get_preprocessing_config(&self) -> Result<PreprocessingConfig>;

    /// Get model information for this backend
    ///
    /// # Errors
    /// - Model manager not available
    fn get_model_info(&self) -> Result<ModelInfo>;

    /// Check if backend is initialized
    fn is_initialized(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_utils::MockBackend;

    #[test]
    fn test_backend_trait_object() {
        let mut backend: Box<dyn InferenceBackend> = Box::new(MockBackend::new(32));
        assert!(!backend.is_initialized());

        backend.initialize().unwrap();
        assert!(backend.is_initialized());

        assert_eq!(backend.input_shape(), (1, 3, 32, 32));
        assert_eq!(backend.output_shape(), (1, 1, 32, 32));

        let output = backend.infer(&Array4::zeros((1, 3, 32, 32))).unwrap();
        assert_eq!(output.shape(), &[1, 1, 32, 32]);
    }

    #[test]
    fn test_backend_preprocessing_matches_shape() {
        let backend = MockBackend::new(48);
        let config = backend.get_preprocessing_config().unwrap();
        let (_, _, height, width) = backend.input_shape();
        assert_eq!(config.target_size, [height as u32, width as u32]);
        assert!(!backend.get_model_info().unwrap().name.is_empty());
    }
}
