//! Test utilities and mock backends
//!
//! These implement [`InferenceBackend`] without model files so the full
//! removal pipeline can be exercised in unit tests.

use crate::{
    error::{BgRemovalError, Result},
    inference::InferenceBackend,
    models::{ModelInfo, PreprocessingConfig},
};
use instant::Duration;
use ndarray::Array4;
use std::sync::{Arc, Mutex};

/// Mock backend that predicts a centred square of foreground
///
/// The square spans the middle half of the canvas in both directions.
#[derive(Debug, Clone)]
pub struct MockBackend {
    size: usize,
    initialized: bool,
    call_history: Arc<Mutex<Vec<String>>>,
    should_fail_init: bool,
    should_fail_inference: bool,
}

impl MockBackend {
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            size,
            initialized: false,
            call_history: Arc::new(Mutex::new(Vec::new())),
            should_fail_init: false,
            should_fail_inference: false,
        }
    }

    /// Create a mock backend that will fail during initialization
    #[must_use]
    pub fn new_failing_init(size: usize) -> Self {
        let mut backend = Self::new(size);
        backend.should_fail_init = true;
        backend
    }

    /// Create a mock backend that will fail during inference
    #[must_use]
    pub fn new_failing_inference(size: usize) -> Self {
        let mut backend = Self::new(size);
        backend.should_fail_inference = true;
        backend
    }

    /// Shared handle on the recorded method calls
    #[must_use]
    pub fn call_history(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.call_history)
    }

    fn record_call(&self, method: &str) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(method.to_string());
        }
    }
}

impl InferenceBackend for MockBackend {
    fn initialize(&mut self) -> Result<Option<Duration>> {
        self.record_call("initialize");

        if self.should_fail_init {
            return Err(BgRemovalError::model("Mock backend initialization failed"));
        }
        if self.initialized {
            return Ok(None);
        }

        self.initialized = true;
        Ok(Some(Duration::from_millis(1)))
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        self.record_call("infer");

        if !self.initialized {
            return Err(BgRemovalError::inference("Mock backend not initialized"));
        }
        if self.should_fail_inference {
            return Err(BgRemovalError::inference("Mock backend inference failed"));
        }

        let (batch, _, height, width) = input.dim();
        let mut output = Array4::<f32>::zeros((batch, 1, height, width));
        for ((_, _, y, x), value) in output.indexed_iter_mut() {
            let inside_y = y >= height / 4 && y < height * 3 / 4;
            let inside_x = x >= width / 4 && x < width * 3 / 4;
            if inside_y && inside_x {
                *value = 1.0;
            }
        }

        Ok(output)
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        (1, 3, self.size, self.size)
    }

    fn output_shape(&self) -> (usize, usize, usize, usize) {
        (1, 1, self.size, self.size)
    }

    fn get_preprocessing_config(&self) -> Result<PreprocessingConfig> {
        Ok(PreprocessingConfig::isnet(self.size as u32))
    }

    fn get_model_info(&self) -> Result<ModelInfo> {
        Ok(ModelInfo {
            name: "mock-square-model".to_string(),
            size_bytes: 1024,
            input_shape: self.input_shape(),
            output_shape: self.output_shape(),
        })
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_requires_initialization() {
        let mut backend = MockBackend::new(8);
        assert!(backend.infer(&Array4::zeros((1, 3, 8, 8))).is_err());
        assert_eq!(backend.initialize().unwrap(), Some(Duration::from_millis(1)));
        assert_eq!(backend.initialize().unwrap(), None);
    }

    #[test]
    fn test_mock_square_mask() {
        let mut backend = MockBackend::new(8);
        backend.initialize().unwrap();
        let output = backend.infer(&Array4::zeros((1, 3, 8, 8))).unwrap();

        assert!((output[[0, 0, 0, 0]]).abs() < f32::EPSILON);
        assert!((output[[0, 0, 4, 4]] - 1.0).abs() < f32::EPSILON);
        assert!((output[[0, 0, 2, 5]] - 1.0).abs() < f32::EPSILON);
        assert!((output[[0, 0, 6, 2]]).abs() < f32::EPSILON);
    }

    #[test]
    fn test_failure_modes() {
        let mut backend = MockBackend::new_failing_init(8);
        assert!(backend.initialize().is_err());
        assert!(!backend.is_initialized());

        let mut backend = MockBackend::new_failing_inference(8);
        backend.initialize().unwrap();
        assert!(backend.infer(&Array4::zeros((1, 3, 8, 8))).is_err());

        let history = backend.call_history();
        let calls = history.lock().unwrap();
        assert_eq!(calls.as_slice(), ["initialize", "infer"]);
    }
}
