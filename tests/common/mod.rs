//! Shared fixtures for integration tests

#![allow(dead_code)]

use bgcut::{
    BatchProcessingStats, BgRemovalError, ImageIOService, InferenceBackend, ItemFailure,
    ModelInfo, PreprocessingConfig, ProgressReporter,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use instant::Duration;
use ndarray::Array4;
use std::io::Cursor;
use std::sync::Mutex;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
    ImageIOService::encode_png(&image).unwrap()
}

pub fn jpeg_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
        .unwrap();
    buffer
}

/// Stub segmentation service: the left half of every image becomes
/// transparent, undecodable input is rejected
pub fn stub_remover(bytes: &[u8]) -> bgcut::Result<Vec<u8>> {
    let mut image: RgbaImage = image::load_from_memory(bytes)
        .map_err(|e| BgRemovalError::processing(format!("stub cannot decode input: {e}")))?
        .to_rgba8();
    let half = image.width() / 2;
    for (x, _, pixel) in image.enumerate_pixels_mut() {
        if x < half {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }
    ImageIOService::encode_png(&DynamicImage::ImageRgba8(image))
}

pub fn decode_rgba(bytes: &[u8]) -> RgbaImage {
    image::load_from_memory(bytes).unwrap().to_rgba8()
}

/// Inference backend predicting foreground for the bottom half of the canvas
#[derive(Debug, Default)]
pub struct BottomHalfBackend {
    initialized: bool,
}

impl InferenceBackend for BottomHalfBackend {
    fn initialize(&mut self) -> bgcut::Result<Option<Duration>> {
        if self.initialized {
            return Ok(None);
        }
        self.initialized = true;
        Ok(Some(Duration::from_millis(0)))
    }

    fn infer(&mut self, input: &Array4<f32>) -> bgcut::Result<Array4<f32>> {
        let (_, _, height, width) = input.dim();
        Ok(Array4::from_shape_fn((1, 1, height, width), |(_, _, y, _)| {
            if y >= height / 2 {
                1.0
            } else {
                0.0
            }
        }))
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        (1, 3, 16, 16)
    }

    fn output_shape(&self) -> (usize, usize, usize, usize) {
        (1, 1, 16, 16)
    }

    fn get_preprocessing_config(&self) -> bgcut::Result<PreprocessingConfig> {
        Ok(PreprocessingConfig::isnet(16))
    }

    fn get_model_info(&self) -> bgcut::Result<ModelInfo> {
        Ok(ModelInfo {
            name: "bottom-half".to_string(),
            size_bytes: 0,
            input_shape: self.input_shape(),
            output_shape: self.output_shape(),
        })
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// Progress reporter recording every callback as a line
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressReporter for RecordingReporter {
    fn report_item_started(&self, position: usize, total: usize, name: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("Processing image {position}/{total}: {name}"));
    }

    fn report_item_failed(&self, failure: &ItemFailure) {
        self.events
            .lock()
            .unwrap()
            .push(format!("failed {}", failure.position));
    }

    fn report_completion(&self, stats: &BatchProcessingStats) {
        self.events.lock().unwrap().push(format!(
            "done {}/{}",
            stats.items_completed, stats.items_total
        ));
    }
}
