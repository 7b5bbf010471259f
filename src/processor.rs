//! Model-backed background removal processor
//!
//! [`BackgroundRemovalProcessor`] owns an [`InferenceBackend`] and runs the
//! full pipeline for one image: decode, letterbox, infer, map the mask back
//! onto the original pixels, apply it as alpha and encode PNG.

use crate::{
    error::{BgRemovalError, Result},
    inference::InferenceBackend,
    remover::BackgroundRemover,
    services::ImageIOService,
    types::SegmentationMask,
    utils::{ImagePreprocessor, Letterbox, PreprocessingOptions},
};
#[cfg(feature = "tract")]
use crate::{backends::TractBackend, models::ModelManager, models::ModelSpec};
use image::{DynamicImage, GenericImageView, RgbaImage};
use instant::Instant;
use log::{debug, info};
use ndarray::Array4;
use tracing::{instrument, span, Level};

/// Detailed timing of one processed image, in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingTimings {
    pub model_load_ms: u64,
    pub image_decode_ms: u64,
    pub preprocessing_ms: u64,
    pub inference_ms: u64,
    pub postprocessing_ms: u64,
    pub total_ms: u64,
}

/// Output of the pipeline before PNG encoding
#[derive(Debug, Clone)]
pub struct RemovalResult {
    pub image: RgbaImage,
    pub mask: SegmentationMask,
    /// Original image dimensions (width, height)
    pub original_dimensions: (u32, u32),
    pub timings: ProcessingTimings,
}

impl RemovalResult {
    /// Encode the result as PNG bytes
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        ImageIOService::encode_png(&DynamicImage::ImageRgba8(self.image.clone()))
    }
}

/// Background removal processor running a segmentation model
pub struct BackgroundRemovalProcessor {
    backend: Box<dyn InferenceBackend>,
    options: PreprocessingOptions,
    model_load_ms: Option<u64>,
}

impl BackgroundRemovalProcessor {
    /// Create a processor over any inference backend
    ///
    /// The backend is initialized lazily on the first processed image.
    #[must_use]
    pub fn new(backend: Box<dyn InferenceBackend>) -> Self {
        Self {
            backend,
            options: PreprocessingOptions::default(),
            model_load_ms: None,
        }
    }

    /// Create a processor running an ONNX model with the Tract backend
    ///
    /// # Errors
    /// - Model file missing or input size out of range
    #[cfg(feature = "tract")]
    pub fn from_model_spec(spec: &ModelSpec) -> Result<Self> {
        let model_manager = ModelManager::from_spec(spec)?;
        Ok(Self::new(Box::new(TractBackend::with_model_manager(
            model_manager,
        ))))
    }

    /// Override the letterbox padding colour
    #[must_use]
    pub fn with_options(mut self, options: PreprocessingOptions) -> Self {
        self.options = options;
        self
    }

    /// Initialize the backend if it has not been already
    ///
    /// # Errors
    /// - Model loading or validation errors
    pub fn initialize(&mut self) -> Result<()> {
        if self.backend.is_initialized() {
            return Ok(());
        }

        let _span = span!(Level::INFO, "model_initialization").entered();
        if let Some(load_time) = self.backend.initialize()? {
            let load_ms = u64::try_from(load_time.as_millis()).unwrap_or(u64::MAX);
            info!("Model loaded in {load_ms}ms");
            self.model_load_ms = Some(load_ms);
        }
        Ok(())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.backend.is_initialized()
    }

    /// Model name reported by the backend
    #[must_use]
    pub fn model_name(&self) -> String {
        self.backend
            .get_model_info()
            .map_or_else(|_| "unknown".to_string(), |info| info.name)
    }

    /// Decode encoded image bytes and remove their background
    ///
    /// # Errors
    /// - Bytes are not a decodable image
    /// - Inference or mask generation errors
    pub fn process_bytes(&mut self, image_bytes: &[u8]) -> Result<RemovalResult> {
        let decode_start = Instant::now();
        let image = ImageIOService::load_from_bytes(image_bytes)?;
        let decode_ms = elapsed_ms(decode_start);

        let mut result = self.process_image(&image)?;
        result.timings.image_decode_ms = decode_ms;
        result.timings.total_ms += decode_ms;
        Ok(result)
    }

    /// Remove the background of a decoded image
    ///
    /// # Errors
    /// - Backend initialization failures
    /// - Inference execution errors
    /// - Mask generation and application errors
    #[instrument(
        skip(self, image),
        fields(dimensions = %format!("{}x{}", image.width(), image.height()))
    )]
    pub fn process_image(&mut self, image: &DynamicImage) -> Result<RemovalResult> {
        self.initialize()?;

        let total_start = Instant::now();
        let original_dimensions = image.dimensions();
        let mut timings = ProcessingTimings {
            model_load_ms: self.model_load_ms.take().unwrap_or(0),
            ..ProcessingTimings::default()
        };

        let (letterbox, input_tensor) = {
            let _span = span!(Level::DEBUG, "preprocessing").entered();
            let start = Instant::now();
            let preprocessing_config = self.backend.get_preprocessing_config()?;
            let prepared =
                ImagePreprocessor::preprocess_image(image, &preprocessing_config, &self.options)?;
            timings.preprocessing_ms = elapsed_ms(start);
            prepared
        };

        let output_tensor = {
            let _span = span!(Level::INFO, "inference").entered();
            let start = Instant::now();
            let output = self.backend.infer(&input_tensor)?;
            timings.inference_ms = elapsed_ms(start);
            output
        };

        let (mask, result_image) = {
            let _span = span!(Level::DEBUG, "background_removal").entered();
            let start = Instant::now();
            let mask = tensor_to_mask(&output_tensor, &letterbox, original_dimensions)?;
            let mut result_image = image.to_rgba8();
            mask.apply_to_image(&mut result_image)?;
            timings.postprocessing_ms = elapsed_ms(start);
            (mask, result_image)
        };

        timings.total_ms = elapsed_ms(total_start);
        debug!(
            "Processed {}x{} image: preprocessing {}ms, inference {}ms, postprocessing {}ms",
            original_dimensions.0,
            original_dimensions.1,
            timings.preprocessing_ms,
            timings.inference_ms,
            timings.postprocessing_ms
        );

        Ok(RemovalResult {
            image: result_image,
            mask,
            original_dimensions,
            timings,
        })
    }
}

impl BackgroundRemover for BackgroundRemovalProcessor {
    fn remove_background(&mut self, image_bytes: &[u8]) -> Result<Vec<u8>> {
        self.process_bytes(image_bytes)?.to_png_bytes()
    }

    fn name(&self) -> &str {
        "segmentation-model"
    }
}

/// Map a `(1, 1, H, W)` model output back onto the original image
///
/// Each original pixel is projected into the letterbox canvas and then into
/// the tensor grid, which may be smaller than the canvas.
fn tensor_to_mask(
    tensor: &Array4<f32>,
    letterbox: &Letterbox,
    original_dimensions: (u32, u32),
) -> Result<SegmentationMask> {
    let (batch, channels, tensor_height, tensor_width) = tensor.dim();
    if batch != 1 || channels != 1 || tensor_height == 0 || tensor_width == 0 {
        return Err(BgRemovalError::processing(format!(
            "Invalid output tensor shape {:?}, expected (1, 1, H, W)",
            tensor.shape()
        )));
    }

    let x_ratio = tensor_width as f32 / letterbox.canvas_width as f32;
    let y_ratio = tensor_height as f32 / letterbox.canvas_height as f32;

    let (width, height) = original_dimensions;
    let mut data = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            let value = letterbox
                .to_canvas(x, y)
                .and_then(|(canvas_x, canvas_y)| {
                    let tx = ((canvas_x as f32 * x_ratio) as usize).min(tensor_width - 1);
                    let ty = ((canvas_y as f32 * y_ratio) as usize).min(tensor_height - 1);
                    tensor.get([0, 0, ty, tx]).copied()
                })
                .unwrap_or(0.0);
            data.push((value.clamp(0.0, 1.0) * 255.0).round() as u8);
        }
    }

    Ok(SegmentationMask::new(data, original_dimensions))
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
