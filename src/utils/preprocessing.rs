//! Image preprocessing for model inference
//!
//! Images are letterboxed: resized with preserved aspect ratio, centred on a
//! padded canvas of the model's input size and normalized into an NCHW
//! tensor. The same [`Letterbox`] geometry maps the model's mask back onto
//! the original image.

use crate::{
    error::{BgRemovalError, Result},
    models::PreprocessingConfig,
};
use image::{DynamicImage, ImageBuffer, RgbImage};
use ndarray::Array4;

/// Configuration for preprocessing behavior
#[derive(Debug, Clone)]
pub struct PreprocessingOptions {
    /// Padding color for aspect ratio preservation (RGB)
    pub padding_color: [u8; 3],
}

impl Default for PreprocessingOptions {
    fn default() -> Self {
        Self {
            padding_color: [255, 255, 255],
        }
    }
}

/// Placement of a resized image inside the model canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Letterbox {
    /// Compute the letterbox for an image of `original` size on a canvas
    pub fn compute(original: (u32, u32), canvas: (u32, u32)) -> Result<Self> {
        let (orig_width, orig_height) = original;
        let (canvas_width, canvas_height) = canvas;
        if orig_width == 0 || orig_height == 0 {
            return Err(BgRemovalError::processing("Image has zero width or height"));
        }
        if canvas_width == 0 || canvas_height == 0 {
            return Err(BgRemovalError::invalid_config("Model input size is zero"));
        }

        let scale = (canvas_width as f32 / orig_width as f32)
            .min(canvas_height as f32 / orig_height as f32);

        let scaled_width = ((orig_width as f32 * scale).round() as u32).clamp(1, canvas_width);
        let scaled_height = ((orig_height as f32 * scale).round() as u32).clamp(1, canvas_height);

        Ok(Self {
            scale,
            scaled_width,
            scaled_height,
            offset_x: (canvas_width - scaled_width) / 2,
            offset_y: (canvas_height - scaled_height) / 2,
            canvas_width,
            canvas_height,
        })
    }

    /// Map a pixel of the original image to canvas coordinates
    #[must_use]
    pub fn to_canvas(&self, x: u32, y: u32) -> Option<(u32, u32)> {
        let canvas_x = ((x as f32 * self.scale) as u32).min(self.scaled_width - 1) + self.offset_x;
        let canvas_y = ((y as f32 * self.scale) as u32).min(self.scaled_height - 1) + self.offset_y;
        (canvas_x < self.canvas_width && canvas_y < self.canvas_height)
            .then_some((canvas_x, canvas_y))
    }
}

/// Shared image preprocessing utilities
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Letterbox and normalize an image into a `(1, 3, H, W)` tensor
    pub fn preprocess_image(
        image: &DynamicImage,
        preprocessing_config: &PreprocessingConfig,
        options: &PreprocessingOptions,
    ) -> Result<(Letterbox, Array4<f32>)> {
        let [target_height, target_width] = preprocessing_config.target_size;

        let rgb_image = image.to_rgb8();
        let letterbox = Letterbox::compute(rgb_image.dimensions(), (target_width, target_height))?;

        let resized = image::imageops::resize(
            &rgb_image,
            letterbox.scaled_width,
            letterbox.scaled_height,
            image::imageops::FilterType::Triangle,
        );

        let padding = options.padding_color;
        let mut canvas =
            ImageBuffer::from_pixel(target_width, target_height, image::Rgb(padding));
        image::imageops::replace(
            &mut canvas,
            &resized,
            i64::from(letterbox.offset_x),
            i64::from(letterbox.offset_y),
        );

        let tensor = Self::canvas_to_tensor(&canvas, preprocessing_config);
        Ok((letterbox, tensor))
    }

    /// Preprocess with default options, returning the letterbox and tensor
    pub fn preprocess_for_inference(
        image: &DynamicImage,
        preprocessing_config: &PreprocessingConfig,
    ) -> Result<(Letterbox, Array4<f32>)> {
        Self::preprocess_image(image, preprocessing_config, &PreprocessingOptions::default())
    }

    fn canvas_to_tensor(canvas: &RgbImage, preprocessing_config: &PreprocessingConfig) -> Array4<f32> {
        let (width, height) = canvas.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
        let mean = preprocessing_config.normalization_mean;
        let std = preprocessing_config.normalization_std;

        for (x, y, pixel) in canvas.enumerate_pixels() {
            for channel in 0..3 {
                let value = (f32::from(pixel[channel]) / 255.0 - mean[channel]) / std[channel];
                if let Some(elem) = tensor.get_mut([0, channel, y as usize, x as usize]) {
                    *elem = value;
                }
            }
        }

        tensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([255, 0, 0])))
    }

    #[test]
    fn test_preprocess_shape() {
        let image = create_test_image(100, 50);
        let config = PreprocessingConfig::isnet(64);

        let (letterbox, tensor) =
            ImagePreprocessor::preprocess_for_inference(&image, &config).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 64, 64]);
        assert_eq!(letterbox.scaled_width, 64);
        assert_eq!(letterbox.scaled_height, 32);
        assert_eq!(letterbox.offset_x, 0);
        assert_eq!(letterbox.offset_y, 16);
    }

    #[test]
    fn test_normalization_and_padding() {
        let image = create_test_image(10, 20);
        let config = PreprocessingConfig::isnet(20);

        let (letterbox, tensor) =
            ImagePreprocessor::preprocess_for_inference(&image, &config).unwrap();
        assert_eq!(letterbox.offset_x, 5);

        // Red image pixel: R = 1.0 - 0.5, G = 0.0 - 0.5
        assert!((tensor[[0, 0, 10, 10]] - 0.5).abs() < 1e-3);
        assert!((tensor[[0, 1, 10, 10]] + 0.5).abs() < 1e-3);
        // White padding column on the left
        assert!((tensor[[0, 1, 10, 0]] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_letterbox_mapping() {
        let letterbox = Letterbox::compute((200, 100), (100, 100)).unwrap();
        assert_eq!(letterbox.to_canvas(0, 0), Some((0, 25)));
        assert_eq!(letterbox.to_canvas(198, 98), Some((99, 74)));
    }

    #[test]
    fn test_letterbox_keeps_far_edge_inside_image() {
        let letterbox = Letterbox::compute((1000, 10), (32, 32)).unwrap();
        assert_eq!(letterbox.scaled_width, 32);
        for x in [985, 998, 999] {
            let (canvas_x, _) = letterbox.to_canvas(x, 0).unwrap();
            assert!(canvas_x < letterbox.offset_x + letterbox.scaled_width);
        }
        assert_eq!(letterbox.to_canvas(999, 9).map(|(x, _)| x), Some(31));
    }

    #[test]
    fn test_letterbox_rejects_empty_image() {
        assert!(Letterbox::compute((0, 10), (64, 64)).is_err());
        assert!(Letterbox::compute((10, 10), (0, 64)).is_err());
    }
}
