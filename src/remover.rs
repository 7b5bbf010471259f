//! Segmentation service seam
//!
//! Everything above this module treats background removal as an opaque
//! bytes-in, PNG-bytes-out service. [`BackgroundRemovalProcessor`] is the
//! model-backed implementation; closures implement the trait too, which is
//! how tests plug in stub removers.
//!
//! [`BackgroundRemovalProcessor`]: crate::processor::BackgroundRemovalProcessor

use crate::error::{BgRemovalError, Result};
use crate::services::ImageIOService;
use image::{DynamicImage, RgbaImage};

/// Removes the background from an encoded image
pub trait BackgroundRemover {
    /// Segment the foreground of `image_bytes` and return it as PNG bytes
    /// with the background made transparent
    ///
    /// # Errors
    /// - Input bytes are not a decodable image
    /// - Model or inference failures
    fn remove_background(&mut self, image_bytes: &[u8]) -> Result<Vec<u8>>;

    /// Short name used in log lines
    fn name(&self) -> &str {
        "background-remover"
    }
}

impl<F> BackgroundRemover for F
where
    F: FnMut(&[u8]) -> Result<Vec<u8>>,
{
    fn remove_background(&mut self, image_bytes: &[u8]) -> Result<Vec<u8>> {
        self(image_bytes)
    }

    fn name(&self) -> &str {
        "closure"
    }
}

/// Run an in-memory image through a remover and decode the result as RGBA
///
/// The image is encoded to PNG first so every remover sees the same wire
/// format regardless of where the pixels came from.
pub fn remove_background_from_image<R>(remover: &mut R, image: &DynamicImage) -> Result<RgbaImage>
where
    R: BackgroundRemover + ?Sized,
{
    let encoded = ImageIOService::encode_png(image)?;
    let output = remover.remove_background(&encoded)?;
    let decoded = image::load_from_memory(&output).map_err(|e| {
        BgRemovalError::processing_stage_error(
            "result decoding",
            &e.to_string(),
            Some(remover.name()),
        )
    })?;
    Ok(decoded.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba};

    #[test]
    fn test_closure_remover_receives_png() {
        let mut seen_png = false;
        let mut remover = |bytes: &[u8]| -> Result<Vec<u8>> {
            seen_png = image::guess_format(bytes).ok() == Some(image::ImageFormat::Png);
            let mut image = image::load_from_memory(bytes)?.to_rgba8();
            for pixel in image.pixels_mut() {
                pixel[3] = 0;
            }
            ImageIOService::encode_png(&DynamicImage::ImageRgba8(image))
        };

        let input = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([9, 9, 9])));
        let output = remove_background_from_image(&mut remover, &input).unwrap();

        assert!(seen_png);
        assert_eq!(output.dimensions(), (4, 4));
        assert_eq!(output.get_pixel(0, 0), &Rgba([9, 9, 9, 0]));
    }

    #[test]
    fn test_remover_error_propagates() {
        let mut remover =
            |_: &[u8]| -> Result<Vec<u8>> { Err(BgRemovalError::inference("service down")) };
        let input = DynamicImage::ImageRgb8(RgbImage::new(2, 2));

        let err = remove_background_from_image(&mut remover, &input).unwrap_err();
        assert!(err.to_string().contains("service down"));
    }

    #[test]
    fn test_undecodable_result_is_processing_error() {
        let mut remover = |_: &[u8]| -> Result<Vec<u8>> { Ok(b"garbage".to_vec()) };
        let input = DynamicImage::ImageRgb8(RgbImage::new(2, 2));

        let err = remove_background_from_image(&mut remover, &input).unwrap_err();
        assert!(matches!(err, BgRemovalError::Processing(_)));
    }
}
