//! Core data types shared by the adapter, orchestrator and front end

use crate::error::{BgRemovalError, Result};
use image::{ImageBuffer, Luma, Rgba};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An encoded input image with an optional display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageItem {
    /// Original file name (for example `cat.jpg`), if known
    pub name: Option<String>,
    /// Encoded image bytes, passed through unchanged
    pub bytes: Vec<u8>,
}

impl ImageItem {
    #[must_use]
    pub fn new<S: Into<String>>(name: S, bytes: Vec<u8>) -> Self {
        Self {
            name: Some(name.into()),
            bytes,
        }
    }

    #[must_use]
    pub fn unnamed(bytes: Vec<u8>) -> Self {
        Self { name: None, bytes }
    }
}

/// PNG bytes produced by the segmentation service under their output name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Why a batch item could not be processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// 1-based position in the input sequence
    pub position: usize,
    pub name: Option<String>,
    pub reason: String,
}

/// Per-item result of a batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Processed { position: usize, entry_name: String },
    Failed(ItemFailure),
}

impl ItemOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Processed { .. })
    }
}

/// Where a written archive ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveArtifact {
    File { path: PathBuf, entries: usize },
    Memory { bytes: Vec<u8>, entries: usize },
}

impl ArchiveArtifact {
    #[must_use]
    pub fn entries(&self) -> usize {
        match self {
            Self::File { entries, .. } | Self::Memory { entries, .. } => *entries,
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::File { path, .. } => Some(path),
            Self::Memory { .. } => None,
        }
    }
}

/// Result of processing a batch of images
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// One outcome per input item, in input order
    pub items: Vec<ItemOutcome>,
    /// The first successful results, capped by the preview limit
    pub previews: Vec<ProcessedImage>,
    /// Archive holding every successful result; `None` when nothing succeeded
    pub archive: Option<ArchiveArtifact>,
}

impl BatchOutcome {
    #[must_use]
    pub fn total(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|item| item.is_success()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemFailure> {
        self.items.iter().filter_map(|item| match item {
            ItemOutcome::Failed(failure) => Some(failure),
            ItemOutcome::Processed { .. } => None,
        })
    }
}

/// Foreground mask as grayscale values (0 = background, 255 = foreground)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationMask {
    pub data: Vec<u8>,
    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    #[must_use]
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Self {
        Self { data, dimensions }
    }

    pub fn to_image(&self) -> Result<ImageBuffer<Luma<u8>, Vec<u8>>> {
        let (width, height) = self.dimensions;
        ImageBuffer::from_raw(width, height, self.data.clone())
            .ok_or_else(|| BgRemovalError::processing("Failed to create image from mask data"))
    }

    /// Write the mask into the alpha channel of an RGBA image
    ///
    /// Fully transparent pixels are zeroed so background colour does not
    /// leak through premultiplying viewers.
    pub fn apply_to_image(&self, image: &mut ImageBuffer<Rgba<u8>, Vec<u8>>) -> Result<()> {
        if image.dimensions() != self.dimensions {
            return Err(BgRemovalError::processing(
                "Image and mask dimensions do not match",
            ));
        }

        for (pixel, &alpha) in image.pixels_mut().zip(&self.data) {
            *pixel = if alpha == 0 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([pixel[0], pixel[1], pixel[2], alpha])
            };
        }

        Ok(())
    }

    #[must_use]
    pub fn statistics(&self) -> MaskStatistics {
        let total_pixels = self.data.len();
        let foreground_pixels = self.data.iter().filter(|&&x| x > 127).count();
        let foreground_ratio = if total_pixels == 0 {
            0.0
        } else {
            foreground_pixels as f32 / total_pixels as f32
        };

        MaskStatistics {
            total_pixels,
            foreground_pixels,
            background_pixels: total_pixels - foreground_pixels,
            foreground_ratio,
        }
    }
}

/// Statistics about a segmentation mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskStatistics {
    pub total_pixels: usize,
    pub foreground_pixels: usize,
    pub background_pixels: usize,
    pub foreground_ratio: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_statistics() {
        let mask = SegmentationMask::new(vec![0, 255, 200, 10], (2, 2));
        let stats = mask.statistics();
        assert_eq!(stats.total_pixels, 4);
        assert_eq!(stats.foreground_pixels, 2);
        assert_eq!(stats.background_pixels, 2);
        assert!((stats.foreground_ratio - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_apply_mask_sets_alpha() {
        let mut image = ImageBuffer::from_pixel(2, 1, Rgba([10, 20, 30, 255]));
        let mask = SegmentationMask::new(vec![0, 180], (2, 1));
        mask.apply_to_image(&mut image).unwrap();

        assert_eq!(image.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        assert_eq!(image.get_pixel(1, 0), &Rgba([10, 20, 30, 180]));
    }

    #[test]
    fn test_apply_mask_dimension_mismatch() {
        let mut image = ImageBuffer::from_pixel(3, 3, Rgba([0, 0, 0, 255]));
        let mask = SegmentationMask::new(vec![255; 4], (2, 2));
        assert!(mask.apply_to_image(&mut image).is_err());
    }

    #[test]
    fn test_batch_outcome_counts() {
        let outcome = BatchOutcome {
            items: vec![
                ItemOutcome::Processed {
                    position: 1,
                    entry_name: "a_no_bg.png".to_string(),
                },
                ItemOutcome::Failed(ItemFailure {
                    position: 2,
                    name: None,
                    reason: "bad".to_string(),
                }),
            ],
            previews: Vec::new(),
            archive: None,
        };

        assert_eq!(outcome.total(), 2);
        assert_eq!(outcome.succeeded(), 1);
        assert_eq!(outcome.failed(), 1);
        assert_eq!(outcome.failures().next().unwrap().position, 2);
    }
}
