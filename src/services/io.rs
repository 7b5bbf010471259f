//! Image I/O operations service
//!
//! File reads and writes plus PNG encoding, kept out of the processing code
//! so it can be exercised against in-memory data.

use crate::error::{BgRemovalError, Result};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Read a file's raw bytes
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bgcut::services::ImageIOService;
    ///
    /// let bytes = ImageIOService::read_bytes("Input_images/cat.jpg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        let path_ref = path.as_ref();
        std::fs::read(path_ref)
            .map_err(|e| BgRemovalError::file_io_error("read image file", path_ref, &e))
    }

    /// Write bytes to a file, replacing any previous contents
    pub fn write_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
        let path_ref = path.as_ref();
        std::fs::write(path_ref, bytes)
            .map_err(|e| BgRemovalError::file_io_error("write output file", path_ref, &e))?;
        log::debug!("Wrote {} bytes to {}", bytes.len(), path_ref.display());
        Ok(())
    }

    /// Create a directory and its parents if missing
    pub fn ensure_directory<P: AsRef<Path>>(path: P) -> Result<()> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)
            .map_err(|e| BgRemovalError::file_io_error("create directory", path_ref, &e))
    }

    /// Decode an image from encoded bytes
    pub fn load_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes).map_err(|e| {
            BgRemovalError::processing_stage_error(
                "image decoding",
                &e.to_string(),
                Some(&format!("{} bytes", bytes.len())),
            )
        })
    }

    /// Encode an image as PNG, keeping its alpha channel
    pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
        Ok(buffer)
    }
}
