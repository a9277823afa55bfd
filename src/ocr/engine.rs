// src/ocr/engine.rs
use image::DynamicImage;

use crate::error::OcrError;

/// OCR engine abstraction
pub trait OcrEngine: Send + Sync {
    /// Recognize all text in the image. Empty output means no text was found.
    fn extract_text(&self, image: &DynamicImage) -> Result<String, OcrError>;

    /// Report the engine version if it can be started
    fn probe(&self) -> Result<String, OcrError>;
}
