// src/ocr/tesseract.rs
use image::DynamicImage;
use log::info;
use std::time::Instant;
use tesseract::Tesseract;

use super::engine::OcrEngine;
use crate::config::OcrConfig;
use crate::error::OcrError;
use crate::upload::encode_png;

/// Tesseract OCR engine backed by libtesseract
pub struct TesseractEngine {
    // Tesseract instances are not shareable across threads, so one is created per call
    datapath: Option<String>,
    language: String,
}

impl TesseractEngine {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            datapath: config.datapath.clone(),
            language: config.language.clone(),
        }
    }

    fn init(&self) -> Result<Tesseract, OcrError> {
        Tesseract::new(self.datapath.as_deref(), Some(&self.language)).map_err(|e| {
            OcrError::EngineNotFound(format!("language `{}`: {}", self.language, e))
        })
    }

    /// Whether libtesseract starts with the configured language data
    pub fn is_available(&self) -> bool {
        self.init().is_ok()
    }
}

impl OcrEngine for TesseractEngine {
    fn extract_text(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let png = encode_png(image)?;
        info!(
            "Running Tesseract on {}x{} image ({} bytes, lang {})",
            image.width(),
            image.height(),
            png.len(),
            self.language
        );

        let started = Instant::now();
        let text = self
            .init()?
            .set_image_from_mem(&png)
            .map_err(|e| OcrError::Recognition(format!("failed to set image: {}", e)))?
            .get_text()
            .map_err(|e| OcrError::Recognition(e.to_string()))?;

        info!(
            "OCR produced {} chars in {:.1}s",
            text.trim().len(),
            started.elapsed().as_secs_f32()
        );
        Ok(text)
    }

    fn probe(&self) -> Result<String, OcrError> {
        self.init()?;
        Ok(format!("Tesseract (lang {})", self.language))
    }
}
