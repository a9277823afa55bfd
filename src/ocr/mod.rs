pub mod engine;
pub mod tesseract;

pub use engine::OcrEngine;
pub use tesseract::TesseractEngine;
