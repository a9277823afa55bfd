// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Fatal problems found while resolving configuration. Nothing is shown to
/// the user except this message.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("API key not found! Please set the {0} environment variable.")]
    MissingCredential(&'static str),

    #[error("Invalid setting `{name}`: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Unsupported image type ({0}). Please upload a JPEG or PNG file.")]
    UnsupportedFormat(String),

    #[error("Could not recognise the file as an image")]
    Unrecognized,

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Failures of the remote vision-language model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Could not reach the vision model: {0}")]
    Network(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("The vision model rejected the API key: {0}")]
    Auth(String),

    #[error("Vision model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response from the vision model: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Tesseract could not start for {0}. Install Tesseract and its language data, or point --tessdata at them.")]
    EngineNotFound(String),

    #[error("Text recognition failed: {0}")]
    Recognition(String),

    #[error("Failed to prepare image for OCR: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("There is no text to read aloud")]
    NothingToSay,

    #[error("Speech engine `{0}` is not available")]
    EngineUnavailable(String),

    #[error("Speech engine failed: {0}")]
    Render(String),

    #[error("Speech engine finished but wrote no audio to {0}")]
    NoAudio(PathBuf),

    #[error("Speech engine I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that can stop a feature from producing its text.
#[derive(Debug, Error)]
pub enum AssistError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error("processing stopped unexpectedly: {0}")]
    Crashed(String),
}
