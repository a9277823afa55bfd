// src/upload.rs
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, ImageFormat};
use log::info;
use std::io::Cursor;
use std::path::Path;

use crate::error::ImageError;

/// File extensions offered by the upload dialog.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Transport-safe copy of an uploaded image, ready to embed in a model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImagePayload {
    pub mime_type: &'static str,
    pub data: String,
}

impl EncodedImagePayload {
    /// Re-encode as PNG and base64 it.
    pub fn from_image(image: &DynamicImage) -> Result<Self, ImageError> {
        let png = encode_png(image)?;
        Ok(Self {
            mime_type: "image/png",
            data: general_purpose::STANDARD.encode(png),
        })
    }
}

/// An image the user picked, decoded and with its payload precomputed.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub name: String,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
    pub decoded: DynamicImage,
    pub payload: EncodedImagePayload,
}

impl UploadedImage {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ImageError> {
        let name = name.into();
        let format = image::guess_format(&bytes).map_err(|_| ImageError::Unrecognized)?;
        if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
            return Err(ImageError::UnsupportedFormat(format!("{:?}", format)));
        }

        let decoded = image::load_from_memory_with_format(&bytes, format)?;
        let payload = EncodedImagePayload::from_image(&decoded)?;

        info!(
            "Loaded {} ({:?}, {}x{}, {} bytes)",
            name,
            format,
            decoded.width(),
            decoded.height(),
            bytes.len()
        );

        Ok(Self {
            name,
            format,
            bytes,
            decoded,
            payload,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, ImageError> {
        let bytes = std::fs::read(path).map_err(|source| ImageError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_bytes(name, bytes)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.decoded.width(), self.decoded.height())
    }
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    image.write_to(&mut cursor, image::ImageOutputFormat::Png)?;
    Ok(buffer)
}
