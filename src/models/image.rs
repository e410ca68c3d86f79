// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Uploaded still images.
//!
//! The format is detected from the leading magic bytes; the client-supplied
//! file name and content type are never trusted. A payload is only accepted
//! once it fully decodes in that format.

use axum::body::Bytes;
use ::image::ImageFormat;

/// Raster formats accepted for sightings.
const ACCEPTED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
    "image/tiff",
];

/// A still image whose format has been verified.
#[derive(Debug, Clone)]
pub struct RasterImage {
    bytes: Bytes,
    mime_type: &'static str,
    extension: &'static str,
}

impl RasterImage {
    /// Sniff the payload and accept it if it is a supported raster format
    /// that decodes cleanly.
    ///
    /// Decoding is CPU-bound; callers on the async runtime should run this
    /// on a blocking thread.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self, ImageError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }

        let kind = infer::get(&bytes).ok_or(ImageError::UnknownFormat)?;
        if kind.matcher_type() != infer::MatcherType::Image
            || !ACCEPTED_MIME_TYPES.contains(&kind.mime_type())
        {
            return Err(ImageError::Unsupported(kind.mime_type().to_string()));
        }

        let format = ImageFormat::from_mime_type(kind.mime_type())
            .ok_or_else(|| ImageError::Unsupported(kind.mime_type().to_string()))?;
        ::image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| ImageError::Undecodable(e.to_string()))?;

        Ok(Self {
            bytes,
            mime_type: kind.mime_type(),
            extension: kind.extension(),
        })
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    /// File extension matching the detected format (e.g. `jpg`).
    pub fn extension(&self) -> &'static str {
        self.extension
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Reasons an upload is not accepted as an image.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Image payload is empty")]
    Empty,

    #[error("Payload is not a recognizable image")]
    UnknownFormat,

    #[error("Unsupported image format: {0}")]
    Unsupported(String),

    #[error("Image data is corrupt or truncated: {0}")]
    Undecodable(String),
}

/// Encode a small solid-color picture, for tests.
#[cfg(test)]
pub(crate) fn sample_image(format: ImageFormat) -> Vec<u8> {
    use ::image::{DynamicImage, Rgb, RgbImage};
    use std::io::Cursor;

    let picture = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([180, 90, 40])));
    let mut buf = Vec::new();
    picture
        .write_to(&mut Cursor::new(&mut buf), format)
        .expect("encode sample image");
    buf
}
