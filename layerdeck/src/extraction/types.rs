//! Core types for layer extraction.

use image::{DynamicImage, ImageFormat, ImageResult};
use serde::Serialize;

use crate::document::Rectangle;

/// One embedded image on one page as reported by the document library
#[derive(Debug, Clone)]
pub struct RawImage {
    /// Library reference the bytes were resolved from
    pub reference: usize,
    /// Encoded image bytes
    pub bytes: Vec<u8>,
    /// Encoding of `bytes`
    pub format: ImageFormat,
    /// Where the image is drawn on the page
    pub placement: Rectangle,
}

impl RawImage {
    pub fn decode(&self) -> ImageResult<DynamicImage> {
        image::load_from_memory_with_format(&self.bytes, self.format)
    }
}

/// A finished image ready for output
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedImage {
    /// Encoded image bytes (PNG for composited pairs, original encoding otherwise)
    #[serde(skip)]
    pub bytes: Vec<u8>,
    #[serde(skip)]
    pub format: ImageFormat,
    /// Text found below the image; empty when none
    pub caption: String,
    /// Page the image came from (0-indexed)
    pub page_index: usize,
}

impl ProcessedImage {
    /// File extension matching the encoding of `bytes`
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("bin")
    }
}
