//! Document source abstraction.
//!
//! The pipeline only needs a handful of capabilities from a paginated document:
//! page geometry, the raster images drawn on each page with their placement,
//! the encoded bytes behind each image reference, and the text inside a page
//! rectangle. `DocumentLoader`/`PageSource` capture exactly that, so the PDF
//! library stays behind one seam.
//!
//! All rectangles use page coordinates in points with a top-left origin
//! (y grows downward), the convention of most PDF image enumerators.

pub mod pdfium;

use std::path::Path;

use image::ImageFormat;

use crate::error::ExtractResult;

/// Rectangle in page coordinates (points, top-left origin)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rectangle {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).abs()
    }

    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).abs()
    }

    /// Axis-aligned bounding box of both rectangles
    pub fn union(&self, other: &Rectangle) -> Rectangle {
        Rectangle {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }
}

/// Page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// An image drawn on a page, before its bytes are resolved
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageRef {
    /// Library-specific handle used to resolve the image bytes
    pub reference: usize,
    /// Where the image is drawn on the page
    pub placement: Rectangle,
}

/// Encoded bytes behind an image reference
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

/// Read access to an open document.
///
/// Dropping the value releases the underlying handle.
pub trait PageSource {
    fn page_count(&self) -> usize;

    fn page_size(&self, page: usize) -> ExtractResult<PageSize>;

    /// Images on `page` in content-stream order
    fn page_images(&self, page: usize) -> ExtractResult<Vec<ImageRef>>;

    fn resolve_image(&self, page: usize, image: &ImageRef) -> ExtractResult<ResolvedImage>;

    /// Text whose glyphs fall inside `rect` on `page`
    fn text_in_rect(&self, page: usize, rect: &Rectangle) -> ExtractResult<String>;
}

/// Opens documents by path.
pub trait DocumentLoader: Send + Sync {
    type Document<'a>: PageSource
    where
        Self: 'a;

    fn open<'a>(&'a self, path: &Path) -> ExtractResult<Self::Document<'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_dimensions() {
        let rect = Rectangle::new(10.0, 20.0, 110.0, 70.0);
        assert_eq!(rect.width(), 100.0);
        assert_eq!(rect.height(), 50.0);
    }

    #[test]
    fn test_rectangle_union() {
        let a = Rectangle::new(0.0, 0.0, 100.0, 100.0);
        let b = Rectangle::new(50.0, 50.0, 150.0, 120.0);
        let union = a.union(&b);
        assert_eq!(union, Rectangle::new(0.0, 0.0, 150.0, 120.0));
    }
}
