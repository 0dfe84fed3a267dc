//! PDF documents backed by pdfium-render.
//!
//! pdfium reports geometry with a bottom-left origin; everything handed to the
//! rest of the crate is flipped to the top-left convention of `Rectangle`.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use tracing::{debug, trace, warn};

use super::{DocumentLoader, ImageRef, PageSize, PageSource, Rectangle, ResolvedImage};
use crate::error::{ExtractResult, ExtractionError};

/// Create a new Pdfium instance (dynamically linked).
///
/// Searches for libpdfium in:
/// 1. Current directory (./libpdfium.so)
/// 2. vendor/pdfium/lib/
/// 3. System library paths
pub fn create_pdfium() -> ExtractResult<Pdfium> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "./vendor/pdfium/lib/",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| ExtractionError::Config {
            message: format!(
                "Failed to load PDFium library. Install libpdfium or place it next to the binary: {:?}",
                e
            ),
        })?;

    Ok(Pdfium::new(bindings))
}

/// Opens PDF files with a shared pdfium binding
pub struct PdfiumLoader {
    pdfium: Pdfium,
}

impl PdfiumLoader {
    pub fn new(pdfium: Pdfium) -> Self {
        Self { pdfium }
    }
}

impl DocumentLoader for PdfiumLoader {
    type Document<'a> = PdfiumDocument<'a>;

    fn open<'a>(&'a self, path: &Path) -> ExtractResult<PdfiumDocument<'a>> {
        let document = self.pdfium.load_pdf_from_file(path, None).map_err(|e| {
            ExtractionError::DocumentOpen {
                path: path.to_path_buf(),
                message: format!("{:?}", e),
            }
        })?;

        debug!(
            path = %path.display(),
            pages = document.pages().len(),
            "Opened PDF with pdfium"
        );

        Ok(PdfiumDocument {
            document,
            path: path.to_path_buf(),
        })
    }
}

/// An open PDF; the pdfium handle is closed when this is dropped
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
    path: PathBuf,
}

impl PdfiumDocument<'_> {
    fn page(&self, page: usize) -> ExtractResult<PdfPage<'_>> {
        let index = PdfPageIndex::try_from(page).map_err(|_| ExtractionError::PageAccess {
            page,
            message: "page index out of range".to_string(),
        })?;

        self.document
            .pages()
            .get(index)
            .map_err(|e| ExtractionError::PageAccess {
                page,
                message: format!("{}: {}", self.path.display(), e),
            })
    }
}

/// Convert a pdfium rectangle (bottom-left origin) to top-left page coordinates
fn pdf_rect_to_rectangle(rect: &PdfRect, page_height: f64) -> Rectangle {
    Rectangle {
        x1: rect.left().value as f64,
        y1: page_height - rect.top().value as f64,
        x2: rect.right().value as f64,
        y2: page_height - rect.bottom().value as f64,
    }
}

/// Convert top-left page coordinates back to a pdfium rectangle
fn rectangle_to_pdf_rect(rect: &Rectangle, page_height: f64) -> PdfRect {
    PdfRect::new_from_values(
        (page_height - rect.y2) as f32,
        rect.x1 as f32,
        (page_height - rect.y1) as f32,
        rect.x2 as f32,
    )
}

/// Strip an alpha channel that carries no transparency.
///
/// pdfium widens BGR and BGRx bitmaps to RGBA with every alpha byte at 255;
/// left in place, that channel would mark every opaque photo as a layer with
/// its own transparency.
fn drop_opaque_alpha(image: DynamicImage) -> DynamicImage {
    let opaque = match &image {
        DynamicImage::ImageRgba8(rgba) => rgba.pixels().all(|p| p[3] == u8::MAX),
        DynamicImage::ImageLumaA8(luma) => luma.pixels().all(|p| p[1] == u8::MAX),
        _ => false,
    };
    if !opaque {
        return image;
    }

    if image.color().has_color() {
        DynamicImage::ImageRgb8(image.to_rgb8())
    } else {
        DynamicImage::ImageLuma8(image.to_luma8())
    }
}

fn encode_decoded(image: DynamicImage) -> image::ImageResult<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

impl PageSource for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_size(&self, page: usize) -> ExtractResult<PageSize> {
        let pdf_page = self.page(page)?;
        Ok(PageSize {
            width: pdf_page.width().value as f64,
            height: pdf_page.height().value as f64,
        })
    }

    fn page_images(&self, page: usize) -> ExtractResult<Vec<ImageRef>> {
        let pdf_page = self.page(page)?;
        let page_height = pdf_page.height().value as f64;

        let mut images = Vec::new();
        for (index, object) in pdf_page.objects().iter().enumerate() {
            let PdfPageObject::Image(image_obj) = &object else {
                continue;
            };
            match image_obj.bounds() {
                Ok(quad_points) => {
                    let placement = pdf_rect_to_rectangle(&quad_points.to_rect(), page_height);
                    trace!(
                        page = page + 1,
                        object_index = index,
                        bounds = format!(
                            "({:.1},{:.1})-({:.1},{:.1})",
                            placement.x1, placement.y1, placement.x2, placement.y2
                        ),
                        "Found image object"
                    );
                    images.push(ImageRef {
                        reference: index,
                        placement,
                    });
                }
                Err(e) => warn!(
                    page = page + 1,
                    object_index = index,
                    error = %e,
                    "Skipping image object without bounds"
                ),
            }
        }

        Ok(images)
    }

    fn resolve_image(&self, page: usize, image: &ImageRef) -> ExtractResult<ResolvedImage> {
        let decode_error = |message: String| ExtractionError::ImageDecode {
            page,
            reference: image.reference,
            source: Box::new(std::io::Error::other(message)),
        };

        let pdf_page = self.page(page)?;
        let object = pdf_page
            .objects()
            .get(image.reference)
            .map_err(|e| decode_error(format!("object lookup failed: {}", e)))?;
        let image_obj = object
            .as_image_object()
            .ok_or_else(|| decode_error("object is not an image".to_string()))?;

        let decoded = image_obj
            .get_raw_image()
            .map_err(|e| decode_error(format!("pdfium could not decode image: {}", e)))?;

        // pdfium hands back decoded pixels, so the stored encoding is PNG.
        let bytes = encode_decoded(drop_opaque_alpha(decoded)).map_err(|e| {
            ExtractionError::ImageDecode {
                page,
                reference: image.reference,
                source: Box::new(e),
            }
        })?;

        Ok(ResolvedImage {
            bytes,
            format: ImageFormat::Png,
        })
    }

    fn text_in_rect(&self, page: usize, rect: &Rectangle) -> ExtractResult<String> {
        let pdf_page = self.page(page)?;
        let page_height = pdf_page.height().value as f64;
        let text = pdf_page.text().map_err(|e| ExtractionError::PageAccess {
            page,
            message: format!("failed to load text: {}", e),
        })?;

        Ok(text.inside_rect(rectangle_to_pdf_rect(rect, page_height)))
    }
}
