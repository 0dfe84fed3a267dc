//! In-memory documents for unit tests.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tokio_util::sync::CancellationToken;

use crate::document::{
    DocumentLoader, ImageRef, PageSize, PageSource, Rectangle, ResolvedImage,
};
use crate::error::{ExtractResult, ExtractionError};

#[derive(Debug, Clone)]
enum MemoryImage {
    Encoded {
        bytes: Vec<u8>,
        format: ImageFormat,
        placement: Rectangle,
    },
    Broken {
        placement: Rectangle,
    },
}

#[derive(Debug, Clone)]
pub struct MemoryPage {
    size: PageSize,
    images: Vec<MemoryImage>,
    texts: Vec<(Rectangle, String)>,
}

impl MemoryPage {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: PageSize { width, height },
            images: Vec::new(),
            texts: Vec::new(),
        }
    }

    pub fn add_image(&mut self, bytes: Vec<u8>, placement: Rectangle) -> &mut Self {
        self.images.push(MemoryImage::Encoded {
            bytes,
            format: ImageFormat::Png,
            placement,
        });
        self
    }

    /// An image whose bytes are not decodable at all
    pub fn add_garbage_image(&mut self, placement: Rectangle) -> &mut Self {
        self.images.push(MemoryImage::Encoded {
            bytes: b"not an image".to_vec(),
            format: ImageFormat::Png,
            placement,
        });
        self
    }

    /// An image reference the library cannot resolve
    pub fn add_broken_image(&mut self, placement: Rectangle) -> &mut Self {
        self.images.push(MemoryImage::Broken { placement });
        self
    }

    pub fn add_text(&mut self, bounds: Rectangle, text: &str) -> &mut Self {
        self.texts.push((bounds, text.to_string()));
        self
    }
}

/// Shared observations about documents opened from a `MemoryLoader`
#[derive(Debug, Default)]
pub struct DocumentProbe {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
}

impl DocumentProbe {
    pub fn all_closed(&self) -> bool {
        self.opened.load(Ordering::SeqCst) == self.closed.load(Ordering::SeqCst)
    }
}

pub struct MemoryDocument {
    pages: Vec<MemoryPage>,
    probe: Option<Arc<DocumentProbe>>,
    cancel_on_scan: Option<(usize, CancellationToken)>,
    resolved: AtomicUsize,
}

impl MemoryDocument {
    pub fn new(pages: Vec<MemoryPage>) -> Self {
        Self {
            pages,
            probe: None,
            cancel_on_scan: None,
            resolved: AtomicUsize::new(0),
        }
    }

    /// Cancel `token` as soon as `page`'s images are enumerated
    pub fn cancel_when_scanning(mut self, page: usize, token: CancellationToken) -> Self {
        self.cancel_on_scan = Some((page, token));
        self
    }

    /// How many image references have been resolved so far
    pub fn resolved_count(&self) -> usize {
        self.resolved.load(Ordering::SeqCst)
    }

    fn page(&self, page: usize) -> ExtractResult<&MemoryPage> {
        self.pages.get(page).ok_or_else(|| ExtractionError::PageAccess {
            page,
            message: "no such page".to_string(),
        })
    }
}

impl Drop for MemoryDocument {
    fn drop(&mut self) {
        if let Some(probe) = &self.probe {
            probe.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn center_inside(inner: &Rectangle, outer: &Rectangle) -> bool {
    let cx = (inner.x1 + inner.x2) / 2.0;
    let cy = (inner.y1 + inner.y2) / 2.0;
    cx >= outer.x1 && cx <= outer.x2 && cy >= outer.y1 && cy <= outer.y2
}

impl PageSource for MemoryDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, page: usize) -> ExtractResult<PageSize> {
        Ok(self.page(page)?.size)
    }

    fn page_images(&self, page: usize) -> ExtractResult<Vec<ImageRef>> {
        if let Some((trigger_page, token)) = &self.cancel_on_scan
            && *trigger_page == page
        {
            token.cancel();
        }

        Ok(self
            .page(page)?
            .images
            .iter()
            .enumerate()
            .map(|(reference, image)| ImageRef {
                reference,
                placement: match image {
                    MemoryImage::Encoded { placement, .. } | MemoryImage::Broken { placement } => {
                        *placement
                    }
                },
            })
            .collect())
    }

    fn resolve_image(&self, page: usize, image: &ImageRef) -> ExtractResult<ResolvedImage> {
        self.resolved.fetch_add(1, Ordering::SeqCst);
        match self.page(page)?.images.get(image.reference) {
            Some(MemoryImage::Encoded { bytes, format, .. }) => Ok(ResolvedImage {
                bytes: bytes.clone(),
                format: *format,
            }),
            _ => Err(ExtractionError::ImageDecode {
                page,
                reference: image.reference,
                source: Box::new(std::io::Error::other("unresolvable reference")),
            }),
        }
    }

    fn text_in_rect(&self, page: usize, rect: &Rectangle) -> ExtractResult<String> {
        let texts: Vec<&str> = self
            .page(page)?
            .texts
            .iter()
            .filter(|(bounds, _)| center_inside(bounds, rect))
            .map(|(_, text)| text.as_str())
            .collect();
        Ok(texts.join("\n"))
    }
}

/// Serves one in-memory document at a fixed path
pub struct MemoryLoader {
    path: PathBuf,
    pages: Vec<MemoryPage>,
    probe: Arc<DocumentProbe>,
    cancel_on_scan: Option<(usize, CancellationToken)>,
}

impl MemoryLoader {
    pub fn new(path: impl Into<PathBuf>, pages: Vec<MemoryPage>) -> Self {
        Self {
            path: path.into(),
            pages,
            probe: Arc::new(DocumentProbe::default()),
            cancel_on_scan: None,
        }
    }

    /// Cancel `token` as soon as the pipeline starts scanning `page`
    pub fn cancel_when_scanning(mut self, page: usize, token: CancellationToken) -> Self {
        self.cancel_on_scan = Some((page, token));
        self
    }

    pub fn probe(&self) -> Arc<DocumentProbe> {
        self.probe.clone()
    }
}

impl DocumentLoader for MemoryLoader {
    type Document<'a> = MemoryDocument;

    fn open<'a>(&'a self, path: &Path) -> ExtractResult<MemoryDocument> {
        if path != self.path {
            return Err(ExtractionError::DocumentOpen {
                path: path.to_path_buf(),
                message: "file not found".to_string(),
            });
        }
        self.probe.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryDocument {
            pages: self.pages.clone(),
            probe: Some(self.probe.clone()),
            cancel_on_scan: self.cancel_on_scan.clone(),
            resolved: AtomicUsize::new(0),
        })
    }
}

pub fn encode_png(image: &DynamicImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    encode_png(&DynamicImage::ImageRgb8(RgbImage::from_pixel(
        width,
        height,
        Rgb(rgb),
    )))
}

/// Mid-tone artwork the classifier rejects
pub fn artwork_png(width: u32, height: u32) -> Vec<u8> {
    encode_png(&DynamicImage::ImageRgb8(RgbImage::from_fn(
        width,
        height,
        |x, y| Rgb([(60 + x % 100) as u8, (80 + y % 100) as u8, 140]),
    )))
}

/// White markup on a black field, the classic flattened overlay
pub fn markup_png(width: u32, height: u32) -> Vec<u8> {
    encode_png(&DynamicImage::ImageRgb8(RgbImage::from_fn(
        width,
        height,
        |x, y| {
            if y == height / 2 || x == width / 2 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        },
    )))
}

/// Two pages: an unpaired image on page 1, a captioned base+overlay pair on page 2
pub fn two_page_document() -> Vec<MemoryPage> {
    let mut first = MemoryPage::new(612.0, 792.0);
    first.add_image(artwork_png(40, 30), Rectangle::new(50.0, 50.0, 250.0, 200.0));

    let mut second = MemoryPage::new(612.0, 792.0);
    let pair = Rectangle::new(100.0, 100.0, 400.0, 300.0);
    second.add_image(artwork_png(60, 40), pair);
    second.add_image(markup_png(60, 40), pair);
    second.add_text(Rectangle::new(110.0, 320.0, 170.0, 332.0), "Fig. 2");

    vec![first, second]
}
