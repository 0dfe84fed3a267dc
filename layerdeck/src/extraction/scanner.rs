//! Page scanning: enumerate the raster images drawn on one page.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::document::PageSource;
use crate::error::{ExtractResult, format_error_chain};
use crate::pipeline::check_cancellation;

use super::RawImage;

/// A recoverable problem found while scanning a page
#[derive(Debug, Clone)]
pub struct ScanWarning {
    pub page: usize,
    pub reference: Option<usize>,
    pub message: String,
}

/// Images found on a page, in scan order, plus any soft failures
#[derive(Debug, Default)]
pub struct PageScan {
    pub images: Vec<RawImage>,
    pub warnings: Vec<ScanWarning>,
}

/// Resolve every image on `page`.
///
/// Images whose reference cannot be resolved are skipped with a warning; a
/// page whose image list cannot be read yields an empty scan with a warning.
/// `min_dimension` drops images smaller than that many pixels on either side
/// (0 keeps everything). Cancellation is checked before each image is
/// resolved.
pub fn scan_page<S: PageSource + ?Sized>(
    source: &S,
    page: usize,
    min_dimension: u32,
    cancel: &CancellationToken,
    document: &str,
) -> ExtractResult<PageScan> {
    let mut scan = PageScan::default();

    let refs = match source.page_images(page) {
        Ok(refs) => refs,
        Err(e) => {
            warn!(page = page + 1, error = %e, "Failed to enumerate page images");
            scan.warnings.push(ScanWarning {
                page,
                reference: None,
                message: format_error_chain(&e),
            });
            return Ok(scan);
        }
    };

    for image_ref in refs {
        check_cancellation(cancel, document)?;

        let resolved = match source.resolve_image(page, &image_ref) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(
                    page = page + 1,
                    reference = image_ref.reference,
                    error = %e,
                    "Skipping unresolvable image"
                );
                scan.warnings.push(ScanWarning {
                    page,
                    reference: Some(image_ref.reference),
                    message: format_error_chain(&e),
                });
                continue;
            }
        };

        if min_dimension > 0 && is_too_small(&resolved.bytes, min_dimension) {
            debug!(
                page = page + 1,
                reference = image_ref.reference,
                min_dimension = min_dimension,
                "Skipping image: too small"
            );
            continue;
        }

        scan.images.push(RawImage {
            reference: image_ref.reference,
            bytes: resolved.bytes,
            format: resolved.format,
            placement: image_ref.placement,
        });
    }

    debug!(
        page = page + 1,
        images = scan.images.len(),
        warnings = scan.warnings.len(),
        "Scanned page"
    );

    Ok(scan)
}

/// Check dimensions from the image header without decoding pixels
fn is_too_small(bytes: &[u8], min_dimension: u32) -> bool {
    let reader = match image::ImageReader::new(std::io::Cursor::new(bytes)).with_guessed_format() {
        Ok(reader) => reader,
        Err(_) => return false,
    };
    match reader.into_dimensions() {
        Ok((width, height)) => width < min_dimension || height < min_dimension,
        // Undecodable headers are left for the decode step to report
        Err(_) => false,
    }
}
