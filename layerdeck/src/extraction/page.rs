//! Per-page processing: scan, group, pair, composite, caption.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ExtractionConfig;
use crate::document::PageSource;
use crate::error::{ExtractResult, ExtractionError};
use crate::pipeline::check_cancellation;

use super::{
    ProcessedImage, RawImage, composite_layers, group_layers, is_likely_overlay, read_caption,
    remove_black_matte, scan_page,
};

/// Turns one page into its list of output images
pub struct PageProcessor<'a> {
    config: &'a ExtractionConfig,
    include_unpaired: bool,
    cancel: &'a CancellationToken,
    document_name: &'a str,
}

impl<'a> PageProcessor<'a> {
    pub fn new(
        config: &'a ExtractionConfig,
        include_unpaired: bool,
        cancel: &'a CancellationToken,
        document_name: &'a str,
    ) -> Self {
        Self {
            config,
            include_unpaired,
            cancel,
            document_name,
        }
    }

    /// Process one page.
    ///
    /// Output follows group order (first-scanned corner first), which is not
    /// guaranteed to match the visual order on the page. Failures confined to
    /// one image or pair are logged and that output is skipped; only
    /// cancellation ends the page early.
    pub fn process<S: PageSource + ?Sized>(
        &self,
        source: &S,
        page: usize,
    ) -> ExtractResult<Vec<ProcessedImage>> {
        let scan = scan_page(
            source,
            page,
            self.config.scan.min_image_dimension,
            self.cancel,
            self.document_name,
        )?;
        let groups = group_layers(scan.images);
        let mut results = Vec::new();

        for (key, mut members) in groups {
            check_cancellation(self.cancel, self.document_name)?;

            let outcome = match members.len() {
                2 => {
                    let overlay = members.pop();
                    let base = members.pop();
                    match (base, overlay) {
                        (Some(base), Some(overlay)) => self
                            .process_pair(source, page, &base, &overlay)
                            .map(|image| vec![image]),
                        _ => Ok(vec![]),
                    }
                }
                count => {
                    if count > 2 {
                        debug!(
                            page = page + 1,
                            images = count,
                            x = key.x(),
                            y = key.y(),
                            "Group too large to pair, treating images as unpaired"
                        );
                    }
                    Ok(self.pass_through(page, members))
                }
            };

            match outcome {
                Ok(images) => results.extend(images),
                Err(e) if e.is_per_image() => {
                    warn!(
                        page = page + 1,
                        x = key.x(),
                        y = key.y(),
                        error = %e,
                        "Skipping layer group"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        debug!(page = page + 1, images = results.len(), "Processed page");
        Ok(results)
    }

    /// Emit standalone images unchanged, or drop them
    fn pass_through(&self, page: usize, images: Vec<RawImage>) -> Vec<ProcessedImage> {
        if !self.include_unpaired {
            return vec![];
        }
        images
            .into_iter()
            .map(|image| ProcessedImage {
                bytes: image.bytes,
                format: image.format,
                caption: String::new(),
                page_index: page,
            })
            .collect()
    }

    /// Composite a co-located pair.
    ///
    /// When exactly one layer looks like an overlay it is used as the overlay;
    /// when both or neither do, the later-scanned layer is, since producers
    /// draw annotations after the artwork they mark up.
    fn process_pair<S: PageSource + ?Sized>(
        &self,
        source: &S,
        page: usize,
        first: &RawImage,
        second: &RawImage,
    ) -> ExtractResult<ProcessedImage> {
        let decode = |image: &RawImage| {
            image.decode().map_err(|e| ExtractionError::ImageDecode {
                page,
                reference: image.reference,
                source: Box::new(e),
            })
        };
        let first_img = decode(first)?;
        let second_img = decode(second)?;

        let first_is_overlay = is_likely_overlay(&first_img, &self.config.classifier);
        let second_is_overlay = is_likely_overlay(&second_img, &self.config.classifier);

        let (base, overlay, overlay_reference) = if first_is_overlay && !second_is_overlay {
            (&second_img, &first_img, first.reference)
        } else {
            (&first_img, &second_img, second.reference)
        };

        debug!(
            page = page + 1,
            first_is_overlay = first_is_overlay,
            second_is_overlay = second_is_overlay,
            overlay_reference = overlay_reference,
            "Pairing layers"
        );

        let matted = remove_black_matte(overlay, self.config.matte.threshold);
        let composite = composite_layers(base, &matted).map_err(|e| ExtractionError::Composite {
            page,
            source: Box::new(e),
        })?;

        let bytes = encode_png(&DynamicImage::ImageRgba8(composite)).map_err(|e| {
            ExtractionError::Composite {
                page,
                source: Box::new(e),
            }
        })?;

        let placement = first.placement.union(&second.placement);
        let caption = read_caption(source, page, &placement);

        Ok(ProcessedImage {
            bytes,
            format: ImageFormat::Png,
            caption,
            page_index: page,
        })
    }
}

fn encode_png(image: &DynamicImage) -> image::ImageResult<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}
