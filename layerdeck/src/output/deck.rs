//! Slide deck assembly.
//!
//! Each image is staged as a PNG scratch file in the output directory, measured,
//! placed on its own blank slide and the scratch file removed again. The deck
//! itself is written next to its final name and only renamed into place once
//! complete, so an interrupted save never leaves a half-written `.pptx` behind.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::SlideConfig;
use crate::error::{ExtractResult, ExtractionError};
use crate::extraction::ProcessedImage;
use crate::pipeline::{ProgressPhase, check_cancellation};

use super::naming::{deck_file_name, temp_image_name};
use super::pptx::{EMU_PER_INCH, PictureFrame, PptxDeck};
use super::{AssemblyContext, CleanupGuard, decode, encode_png};

fn inches_to_emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH).round() as i64
}

/// Largest frame with the image's aspect ratio inside the configured maximum,
/// centered on the slide both ways.
pub fn fit_centered(pixel_width: u32, pixel_height: u32, slides: &SlideConfig) -> PictureFrame {
    let slide_width = slides.width_in * EMU_PER_INCH;
    let slide_height = slides.height_in * EMU_PER_INCH;
    let max_width = slides.max_width_in * EMU_PER_INCH;
    let max_height = slides.max_height_in * EMU_PER_INCH;

    let aspect = pixel_width.max(1) as f64 / pixel_height.max(1) as f64;
    let (width, height) = if aspect > max_width / max_height {
        (max_width, max_width / aspect)
    } else {
        (max_height * aspect, max_height)
    };

    PictureFrame {
        x: ((slide_width - width) / 2.0).round() as i64,
        y: ((slide_height - height) / 2.0).round() as i64,
        cx: width.round() as i64,
        cy: height.round() as i64,
    }
}

/// Build the deck for `images` and return its final path with the number of
/// slides placed.
///
/// Images that fail to decode are skipped. Scratch files are removed on every
/// exit path, including cancellation and save failures.
pub fn build_deck(
    images: &[ProcessedImage],
    slides: &SlideConfig,
    ctx: &AssemblyContext<'_>,
) -> ExtractResult<(PathBuf, usize)> {
    let mut deck = PptxDeck::new(
        ctx.stem,
        inches_to_emu(slides.width_in),
        inches_to_emu(slides.height_in),
        &slides.background,
    );
    let mut scratch = CleanupGuard::new();

    for (i, image) in images.iter().enumerate() {
        check_cancellation(ctx.cancel, ctx.document)?;

        let temp_path = ctx.directory.join(temp_image_name(ctx.stem, ctx.run_id, i));
        match add_image_slide(&mut deck, image, &temp_path, &mut scratch, slides, ctx.invert) {
            Ok(()) => {}
            Err(e) if e.is_per_image() => {
                warn!(
                    page = image.page_index + 1,
                    position = i + 1,
                    error = %e,
                    "Skipping image in slide deck"
                );
            }
            Err(e) => return Err(e),
        }
        scratch.remove(&temp_path);

        ctx.progress.report(
            ProgressPhase::Saving,
            i + 1,
            images.len(),
            Some(format!("Placed image {} of {}", i + 1, images.len())),
        );
    }

    check_cancellation(ctx.cancel, ctx.document)?;

    let path = ctx.directory.join(deck_file_name(ctx.stem));
    save_deck(&deck, ctx.directory, &path)?;

    info!(
        path = %path.display(),
        slides = deck.slide_count(),
        "Saved slide deck"
    );
    Ok((path, deck.slide_count()))
}

fn add_image_slide(
    deck: &mut PptxDeck,
    image: &ProcessedImage,
    temp_path: &Path,
    scratch: &mut CleanupGuard,
    slides: &SlideConfig,
    invert: bool,
) -> ExtractResult<()> {
    let mut decoded = decode(image)?;
    if invert {
        decoded.invert();
    }
    let png = encode_png(&decoded, image.page_index)?;

    std::fs::write(temp_path, &png)
        .map_err(|e| ExtractionError::from_save_failure(temp_path.to_path_buf(), e))?;
    scratch.track(temp_path.to_path_buf());

    let (width, height) =
        image::image_dimensions(temp_path).map_err(|e| ExtractionError::ImageDecode {
            page: image.page_index,
            reference: 0,
            source: Box::new(e),
        })?;
    let frame = fit_centered(width, height, slides);
    debug!(
        page = image.page_index + 1,
        width,
        height,
        x = frame.x,
        y = frame.y,
        cx = frame.cx,
        cy = frame.cy,
        "Placing image on slide"
    );

    let staged = std::fs::read(temp_path)?;
    deck.add_slide(staged, frame, Some(image.caption.clone()));
    Ok(())
}

/// Write the package beside `path`, then rename it into place
fn save_deck(deck: &PptxDeck, directory: &Path, path: &Path) -> ExtractResult<()> {
    let save_error = |e: std::io::Error| ExtractionError::from_save_failure(path.to_path_buf(), e);

    let mut staging = tempfile::Builder::new()
        .prefix(".layerdeck-")
        .suffix(".pptx.part")
        .tempfile_in(directory)
        .map_err(save_error)?;

    deck.write_to(staging.as_file_mut())
        .map_err(|e| save_error(std::io::Error::other(e)))?;
    staging.as_file().sync_all().map_err(save_error)?;

    staging.persist(path).map_err(|e| save_error(e.error))?;
    Ok(())
}
