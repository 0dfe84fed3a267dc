//! Output assembly: numbered image files or a slide deck.
//!
//! Both output kinds write into the request's output directory, creating it
//! when missing. Anything written by a run that does not complete (failure or
//! cancellation) is removed again before the job reports.

pub mod deck;
pub mod files;
pub mod launcher;
pub mod naming;
pub mod pptx;

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ExtractionConfig;
use crate::error::{ExtractResult, ExtractionError};
use crate::extraction::ProcessedImage;
use crate::pipeline::ProgressReporter;

pub use launcher::{ArtifactLauncher, NoopLauncher, SystemLauncher};

/// What the assembler produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Files,
    SlideDeck,
}

/// Per-run state shared by both output writers
pub struct AssemblyContext<'a> {
    pub directory: &'a Path,
    /// Artifact name stem, `<base>[ <range suffix>]`
    pub stem: &'a str,
    pub invert: bool,
    pub run_id: Uuid,
    pub document: &'a str,
    pub cancel: &'a CancellationToken,
    pub progress: &'a ProgressReporter,
}

/// Files created by an in-flight run.
///
/// Every tracked path is deleted on drop unless the guard was released with
/// `keep`.
#[derive(Debug, Default)]
pub(crate) struct CleanupGuard {
    paths: Vec<PathBuf>,
}

impl CleanupGuard {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn track(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Delete a tracked file now
    pub(crate) fn remove(&mut self, path: &Path) {
        self.paths.retain(|tracked| tracked != path);
        remove_quietly(path);
    }

    /// Stop tracking and hand back the surviving paths
    pub(crate) fn keep(mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.paths)
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            remove_quietly(&path);
        }
    }
}

fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove file"),
    }
}

/// Bytes and extension to write for `image`.
///
/// Without inversion the original encoding is passed through. Inverted images
/// have their color channels flipped (alpha untouched) and are re-encoded as
/// PNG.
pub(crate) fn output_bytes(
    image: &ProcessedImage,
    invert: bool,
) -> ExtractResult<(Vec<u8>, &'static str)> {
    if !invert {
        return Ok((image.bytes.clone(), image.extension()));
    }
    let mut decoded = decode(image)?;
    decoded.invert();
    Ok((encode_png(&decoded, image.page_index)?, "png"))
}

pub(crate) fn decode(image: &ProcessedImage) -> ExtractResult<DynamicImage> {
    image::load_from_memory_with_format(&image.bytes, image.format).map_err(|e| {
        ExtractionError::ImageDecode {
            page: image.page_index,
            reference: 0,
            source: Box::new(e),
        }
    })
}

pub(crate) fn encode_png(image: &DynamicImage, page: usize) -> ExtractResult<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| ExtractionError::Composite {
            page,
            source: Box::new(e),
        })?;
    Ok(bytes)
}

/// What an assembly run left behind
#[derive(Debug, Clone, Default)]
pub struct Assembled {
    /// Images written or placed on slides
    pub placed: usize,
    /// Final artifact paths
    pub artifacts: Vec<PathBuf>,
}

/// Hands processed images to the writer for the requested output kind
pub struct OutputAssembler<'a> {
    config: &'a ExtractionConfig,
    launcher: &'a dyn ArtifactLauncher,
}

impl<'a> OutputAssembler<'a> {
    pub fn new(config: &'a ExtractionConfig, launcher: &'a dyn ArtifactLauncher) -> Self {
        Self { config, launcher }
    }

    /// Write `images` in the requested form.
    ///
    /// Image files are never launched; a finished deck is, when configured.
    pub fn assemble(
        &self,
        images: &[ProcessedImage],
        kind: OutputKind,
        ctx: &AssemblyContext<'_>,
    ) -> ExtractResult<Assembled> {
        std::fs::create_dir_all(ctx.directory).map_err(|e| {
            ExtractionError::from_save_failure(ctx.directory.to_path_buf(), e)
        })?;

        let assembled = match kind {
            OutputKind::Files => {
                let artifacts = files::write_image_files(images, ctx)?;
                Assembled {
                    placed: artifacts.len(),
                    artifacts,
                }
            }
            OutputKind::SlideDeck => {
                let (path, placed) = deck::build_deck(images, &self.config.slides, ctx)?;
                if self.config.output.open_artifacts {
                    self.launcher.open(&path);
                }
                Assembled {
                    placed,
                    artifacts: vec![path],
                }
            }
        };

        info!(
            kind = %kind,
            placed = assembled.placed,
            artifacts = assembled.artifacts.len(),
            directory = %ctx.directory.display(),
            "Output assembled"
        );
        Ok(assembled)
    }
}
