//! Numbered image files.
//!
//! Captions are not carried by this output kind.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::{ExtractResult, ExtractionError};
use crate::extraction::ProcessedImage;
use crate::pipeline::{ProgressPhase, check_cancellation};

use super::naming::image_file_name;
use super::{AssemblyContext, CleanupGuard, output_bytes};

/// Write each image as `<stem>_<n>.<ext>`, numbering from 1.
///
/// An image that cannot be prepared (only possible when inverting) is skipped
/// and the numbering stays contiguous. A failed write or cancellation removes
/// every file this call already wrote.
pub fn write_image_files(
    images: &[ProcessedImage],
    ctx: &AssemblyContext<'_>,
) -> ExtractResult<Vec<PathBuf>> {
    let mut written = CleanupGuard::new();
    let mut next_index = 1;

    for (position, image) in images.iter().enumerate() {
        check_cancellation(ctx.cancel, ctx.document)?;

        let (bytes, extension) = match output_bytes(image, ctx.invert) {
            Ok(prepared) => prepared,
            Err(e) if e.is_per_image() => {
                warn!(
                    page = image.page_index + 1,
                    position = position + 1,
                    error = %e,
                    "Skipping image"
                );
                continue;
            }
            Err(e) => return Err(e),
        };

        let path = ctx
            .directory
            .join(image_file_name(ctx.stem, next_index, extension));
        std::fs::write(&path, &bytes)
            .map_err(|e| ExtractionError::from_save_failure(path.clone(), e))?;
        debug!(path = %path.display(), bytes = bytes.len(), "Wrote image file");
        written.track(path);
        next_index += 1;

        ctx.progress.report(
            ProgressPhase::Saving,
            position + 1,
            images.len(),
            Some(format!("Saved image {} of {}", position + 1, images.len())),
        );
    }

    Ok(written.keep())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ProgressReporter;
    use crate::testing::solid_png;
    use image::ImageFormat;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    fn processed(bytes: Vec<u8>, page_index: usize) -> ProcessedImage {
        ProcessedImage {
            bytes,
            format: ImageFormat::Png,
            caption: "ignored".to_string(),
            page_index,
        }
    }

    fn context<'a>(
        directory: &'a std::path::Path,
        invert: bool,
        cancel: &'a CancellationToken,
        progress: &'a ProgressReporter,
    ) -> AssemblyContext<'a> {
        AssemblyContext {
            directory,
            stem: "guide",
            invert,
            run_id: Uuid::new_v4(),
            document: "guide.pdf",
            cancel,
            progress,
        }
    }

    #[test]
    fn test_files_are_numbered_from_one() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let progress = ProgressReporter::disabled();
        let images = vec![
            processed(solid_png(2, 2, [1, 2, 3]), 0),
            processed(solid_png(3, 3, [4, 5, 6]), 1),
        ];

        let paths =
            write_image_files(&images, &context(dir.path(), false, &cancel, &progress)).unwrap();

        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0], dir.path().join("guide_1.png"));
        assert_eq!(paths[1], dir.path().join("guide_2.png"));
        assert_eq!(std::fs::read(&paths[1]).unwrap(), images[1].bytes);
    }

    #[test]
    fn test_undecodable_image_skipped_when_inverting() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let progress = ProgressReporter::disabled();
        let images = vec![
            processed(b"garbage".to_vec(), 0),
            processed(solid_png(2, 2, [0, 0, 0]), 0),
        ];

        let paths =
            write_image_files(&images, &context(dir.path(), true, &cancel, &progress)).unwrap();

        assert_eq!(paths, vec![dir.path().join("guide_1.png")]);
    }

    #[test]
    fn test_cancelled_run_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let progress = ProgressReporter::disabled();
        let images = vec![processed(solid_png(2, 2, [1, 2, 3]), 0)];

        let err = write_image_files(&images, &context(dir.path(), false, &cancel, &progress))
            .unwrap_err();

        assert!(matches!(err, ExtractionError::Cancelled { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_write_removes_earlier_files() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let progress = ProgressReporter::disabled();
        // A directory squatting on the second file name makes that write fail
        std::fs::create_dir(dir.path().join("guide_2.png")).unwrap();
        let images = vec![
            processed(solid_png(2, 2, [1, 2, 3]), 0),
            processed(solid_png(2, 2, [4, 5, 6]), 0),
        ];

        let result = write_image_files(&images, &context(dir.path(), false, &cancel, &progress));

        assert!(result.is_err());
        assert!(!dir.path().join("guide_1.png").exists());
    }
}
