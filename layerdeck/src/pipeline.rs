//! Extraction pipeline orchestration.
//!
//! A job opens the document, runs the page processor over the requested range
//! one page at a time, releases the document, then either returns the buffers
//! (preview) or hands them to the output assembler (extract).
//!
//! Cancellation is cooperative: the token is checked before every page and
//! every group or output image. A cancelled job keeps nothing. No deck is
//! saved, image files written by the run are removed again, and the result
//! reports [`JobStatus::Cancelled`].

mod cancellation;
pub mod progress;
pub mod request;
mod worker;

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use strum::Display;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::ExtractionConfig;
use crate::document::{DocumentLoader, PageSource};
use crate::error::{ExtractResult, ExtractionError, format_error_chain};
use crate::extraction::{PageProcessor, ProcessedImage};
use crate::output::naming::artifact_stem;
use crate::output::{ArtifactLauncher, AssemblyContext, OutputAssembler};

pub use crate::output::OutputKind;
pub use cancellation::check_cancellation;
pub use progress::{ProgressPhase, ProgressReporter, ProgressUpdate};
pub use request::{ExtractionMode, ExtractionRequest};
pub use worker::ExtractionJob;

/// Terminal state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultPayload {
    /// Processed buffers, nothing written
    Preview { images: Vec<ProcessedImage> },
    /// Artifacts written to disk
    Produced {
        count: usize,
        artifacts: Vec<PathBuf>,
    },
    Nothing,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub status: JobStatus,
    pub message: String,
    pub payload: ResultPayload,
}

impl ExtractionResult {
    pub fn success(&self) -> bool {
        self.status == JobStatus::Succeeded
    }

    pub(crate) fn failed(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            message: message.into(),
            payload: ResultPayload::Nothing,
        }
    }

    fn cancelled() -> Self {
        Self {
            status: JobStatus::Cancelled,
            message: "Extraction cancelled".to_string(),
            payload: ResultPayload::Nothing,
        }
    }
}

/// Runs extraction jobs against documents opened by `L`
pub struct Pipeline<L: DocumentLoader> {
    loader: L,
    config: ExtractionConfig,
    launcher: Arc<dyn ArtifactLauncher>,
}

impl<L: DocumentLoader> Pipeline<L> {
    pub fn new(loader: L, config: ExtractionConfig, launcher: Arc<dyn ArtifactLauncher>) -> Self {
        Self {
            loader,
            config,
            launcher,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Run one job to completion on the current thread.
    ///
    /// Never panics on bad input; every outcome is folded into the result.
    pub fn run(
        &self,
        request: &ExtractionRequest,
        cancel: &CancellationToken,
        progress: &ProgressReporter,
    ) -> ExtractionResult {
        match self.execute(request, cancel, progress) {
            Ok(result) => {
                info!(status = %result.status, message = %result.message, "Extraction finished");
                result
            }
            Err(ExtractionError::Cancelled { document }) => {
                warn!(document = %document, "Extraction cancelled");
                ExtractionResult::cancelled()
            }
            Err(e) => {
                let message = format_error_chain(&e);
                error!(
                    document = %request.document_path.display(),
                    error = %message,
                    "Extraction failed"
                );
                ExtractionResult::failed(message)
            }
        }
    }

    fn execute(
        &self,
        request: &ExtractionRequest,
        cancel: &CancellationToken,
        progress: &ProgressReporter,
    ) -> ExtractResult<ExtractionResult> {
        let document_name = request
            .document_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| request.document_path.display().to_string());

        info!(
            document = %request.document_path.display(),
            mode = %request.mode,
            output = %request.output_kind,
            include_unpaired = request.include_unpaired,
            "Starting extraction"
        );

        // The document is only held while pages are processed
        let (images, range, page_count) = {
            let document = self.loader.open(&request.document_path)?;
            let page_count = document.page_count();
            let range = request.validate(page_count)?;
            let processor = PageProcessor::new(
                &self.config,
                request.include_unpaired,
                cancel,
                &document_name,
            );

            let total = range.len();
            let mut images = Vec::new();
            for (done, page) in range.clone().enumerate() {
                check_cancellation(cancel, &document_name)?;
                images.extend(processor.process(&document, page)?);
                progress.report(
                    ProgressPhase::Pages,
                    done + 1,
                    total,
                    Some(format!("Processed page {} of {}", page + 1, range.end)),
                );
            }
            (images, range, page_count)
        };

        let pages = format!("pages {}-{}", range.start + 1, range.end);

        if request.mode == ExtractionMode::Preview {
            return Ok(ExtractionResult {
                status: JobStatus::Succeeded,
                message: format!("Found {} images in {}", images.len(), pages),
                payload: ResultPayload::Preview { images },
            });
        }

        if images.is_empty() {
            return Ok(ExtractionResult {
                status: JobStatus::Succeeded,
                message: format!("No images found in {}", pages),
                payload: ResultPayload::Produced {
                    count: 0,
                    artifacts: Vec::new(),
                },
            });
        }

        let stem = artifact_stem(&request.document_path, range.start, range.end, page_count);
        let ctx = AssemblyContext {
            directory: &request.output_directory,
            stem: &stem,
            invert: request.invert,
            run_id: Uuid::new_v4(),
            document: &document_name,
            cancel,
            progress,
        };
        let assembled = OutputAssembler::new(&self.config, self.launcher.as_ref()).assemble(
            &images,
            request.output_kind,
            &ctx,
        )?;

        let message = match request.output_kind {
            OutputKind::Files => format!(
                "Saved {} images to {}",
                assembled.placed,
                request.output_directory.display()
            ),
            OutputKind::SlideDeck => format!(
                "Created slide deck with {} slides: {}",
                assembled.placed,
                assembled
                    .artifacts
                    .first()
                    .map(|path| path.display().to_string())
                    .unwrap_or_default()
            ),
        };

        Ok(ExtractionResult {
            status: JobStatus::Succeeded,
            message,
            payload: ResultPayload::Produced {
                count: assembled.placed,
                artifacts: assembled.artifacts,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryLoader, MemoryPage, two_page_document};
    use std::io::Read;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::Ordering;

    #[derive(Default)]
    struct RecordingLauncher {
        opened: Mutex<Vec<PathBuf>>,
    }

    impl ArtifactLauncher for RecordingLauncher {
        fn open(&self, path: &Path) {
            self.opened.lock().unwrap().push(path.to_path_buf());
        }
    }

    const DOCUMENT: &str = "/library/scenario.pdf";

    fn pipeline(loader: MemoryLoader) -> (Pipeline<MemoryLoader>, Arc<RecordingLauncher>) {
        let launcher = Arc::new(RecordingLauncher::default());
        (
            Pipeline::new(loader, ExtractionConfig::default(), launcher.clone()),
            launcher,
        )
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn notes_text(xml: &str) -> String {
        xml.split("<a:t>")
            .skip(1)
            .filter_map(|part| part.split("</a:t>").next())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_files_output_for_two_page_document() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, launcher) = pipeline(MemoryLoader::new(DOCUMENT, two_page_document()));
        let request = ExtractionRequest::new(DOCUMENT, dir.path())
            .with_output_kind(OutputKind::Files)
            .with_unpaired(true);

        let result = pipeline.run(
            &request,
            &CancellationToken::new(),
            &ProgressReporter::disabled(),
        );

        assert!(result.success(), "{}", result.message);
        assert_eq!(
            entries(dir.path()),
            vec!["scenario_1.png".to_string(), "scenario_2.png".to_string()]
        );
        let composite = image::open(dir.path().join("scenario_2.png")).unwrap();
        assert!(composite.color().has_alpha());
        assert!(launcher.opened.lock().unwrap().is_empty());
        match result.payload {
            ResultPayload::Produced { count, artifacts } => {
                assert_eq!(count, 2);
                assert_eq!(artifacts.len(), 2);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_slide_deck_for_two_page_document() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, launcher) = pipeline(MemoryLoader::new(DOCUMENT, two_page_document()));
        let request = ExtractionRequest::new(DOCUMENT, dir.path())
            .with_output_kind(OutputKind::SlideDeck)
            .with_unpaired(true);

        let result = pipeline.run(
            &request,
            &CancellationToken::new(),
            &ProgressReporter::disabled(),
        );

        assert!(result.success(), "{}", result.message);
        assert_eq!(entries(dir.path()), vec!["scenario.pptx".to_string()]);

        let deck_path = dir.path().join("scenario.pptx");
        let mut archive = zip::ZipArchive::new(std::fs::File::open(&deck_path).unwrap()).unwrap();
        let slides = archive
            .file_names()
            .filter(|name| name.starts_with("ppt/slides/slide") && name.ends_with(".xml"))
            .count();
        assert_eq!(slides, 2);
        assert!(archive.by_name("ppt/notesSlides/notesSlide1.xml").is_err());

        let mut notes = String::new();
        archive
            .by_name("ppt/notesSlides/notesSlide2.xml")
            .unwrap()
            .read_to_string(&mut notes)
            .unwrap();
        assert_eq!(notes_text(&notes), "Fig. 2");

        assert_eq!(*launcher.opened.lock().unwrap(), vec![deck_path]);
    }

    #[test]
    fn test_partial_range_names_deck_with_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(MemoryLoader::new(DOCUMENT, two_page_document()));
        let request = ExtractionRequest::new(DOCUMENT, dir.path()).with_pages(1, 2);

        let result = pipeline.run(
            &request,
            &CancellationToken::new(),
            &ProgressReporter::disabled(),
        );

        assert!(result.success(), "{}", result.message);
        assert_eq!(entries(dir.path()), vec!["scenario (page 2).pptx".to_string()]);
    }

    #[test]
    fn test_cancel_after_first_page_discards_everything() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let pair_page = two_page_document().remove(1);
        let pages: Vec<MemoryPage> = std::iter::repeat_n(pair_page, 10).collect();
        let loader = MemoryLoader::new(DOCUMENT, pages).cancel_when_scanning(1, cancel.clone());
        let probe = loader.probe();
        let (pipeline, launcher) = pipeline(loader);
        let (reporter, mut updates) = ProgressReporter::channel();
        let request = ExtractionRequest::new(DOCUMENT, dir.path()).with_unpaired(true);

        let result = pipeline.run(&request, &cancel, &reporter);

        assert_eq!(result.status, JobStatus::Cancelled);
        assert!(!result.success());
        assert!(matches!(result.payload, ResultPayload::Nothing));
        assert_eq!(probe.opened.load(Ordering::SeqCst), 1);
        assert!(probe.all_closed());
        assert!(entries(dir.path()).is_empty());
        assert!(launcher.opened.lock().unwrap().is_empty());

        // Only page 1 finished before the cancel was observed
        assert_eq!(updates.try_recv().unwrap().processed, 1);
        assert!(updates.try_recv().is_err());
    }

    #[test]
    fn test_cancelled_files_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let loader =
            MemoryLoader::new(DOCUMENT, two_page_document()).cancel_when_scanning(1, cancel.clone());
        let (pipeline, _) = pipeline(loader);
        let request = ExtractionRequest::new(DOCUMENT, dir.path())
            .with_output_kind(OutputKind::Files)
            .with_unpaired(true);

        let result = pipeline.run(&request, &cancel, &ProgressReporter::disabled());

        assert_eq!(result.status, JobStatus::Cancelled);
        assert!(entries(dir.path()).is_empty());
    }

    #[test]
    fn test_preview_returns_buffers_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, launcher) = pipeline(MemoryLoader::new(DOCUMENT, two_page_document()));
        let request = ExtractionRequest::new(DOCUMENT, dir.path())
            .with_mode(ExtractionMode::Preview)
            .with_unpaired(false);

        let result = pipeline.run(
            &request,
            &CancellationToken::new(),
            &ProgressReporter::disabled(),
        );

        assert!(result.success());
        match &result.payload {
            ResultPayload::Preview { images } => {
                assert_eq!(images.len(), 1);
                assert_eq!(images[0].caption, "Fig. 2");
                assert_eq!(images[0].page_index, 1);
            }
            other => panic!("unexpected payload {:?}", other),
        }
        assert!(entries(dir.path()).is_empty());
        assert!(launcher.opened.lock().unwrap().is_empty());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "succeeded");
        assert_eq!(json["payload"]["kind"], "preview");
        assert!(json["payload"]["images"][0].get("bytes").is_none());
    }

    #[test]
    fn test_missing_document_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(MemoryLoader::new(DOCUMENT, two_page_document()));
        let request = ExtractionRequest::new("/library/other.pdf", dir.path());

        let result = pipeline.run(
            &request,
            &CancellationToken::new(),
            &ProgressReporter::disabled(),
        );

        assert_eq!(result.status, JobStatus::Failed);
        assert!(result.message.contains("other.pdf"));
        assert!(entries(dir.path()).is_empty());
    }

    #[test]
    fn test_empty_range_fails_and_closes_document() {
        let dir = tempfile::tempdir().unwrap();
        let loader = MemoryLoader::new(DOCUMENT, two_page_document());
        let probe = loader.probe();
        let (pipeline, _) = pipeline(loader);
        let request = ExtractionRequest::new(DOCUMENT, dir.path()).with_pages(5, 9);

        let result = pipeline.run(
            &request,
            &CancellationToken::new(),
            &ProgressReporter::disabled(),
        );

        assert_eq!(result.status, JobStatus::Failed);
        assert!(result.message.starts_with("Invalid request"));
        assert!(probe.all_closed());
    }

    #[test]
    fn test_no_images_produces_no_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, launcher) = pipeline(MemoryLoader::new(
            DOCUMENT,
            vec![MemoryPage::new(612.0, 792.0)],
        ));
        let request = ExtractionRequest::new(DOCUMENT, dir.path());

        let result = pipeline.run(
            &request,
            &CancellationToken::new(),
            &ProgressReporter::disabled(),
        );

        assert!(result.success());
        assert!(result.message.starts_with("No images found"));
        assert!(entries(dir.path()).is_empty());
        assert!(launcher.opened.lock().unwrap().is_empty());
    }
}
