//! Background execution of extraction jobs.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::document::DocumentLoader;

use super::{ExtractionRequest, ExtractionResult, Pipeline, ProgressReporter, ProgressUpdate};

/// A job running on the blocking thread pool
pub struct ExtractionJob {
    progress: UnboundedReceiver<ProgressUpdate>,
    cancel: CancellationToken,
    handle: JoinHandle<ExtractionResult>,
}

impl ExtractionJob {
    /// Progress updates; the channel closes when the job finishes
    pub fn progress(&mut self) -> &mut UnboundedReceiver<ProgressUpdate> {
        &mut self.progress
    }

    /// Handle for requesting cancellation from elsewhere
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the job to end. A worker that panicked reports a failure.
    pub async fn wait(self) -> ExtractionResult {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Extraction worker panicked");
                ExtractionResult::failed(format!("Extraction worker stopped unexpectedly: {}", e))
            }
        }
    }
}

impl<L: DocumentLoader + 'static> Pipeline<L> {
    /// Start `request` on a dedicated blocking thread.
    ///
    /// Pages are processed strictly in order; the only state shared with the
    /// caller is the cancellation token and the progress channel.
    pub fn spawn(self: &Arc<Self>, request: ExtractionRequest) -> ExtractionJob {
        self.spawn_with_cancel(request, CancellationToken::new())
    }

    /// Like [`Pipeline::spawn`], cancelled through an existing token
    pub fn spawn_with_cancel(
        self: &Arc<Self>,
        request: ExtractionRequest,
        cancel: CancellationToken,
    ) -> ExtractionJob {
        let (reporter, progress) = ProgressReporter::channel();

        let pipeline = Arc::clone(self);
        let token = cancel.clone();
        let handle = tokio::task::spawn_blocking(move || {
            info!(document = %request.document_path.display(), "Extraction worker started");
            pipeline.run(&request, &token, &reporter)
        });

        ExtractionJob {
            progress,
            cancel,
            handle,
        }
    }
}
