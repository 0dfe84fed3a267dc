//! Progress reporting from the worker to whoever is watching the job.

use serde::Serialize;
use strum::Display;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::trace;

/// What the units of a progress update count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProgressPhase {
    /// Pages of the requested range
    Pages,
    /// Images written to files or placed on slides
    Saving,
}

/// `processed` of `total` units of `phase` done, with an optional status line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    pub phase: ProgressPhase,
    pub processed: usize,
    pub total: usize,
    pub message: Option<String>,
}

/// Sending half of the progress channel.
///
/// Reporting never fails: a dropped receiver just means nobody is watching.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<UnboundedSender<ProgressUpdate>>,
}

impl ProgressReporter {
    pub fn channel() -> (Self, UnboundedReceiver<ProgressUpdate>) {
        let (sender, receiver) = unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// A reporter that discards every update
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn report(
        &self,
        phase: ProgressPhase,
        processed: usize,
        total: usize,
        message: Option<String>,
    ) {
        trace!(%phase, processed, total, message = message.as_deref(), "Progress");
        if let Some(sender) = &self.sender {
            let _ = sender.send(ProgressUpdate {
                phase,
                processed,
                total,
                message,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updates_arrive_in_order() {
        let (reporter, mut receiver) = ProgressReporter::channel();
        reporter.report(ProgressPhase::Pages, 1, 3, None);
        reporter.report(ProgressPhase::Pages, 2, 3, Some("Page 2".to_string()));

        assert_eq!(receiver.try_recv().unwrap().processed, 1);
        let second = receiver.try_recv().unwrap();
        assert_eq!(second.message.as_deref(), Some("Page 2"));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_closed_receiver_is_ignored() {
        let (reporter, receiver) = ProgressReporter::channel();
        drop(receiver);
        reporter.report(ProgressPhase::Saving, 1, 1, None);
        ProgressReporter::disabled().report(ProgressPhase::Saving, 1, 1, None);
    }

    #[test]
    fn test_phase_serializes_in_snake_case() {
        let update = ProgressUpdate {
            phase: ProgressPhase::Saving,
            processed: 1,
            total: 2,
            message: None,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["phase"], "saving");
        assert_eq!(ProgressPhase::Pages.to_string(), "pages");
    }
}
