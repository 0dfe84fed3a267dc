//! Cooperative cancellation checks.

use tokio_util::sync::CancellationToken;

use crate::error::{ExtractResult, ExtractionError};

/// Check if the job should keep going.
pub fn check_cancellation(token: &CancellationToken, document: &str) -> ExtractResult<()> {
    if token.is_cancelled() {
        Err(ExtractionError::Cancelled {
            document: document.to_string(),
        })
    } else {
        Ok(())
    }
}
