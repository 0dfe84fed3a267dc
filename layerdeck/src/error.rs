use std::path::PathBuf;

use thiserror::Error;

/// Main error type for extraction jobs
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to open document {path}: {message}")]
    DocumentOpen { path: PathBuf, message: String },

    #[error("Failed to read page {page}: {message}")]
    PageAccess { page: usize, message: String },

    #[error("Failed to decode image {reference} on page {page}")]
    ImageDecode {
        page: usize,
        reference: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to composite layers on page {page}")]
    Composite {
        page: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save {path}")]
    ArtifactSave {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is locked or not writable; close it in any application using it and retry")]
    ArtifactLocked {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Extraction of {document} was cancelled")]
    Cancelled { document: String },
}

impl ExtractionError {
    /// Errors that only affect a single image (or pair) and are recovered by skipping it.
    pub fn is_per_image(&self) -> bool {
        matches!(
            self,
            ExtractionError::ImageDecode { .. } | ExtractionError::Composite { .. }
        )
    }

    /// Classify a failed write of a final artifact.
    ///
    /// Permission failures and Windows sharing violations usually mean another
    /// application has the file open, which gets its own message.
    pub fn from_save_failure(path: PathBuf, source: std::io::Error) -> Self {
        const ERROR_SHARING_VIOLATION: i32 = 32;
        const ERROR_LOCK_VIOLATION: i32 = 33;

        let locked = source.kind() == std::io::ErrorKind::PermissionDenied
            || (cfg!(windows)
                && matches!(
                    source.raw_os_error(),
                    Some(ERROR_SHARING_VIOLATION | ERROR_LOCK_VIOLATION)
                ));

        if locked {
            ExtractionError::ArtifactLocked { path, source }
        } else {
            ExtractionError::ArtifactSave { path, source }
        }
    }
}

/// Result type alias for extraction operations
pub type ExtractResult<T> = Result<T, ExtractionError>;

/// Render an error with its full `source()` chain, outermost first.
pub fn format_error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut current = error.source();
    while let Some(source) = current {
        message.push_str(": ");
        message.push_str(&source.to_string());
        current = source.source();
    }
    message
}
