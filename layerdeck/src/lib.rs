//! Extract images embedded in PDF pages, recombine annotation overlays with
//! the artwork they mark up, and save the results as image files or a slide
//! deck with captions as speaker notes.

pub mod config;
pub mod document;
pub mod error;
pub mod extraction;
pub mod output;
pub mod pipeline;

#[cfg(test)]
mod testing;

pub use config::{ExtractionConfig, load_config};
pub use document::pdfium::{PdfiumLoader, create_pdfium};
pub use error::{ExtractResult, ExtractionError};
pub use pipeline::{
    ExtractionJob, ExtractionMode, ExtractionRequest, ExtractionResult, JobStatus, OutputKind,
    Pipeline, ProgressPhase, ProgressUpdate,
};
