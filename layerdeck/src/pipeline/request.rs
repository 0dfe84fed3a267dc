//! Job request.

use std::ops::Range;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{ExtractResult, ExtractionError};
use crate::output::OutputKind;

/// Preview returns buffers; Extract writes artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    Preview,
    Extract,
}

/// Everything one extraction job needs to know.
///
/// Pages are zero-based and `page_end` is exclusive. An end past the last
/// page is clamped to the document length by [`ExtractionRequest::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub document_path: PathBuf,
    pub output_directory: PathBuf,
    pub page_start: usize,
    pub page_end: usize,
    pub mode: ExtractionMode,
    pub output_kind: OutputKind,
    pub include_unpaired: bool,
    /// Invert color channels of every output image
    pub invert: bool,
}

impl ExtractionRequest {
    /// Extract every page of `document_path` into a slide deck in `output_directory`
    pub fn new(document_path: impl Into<PathBuf>, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            document_path: document_path.into(),
            output_directory: output_directory.into(),
            page_start: 0,
            page_end: usize::MAX,
            mode: ExtractionMode::Extract,
            output_kind: OutputKind::SlideDeck,
            include_unpaired: false,
            invert: false,
        }
    }

    pub fn with_pages(mut self, start: usize, end: usize) -> Self {
        self.page_start = start;
        self.page_end = end;
        self
    }

    pub fn with_mode(mut self, mode: ExtractionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_output_kind(mut self, output_kind: OutputKind) -> Self {
        self.output_kind = output_kind;
        self
    }

    pub fn with_unpaired(mut self, include_unpaired: bool) -> Self {
        self.include_unpaired = include_unpaired;
        self
    }

    pub fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Resolve the page range against a document with `page_count` pages
    pub fn validate(&self, page_count: usize) -> ExtractResult<Range<usize>> {
        if self.document_path.as_os_str().is_empty() {
            return Err(ExtractionError::InvalidRequest {
                message: "no document given".to_string(),
            });
        }
        if self.mode == ExtractionMode::Extract && self.output_directory.as_os_str().is_empty() {
            return Err(ExtractionError::InvalidRequest {
                message: "no output directory given".to_string(),
            });
        }

        let end = self.page_end.min(page_count);
        if self.page_start >= end {
            return Err(ExtractionError::InvalidRequest {
                message: format!(
                    "page range {}..{} selects no pages of a {}-page document",
                    self.page_start, self.page_end, page_count
                ),
            });
        }
        Ok(self.page_start..end)
    }
}
