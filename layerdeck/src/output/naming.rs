//! Deterministic artifact names.

use std::path::Path;

use uuid::Uuid;

/// Base name of the source document without its extension
pub fn document_base_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "document".to_string())
}

/// Human-readable range suffix, or `None` when the whole document was processed.
///
/// `start` is zero-based and `end` exclusive; the suffix uses 1-based page numbers.
pub fn range_suffix(start: usize, end: usize, page_count: usize) -> Option<String> {
    if start == 0 && end >= page_count {
        return None;
    }
    if end == start + 1 {
        Some(format!("(page {})", start + 1))
    } else {
        Some(format!("(pages {}-{})", start + 1, end))
    }
}

/// `<base>[ <suffix>]`, shared by every artifact of one run
pub fn artifact_stem(document: &Path, start: usize, end: usize, page_count: usize) -> String {
    let base = document_base_name(document);
    match range_suffix(start, end, page_count) {
        Some(suffix) => format!("{} {}", base, suffix),
        None => base,
    }
}

pub fn deck_file_name(stem: &str) -> String {
    format!("{}.pptx", stem)
}

/// Numbered image file; `index` is 1-based
pub fn image_file_name(stem: &str, index: usize, extension: &str) -> String {
    format!("{}_{}.{}", stem, index, extension)
}

/// Hidden per-image scratch file, unique to one run
pub fn temp_image_name(stem: &str, run_id: Uuid, index: usize) -> String {
    format!(".{}-{}-{}.png", stem, run_id.simple(), index)
}
