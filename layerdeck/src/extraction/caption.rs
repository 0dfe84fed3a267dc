//! Caption capture from the text below an image.

use tracing::debug;

use crate::document::{PageSource, Rectangle};

/// Read the text between the bottom edge of `placement` and the bottom of the page,
/// within the image's horizontal extent.
///
/// Returns an empty string when there is no such text or the page cannot be read.
pub fn read_caption<S: PageSource + ?Sized>(source: &S, page: usize, placement: &Rectangle) -> String {
    let page_size = match source.page_size(page) {
        Ok(size) => size,
        Err(e) => {
            debug!(page = page + 1, error = %e, "No page size for caption lookup");
            return String::new();
        }
    };

    let top = placement.y1.max(placement.y2);
    if top >= page_size.height || placement.width() <= 0.0 {
        return String::new();
    }

    let region = Rectangle {
        x1: placement.x1.min(placement.x2),
        y1: top,
        x2: placement.x1.max(placement.x2),
        y2: page_size.height,
    };

    match source.text_in_rect(page, &region) {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            debug!(page = page + 1, error = %e, "Caption text lookup failed");
            String::new()
        }
    }
}
