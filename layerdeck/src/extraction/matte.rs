//! Black matte removal.
//!
//! Overlay layers are often flattened onto a black field. Any pixel whose
//! color channels are all below the threshold becomes transparent white; all
//! other pixels are kept as they are (fully opaque when the source had no
//! alpha). The test is per pixel, so dark strokes inside the markup are
//! cleared along with the background.

use image::{DynamicImage, Rgba, RgbaImage};

const TRANSPARENT_WHITE: Rgba<u8> = Rgba([255, 255, 255, 0]);

/// Convert near-black pixels of `image` to transparency.
///
/// Idempotent: cleared pixels are white and so never match again.
pub fn remove_black_matte(image: &DynamicImage, threshold: u8) -> RgbaImage {
    let mut rgba = image.to_rgba8();
    for pixel in rgba.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        if r < threshold && g < threshold && b < threshold {
            *pixel = TRANSPARENT_WHITE;
        }
    }
    rgba
}
