//! Overlay detection heuristic.
//!
//! Annotation layers (handwriting, typed markup) are usually emitted either
//! with their own alpha channel or as nearly bilevel images: ink on a solid
//! black or white field. Photographic or illustrated base art has a spread of
//! mid-tones. The test below is probabilistic; it samples pixels rather than
//! inspecting the whole image and can misjudge stark line art. Callers must
//! break ties themselves when both or neither layer of a pair match.

use image::DynamicImage;
use tracing::trace;

use crate::config::ClassifierConfig;

/// Decide whether `image` is likely an annotation overlay.
///
/// Deterministic for a given image and config.
pub fn is_likely_overlay(image: &DynamicImage, config: &ClassifierConfig) -> bool {
    if image.color().has_alpha() {
        return true;
    }

    let rgb = image.to_rgb8();
    let total = rgb.width() as usize * rgb.height() as usize;
    if total == 0 || config.sample_limit == 0 {
        return false;
    }

    // Round up so the samples reach the end of the buffer
    let stride = total.div_ceil(config.sample_limit).max(1);
    let mut sampled = 0usize;
    let mut extreme = 0usize;

    for pixel in rgb.pixels().step_by(stride).take(config.sample_limit) {
        sampled += 1;
        let [r, g, b] = pixel.0;
        let dark = r < config.dark_threshold && g < config.dark_threshold && b < config.dark_threshold;
        let light =
            r > config.light_threshold && g > config.light_threshold && b > config.light_threshold;
        if dark || light {
            extreme += 1;
        }
    }

    let fraction = extreme as f64 / sampled as f64;
    trace!(
        sampled = sampled,
        extreme = extreme,
        fraction = format!("{:.3}", fraction),
        "Classified image"
    );

    fraction > config.extreme_fraction
}
