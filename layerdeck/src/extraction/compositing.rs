//! Alpha compositing of an overlay layer onto its base.

use image::imageops::FilterType;
use image::{DynamicImage, ImageResult, Rgba, RgbaImage};
use tracing::debug;

/// Composite `overlay` over `base` and return a new RGBA image the size of `base`.
///
/// The base is first drawn onto a transparent canvas, then the overlay is
/// blended on top with the standard "over" operator. An overlay whose pixel
/// size differs from the base is resampled (Lanczos3) to the base size first.
/// That assumes both layers cover the same area; when their aspect ratios
/// differ the overlay is stretched rather than aligned.
pub fn composite_layers(base: &DynamicImage, overlay: &RgbaImage) -> ImageResult<RgbaImage> {
    let base = base.to_rgba8();
    let (width, height) = base.dimensions();

    let resized;
    let overlay = if overlay.dimensions() != (width, height) {
        debug!(
            base = format!("{}x{}", width, height),
            overlay = format!("{}x{}", overlay.width(), overlay.height()),
            "Resampling overlay to base dimensions"
        );
        resized = image::imageops::resize(overlay, width, height, FilterType::Lanczos3);
        &resized
    } else {
        overlay
    };

    let mut canvas = RgbaImage::new(width, height);
    blend_onto(&mut canvas, &base);
    blend_onto(&mut canvas, overlay);

    Ok(canvas)
}

/// Blend every pixel of `top` over the same-sized `canvas`
fn blend_onto(canvas: &mut RgbaImage, top: &RgbaImage) {
    for (dst, src) in canvas.pixels_mut().zip(top.pixels()) {
        blend_over(dst, src);
    }
}

/// Porter-Duff "over" for straight (non-premultiplied) alpha
fn blend_over(dst: &mut Rgba<u8>, src: &Rgba<u8>) {
    let src_alpha = src[3];
    if src_alpha == 0 {
        return;
    }
    if src_alpha == 255 {
        *dst = *src;
        return;
    }

    let sa = src_alpha as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_alpha = sa + da * (1.0 - sa);

    let mut out = [0u8; 4];
    for channel in 0..3 {
        let sc = src[channel] as f32;
        let dc = dst[channel] as f32;
        let value = (sc * sa + dc * da * (1.0 - sa)) / out_alpha;
        out[channel] = value.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;

    *dst = Rgba(out);
}
