//! Inter-frame measurements and ghosting

use super::{clip_round, luma};
use image::RgbImage;

/// Mean luma of the frame, normalised to 0..1
pub fn mean_luma(img: &RgbImage) -> f32 {
    let n = (img.width() as usize * img.height() as usize).max(1);
    let sum: f64 = img.pixels().map(|p| luma(&p.0) as f64).sum();
    (sum / n as f64 / 255.0) as f32
}

/// Mean absolute luma difference between two equally sized frames, 0..1
pub fn motion_magnitude(current: &RgbImage, previous: &RgbImage) -> f32 {
    if current.dimensions() != previous.dimensions() {
        return 0.0;
    }
    let n = (current.width() as usize * current.height() as usize).max(1);
    let sum: f64 = current
        .pixels()
        .zip(previous.pixels())
        .map(|(a, b)| (luma(&a.0).round() - luma(&b.0).round()).abs() as f64)
        .sum();
    (sum / n as f64 / 255.0) as f32
}

/// Blend ratio used for a given motion, `None` below the threshold
pub(crate) fn ghost_mix(motion: f32, threshold: f32, cap: f32) -> Option<f32> {
    if cap <= 0.0 || motion <= threshold {
        return None;
    }
    Some((0.05 + motion * 0.6).min(cap))
}

/// Stage 7: smear fast motion by blending in the previous output.
///
/// Returns the blend ratio when the stage fired.
pub fn ghost(
    img: &mut RgbImage,
    previous: &RgbImage,
    motion: f32,
    threshold: f32,
    cap: f32,
) -> Option<f32> {
    if img.dimensions() != previous.dimensions() {
        return None;
    }
    let mix = ghost_mix(motion, threshold, cap)?;
    for (cur, prev) in img.iter_mut().zip(previous.iter()) {
        *cur = clip_round(*cur as f32 * (1.0 - mix) + *prev as f32 * mix);
    }
    Some(mix)
}
