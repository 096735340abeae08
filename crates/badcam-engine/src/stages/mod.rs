//! The fourteen degradation stages
//!
//! Every stage works in place on an 8-bit RGB image and clips its results to
//! `0..=255` before returning, so the next stage never sees wrapped values.

mod blur;
mod codec;
mod color;
mod exposure;
mod geometry;
mod noise;
mod temporal;

pub use blur::{adaptive_blur, blur_kernel_size};
pub use codec::{block_noise, chroma_subsample, recompress};
pub use color::{posterize, posterize_random, saturate_and_tint};
pub use exposure::{apply_vignette, exposure_drift, exposure_spike, mains_flicker, scanlines, vignette_mask};
pub use geometry::{chroma_shift, resize_to_working, rolling_shutter};
pub use noise::{generate_dead_pixels, inject_dead_pixels, jittered, sensor_noise};
pub use temporal::{ghost, mean_luma, motion_magnitude};

use rand::Rng;

/// Saturating float to channel conversion; truncates like a numpy `astype(uint8)`
#[inline]
pub(crate) fn clip(v: f32) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

/// Rounding float to channel conversion
#[inline]
pub(crate) fn clip_round(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// BT.601 luma of an RGB pixel, 0..=255
#[inline]
pub(crate) fn luma(px: &[u8; 3]) -> f32 {
    0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32
}

/// Standard normal sample via the Box-Muller transform
pub(crate) fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    // gen::<f32>() is in [0, 1); flip it so ln never sees zero
    let u1 = 1.0 - rng.gen::<f32>();
    let u2 = rng.gen::<f32>();
    (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos()
}

/// Multiply every channel of every pixel by `gain`, clipping the result
pub(crate) fn scale_brightness(img: &mut image::RgbImage, gain: f32) {
    for v in img.iter_mut() {
        *v = clip(*v as f32 * gain);
    }
}
