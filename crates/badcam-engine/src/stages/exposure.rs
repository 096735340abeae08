//! Brightness stages: exposure drift, vignette, spikes, mains flicker, scanlines

use super::{clip, scale_brightness};
use crate::state::TemporalState;
use image::RgbImage;
use rand::Rng;
use std::f64::consts::TAU;
use tracing::trace;

/// Stage 2: slow auto-exposure and white-balance wander.
///
/// Both phase accumulators advance by a positive step plus jitter every
/// call, so the gains drift smoothly instead of flickering frame to frame.
/// `strength` scales every gain toward 1.0; zero leaves pixels untouched.
pub fn exposure_drift<R: Rng + ?Sized>(
    img: &mut RgbImage,
    state: &mut TemporalState,
    strength: f32,
    rng: &mut R,
) {
    let ae_step = 0.02 + rng.gen_range(-0.005f64..0.01);
    let awb_step = 0.015 + rng.gen_range(-0.004f64..0.008);
    let (ae_phase, awb_phase) = state.advance_exposure(ae_step, awb_step);
    let ae_jitter: f64 = rng.gen_range(-0.04..=0.04);

    if strength <= 0.0 {
        return;
    }

    let ae = 0.85 + 0.3 * ae_phase.sin() + ae_jitter;
    let r = 0.85 + 0.18 * (awb_phase - 0.7).sin();
    let g = 1.0 + 0.08 * (awb_phase + 1.1).sin();
    let b = 0.9 + 0.2 * (awb_phase + 0.5).sin();

    let toward_one = |gain: f64| 1.0 + strength * (gain as f32 - 1.0);
    let ae = toward_one(ae);
    let gains = [toward_one(r) * ae, toward_one(g) * ae, toward_one(b) * ae];

    for px in img.pixels_mut() {
        for (c, gain) in gains.iter().enumerate() {
            px.0[c] = clip(px.0[c] as f32 * gain);
        }
    }
}

/// Radial darkening mask, row-major, one weight per pixel.
///
/// Coordinates are normalised to `[-1, 1]` on each axis; the weight is
/// `1 - r^2 * strength` kept within `[0.3, 1.0]`.
pub fn vignette_mask(width: u32, height: u32, strength: f32) -> Vec<f32> {
    let norm = |i: u32, n: u32| {
        if n <= 1 {
            0.0
        } else {
            -1.0 + 2.0 * i as f32 / (n - 1) as f32
        }
    };

    let mut mask = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        let ny = norm(y, height);
        for x in 0..width {
            let nx = norm(x, width);
            mask.push((1.0 - (nx * nx + ny * ny) * strength).clamp(0.3, 1.0));
        }
    }
    mask
}

/// Stage 3: multiply by the cached vignette mask
pub fn apply_vignette(img: &mut RgbImage, mask: &[f32]) {
    for (px, &m) in img.pixels_mut().zip(mask) {
        if m < 1.0 {
            for v in px.0.iter_mut() {
                *v = clip(*v as f32 * m);
            }
        }
    }
}

/// Stage 9: occasionally overexpose a single frame. Returns whether it fired.
pub fn exposure_spike<R: Rng + ?Sized>(img: &mut RgbImage, chance: f64, rng: &mut R) -> bool {
    if chance <= 0.0 || !rng.gen_bool(chance) {
        return false;
    }
    let gain = 1.1 + rng.gen_range(0.0f32..0.25);
    trace!("Exposure spike x{:.2}", gain);
    scale_brightness(img, gain);
    true
}

/// Gain of the mains flicker at wall-clock time `t` (seconds)
pub(crate) fn flicker_gain(amplitude: f32, mains_hz: f64, phase: f64, t: f64) -> f32 {
    1.0 + amplitude * (TAU * mains_hz * t + phase).sin() as f32
}

/// Stage 13a: global brightness wobble from 50/60 Hz lighting
pub fn mains_flicker(img: &mut RgbImage, state: &TemporalState, amplitude: f32, wall_clock: f64) {
    if amplitude <= 0.0 {
        return;
    }
    let gain = flicker_gain(amplitude, state.mains_hz(), state.flicker_phase(), wall_clock);
    scale_brightness(img, gain);
}

/// Stage 13b: darken every other pair of rows
pub fn scanlines(img: &mut RgbImage, strength: f32) {
    if strength <= 0.0 {
        return;
    }
    let keep = 1.0 - strength;
    for (y, row) in img.rows_mut().enumerate() {
        if (y / 2) % 2 == 0 {
            for px in row {
                for v in px.0.iter_mut() {
                    *v = clip(*v as f32 * keep);
                }
            }
        }
    }
}
