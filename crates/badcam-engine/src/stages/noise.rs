//! Sensor stages: shot/read noise and dead pixels

use super::{clip, standard_normal};
use image::{Rgb, RgbImage};
use rand::Rng;

/// Stage 4: brightness-dependent shot noise followed by fixed read noise.
///
/// Shot noise sigma is `shot * (0.5 + v)` in normalised units, read noise
/// sigma is `read` in 8-bit units. Each pass clips on its own.
pub fn sensor_noise<R: Rng + ?Sized>(img: &mut RgbImage, shot: f32, read: f32, rng: &mut R) {
    if shot > 0.0 {
        for v in img.iter_mut() {
            let vf = *v as f32 / 255.0;
            let sigma = shot * (0.5 + vf);
            let noisy = (vf + standard_normal(rng) * sigma).clamp(0.0, 1.0);
            *v = clip(noisy * 255.0);
        }
    }

    if read > 0.0 {
        for v in img.iter_mut() {
            *v = clip(*v as f32 + standard_normal(rng) * read);
        }
    }
}

/// `base` plus a uniform offset from `range`, never below zero.
///
/// A zero base stays zero so a disabled stage is not switched back on.
pub fn jittered<R: Rng + ?Sized>(base: f32, range: (f32, f32), rng: &mut R) -> f32 {
    let (lo, hi) = range;
    if base <= 0.0 || (lo == 0.0 && hi == 0.0) {
        return base.max(0.0);
    }
    let offset = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
    (base + offset).max(0.0)
}

/// Draw the per-run dead pixel set: one Bernoulli trial per pixel.
///
/// Coordinates come back as `(x, y)` in row-major order.
pub fn generate_dead_pixels<R: Rng + ?Sized>(
    width: u32,
    height: u32,
    density: f64,
    rng: &mut R,
) -> Vec<(u32, u32)> {
    if density <= 0.0 {
        return Vec::new();
    }
    let density = density.min(1.0);
    let mut coords = Vec::new();
    for y in 0..height {
        for x in 0..width {
            if rng.gen_bool(density) {
                coords.push((x, y));
            }
        }
    }
    coords
}

/// Stage 11: paint every dead pixel with a fresh random colour
pub fn inject_dead_pixels<R: Rng + ?Sized>(img: &mut RgbImage, dead: &[(u32, u32)], rng: &mut R) {
    let (w, h) = img.dimensions();
    for &(x, y) in dead {
        if x < w && y < h {
            img.put_pixel(x, y, Rgb(rng.gen()));
        }
    }
}
