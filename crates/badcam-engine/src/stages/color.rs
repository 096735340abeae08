//! Colour stages: posterization, saturation and tint

use super::clip_round;
use image::RgbImage;
use rand::seq::SliceRandom;
use rand::Rng;

/// Stage 12 with a fixed level count: `v = floor(v / step) * step`, `step = floor(256 / levels)`
pub fn posterize(img: &mut RgbImage, levels: u32) {
    if levels == 0 {
        return;
    }
    let step = 256 / levels;
    if step <= 1 {
        return;
    }
    for v in img.iter_mut() {
        *v = ((*v as u32 / step) * step) as u8;
    }
}

/// Stage 12: pick this frame's level count from the menu and posterize.
///
/// Returns the level count used; an empty menu behaves like 256.
pub fn posterize_random<R: Rng + ?Sized>(img: &mut RgbImage, menu: &[u32], rng: &mut R) -> u32 {
    let levels = menu.choose(rng).copied().unwrap_or(256);
    posterize(img, levels);
    levels
}

fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta <= f32::EPSILON {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max <= 0.0 { 0.0 } else { delta / max };
    (h, s, max)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let c = v * s;
    let hp = (h / 60.0).rem_euclid(6.0);
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r, g, b) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    (r + m, g + m, b + m)
}

/// Stage 14: scale HSV saturation by `saturation` (plus a little per-frame
/// jitter), then push green against blue by `tint`.
///
/// A saturation of exactly 1.0 skips the saturation pass and a zero tint
/// skips the tint pass.
pub fn saturate_and_tint<R: Rng + ?Sized>(img: &mut RgbImage, saturation: f32, tint: f32, rng: &mut R) {
    if saturation != 1.0 {
        let factor = (saturation + rng.gen_range(-0.05f32..=0.05)).max(0.0);
        for px in img.pixels_mut() {
            let [r, g, b] = px.0.map(|v| v as f32 / 255.0);
            let (h, s, v) = rgb_to_hsv(r, g, b);
            let (r, g, b) = hsv_to_rgb(h, (s * factor).min(1.0), v);
            px.0 = [r, g, b].map(|c| clip_round(c * 255.0));
        }
    }

    if tint != 0.0 {
        for px in img.pixels_mut() {
            let [_, g, b] = px.0.map(|v| v as f32);
            px.0[1] = clip_round((1.0 + tint) * g - tint * b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::test_util::{gradient, solid};
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_posterize_values_are_multiples_of_step() {
        for levels in [4u32, 8, 16, 32, 48, 64, 80] {
            let mut img = gradient(64, 32);
            posterize(&mut img, levels);
            let step = (256 / levels) as u8;
            assert!(img.iter().all(|&v| v % step == 0), "levels {}", levels);
        }
    }

    #[test]
    fn test_posterize_256_is_noop() {
        let src = gradient(32, 16);
        let mut img = src.clone();
        posterize(&mut img, 256);
        assert_eq!(img, src);
    }

    #[test]
    fn test_posterize_random_uses_menu() {
        let mut rng = StdRng::seed_from_u64(12);
        let menu = [32, 48, 64];
        for _ in 0..20 {
            let mut img = gradient(16, 16);
            let levels = posterize_random(&mut img, &menu, &mut rng);
            assert!(menu.contains(&levels));
        }
        let mut img = gradient(16, 16);
        assert_eq!(posterize_random(&mut img, &[], &mut rng), 256);
    }

    #[test]
    fn test_hsv_round_trip() {
        for px in [[255u8, 0, 0], [12, 200, 77], [40, 40, 40], [0, 0, 0], [250, 251, 3]] {
            let [r, g, b] = px.map(|v| v as f32 / 255.0);
            let (h, s, v) = rgb_to_hsv(r, g, b);
            let (r2, g2, b2) = hsv_to_rgb(h, s, v);
            let back = [r2, g2, b2].map(|c| clip_round(c * 255.0));
            assert_eq!(back, px);
        }
    }

    #[test]
    fn test_neutral_settings_are_noop() {
        let mut rng = StdRng::seed_from_u64(12);
        let src = gradient(20, 20);
        let mut img = src.clone();
        saturate_and_tint(&mut img, 1.0, 0.0, &mut rng);
        assert_eq!(img, src);
    }

    #[test]
    fn test_desaturation_pulls_toward_grey() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut img = solid(4, 4, [200, 60, 60]);
        saturate_and_tint(&mut img, 0.5, 0.0, &mut rng);
        let [r, g, b] = img.get_pixel(0, 0).0;
        assert_eq!(r, 200);
        assert!(g > 60 && g == b, "{:?}", [r, g, b]);
    }

    #[test]
    fn test_tint_shifts_green() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut img = solid(2, 2, [100, 100, 50]);
        saturate_and_tint(&mut img, 1.0, 0.1, &mut rng);
        assert_eq!(img.get_pixel(0, 0).0, [100, 105, 50]);

        // Grey stays grey when green and blue match
        let mut grey = solid(2, 2, [80, 80, 80]);
        saturate_and_tint(&mut grey, 1.0, 0.3, &mut rng);
        assert_eq!(grey.get_pixel(1, 1).0, [80, 80, 80]);
    }
}
