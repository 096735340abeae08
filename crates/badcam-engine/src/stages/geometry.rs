//! Geometric stages: working-resolution resize, chroma misalignment, rolling shutter

use image::imageops::{self, FilterType};
use image::RgbImage;
use rand::Rng;

/// Stage 1: centre-crop to the target aspect ratio and resize to `width x height`.
///
/// With `pixelate` set, the frame is additionally squeezed through that
/// resolution and blown back up with nearest-neighbour sampling.
pub fn resize_to_working(
    src: &RgbImage,
    width: u32,
    height: u32,
    pixelate: Option<(u32, u32)>,
) -> RgbImage {
    let (sw, sh) = src.dimensions();
    let target_aspect = width as f64 / height as f64;
    let src_aspect = sw as f64 / sh as f64;

    let (cw, ch) = if src_aspect > target_aspect {
        ((sh as f64 * target_aspect).round() as u32, sh)
    } else {
        (sw, (sw as f64 / target_aspect).round() as u32)
    };
    let (cw, ch) = (cw.clamp(1, sw), ch.clamp(1, sh));

    let cropped = if (cw, ch) == (sw, sh) {
        src.clone()
    } else {
        imageops::crop_imm(src, (sw - cw) / 2, (sh - ch) / 2, cw, ch).to_image()
    };

    let mut out = if (cw, ch) == (width, height) {
        cropped
    } else {
        imageops::resize(&cropped, width, height, FilterType::Triangle)
    };

    if let Some((pw, ph)) = pixelate {
        let (pw, ph) = (pw.min(width), ph.min(height));
        if (pw, ph) != (width, height) {
            let small = imageops::resize(&out, pw, ph, FilterType::Triangle);
            out = imageops::resize(&small, width, height, FilterType::Nearest);
        }
    }

    out
}

/// Mirror an out-of-range index back into `0..len`, edge pixel not repeated
fn reflect_101(i: i64, len: u32) -> u32 {
    let n = len as i64;
    if n == 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let mut i = i.rem_euclid(period);
    if i >= n {
        i = period - i;
    }
    i as u32
}

/// Stage 5: translate the red and blue channels independently by up to `radius` pixels.
pub fn chroma_shift<R: Rng + ?Sized>(img: &mut RgbImage, radius: u32, rng: &mut R) {
    if radius == 0 {
        return;
    }
    let r = radius as i64;
    let src = img.clone();
    let (w, h) = img.dimensions();

    for channel in [0usize, 2] {
        let dx = rng.gen_range(-r..=r);
        let dy = rng.gen_range(-r..=r);
        if dx == 0 && dy == 0 {
            continue;
        }
        for y in 0..h {
            let sy = reflect_101(y as i64 - dy, h);
            for x in 0..w {
                let sx = reflect_101(x as i64 - dx, w);
                img.get_pixel_mut(x, y).0[channel] = src.get_pixel(sx, sy).0[channel];
            }
        }
    }
}

/// Horizontal offset of row `y` for a given skew `amount` and `phase`
pub(crate) fn row_shift(y: u32, height: u32, amount: f32, phase: f32) -> i64 {
    let pos = y as f32 / height as f32 - 0.5;
    let wobble = (phase + y as f32 * 0.1).sin() * amount * 0.2;
    (pos * amount + wobble) as i64
}

/// Stage 6: shift each row sideways, more so while the scene is moving.
///
/// `motion` is the mean luma difference to the previous output (0..1);
/// a `base` of zero disables the stage.
pub fn rolling_shutter<R: Rng + ?Sized>(
    img: &mut RgbImage,
    base: f32,
    motion: f32,
    frame_index: u64,
    rng: &mut R,
) {
    if base <= 0.0 {
        return;
    }
    let amount = base + motion * 6.0 + rng.gen_range(-0.5f32..=0.5);
    let phase = frame_index as f32 * 0.03;
    let (w, h) = img.dimensions();
    let src = img.clone();

    for y in 0..h {
        let shift = row_shift(y, h, amount, phase);
        if shift == 0 {
            continue;
        }
        for x in 0..w {
            let sx = (x as i64 - shift).clamp(0, w as i64 - 1) as u32;
            img.put_pixel(x, y, *src.get_pixel(sx, y));
        }
    }
}
