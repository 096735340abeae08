//! Lossy recompression: chroma subsampling, macroblock corruption, JPEG round-trip

use super::clip_round;
use badcam_core::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgb, RgbImage};
use rand::Rng;
use tracing::trace;

/// Smallest corrupt block edge in pixels
const MIN_BLOCK: u32 = 8;

fn to_ycbcr(px: [u8; 3]) -> [f32; 3] {
    let [r, g, b] = px.map(|v| v as f32);
    [
        0.299 * r + 0.587 * g + 0.114 * b,
        128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b,
        128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b,
    ]
}

fn to_rgb(y: f32, cb: f32, cr: f32) -> [u8; 3] {
    let (cb, cr) = (cb - 128.0, cr - 128.0);
    [
        clip_round(y + 1.402 * cr),
        clip_round(y - 0.344_136 * cb - 0.714_136 * cr),
        clip_round(y + 1.772 * cb),
    ]
}

/// Average the chroma planes over `factor x factor` cells, keeping full-resolution luma.
///
/// Equivalent to downsampling Cb/Cr and upsampling them back with nearest
/// neighbour. A factor of 1 leaves the frame alone.
pub fn chroma_subsample(img: &mut RgbImage, factor: u32) {
    if factor <= 1 {
        return;
    }
    let (w, h) = img.dimensions();

    for by in (0..h).step_by(factor as usize) {
        for bx in (0..w).step_by(factor as usize) {
            let (x1, y1) = ((bx + factor).min(w), (by + factor).min(h));

            let mut sum = [0.0f32; 2];
            let mut n = 0.0f32;
            for y in by..y1 {
                for x in bx..x1 {
                    let [_, cb, cr] = to_ycbcr(img.get_pixel(x, y).0);
                    sum[0] += cb;
                    sum[1] += cr;
                    n += 1.0;
                }
            }
            let (cb, cr) = (sum[0] / n, sum[1] / n);

            for y in by..y1 {
                for x in bx..x1 {
                    let [luma, _, _] = to_ycbcr(img.get_pixel(x, y).0);
                    img.put_pixel(x, y, Rgb(to_rgb(luma, cb, cr)));
                }
            }
        }
    }
}

/// Paint `count` solid random-colour rectangles, like corrupt macroblocks
pub fn block_noise<R: Rng + ?Sized>(img: &mut RgbImage, count: u32, rng: &mut R) {
    let (w, h) = img.dimensions();
    let max_size = (w / 8).max(16);

    for _ in 0..count {
        let bw = rng.gen_range(MIN_BLOCK..=max_size).min(w);
        let bh = rng.gen_range(MIN_BLOCK..=max_size).min(h);
        let x0 = rng.gen_range(0..=w - bw);
        let y0 = rng.gen_range(0..=h - bh);
        let color = Rgb(rng.gen::<[u8; 3]>());

        for y in y0..y0 + bh {
            for x in x0..x0 + bw {
                img.put_pixel(x, y, color);
            }
        }
    }
}

/// Quality for this frame: `base` plus uniform jitter, kept within 1..=100
pub(crate) fn jittered_quality<R: Rng + ?Sized>(base: u8, jitter: u8, rng: &mut R) -> u8 {
    let offset = if jitter > 0 {
        rng.gen_range(-(jitter as i32)..=jitter as i32)
    } else {
        0
    };
    (base as i32 + offset).clamp(1, 100) as u8
}

/// Stage 10c: encode to JPEG and decode again.
///
/// A base quality of 100 without jitter skips the round-trip entirely.
/// Returns the quality used, if any.
pub fn recompress<R: Rng + ?Sized>(
    img: &mut RgbImage,
    base: u8,
    jitter: u8,
    rng: &mut R,
) -> Result<Option<u8>> {
    if base >= 100 && jitter == 0 {
        return Ok(None);
    }
    let quality = jittered_quality(base, jitter, rng);

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&*img)
        .map_err(|e| Error::Codec(format!("JPEG encode failed: {}", e)))?;

    let decoded = image::load_from_memory_with_format(&buf, ImageFormat::Jpeg)
        .map_err(|e| Error::Codec(format!("JPEG decode failed: {}", e)))?
        .to_rgb8();

    if decoded.dimensions() != img.dimensions() {
        return Err(Error::Codec(format!(
            "JPEG round-trip changed size {:?} -> {:?}",
            img.dimensions(),
            decoded.dimensions()
        )));
    }

    trace!("Recompressed at quality {} ({} bytes)", quality, buf.len());
    *img = decoded;
    Ok(Some(quality))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::test_util::{gradient, solid};
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_subsample_keeps_flat_colour() {
        let mut img = solid(9, 7, [180, 40, 90]);
        chroma_subsample(&mut img, 4);
        assert!(img.pixels().all(|p| p.0 == [180, 40, 90]));
    }

    #[test]
    fn test_subsample_bleeds_colour_across_edges() {
        let mut img = RgbImage::from_fn(4, 4, |x, _| {
            if x < 2 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        chroma_subsample(&mut img, 4);
        let left = img.get_pixel(0, 0).0;
        // Pure red now carries some of the blue's chroma
        assert!(left[2] > 0 || left[0] < 255, "{:?}", left);
    }

    #[test]
    fn test_subsample_factor_one_is_noop() {
        let src = gradient(10, 10);
        let mut img = src.clone();
        chroma_subsample(&mut img, 1);
        assert_eq!(img, src);
    }

    #[test]
    fn test_block_noise_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(2);
        // Frame narrower than the smallest block
        let mut tiny = solid(5, 4, [0, 0, 0]);
        block_noise(&mut tiny, 10, &mut rng);
        assert_eq!(tiny.dimensions(), (5, 4));

        let mut img = solid(64, 48, [0, 0, 0]);
        block_noise(&mut img, 3, &mut rng);
        assert!(img.pixels().any(|p| p.0 != [0, 0, 0]));
    }

    #[test]
    fn test_quality_jitter_range() {
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..200 {
            let q = jittered_quality(24, 6, &mut rng);
            assert!((18..=30).contains(&q));
        }
        for _ in 0..50 {
            assert!(jittered_quality(2, 10, &mut rng) >= 1);
        }
        assert_eq!(jittered_quality(100, 0, &mut rng), 100);
    }

    #[test]
    fn test_recompress_round_trip_keeps_size() {
        let mut rng = StdRng::seed_from_u64(4);
        let src = gradient(33, 17);
        let mut img = src.clone();
        let q = recompress(&mut img, 10, 2, &mut rng).unwrap();
        assert!(matches!(q, Some(8..=12)));
        assert_eq!(img.dimensions(), (33, 17));
        assert_ne!(img, src);
    }

    #[test]
    fn test_recompress_quality_100_skips() {
        let mut rng = StdRng::seed_from_u64(4);
        let src = gradient(16, 16);
        let mut img = src.clone();
        assert_eq!(recompress(&mut img, 100, 0, &mut rng).unwrap(), None);
        assert_eq!(img, src);
    }
}
