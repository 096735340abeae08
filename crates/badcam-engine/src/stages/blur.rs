//! Brightness-adaptive defocus

use super::mean_luma;
use image::{imageops, RgbImage};

/// Kernel size for a scene of the given mean luma (0..1); darker means larger.
///
/// Always odd; `max_kernel` of 1 (or less) yields 1.
pub fn blur_kernel_size(mean_luma: f32, max_kernel: u32) -> u32 {
    if max_kernel <= 1 {
        return 1;
    }
    let darkness = (1.0 - mean_luma).clamp(0.0, 1.0);
    let k = 1 + (darkness * (max_kernel - 1) as f32) as u32;
    if k % 2 == 0 {
        k + 1
    } else {
        k
    }
}

/// Gaussian sigma for a kernel size, same rule OpenCV applies when sigma is 0
fn kernel_sigma(k: u32) -> f32 {
    0.3 * ((k as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Stage 8: Gaussian blur whose kernel grows as the scene darkens.
///
/// Returns the kernel size used.
pub fn adaptive_blur(img: &mut RgbImage, max_kernel: u32) -> u32 {
    let k = blur_kernel_size(mean_luma(img), max_kernel);
    if k > 1 {
        *img = imageops::blur(&*img, kernel_sigma(k));
    }
    k
}
