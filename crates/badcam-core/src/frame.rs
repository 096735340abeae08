//! Frame representation for camera data
//!
//! This module provides the common Frame type passed between sources, the
//! degradation engine and sinks.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Channel order of a packed 3-channel, 8-bit frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    #[default]
    Rgb24,
    Bgr24,
}

impl PixelFormat {
    /// Bytes per pixel (always three channels)
    pub const fn bytes_per_pixel(&self) -> usize {
        3
    }

    /// Name as understood by `ffmpeg -pix_fmt`
    pub fn as_ffmpeg_name(&self) -> &'static str {
        match self {
            PixelFormat::Rgb24 => "rgb24",
            PixelFormat::Bgr24 => "bgr24",
        }
    }
}

impl std::str::FromStr for PixelFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rgb24" | "rgb" => Ok(PixelFormat::Rgb24),
            "bgr24" | "bgr" => Ok(PixelFormat::Bgr24),
            _ => Err(format!("Invalid pixel format: {}. Use: rgb24, bgr24", s)),
        }
    }
}

/// A single camera frame
#[derive(Clone)]
pub struct Frame {
    /// Packed pixel data, `width * height * 3` bytes
    data: Arc<Vec<u8>>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Channel order of `data`
    pub format: PixelFormat,
    /// Frame sequence number
    pub sequence: u64,
    /// Timestamp in microseconds
    pub timestamp_us: u64,
}

impl Frame {
    /// Create a new frame from packed pixel data
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat, sequence: u64) -> Self {
        let timestamp_us = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);

        Self {
            data: Arc::new(data),
            width,
            height,
            format,
            sequence,
            timestamp_us,
        }
    }

    /// Create a frame filled with a single RGB colour
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(Self::expected_len(width, height))
            .collect();
        Self::new(data, width, height, PixelFormat::Rgb24, 0)
    }

    /// Number of bytes a frame of the given size occupies
    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }

    /// Get the raw pixel data as a slice
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the number of bytes per row (stride)
    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Get total size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Check if frame dimensions are valid
    pub fn is_valid(&self) -> bool {
        self.data.len() == Self::expected_len(self.width, self.height)
            && self.width > 0
            && self.height > 0
    }

    /// Pixel at `(x, y)` in RGB order regardless of the stored format
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        let px = [self.data[idx], self.data[idx + 1], self.data[idx + 2]];
        match self.format {
            PixelFormat::Rgb24 => px,
            PixelFormat::Bgr24 => [px[2], px[1], px[0]],
        }
    }

    /// Pixel data converted to the requested channel order
    pub fn to_format(&self, format: PixelFormat) -> Vec<u8> {
        if format == self.format {
            return self.data.as_ref().clone();
        }
        let mut out = self.data.as_ref().clone();
        for px in out.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
        out
    }

    /// Whether two frames carry byte-identical pixels (shared buffers short-circuit)
    pub fn same_pixels(&self, other: &Frame) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
            || (self.width == other.width
                && self.height == other.height
                && self.format == other.format
                && self.data == other.data)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("sequence", &self.sequence)
            .field("size", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_frame_is_valid() {
        let frame = Frame::filled(4, 3, [10, 20, 30]);
        assert!(frame.is_valid());
        assert_eq!(frame.size(), 36);
        assert_eq!(frame.stride(), 12);
        assert_eq!(frame.rgb_at(3, 2), [10, 20, 30]);
    }

    #[test]
    fn test_bgr_conversion() {
        let frame = Frame::new(vec![1, 2, 3, 4, 5, 6], 2, 1, PixelFormat::Bgr24, 7);
        assert_eq!(frame.rgb_at(0, 0), [3, 2, 1]);
        assert_eq!(frame.to_format(PixelFormat::Rgb24), vec![3, 2, 1, 6, 5, 4]);
        assert_eq!(frame.to_format(PixelFormat::Bgr24), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_short_buffer_is_invalid() {
        let frame = Frame::new(vec![0; 5], 2, 1, PixelFormat::Rgb24, 0);
        assert!(!frame.is_valid());
    }

    #[test]
    fn test_pixel_format_parse() {
        assert_eq!("BGR24".parse::<PixelFormat>().unwrap(), PixelFormat::Bgr24);
        assert_eq!("rgb".parse::<PixelFormat>().unwrap(), PixelFormat::Rgb24);
        assert!("yuv420p".parse::<PixelFormat>().is_err());
    }

    #[test]
    fn test_same_pixels() {
        let a = Frame::filled(2, 2, [1, 1, 1]);
        let b = a.clone();
        let c = Frame::filled(2, 2, [1, 1, 1]);
        let d = Frame::filled(2, 2, [2, 1, 1]);
        assert!(a.same_pixels(&b));
        assert!(a.same_pixels(&c));
        assert!(!a.same_pixels(&d));
    }
}
