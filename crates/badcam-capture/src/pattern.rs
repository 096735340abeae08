//! Synthetic animated test pattern
//!
//! Useful when no camera is plugged in: a diagonal colour gradient that
//! slowly scrolls, with a bright bar sweeping across it so the motion-driven
//! stages have something to react to.

use crate::{Frame, FrameSource, PixelFormat};
use badcam_core::{Error, Result};
use tracing::debug;

/// Width of the sweeping bar as a fraction of the frame width
const BAR_FRACTION: u32 = 8;

/// Horizontal bar travel per frame in pixels
const BAR_SPEED: u32 = 4;

/// Source producing an animated test pattern; never fails
pub struct TestPatternSource {
    width: u32,
    height: u32,
    sequence: u64,
}

impl TestPatternSource {
    /// Create a new test pattern source
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::config(format!(
                "pattern size must be positive, got {}x{}",
                width, height
            )));
        }

        debug!("Test pattern source initialized: {}x{}", width, height);

        Ok(Self {
            width,
            height,
            sequence: 0,
        })
    }

    fn render(&self) -> Vec<u8> {
        let (w, h) = (self.width, self.height);
        let bar_width = (w / BAR_FRACTION).max(1);
        // Phases wrap with the pattern period so the arithmetic stays small
        let tr = (self.sequence % w as u64) as u32;
        let bar_x = (tr * BAR_SPEED) % w;
        let tb = ((2 * (self.sequence % (w + h) as u64)) % (w + h) as u64) as u32;

        let mut data = Vec::with_capacity(Frame::expected_len(w, h));
        for y in 0..h {
            for x in 0..w {
                let in_bar = x >= bar_x && x < bar_x + bar_width;
                if in_bar {
                    data.extend_from_slice(&[235, 235, 220]);
                } else {
                    let r = ((x + tr) % w * 255 / w) % 256;
                    let g = (y * 255 / h) % 256;
                    let b = ((x + y + tb) % (w + h) * 255 / (w + h)) % 256;
                    data.extend_from_slice(&[r as u8, g as u8, b as u8]);
                }
            }
        }
        data
    }
}

impl FrameSource for TestPatternSource {
    fn read(&mut self) -> Result<Frame> {
        let data = self.render();
        self.sequence += 1;
        Ok(Frame::new(data, self.width, self.height, PixelFormat::Rgb24, self.sequence))
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
