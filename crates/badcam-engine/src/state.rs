//! Per-run temporal state
//!
//! Everything the pipeline remembers between frames lives here: the previous
//! output, the exposure phase accumulators, the mains flicker phase, the fixed
//! dead-pixel set and an active freeze. One `TemporalState` belongs to one run;
//! two runs never share one.

use crate::stages::generate_dead_pixels;
use badcam_core::{Frame, PipelineConfig};
use image::RgbImage;
use rand::Rng;
use std::f64::consts::TAU;
use tokio::time::Instant;
use tracing::debug;

/// A frame being repeated until `until`
#[derive(Debug, Clone)]
struct Freeze {
    frame: Frame,
    until: Instant,
}

/// Mutable state carried from one processed frame to the next
#[derive(Debug, Clone)]
pub struct TemporalState {
    width: u32,
    height: u32,
    prev_output: Option<RgbImage>,
    ae_phase: f64,
    awb_phase: f64,
    flicker_phase: f64,
    mains_hz: f64,
    dead_pixels: Vec<(u32, u32)>,
    freeze: Option<Freeze>,
    frame_index: u64,
}

impl TemporalState {
    /// Fresh state for a run with the given configuration.
    ///
    /// Phases start at random offsets so concurrent runs drift apart, the
    /// dead-pixel set is drawn once here, and an `auto` mains hint is settled
    /// to 50 or 60 Hz for the whole run.
    pub fn new<R: Rng + ?Sized>(config: &PipelineConfig, rng: &mut R) -> Self {
        let ae_phase = rng.gen::<f64>() * 10.0;
        let awb_phase = rng.gen::<f64>() * 10.0;
        let flicker_phase = rng.gen_range(0.0..TAU);
        let mains_hz = match config.mains.hz() {
            Some(hz) => hz,
            None => {
                if rng.gen_bool(0.5) {
                    50.0
                } else {
                    60.0
                }
            }
        };
        let dead_pixels = generate_dead_pixels(
            config.width,
            config.height,
            config.params.dead_pixel_density,
            rng,
        );

        debug!(
            "Temporal state: {}x{}, {} dead pixels, mains {} Hz",
            config.width,
            config.height,
            dead_pixels.len(),
            mains_hz
        );

        Self {
            width: config.width,
            height: config.height,
            prev_output: None,
            ae_phase,
            awb_phase,
            flicker_phase,
            mains_hz,
            dead_pixels,
            freeze: None,
            frame_index: 0,
        }
    }

    /// Number of frames processed so far
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn ae_phase(&self) -> f64 {
        self.ae_phase
    }

    pub fn awb_phase(&self) -> f64 {
        self.awb_phase
    }

    /// Per-run offset of the mains flicker sine
    pub fn flicker_phase(&self) -> f64 {
        self.flicker_phase
    }

    /// Resolved mains frequency (50 or 60)
    pub fn mains_hz(&self) -> f64 {
        self.mains_hz
    }

    /// Dead-pixel coordinates as `(x, y)`, fixed for the run
    pub fn dead_pixels(&self) -> &[(u32, u32)] {
        &self.dead_pixels
    }

    /// Working resolution the state was built for
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether a freeze is active at `now`
    pub fn is_frozen(&self, now: Instant) -> bool {
        self.freeze.as_ref().is_some_and(|f| now < f.until)
    }

    /// Step both exposure accumulators and return their new values
    pub(crate) fn advance_exposure(&mut self, ae_step: f64, awb_step: f64) -> (f64, f64) {
        self.ae_phase += ae_step;
        self.awb_phase += awb_step;
        (self.ae_phase, self.awb_phase)
    }

    pub(crate) fn prev_output(&self) -> Option<&RgbImage> {
        self.prev_output.as_ref()
    }

    /// Record the output of a processed frame and advance the index
    pub(crate) fn finish_frame(&mut self, output: RgbImage) {
        self.prev_output = Some(output);
        self.frame_index += 1;
    }

    /// Repeat `frame` until `until`
    pub(crate) fn arm_freeze(&mut self, frame: Frame, until: Instant) {
        self.freeze = Some(Freeze { frame, until });
    }

    /// The frozen snapshot if the freeze is still running; an expired freeze is cleared
    pub(crate) fn frozen_frame(&mut self, now: Instant) -> Option<Frame> {
        match &self.freeze {
            Some(f) if now < f.until => Some(f.frame.clone()),
            Some(_) => {
                debug!("Freeze expired at frame {}", self.frame_index);
                self.freeze = None;
                None
            }
            None => None,
        }
    }
}
