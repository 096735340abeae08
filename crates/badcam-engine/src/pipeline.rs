//! Degradation pipeline
//!
//! Runs the fourteen stages in their fixed order over one frame at a time.

use crate::stages::{
    adaptive_blur, apply_vignette, block_noise, chroma_shift, chroma_subsample, exposure_drift,
    exposure_spike, ghost, inject_dead_pixels, jittered, mains_flicker, motion_magnitude,
    posterize_random, recompress, resize_to_working, rolling_shutter, saturate_and_tint, scanlines,
    sensor_noise, vignette_mask,
};
use crate::state::TemporalState;
use badcam_core::{Error, Frame, PipelineConfig, PixelFormat, Result};
use image::RgbImage;
use rand::Rng;
use tracing::{debug, info};

/// Turns clean frames into bad-webcam frames
pub struct DegradationPipeline {
    config: PipelineConfig,
    vignette: Vec<f32>,
}

impl DegradationPipeline {
    /// Validate the configuration and precompute the vignette mask
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let vignette = vignette_mask(config.width, config.height, config.params.vignette);

        info!(
            "Degradation pipeline ready: preset {}, {}x{} @ {} fps",
            config.preset, config.width, config.height, config.fps
        );

        Ok(Self { config, vignette })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Degrade one input frame.
    ///
    /// The output has the configured working resolution and the input's
    /// channel order. `wall_clock` is seconds since the Unix epoch and only
    /// drives the mains flicker. A malformed input frame is rejected as a
    /// source failure before any state changes.
    pub fn process<R: Rng + ?Sized>(
        &self,
        input: &Frame,
        state: &mut TemporalState,
        rng: &mut R,
        wall_clock: f64,
    ) -> Result<Frame> {
        let src = to_image(input)?;
        let p = &self.config.params;
        let (width, height) = (self.config.width, self.config.height);

        // 1. resize/crop (and pixelate)
        let mut img = resize_to_working(&src, width, height, p.pixelate);
        // 2. exposure / white balance drift
        exposure_drift(&mut img, state, p.exposure_drift, rng);
        // 3. vignette
        apply_vignette(&mut img, &self.vignette);
        // 4. sensor noise, strengths re-rolled per frame
        let shot = jittered(p.shot_noise, p.shot_noise_jitter, rng);
        let read = jittered(p.read_noise, p.read_noise_jitter, rng);
        sensor_noise(&mut img, shot, read, rng);
        // 5. chroma misalignment
        if p.chroma_shift > 0 && rng.gen_bool(p.chroma_shift_chance) {
            chroma_shift(&mut img, p.chroma_shift, rng);
        }

        let motion = state
            .prev_output()
            .map(|prev| motion_magnitude(&img, prev))
            .unwrap_or(0.0);

        // 6. rolling shutter
        rolling_shutter(&mut img, p.rolling_shutter, motion, state.frame_index(), rng);
        // 7. ghosting
        let ghosted = match state.prev_output() {
            Some(prev) => ghost(&mut img, prev, motion, p.motion_threshold, p.temporal_mix),
            None => None,
        };
        // 8. adaptive blur
        let kernel = adaptive_blur(&mut img, p.blur);
        // 9. exposure spike
        let spiked = exposure_spike(&mut img, p.spike_chance, rng);
        // 10. lossy recompression
        chroma_subsample(&mut img, p.chroma_subsample);
        block_noise(&mut img, p.block_noise, rng);
        let quality = recompress(&mut img, p.jpeg_quality, p.jpeg_jitter, rng)?;
        // 11. dead pixels
        inject_dead_pixels(&mut img, state.dead_pixels(), rng);
        // 12. posterize
        let levels = posterize_random(&mut img, &p.posterize_levels, rng);
        // 13. mains flicker and scanlines
        mains_flicker(&mut img, state, p.flicker, wall_clock);
        scanlines(&mut img, p.scanlines);
        // 14. saturation and tint
        saturate_and_tint(&mut img, p.saturation, p.tint, rng);

        let sequence = state.frame_index();
        debug!(
            "Frame {}: motion {:.3}, ghost {:?}, blur k={}, spike {}, jpeg q={:?}, levels {}",
            sequence, motion, ghosted, kernel, spiked, quality, levels
        );

        let rgb = Frame::new(img.as_raw().clone(), width, height, PixelFormat::Rgb24, sequence);
        let output = match input.format {
            PixelFormat::Rgb24 => rgb,
            format => Frame::new(rgb.to_format(format), width, height, format, sequence),
        };

        state.finish_frame(img);
        Ok(output)
    }
}

/// View an input frame as an RGB image
fn to_image(frame: &Frame) -> Result<RgbImage> {
    if !frame.is_valid() {
        return Err(Error::SourceUnavailable(format!(
            "malformed frame: {} bytes for {}x{}",
            frame.size(),
            frame.width,
            frame.height
        )));
    }
    RgbImage::from_raw(frame.width, frame.height, frame.to_format(PixelFormat::Rgb24)).ok_or_else(
        || Error::SourceUnavailable(format!("frame buffer too small for {}x{}", frame.width, frame.height)),
    )
}
