//! Configuration types for BadCam

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Named degradation preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// Subtle, plausible cheap webcam with every stage active
    #[default]
    Realistic,
    Bad,
    Awful,
    Horrible,
    Nightmare,
}

impl Preset {
    /// All presets, mildest first
    pub const ALL: [Preset; 5] = [
        Preset::Realistic,
        Preset::Bad,
        Preset::Awful,
        Preset::Horrible,
        Preset::Nightmare,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Realistic => "realistic",
            Preset::Bad => "bad",
            Preset::Awful => "awful",
            Preset::Horrible => "horrible",
            Preset::Nightmare => "nightmare",
        }
    }

    /// One-line description for `--list-presets`
    pub fn description(&self) -> &'static str {
        match self {
            Preset::Realistic => "drifting exposure, sensor noise, JPEG artifacts, dead pixels",
            Preset::Bad => "low resolution, light blur and noise, rare hiccups",
            Preset::Awful => "pixelated, smeared colour, visible blocking",
            Preset::Horrible => "heavy pixelation, posterized, frequent drops and freezes",
            Preset::Nightmare => "barely a picture at all",
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Preset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Preset::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                Error::config(format!(
                    "unknown preset: {}. Use: realistic, bad, awful, horrible, nightmare",
                    s
                ))
            })
    }
}

/// Frequency of the lighting mains, which drives the flicker stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MainsFrequency {
    Hz50,
    Hz60,
    /// Pick 50 or 60 Hz at random once per run
    #[default]
    Auto,
}

impl MainsFrequency {
    /// Fixed frequency in Hz, `None` for [`MainsFrequency::Auto`]
    pub fn hz(&self) -> Option<f64> {
        match self {
            MainsFrequency::Hz50 => Some(50.0),
            MainsFrequency::Hz60 => Some(60.0),
            MainsFrequency::Auto => None,
        }
    }
}

impl std::str::FromStr for MainsFrequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().trim_end_matches("hz") {
            "50" => Ok(MainsFrequency::Hz50),
            "60" => Ok(MainsFrequency::Hz60),
            "auto" => Ok(MainsFrequency::Auto),
            _ => Err(format!("Invalid mains frequency: {}. Use: 50, 60, auto", s)),
        }
    }
}

/// Numeric knobs for the fourteen degradation stages and the pacing loop.
///
/// Strengths of `0` and probabilities of `0.0` switch the corresponding
/// stage off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageParams {
    /// Intermediate resolution for pixelation (stage 1)
    pub pixelate: Option<(u32, u32)>,
    /// Scale of the auto-exposure / white-balance drift, 1.0 = full (stage 2)
    pub exposure_drift: f32,
    /// Radial darkening strength (stage 3)
    pub vignette: f32,
    /// Brightness-proportional noise scale, normalised units (stage 4)
    pub shot_noise: f32,
    /// Sigma of the additive read noise in 8-bit units (stage 4)
    pub read_noise: f32,
    /// Per-frame random offset range added to `shot_noise`
    pub shot_noise_jitter: (f32, f32),
    /// Per-frame random offset range added to `read_noise`
    pub read_noise_jitter: (f32, f32),
    /// Maximum per-channel translation in pixels (stage 5)
    pub chroma_shift: u32,
    /// Per-frame probability that the chroma shift fires at all
    pub chroma_shift_chance: f64,
    /// Base rolling-shutter skew in pixels (stage 6)
    pub rolling_shutter: f32,
    /// Mean luma difference (0..1) above which ghosting kicks in (stage 7)
    pub motion_threshold: f32,
    /// Upper bound on the ghosting blend ratio (stage 7)
    pub temporal_mix: f32,
    /// Blur kernel size used for the darkest scenes (stage 8)
    pub blur: u32,
    /// Per-frame probability of an exposure spike (stage 9)
    pub spike_chance: f64,
    /// Base JPEG quality (stage 10)
    pub jpeg_quality: u8,
    /// Random quality jitter around `jpeg_quality` (stage 10)
    pub jpeg_jitter: u8,
    /// Chroma subsampling factor, 1 = none (stage 10)
    pub chroma_subsample: u32,
    /// Number of corrupt macroblocks per frame (stage 10)
    pub block_noise: u32,
    /// Probability of any given pixel being dead (stage 11)
    pub dead_pixel_density: f64,
    /// Level counts to pick from each frame (stage 12)
    pub posterize_levels: Vec<u32>,
    /// Amplitude of the mains flicker (stage 13)
    pub flicker: f32,
    /// Darkening of alternate row pairs (stage 13)
    pub scanlines: f32,
    /// Saturation multiplier (stage 14)
    pub saturation: f32,
    /// Green-over-blue tint strength (stage 14)
    pub tint: f32,
    /// Probability of dropping a tick entirely
    pub frame_drop: f64,
    /// Probability of freezing on the current frame
    pub freeze_chance: f64,
    /// Shortest and longest freeze in seconds
    pub freeze_secs: (f32, f32),
}

impl Default for StageParams {
    fn default() -> Self {
        Self::for_preset(Preset::Realistic)
    }
}

impl StageParams {
    /// Parameter table for a preset
    pub fn for_preset(preset: Preset) -> Self {
        let realistic = Self {
            pixelate: None,
            exposure_drift: 1.0,
            vignette: 0.9,
            shot_noise: 0.045,
            read_noise: 4.0,
            shot_noise_jitter: (-0.01, 0.02),
            read_noise_jitter: (-1.0, 3.0),
            chroma_shift: 1,
            chroma_shift_chance: 0.7,
            rolling_shutter: 1.0,
            motion_threshold: 0.02,
            temporal_mix: 0.35,
            blur: 7,
            spike_chance: 0.01,
            jpeg_quality: 24,
            jpeg_jitter: 6,
            chroma_subsample: 1,
            block_noise: 0,
            dead_pixel_density: 0.0006,
            posterize_levels: vec![32, 48, 64, 80],
            flicker: 0.03,
            scanlines: 0.0,
            saturation: 0.85,
            tint: 0.02,
            frame_drop: 0.03,
            freeze_chance: 0.005,
            freeze_secs: (0.2, 2.5),
        };

        // The ladder presets keep noise and chroma shift steady frame to frame
        let ladder = Self {
            shot_noise_jitter: (0.0, 0.0),
            read_noise_jitter: (0.0, 0.0),
            chroma_shift_chance: 1.0,
            ..realistic.clone()
        };

        match preset {
            Preset::Realistic => realistic,
            Preset::Bad => Self {
                pixelate: Some((160, 120)),
                blur: 5,
                read_noise: 20.0,
                jpeg_quality: 30,
                jpeg_jitter: 3,
                posterize_levels: vec![32],
                scanlines: 0.06,
                block_noise: 4,
                frame_drop: 0.02,
                freeze_chance: 0.005,
                temporal_mix: 0.06,
                ..ladder
            },
            Preset::Awful => Self {
                pixelate: Some((120, 90)),
                blur: 9,
                read_noise: 35.0,
                jpeg_quality: 15,
                jpeg_jitter: 3,
                chroma_subsample: 2,
                posterize_levels: vec![16],
                scanlines: 0.12,
                block_noise: 8,
                frame_drop: 0.06,
                freeze_chance: 0.02,
                temporal_mix: 0.14,
                ..ladder
            },
            Preset::Horrible => Self {
                pixelate: Some((80, 60)),
                blur: 13,
                read_noise: 55.0,
                jpeg_quality: 8,
                jpeg_jitter: 2,
                chroma_subsample: 3,
                posterize_levels: vec![8],
                scanlines: 0.18,
                block_noise: 14,
                frame_drop: 0.15,
                freeze_chance: 0.06,
                temporal_mix: 0.28,
                ..ladder
            },
            Preset::Nightmare => Self {
                pixelate: Some((40, 30)),
                blur: 21,
                read_noise: 90.0,
                jpeg_quality: 4,
                jpeg_jitter: 2,
                chroma_subsample: 4,
                posterize_levels: vec![4],
                scanlines: 0.28,
                block_noise: 28,
                frame_drop: 0.35,
                freeze_chance: 0.18,
                temporal_mix: 0.45,
                ..ladder
            },
        }
    }

    /// A table with every stage and every random event switched off
    pub fn passthrough() -> Self {
        Self {
            pixelate: None,
            exposure_drift: 0.0,
            vignette: 0.0,
            shot_noise: 0.0,
            read_noise: 0.0,
            shot_noise_jitter: (0.0, 0.0),
            read_noise_jitter: (0.0, 0.0),
            chroma_shift: 0,
            chroma_shift_chance: 1.0,
            rolling_shutter: 0.0,
            motion_threshold: 0.02,
            temporal_mix: 0.0,
            blur: 1,
            spike_chance: 0.0,
            jpeg_quality: 100,
            jpeg_jitter: 0,
            chroma_subsample: 1,
            block_noise: 0,
            dead_pixel_density: 0.0,
            posterize_levels: vec![256],
            flicker: 0.0,
            scanlines: 0.0,
            saturation: 1.0,
            tint: 0.0,
            frame_drop: 0.0,
            freeze_chance: 0.0,
            freeze_secs: (0.2, 2.5),
        }
    }

    /// Load a parameter table from a JSON file; missing fields fall back to the realistic preset
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let params: StageParams = serde_json::from_str(&text)?;
        debug!("Loaded stage parameters from {}", path.display());
        Ok(params)
    }

    /// Check every knob is within its meaningful range
    pub fn validate(&self) -> Result<()> {
        for (name, p) in [
            ("spike_chance", self.spike_chance),
            ("chroma_shift_chance", self.chroma_shift_chance),
            ("dead_pixel_density", self.dead_pixel_density),
            ("frame_drop", self.frame_drop),
            ("freeze_chance", self.freeze_chance),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::config(format!("{} must be within 0..=1, got {}", name, p)));
            }
        }

        for (name, v) in [
            ("exposure_drift", self.exposure_drift),
            ("vignette", self.vignette),
            ("shot_noise", self.shot_noise),
            ("read_noise", self.read_noise),
            ("rolling_shutter", self.rolling_shutter),
            ("motion_threshold", self.motion_threshold),
            ("flicker", self.flicker),
            ("saturation", self.saturation),
            ("tint", self.tint),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::config(format!("{} must be a non-negative number, got {}", name, v)));
            }
        }

        if !(0.0..=1.0).contains(&self.temporal_mix) {
            return Err(Error::config("temporal_mix must be within 0..=1"));
        }
        if !(0.0..=1.0).contains(&self.scanlines) {
            return Err(Error::config("scanlines must be within 0..=1"));
        }
        if let Some((w, h)) = self.pixelate {
            if w == 0 || h == 0 {
                return Err(Error::config("pixelate resolution must be positive"));
            }
        }
        if self.blur == 0 {
            return Err(Error::config("blur kernel size must be at least 1"));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::config("jpeg_quality must be within 1..=100"));
        }
        if self.chroma_subsample == 0 {
            return Err(Error::config("chroma_subsample must be at least 1"));
        }
        if self.posterize_levels.is_empty() {
            return Err(Error::config("posterize_levels must not be empty"));
        }
        if let Some(bad) = self.posterize_levels.iter().find(|l| !(1..=256).contains(*l)) {
            return Err(Error::config(format!("posterize level {} outside 1..=256", bad)));
        }
        for (name, (lo, hi)) in [
            ("shot_noise_jitter", self.shot_noise_jitter),
            ("read_noise_jitter", self.read_noise_jitter),
        ] {
            if !(lo.is_finite() && hi.is_finite()) || lo > hi {
                return Err(Error::config(format!(
                    "{} must be an ordered range, got ({}, {})",
                    name, lo, hi
                )));
            }
        }
        let (min, max) = self.freeze_secs;
        if !(min.is_finite() && max.is_finite()) || min < 0.0 || min > max {
            return Err(Error::config(format!(
                "freeze_secs must be an ordered non-negative range, got ({}, {})",
                min, max
            )));
        }
        Ok(())
    }
}

/// Immutable configuration for one degradation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Preset the stage parameters were taken from
    pub preset: Preset,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Target frame rate
    pub fps: u32,
    /// Lighting mains frequency hint
    pub mains: MainsFrequency,
    /// Seed for the run's random source (entropy if None)
    pub seed: Option<u64>,
    /// Per-stage knobs
    pub params: StageParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            preset: Preset::Realistic,
            width: 320,
            height: 240,
            fps: 10,
            mains: MainsFrequency::Auto,
            seed: None,
            params: StageParams::for_preset(Preset::Realistic),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for a preset key such as `"horrible"`
    pub fn from_preset(name: &str) -> Result<Self> {
        let preset: Preset = name.parse()?;
        Ok(Self::new().with_preset(preset))
    }

    /// Builder pattern: set preset (replaces the stage parameters)
    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = preset;
        self.params = StageParams::for_preset(preset);
        self
    }

    /// Builder pattern: set width
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    /// Builder pattern: set height
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    /// Builder pattern: set frame rate
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Builder pattern: set mains frequency
    pub fn with_mains(mut self, mains: MainsFrequency) -> Self {
        self.mains = mains;
        self
    }

    /// Builder pattern: set random seed
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Builder pattern: override stage parameters
    pub fn with_params(mut self, params: StageParams) -> Self {
        self.params = params;
        self
    }

    /// Reject configurations the loop must not start with
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::config(format!(
                "frame size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.fps == 0 {
            return Err(Error::config("fps must be positive"));
        }
        self.params.validate()
    }

    /// Time between ticks of the pacing loop
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_micros(1_000_000 / self.fps.max(1) as u64)
    }

    /// Calculate bytes per frame for 3-channel output
    pub fn frame_size_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}
