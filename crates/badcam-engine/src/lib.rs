//! BadCam Engine - Frame degradation and real-time pacing
//!
//! This crate turns clean camera frames into convincingly bad webcam output:
//! a fixed fourteen-stage degradation pipeline, the per-run temporal state it
//! carries between frames, and the loop that paces it at the target frame rate.

pub mod pacer;
pub mod pipeline;
pub mod stages;
pub mod state;

pub use pacer::{next_pause, Pacer, RunSummary, TickOutcome};
pub use pipeline::DegradationPipeline;
pub use state::TemporalState;
