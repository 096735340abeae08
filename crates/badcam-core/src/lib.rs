//! BadCam Core - Shared types and collaborator traits
//!
//! This crate provides the foundational types used across all BadCam components.

pub mod config;
pub mod error;
pub mod frame;
pub mod io;

pub use config::{MainsFrequency, PipelineConfig, Preset, StageParams};
pub use error::{Error, Result};
pub use frame::{Frame, PixelFormat};
pub use io::{FrameSink, FrameSource};
