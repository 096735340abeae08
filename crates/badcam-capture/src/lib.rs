//! BadCam Capture - Frame sources and sinks
//!
//! This crate provides the I/O collaborators around the degradation engine:
//! - Raw video read from any byte stream (stdin, a file or a capture device)
//! - A synthetic animated test pattern
//! - Raw video written to any byte stream (stdout, a file or a v4l2loopback node)

pub mod pattern;
pub mod raw;

pub use badcam_core::{Frame, FrameSink, FrameSource, PixelFormat};
pub use pattern::TestPatternSource;
pub use raw::{RawVideoSink, RawVideoSource};

use badcam_core::Result;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use tracing::info;

/// Open a raw video input; `-` means stdin
pub fn open_input(path: &str) -> Result<Box<dyn Read + Send>> {
    if path == "-" {
        info!("Reading raw video from stdin");
        Ok(Box::new(BufReader::new(std::io::stdin())))
    } else {
        info!("Reading raw video from {}", path);
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

/// Open a raw video output; `-` means stdout.
///
/// Existing paths such as `/dev/video2` are opened for writing without
/// truncation so device nodes keep working.
pub fn open_output(path: &str) -> Result<Box<dyn Write + Send>> {
    if path == "-" {
        info!("Writing raw video to stdout");
        Ok(Box::new(BufWriter::new(std::io::stdout())))
    } else {
        info!("Writing raw video to {}", path);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(Box::new(file))
    }
}
