//! Collaborator traits at the edges of the pacing loop

use crate::{Frame, Result};

/// Anything that can hand out camera frames on demand.
///
/// A failed read is transient: implementations return
/// [`Error::SourceUnavailable`](crate::Error::SourceUnavailable) and the
/// caller retries on its next scheduled tick.
pub trait FrameSource: Send {
    /// Read the next frame
    fn read(&mut self) -> Result<Frame>;

    /// Native dimensions of the frames this source produces
    fn dimensions(&self) -> (u32, u32);
}

/// Destination for finished frames.
///
/// A failed emit is fatal for the run and reported as
/// [`Error::SinkUnavailable`](crate::Error::SinkUnavailable).
pub trait FrameSink: Send {
    /// Deliver one frame
    fn emit(&mut self, frame: &Frame) -> Result<()>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read(&mut self) -> Result<Frame> {
        (**self).read()
    }

    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn emit(&mut self, frame: &Frame) -> Result<()> {
        (**self).emit(frame)
    }
}
