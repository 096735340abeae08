//! Raw video source and sink over byte streams
//!
//! Frames are packed 3-channel, 8-bit pixels with no container, the same
//! layout `ffmpeg -f rawvideo -pix_fmt rgb24|bgr24` reads and writes.

use crate::{Frame, FrameSink, FrameSource, PixelFormat};
use badcam_core::{Error, Result};
use std::io::{ErrorKind, Read, Write};
use tracing::debug;

/// Reads fixed-size raw frames from a byte stream
pub struct RawVideoSource<R> {
    reader: R,
    width: u32,
    height: u32,
    format: PixelFormat,
    sequence: u64,
}

impl<R: Read + Send> RawVideoSource<R> {
    /// Create a source for frames of the given size and channel order
    pub fn new(reader: R, width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::config(format!(
                "input size must be positive, got {}x{}",
                width, height
            )));
        }

        debug!(
            "Raw video source initialized: {}x{} {}",
            width,
            height,
            format.as_ffmpeg_name()
        );

        Ok(Self {
            reader,
            width,
            height,
            format,
            sequence: 0,
        })
    }

    /// Number of frames read so far
    pub fn frames_read(&self) -> u64 {
        self.sequence
    }
}

impl<R: Read + Send> FrameSource for RawVideoSource<R> {
    fn read(&mut self) -> Result<Frame> {
        let mut data = vec![0u8; Frame::expected_len(self.width, self.height)];
        self.reader.read_exact(&mut data).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => Error::EndOfStream(format!(
                "input ran out after {} frames",
                self.sequence
            )),
            _ => Error::SourceUnavailable(format!("read failed: {}", e)),
        })?;

        self.sequence += 1;

        Ok(Frame::new(data, self.width, self.height, self.format, self.sequence))
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Writes frames as raw bytes in a fixed channel order
pub struct RawVideoSink<W> {
    writer: W,
    format: PixelFormat,
    frames_written: u64,
}

impl<W: Write + Send> RawVideoSink<W> {
    /// Create a sink emitting the given channel order
    pub fn new(writer: W, format: PixelFormat) -> Self {
        debug!("Raw video sink initialized: {}", format.as_ffmpeg_name());
        Self {
            writer,
            format,
            frames_written: 0,
        }
    }

    /// Number of frames written so far
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Give back the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> FrameSink for RawVideoSink<W> {
    fn emit(&mut self, frame: &Frame) -> Result<()> {
        let bytes = frame.to_format(self.format);
        self.writer
            .write_all(&bytes)
            .and_then(|_| self.writer.flush())
            .map_err(|e| Error::SinkUnavailable(e.to_string()))?;

        self.frames_written += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_whole_frames_then_fails() {
        let bytes: Vec<u8> = (0..30).collect();
        let mut source = RawVideoSource::new(Cursor::new(bytes), 2, 2, PixelFormat::Bgr24).unwrap();

        let first = source.read().unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(first.data(), &(0..12).collect::<Vec<u8>>()[..]);
        assert_eq!(first.format, PixelFormat::Bgr24);

        let second = source.read().unwrap();
        assert_eq!(second.data()[0], 12);

        // Only six bytes left: the stream is over for good
        let err = source.read().unwrap_err();
        assert!(matches!(err, Error::EndOfStream(_)));
        assert!(!err.is_transient());
        assert_eq!(source.frames_read(), 2);

        let empty = RawVideoSource::new(Cursor::new(Vec::new()), 2, 2, PixelFormat::Rgb24)
            .unwrap()
            .read()
            .unwrap_err();
        assert!(matches!(empty, Error::EndOfStream(_)));
    }

    #[test]
    fn test_rejects_empty_size() {
        assert!(RawVideoSource::new(Cursor::new(Vec::new()), 0, 2, PixelFormat::Rgb24).is_err());
    }

    #[test]
    fn test_sink_converts_channel_order() {
        let frame = Frame::new(vec![1, 2, 3, 4, 5, 6], 2, 1, PixelFormat::Rgb24, 0);
        let mut sink = RawVideoSink::new(Vec::new(), PixelFormat::Bgr24);
        sink.emit(&frame).unwrap();
        sink.emit(&frame).unwrap();
        assert_eq!(sink.frames_written(), 2);
        assert_eq!(sink.into_inner(), vec![3, 2, 1, 6, 5, 4, 3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn test_sink_write_failure_is_fatal() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(ErrorKind::BrokenPipe, "pipe closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut sink = RawVideoSink::new(Broken, PixelFormat::Rgb24);
        let err = sink.emit(&Frame::filled(1, 1, [0, 0, 0])).unwrap_err();
        assert!(matches!(err, Error::SinkUnavailable(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.raw");

        {
            let file = std::fs::File::create(&path).unwrap();
            let mut sink = RawVideoSink::new(file, PixelFormat::Rgb24);
            sink.emit(&Frame::filled(3, 2, [9, 8, 7])).unwrap();
        }

        let file = std::fs::File::open(&path).unwrap();
        let mut source = RawVideoSource::new(file, 3, 2, PixelFormat::Rgb24).unwrap();
        let frame = source.read().unwrap();
        assert_eq!(frame.rgb_at(2, 1), [9, 8, 7]);
    }
}
