//! Pacing loop behaviour under a paused tokio clock

use badcam_capture::{PixelFormat, RawVideoSource, TestPatternSource};
use badcam_core::{Error, Frame, FrameSink, FrameSource, PipelineConfig, Preset, Result, StageParams};
use badcam_engine::Pacer;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const W: u32 = 32;
const H: u32 = 24;

/// Sink that keeps every frame with the (virtual) time it arrived
#[derive(Clone, Default)]
struct Recorder {
    frames: Arc<Mutex<Vec<(Instant, Frame)>>>,
}

impl Recorder {
    fn frames(&self) -> Vec<(Instant, Frame)> {
        self.frames.lock().unwrap().clone()
    }
}

impl FrameSink for Recorder {
    fn emit(&mut self, frame: &Frame) -> Result<()> {
        self.frames.lock().unwrap().push((Instant::now(), frame.clone()));
        Ok(())
    }
}

/// Test pattern that counts reads and can fail the first few
struct CountingSource {
    inner: TestPatternSource,
    reads: Arc<AtomicU64>,
    fail_first: u64,
}

impl CountingSource {
    fn new(fail_first: u64) -> (Self, Arc<AtomicU64>) {
        let reads = Arc::new(AtomicU64::new(0));
        let source = Self {
            inner: TestPatternSource::new(W, H).unwrap(),
            reads: reads.clone(),
            fail_first,
        };
        (source, reads)
    }
}

impl FrameSource for CountingSource {
    fn read(&mut self) -> Result<Frame> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_first {
            return Err(Error::SourceUnavailable("camera unplugged".into()));
        }
        self.inner.read()
    }

    fn dimensions(&self) -> (u32, u32) {
        (W, H)
    }
}

struct BrokenSink;

impl FrameSink for BrokenSink {
    fn emit(&mut self, _frame: &Frame) -> Result<()> {
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "reader went away",
        )))
    }
}

fn config(params: StageParams) -> PipelineConfig {
    PipelineConfig::new()
        .with_width(W)
        .with_height(H)
        .with_fps(10)
        .with_seed(Some(1))
        .with_params(params)
}

fn pattern() -> TestPatternSource {
    TestPatternSource::new(W, H).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_every_frame_dropped() {
    let mut params = StageParams::passthrough();
    params.frame_drop = 1.0;
    let sink = Recorder::default();
    let pacer = Pacer::new(config(params), pattern(), sink.clone()).unwrap();

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(pacer.run(cancel.clone()));
    tokio::time::sleep(Duration::from_millis(1050)).await;
    cancel.cancel();

    let summary = handle.await.unwrap().unwrap();
    assert_eq!(summary.emitted, 0);
    assert!(summary.dropped >= 10, "{:?}", summary);
    assert!(sink.frames().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_no_drops_reads_every_tick() {
    let (source, reads) = CountingSource::new(0);
    let pacer = Pacer::new(config(StageParams::passthrough()), source, Recorder::default())
        .unwrap()
        .with_max_frames(Some(20));

    let summary = pacer.run(CancellationToken::new()).await.unwrap();
    assert_eq!(summary.ticks, 20);
    assert_eq!(summary.emitted, 20);
    assert_eq!(reads.load(Ordering::SeqCst), 20);
}

#[tokio::test(start_paused = true)]
async fn test_freeze_repeats_identical_frames() {
    let params = StageParams {
        frame_drop: 0.0,
        freeze_chance: 1.0,
        freeze_secs: (0.35, 0.35),
        ..StageParams::for_preset(Preset::Realistic)
    };
    let sink = Recorder::default();
    let pacer = Pacer::new(config(params), pattern(), sink.clone())
        .unwrap()
        .with_max_frames(Some(8));

    let summary = pacer.run(CancellationToken::new()).await.unwrap();
    assert_eq!(summary.emitted, 8);
    assert_eq!(summary.frozen, 6);

    let frames = sink.frames();
    let sequences: Vec<u64> = frames.iter().map(|(_, f)| f.sequence).collect();
    assert_eq!(sequences, vec![0, 0, 0, 0, 1, 1, 1, 1]);
    assert!(frames[0].1.same_pixels(&frames[1].1));
    assert!(frames[2].1.same_pixels(&frames[3].1));
    assert!(!frames[3].1.same_pixels(&frames[4].1));
}

#[tokio::test(start_paused = true)]
async fn test_mean_interval_matches_fps() {
    let sink = Recorder::default();
    let pacer = Pacer::new(config(StageParams::passthrough()), pattern(), sink.clone())
        .unwrap()
        .with_max_frames(Some(101));

    pacer.run(CancellationToken::new()).await.unwrap();

    let frames = sink.frames();
    assert_eq!(frames.len(), 101);
    let span = frames[100].0 - frames[0].0;
    let mean = span / 100;
    assert!(
        mean >= Duration::from_millis(99) && mean <= Duration::from_millis(101),
        "mean interval {:?}",
        mean
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_emitting() {
    let sink = Recorder::default();
    let pacer = Pacer::new(config(StageParams::passthrough()), pattern(), sink.clone()).unwrap();

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(pacer.run(cancel.clone()));
    tokio::time::sleep(Duration::from_millis(250)).await;
    let cancelled_at = Instant::now();
    cancel.cancel();

    let summary = handle.await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    let frames = sink.frames();
    assert_eq!(summary.emitted, 3);
    assert_eq!(frames.len(), 3);
    assert!(frames.iter().all(|(at, _)| *at <= cancelled_at));
}

#[tokio::test(start_paused = true)]
async fn test_sink_failure_ends_run() {
    let pacer = Pacer::new(config(StageParams::passthrough()), pattern(), BrokenSink).unwrap();
    let result = pacer.run(CancellationToken::new()).await;
    assert!(matches!(result, Err(Error::SinkUnavailable(_))));
}

#[tokio::test(start_paused = true)]
async fn test_source_failures_are_skipped() {
    let (source, reads) = CountingSource::new(3);
    let sink = Recorder::default();
    let pacer = Pacer::new(config(StageParams::passthrough()), source, sink.clone())
        .unwrap()
        .with_max_frames(Some(2));
    assert_eq!(pacer.state().frame_index(), 0);

    let summary = pacer.run(CancellationToken::new()).await.unwrap();
    assert_eq!(summary.failed_reads, 3);
    assert_eq!(summary.emitted, 2);
    assert_eq!(reads.load(Ordering::SeqCst), 5);

    // Failed ticks never advanced the frame index
    let sequences: Vec<u64> = sink.frames().iter().map(|(_, f)| f.sequence).collect();
    assert_eq!(sequences, vec![0, 1]);
}

#[test]
fn test_invalid_config_never_starts() {
    let mut params = StageParams::passthrough();
    params.frame_drop = 1.5;
    assert!(matches!(
        Pacer::new(config(params), pattern(), Recorder::default()),
        Err(Error::ConfigInvalid(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_finite_input_ends_the_run() {
    // Two whole frames and a torn third
    let mut bytes = vec![40u8; Frame::expected_len(W, H) * 2];
    bytes.extend_from_slice(&[1, 2, 3, 4]);
    let source = RawVideoSource::new(Cursor::new(bytes), W, H, PixelFormat::Rgb24).unwrap();
    let sink = Recorder::default();
    let pacer = Pacer::new(config(StageParams::passthrough()), source, sink.clone()).unwrap();

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(pacer.run(cancel.clone()));
    let summary = tokio::time::timeout(Duration::from_secs(60), handle)
        .await
        .expect("run should finish once the input is exhausted")
        .unwrap()
        .unwrap();

    assert!(summary.source_ended);
    assert_eq!(summary.emitted, 2);
    assert_eq!(summary.failed_reads, 0);
    assert_eq!(sink.frames().len(), 2);
    assert!(!cancel.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn test_zero_frame_budget_emits_nothing() {
    let (source, reads) = CountingSource::new(0);
    let sink = Recorder::default();
    let pacer = Pacer::new(config(StageParams::passthrough()), source, sink.clone())
        .unwrap()
        .with_max_frames(Some(0));

    let summary = pacer.run(CancellationToken::new()).await.unwrap();
    assert_eq!(summary.ticks, 0);
    assert_eq!(summary.emitted, 0);
    assert_eq!(reads.load(Ordering::SeqCst), 0);
    assert!(sink.frames().is_empty());
}
