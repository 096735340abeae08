//! Real-time pacing loop
//!
//! Pulls frames from a source at the configured rate, runs them through the
//! degradation pipeline and pushes the result to a sink, simulating dropped
//! and frozen frames along the way.

use crate::pipeline::DegradationPipeline;
use crate::state::TemporalState;
use badcam_core::{Error, Frame, FrameSink, FrameSource, PipelineConfig, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Frame-drop roll hit; nothing was read or written
    Dropped,
    /// The source had nothing for us
    SourceFailed,
    /// A freeze is running; the snapshot went out again
    EmittedFrozen,
    /// A fresh frame was captured, degraded and written
    Emitted,
}

/// Counters for a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    /// Frames written, frozen repeats included
    pub emitted: u64,
    pub dropped: u64,
    /// Frozen repeats among `emitted`
    pub frozen: u64,
    pub failed_reads: u64,
    /// The run stopped because the source ran out of frames
    pub source_ended: bool,
}

impl RunSummary {
    fn record(&mut self, outcome: TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Dropped => self.dropped += 1,
            TickOutcome::SourceFailed => self.failed_reads += 1,
            TickOutcome::EmittedFrozen => {
                self.emitted += 1;
                self.frozen += 1;
            }
            TickOutcome::Emitted => self.emitted += 1,
        }
    }
}

/// How long to sleep after a tick that took `elapsed`.
///
/// A dropped frame waits a full interval; anything else waits out the rest of
/// the interval and never tries to catch up on an overrun.
pub fn next_pause(outcome: TickOutcome, interval: Duration, elapsed: Duration) -> Duration {
    match outcome {
        TickOutcome::Dropped => interval,
        _ => interval.saturating_sub(elapsed),
    }
}

/// Seconds since the Unix epoch, used as the flicker clock
fn wall_clock_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Drives one source through the pipeline into one sink
pub struct Pacer<S, K> {
    pipeline: DegradationPipeline,
    state: TemporalState,
    source: S,
    sink: K,
    rng: StdRng,
    interval: Duration,
    max_frames: Option<u64>,
}

impl<S: FrameSource, K: FrameSink> Pacer<S, K> {
    /// Build a pacer; fails with `ConfigInvalid` before anything runs
    pub fn new(config: PipelineConfig, source: S, sink: K) -> Result<Self> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let interval = config.frame_interval();
        let pipeline = DegradationPipeline::new(config)?;
        let state = TemporalState::new(pipeline.config(), &mut rng);

        let (sw, sh) = source.dimensions();
        info!(
            "Pacer: source {}x{} -> {}x{}, tick every {:?}",
            sw,
            sh,
            pipeline.config().width,
            pipeline.config().height,
            interval
        );

        Ok(Self {
            pipeline,
            state,
            source,
            sink,
            rng,
            interval,
            max_frames: None,
        })
    }

    /// Builder pattern: stop after this many emitted frames
    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn state(&self) -> &TemporalState {
        &self.state
    }

    /// Run until cancelled, until `max_frames` is reached, until the source
    /// reports the end of its stream, or until the sink fails.
    ///
    /// The source and sink are dropped when this returns.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        loop {
            if cancel.is_cancelled() || self.frame_budget_spent(&summary) {
                break;
            }

            let start = Instant::now();
            let outcome = match self.tick(start) {
                Ok(outcome) => outcome,
                Err(Error::EndOfStream(reason)) => {
                    info!("Source finished: {}", reason);
                    summary.source_ended = true;
                    break;
                }
                Err(e) => return Err(e),
            };
            summary.record(outcome);

            if self.frame_budget_spent(&summary) {
                break;
            }

            let pause = next_pause(outcome, self.interval, start.elapsed());
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        info!(
            "Run finished: {} ticks, {} emitted ({} frozen), {} dropped, {} failed reads",
            summary.ticks, summary.emitted, summary.frozen, summary.dropped, summary.failed_reads
        );
        Ok(summary)
    }

    fn frame_budget_spent(&self, summary: &RunSummary) -> bool {
        self.max_frames.is_some_and(|max| summary.emitted >= max)
    }

    fn tick(&mut self, now: Instant) -> Result<TickOutcome> {
        let params = &self.pipeline.config().params;
        let (frame_drop, freeze_chance, (freeze_min, freeze_max)) =
            (params.frame_drop, params.freeze_chance, params.freeze_secs);

        if frame_drop > 0.0 && self.rng.gen_bool(frame_drop) {
            debug!("Dropped frame");
            return Ok(TickOutcome::Dropped);
        }

        if let Some(frozen) = self.state.frozen_frame(now) {
            self.emit(&frozen)?;
            return Ok(TickOutcome::EmittedFrozen);
        }

        let input = match self.source.read() {
            Ok(frame) => frame,
            Err(e) if e.is_transient() => {
                warn!("Source read failed: {}", e);
                return Ok(TickOutcome::SourceFailed);
            }
            Err(e) => return Err(e),
        };

        let freeze = freeze_chance > 0.0 && self.rng.gen_bool(freeze_chance);

        let output = match self
            .pipeline
            .process(&input, &mut self.state, &mut self.rng, wall_clock_secs())
        {
            Ok(frame) => frame,
            Err(e) if e.is_transient() => {
                warn!("Skipping frame: {}", e);
                return Ok(TickOutcome::SourceFailed);
            }
            Err(e) => return Err(e),
        };

        if freeze {
            let secs = if freeze_max > freeze_min {
                self.rng.gen_range(freeze_min..=freeze_max)
            } else {
                freeze_min
            };
            debug!("Freezing frame {} for {:.2}s", output.sequence, secs);
            self.state
                .arm_freeze(output.clone(), now + Duration::from_secs_f32(secs));
        }

        self.emit(&output)?;
        Ok(TickOutcome::Emitted)
    }

    fn emit(&mut self, frame: &Frame) -> Result<()> {
        self.sink.emit(frame).map_err(|e| {
            warn!("Sink write failed: {}", e);
            match e {
                Error::SinkUnavailable(_) => e,
                other => Error::SinkUnavailable(other.to_string()),
            }
        })
    }
}
