//! BadCam - Emulates a cheap, badly behaved webcam
//!
//! Reads a clean raw video feed (or a synthetic test pattern), degrades every
//! frame the way a low-quality camera would, and writes raw video at the
//! target frame rate to stdout, a file or a v4l2loopback device.

use anyhow::Result;
use badcam_capture::{open_input, open_output, RawVideoSink, RawVideoSource, TestPatternSource};
use badcam_core::{FrameSource, MainsFrequency, PipelineConfig, PixelFormat, Preset, StageParams};
use badcam_engine::Pacer;
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

/// BadCam - Make any video feed look like a terrible webcam
#[derive(Parser, Debug)]
#[command(name = "badcam")]
#[command(version, about, long_about = None)]
struct Args {
    /// Degradation preset (realistic, bad, awful, horrible, nightmare)
    #[arg(long, default_value = "realistic")]
    preset: Preset,

    /// Output width in pixels
    #[arg(short = 'W', long, default_value = "320")]
    width: u32,

    /// Output height in pixels
    #[arg(short = 'H', long, default_value = "240")]
    height: u32,

    /// Target frame rate
    #[arg(short, long, default_value = "10")]
    fps: u32,

    /// Mains frequency of the room lighting (50, 60 or auto)
    #[arg(long, default_value = "auto")]
    mains: MainsFrequency,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// JSON file with stage parameters, replacing the preset table
    #[arg(long)]
    params: Option<PathBuf>,

    /// Raw video input path, or '-' for stdin
    #[arg(short, long, conflicts_with = "test_pattern")]
    input: Option<String>,

    /// Pixel format of the input (rgb24, bgr24)
    #[arg(long, default_value = "rgb24")]
    input_format: PixelFormat,

    /// Input frame width (defaults to --width)
    #[arg(long)]
    input_width: Option<u32>,

    /// Input frame height (defaults to --height)
    #[arg(long)]
    input_height: Option<u32>,

    /// Use a synthetic moving test pattern instead of an input stream
    #[arg(long)]
    test_pattern: bool,

    /// Raw video output path or device node, or '-' for stdout
    #[arg(short, long, default_value = "-")]
    output: String,

    /// Pixel format of the output (rgb24, bgr24)
    #[arg(long, default_value = "rgb24")]
    output_format: PixelFormat,

    /// Stop after this many emitted frames
    #[arg(long)]
    frames: Option<u64>,

    /// List the available presets and exit
    #[arg(long)]
    list_presets: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// What a Ctrl-C press should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// Stop the pacing loop at the next tick boundary
    Cancel,
    /// Leave immediately
    Exit,
}

fn on_interrupt(presses: u32) -> Interrupt {
    if presses <= 1 {
        Interrupt::Cancel
    } else {
        Interrupt::Exit
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout may be carrying video
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    if args.list_presets {
        for preset in Preset::ALL {
            println!("{:<10} {}", preset, preset.description());
        }
        return Ok(());
    }

    info!("BadCam v{}", env!("CARGO_PKG_VERSION"));

    let mut config = PipelineConfig::new()
        .with_preset(args.preset)
        .with_width(args.width)
        .with_height(args.height)
        .with_fps(args.fps)
        .with_mains(args.mains)
        .with_seed(args.seed);

    if let Some(path) = &args.params {
        info!("Loading stage parameters from {}", path.display());
        config = config.with_params(StageParams::from_json_file(path)?);
    }
    config.validate()?;

    let input_width = args.input_width.unwrap_or(args.width);
    let input_height = args.input_height.unwrap_or(args.height);

    let source: Box<dyn FrameSource> = if args.test_pattern {
        info!("Using test pattern {}x{}", input_width, input_height);
        Box::new(TestPatternSource::new(input_width, input_height)?)
    } else if let Some(input) = &args.input {
        Box::new(RawVideoSource::new(
            open_input(input)?,
            input_width,
            input_height,
            args.input_format,
        )?)
    } else {
        anyhow::bail!("No input: pass --input <path|-> or --test-pattern");
    };

    let sink = RawVideoSink::new(open_output(&args.output)?, args.output_format);

    info!(
        "Preset {} at {}x{} @ {} fps, output {} ({})",
        config.preset,
        config.width,
        config.height,
        config.fps,
        args.output,
        args.output_format.as_ffmpeg_name()
    );

    let pacer = Pacer::new(config, source, sink)?.with_max_frames(args.frames);

    // Ctrl-C stops the loop between ticks; a second one exits even if a read is blocked
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        let mut presses = 0;
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                return;
            }
            presses += 1;
            match on_interrupt(presses) {
                Interrupt::Cancel => {
                    info!("Interrupted, shutting down (Ctrl-C again to force)...");
                    interrupt.cancel();
                }
                Interrupt::Exit => {
                    warn!("Interrupted twice, exiting now");
                    std::process::exit(130);
                }
            }
        }
    });

    let summary = pacer.run(cancel).await?;
    info!(
        "Done: {} frames emitted, {} dropped, {} frozen repeats",
        summary.emitted, summary.dropped, summary.frozen
    );

    Ok(())
}
