use std::io::{self, BufWriter, Stdout, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::info;
use usv_tracker::{
    FrameOutput, FrameSink, ImageSequenceSource, InteractionEvent, Overlay, PipelineMode,
    TrackResult, TrackerConfig, TrackingOrchestrator,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Track a colored surface vehicle through an image sequence", long_about = None)]
struct Args {
    /// Directory of frames, processed in file name order
    #[arg(short, long)]
    frames: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pipeline, overrides the configuration file
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Initial selection `x1,y1,x2,y2` for the adaptive pipeline
    #[arg(long, value_parser = parse_selection)]
    select: Option<[i32; 4]>,

    /// Include overlay geometry in the output
    #[arg(long)]
    overlay: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Static,
    Adaptive,
}

impl From<Mode> for PipelineMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Static => PipelineMode::StaticThreshold,
            Mode::Adaptive => PipelineMode::Adaptive,
        }
    }
}

fn parse_selection(arg: &str) -> std::result::Result<[i32; 4], String> {
    let values = arg
        .split(',')
        .map(|v| v.trim().parse::<i32>().map_err(|e| format!("{v:?}: {e}")))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    values
        .try_into()
        .map_err(|v: Vec<i32>| format!("expected 4 comma-separated values, got {}", v.len()))
}

#[derive(Serialize)]
struct Record<'a> {
    index: u64,
    #[serde(flatten)]
    result: &'a TrackResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    overlay: Option<&'a Overlay>,
}

/// Writes one JSON object per frame to stdout and replays the initial
/// selection after the first frame.
struct JsonLinesSink {
    out: BufWriter<Stdout>,
    pending: Vec<InteractionEvent>,
    overlay: bool,
}

impl FrameSink for JsonLinesSink {
    type Error = io::Error;

    fn consume(&mut self, output: &FrameOutput) -> io::Result<Vec<InteractionEvent>> {
        let record = Record {
            index: output.index,
            result: &output.result,
            overlay: self.overlay.then_some(&output.overlay),
        };
        serde_json::to_writer(&mut self.out, &record)?;
        writeln!(self.out)?;
        Ok(std::mem::take(&mut self.pending))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "usv_tracker=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => TrackerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => TrackerConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.mode = mode.into();
    }

    let mut orchestrator = TrackingOrchestrator::new(config)?;
    let mut source = ImageSequenceSource::open(&args.frames)
        .with_context(|| format!("failed to open {}", args.frames.display()))?;
    info!(frames = source.remaining(), mode = ?orchestrator.mode(), "input ready");

    let pending = args
        .select
        .map(|[x1, y1, x2, y2]| InteractionEvent::selection(x1, y1, x2, y2).to_vec())
        .unwrap_or_default();
    let mut sink = JsonLinesSink {
        out: BufWriter::new(io::stdout()),
        pending,
        overlay: args.overlay,
    };

    let stats = orchestrator.run(&mut source, &mut sink)?;
    sink.out.flush()?;
    info!(
        processed = stats.frames_processed,
        found = stats.frames_found,
        "done"
    );
    Ok(())
}
