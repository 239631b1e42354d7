//! Integration of the perception core with frame producers, renderers and
//! interactive controls.
//!
//! This module provides the `Pipeline` strategies, the `TrackingOrchestrator`
//! frame loop and the traits its collaborators implement.

mod builder;
mod events;
mod frame_source;
mod orchestrator;
mod overlay;
mod pipeline;

pub use builder::ColorThresholdsBuilder;
pub use events::InteractionEvent;
pub use frame_source::{Frame, FrameSink, FrameSource, ImageSequenceSource, IterFrameSource};
pub use orchestrator::{FrameOutput, RunStats, TrackResult, TrackingOrchestrator};
pub use overlay::{Crosshair, HistogramBar, Overlay, Segment, histogram_bars};
pub use pipeline::{
    AdaptivePipeline, Pipeline, PipelineOutput, StaticThresholdPipeline, build_pipeline,
};
