//! Color-based tracking of a single unmanned surface vehicle in video frames.
//!
//! Two pipelines are available. The static-threshold pipeline segments each
//! frame by HSV color, cleans the mask, picks the largest admissible region
//! and estimates its pose from a minimal rotated rectangle. The adaptive
//! pipeline learns a hue histogram from a user selection and follows it with
//! CamShift.

pub mod config;
pub mod error;
pub mod integration;
pub mod segmentation;
pub mod tracker;

pub use config::{
    AdaptiveConfig, ColorThresholds, Interval, KernelSizes, PipelineMode, TrackerConfig,
};
pub use error::{Result, TrackerError};
pub use integration::{
    ColorThresholdsBuilder, Frame, FrameOutput, FrameSink, FrameSource, ImageSequenceSource,
    InteractionEvent, IterFrameSource, Overlay, Pipeline, RunStats, TrackResult,
    TrackingOrchestrator,
};
pub use tracker::{AdaptiveTracker, PoseMethod, TrackState};
