//! Per-frame perception strategies behind a common `Pipeline` trait.

use image::{GrayImage, RgbImage};
use tracing::debug;

use crate::config::{PipelineMode, TrackerConfig};
use crate::integration::events::InteractionEvent;
use crate::integration::orchestrator::TrackResult;
use crate::integration::overlay::{Overlay, histogram_bars};
use crate::segmentation::{ColorSegmenter, MorphologyFilter};
use crate::tracker::{
    AdaptiveTracker, AreaBounds, BlobSelector, PoseEstimator, TrackState, likelihood_image,
};

/// What a pipeline produced for one frame.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub result: TrackResult,
    pub overlay: Overlay,
    /// Diagnostic view: the cleaned mask in static mode, the gated
    /// back-projection in adaptive mode.
    pub view: Option<GrayImage>,
}

/// A perception strategy run on every processed frame.
pub trait Pipeline {
    fn mode(&self) -> PipelineMode;

    /// Process one frame, already scaled to the processing resolution.
    fn process(&mut self, frame: &RgbImage) -> PipelineOutput;

    /// Apply a selection, pause or stop event.
    fn handle_event(&mut self, _event: InteractionEvent) {}

    /// Whether frame acquisition should be suspended.
    fn is_paused(&self) -> bool {
        false
    }

    /// Tracking state, for pipelines that keep one.
    fn track_state(&self) -> Option<TrackState> {
        None
    }
}

/// Build the pipeline selected by `config.mode`. The configuration is
/// expected to be normalized.
pub fn build_pipeline(config: &TrackerConfig) -> Box<dyn Pipeline> {
    match config.mode {
        PipelineMode::StaticThreshold => Box::new(StaticThresholdPipeline::new(config)),
        PipelineMode::Adaptive => Box::new(AdaptivePipeline::new(config)),
    }
}

/// Threshold, morphology, blob selection and pose estimation.
pub struct StaticThresholdPipeline {
    segmenter: ColorSegmenter,
    morphology: MorphologyFilter,
    selector: BlobSelector,
    estimator: PoseEstimator,
    min_blob_area: u32,
}

impl StaticThresholdPipeline {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            segmenter: ColorSegmenter::new(config.thresholds, config.kernels.blur),
            morphology: MorphologyFilter::new(&config.kernels),
            selector: BlobSelector::new(AreaBounds::for_frame(config.min_blob_area, 0, 0)),
            estimator: PoseEstimator::new(config.pose_method),
            min_blob_area: config.min_blob_area,
        }
    }
}

impl Pipeline for StaticThresholdPipeline {
    fn mode(&self) -> PipelineMode {
        PipelineMode::StaticThreshold
    }

    fn process(&mut self, frame: &RgbImage) -> PipelineOutput {
        let (width, height) = frame.dimensions();
        self.selector
            .set_bounds(AreaBounds::for_frame(self.min_blob_area, width, height));

        let mask = self.segmenter.segment(frame);
        let cleaned = self.morphology.apply(&mask);

        let mut output = PipelineOutput::default();
        if let Some(region) = self.selector.select(&cleaned) {
            let pose = self.estimator.estimate(&region.boundary);
            output.result = TrackResult::detected(region.centroid, pose.as_ref());
            if let Some(pose) = &pose {
                output.overlay =
                    Overlay::default().with_pose(pose, region.centroid, pose.size, width, height);
            }
        }
        output.view = Some(cleaned);
        output
    }

    fn handle_event(&mut self, event: InteractionEvent) {
        debug!(?event, "event has no effect in static-threshold mode");
    }
}

/// Histogram back-projection tracked with CamShift.
pub struct AdaptivePipeline {
    segmenter: ColorSegmenter,
    tracker: AdaptiveTracker,
}

impl AdaptivePipeline {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            segmenter: ColorSegmenter::new(config.thresholds, config.kernels.blur),
            tracker: AdaptiveTracker::new(config.adaptive),
        }
    }

    pub fn tracker(&self) -> &AdaptiveTracker {
        &self.tracker
    }
}

impl Pipeline for AdaptivePipeline {
    fn mode(&self) -> PipelineMode {
        PipelineMode::Adaptive
    }

    fn process(&mut self, frame: &RgbImage) -> PipelineOutput {
        let (width, height) = frame.dimensions();
        let planes = self.segmenter.adaptive_planes(frame);
        let update = self.tracker.update(&planes);

        let mut output = PipelineOutput::default();
        if let Some(update) = update {
            if let Some(pose) = update.pose() {
                let center = update.shape.center;
                let radius = update.shape.width.min(update.shape.height) / 2.0;
                output.result = TrackResult::detected(center, Some(&pose));
                output.overlay = output
                    .overlay
                    .with_pose(&pose, center, radius, width, height);
            }
            output.overlay.search_window = Some(update.window);
            output.view = Some(likelihood_image(&update.likelihood));
        }
        output.overlay.selection = self.tracker.selection();
        if let Some(model) = self.tracker.model() {
            output.overlay.histogram = histogram_bars(model);
        }
        output
    }

    fn handle_event(&mut self, event: InteractionEvent) {
        match event {
            InteractionEvent::BeginSelection { x, y } => self.tracker.begin_selection(x, y),
            InteractionEvent::UpdateSelection { x, y } => self.tracker.update_selection(x, y),
            InteractionEvent::EndSelection => self.tracker.end_selection(),
            InteractionEvent::TogglePause => self.tracker.toggle_pause(),
            InteractionEvent::StopTracking => self.tracker.stop(),
            InteractionEvent::ToggleBackProjectionView | InteractionEvent::Quit => {}
        }
    }

    fn is_paused(&self) -> bool {
        self.tracker.is_paused()
    }

    fn track_state(&self) -> Option<TrackState> {
        Some(self.tracker.state())
    }
}
