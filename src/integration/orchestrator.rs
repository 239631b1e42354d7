//! Frame loop around the active pipeline.

use std::borrow::Cow;

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use nalgebra::Point2;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{PipelineMode, TrackerConfig};
use crate::error::{Result, TrackerError};
use crate::integration::events::InteractionEvent;
use crate::integration::frame_source::{Frame, FrameSink, FrameSource};
use crate::integration::overlay::Overlay;
use crate::integration::pipeline::{Pipeline, build_pipeline};
use crate::tracker::{Pose, TrackState};

/// Per-frame tracking result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TrackResult {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Point2<f64>>,
    /// Principal axis direction in radians, within `[-pi/2, pi/2)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<f64>,
    /// Half the principal axis length, in processed-frame pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
}

impl TrackResult {
    pub fn not_found() -> Self {
        Self::default()
    }

    /// A detection at `position`. Orientation and size are only reported when
    /// a pose could be estimated.
    pub fn detected(position: Point2<f64>, pose: Option<&Pose>) -> Self {
        Self {
            found: true,
            position: Some(position),
            orientation: pose.map(|p| p.orientation),
            size: pose.map(|p| p.size),
        }
    }
}

/// Everything produced for one processed frame.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub index: u64,
    pub result: TrackResult,
    pub overlay: Overlay,
    /// Present while the back-projection view is toggled on.
    pub back_projection: Option<GrayImage>,
    pub processed_width: u32,
    pub processed_height: u32,
}

/// Totals of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub frames_processed: u64,
    pub frames_found: u64,
    /// Outputs re-emitted while paused.
    pub repeated_outputs: u64,
    /// The run ended on a quit event rather than at end of stream.
    pub quit: bool,
}

/// Drives a `Pipeline` over a stream of frames.
///
/// The orchestrator owns the active pipeline, the back-projection view flag and
/// the last output. Interaction events reach the pipeline only through
/// `handle_event`, between frames.
pub struct TrackingOrchestrator {
    config: TrackerConfig,
    pipeline: Box<dyn Pipeline>,
    show_back_projection: bool,
    quit_requested: bool,
    next_index: u64,
    last_output: Option<FrameOutput>,
}

impl TrackingOrchestrator {
    /// Normalize and validate `config`, then build the pipeline it selects.
    pub fn new(config: TrackerConfig) -> Result<Self> {
        let config = config.normalized();
        config.validate()?;
        let pipeline = build_pipeline(&config);
        debug!(mode = ?config.mode, "orchestrator created");
        Ok(Self {
            config,
            pipeline,
            show_back_projection: false,
            quit_requested: false,
            next_index: 0,
            last_output: None,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn mode(&self) -> PipelineMode {
        self.pipeline.mode()
    }

    pub fn track_state(&self) -> Option<TrackState> {
        self.pipeline.track_state()
    }

    /// Whether the pipeline currently holds its last output instead of
    /// processing frames.
    pub fn is_paused(&self) -> bool {
        self.pipeline.is_paused()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn shows_back_projection(&self) -> bool {
        self.show_back_projection
    }

    /// Output of the most recent `process_frame` call.
    pub fn last_output(&self) -> Option<&FrameOutput> {
        self.last_output.as_ref()
    }

    /// Apply one interaction event. Quit and the view toggle are handled here,
    /// everything else goes to the pipeline.
    pub fn handle_event(&mut self, event: InteractionEvent) {
        debug!(?event, "interaction event");
        match event {
            InteractionEvent::Quit => self.quit_requested = true,
            InteractionEvent::ToggleBackProjectionView => {
                self.show_back_projection = !self.show_back_projection;
            }
            other => self.pipeline.handle_event(other),
        }
    }

    /// Scale the frame down to the processing height cap if needed and run the
    /// pipeline on it.
    ///
    /// While the tracker is paused the frame is not processed and the last
    /// output is returned unchanged.
    ///
    /// # Arguments
    /// * `frame` - Frame in its original resolution
    ///
    /// # Returns
    /// The stored output for this call, also available from `last_output`,
    /// or `DegenerateFrame` when the frame has no pixels.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<&FrameOutput> {
        let (width, height) = frame.image.dimensions();
        if width == 0 || height == 0 {
            return Err(TrackerError::DegenerateFrame { width, height });
        }

        let output = match self.last_output.take() {
            Some(last) if self.is_paused() => {
                debug!(index = frame.index, held = last.index, "paused, holding output");
                last
            }
            _ => self.fresh_output(frame),
        };
        Ok(self.last_output.insert(output))
    }

    fn fresh_output(&mut self, frame: &Frame) -> FrameOutput {
        let processed = self.downscale(&frame.image);
        let (processed_width, processed_height) = processed.dimensions();
        let output = self.pipeline.process(&processed);
        debug!(
            index = frame.index,
            found = output.result.found,
            processed_width,
            processed_height,
            "frame processed"
        );

        FrameOutput {
            index: frame.index,
            result: output.result,
            overlay: output.overlay,
            back_projection: output.view.filter(|_| self.show_back_projection),
            processed_width,
            processed_height,
        }
    }

    /// Pull frames from `source` and hand each output to `sink` until the
    /// stream ends or a quit event arrives.
    ///
    /// While paused no frames are pulled and the last output is handed to the
    /// sink again, so the sink paces the loop.
    ///
    /// # Arguments
    /// * `source` - Producer of frames; `None` ends the run
    /// * `sink` - Consumer of outputs, returning the events to apply next
    ///
    /// # Returns
    /// Totals of the run, or the first source, sink or frame error.
    pub fn run<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<RunStats>
    where
        S: FrameSource,
        K: FrameSink,
    {
        info!(mode = ?self.mode(), "tracking started");
        let mut stats = RunStats::default();

        loop {
            if self.quit_requested {
                stats.quit = true;
                break;
            }

            let paused_output = if self.is_paused() {
                self.last_output.as_ref()
            } else {
                None
            };
            let events = match paused_output {
                Some(output) => {
                    stats.repeated_outputs += 1;
                    sink.consume(output)
                        .map_err(|e| TrackerError::FrameSink(Box::new(e)))?
                }
                None => {
                    let next = source
                        .next_frame()
                        .map_err(|e| TrackerError::FrameSource(Box::new(e)))?;
                    let Some(image) = next else {
                        debug!("end of stream");
                        break;
                    };

                    let frame = Frame::new(self.next_index, image);
                    self.next_index += 1;
                    let output = self.process_frame(&frame)?;
                    stats.frames_processed += 1;
                    if output.result.found {
                        stats.frames_found += 1;
                    }
                    sink.consume(output)
                        .map_err(|e| TrackerError::FrameSink(Box::new(e)))?
                }
            };

            for event in events {
                self.handle_event(event);
            }
        }

        info!(
            frames = stats.frames_processed,
            found = stats.frames_found,
            quit = stats.quit,
            "tracking finished"
        );
        Ok(stats)
    }

    fn downscale<'a>(&self, image: &'a RgbImage) -> Cow<'a, RgbImage> {
        let (width, height) = image.dimensions();
        let limit = self.config.processing_height_limit;
        if height <= limit {
            return Cow::Borrowed(image);
        }
        let ratio = limit as f64 / height as f64;
        let scaled_width = ((width as f64 * ratio) as u32).max(1);
        Cow::Owned(imageops::resize(image, scaled_width, limit, FilterType::Lanczos3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_zero_sized_frame_is_rejected() {
        let mut orchestrator = TrackingOrchestrator::new(TrackerConfig::default()).unwrap();
        let result = orchestrator.process_frame(&Frame::new(0, RgbImage::new(0, 10)));
        assert!(matches!(
            result,
            Err(TrackerError::DegenerateFrame {
                width: 0,
                height: 10
            })
        ));
    }

    #[test]
    fn test_tall_frames_are_downscaled() {
        let config = TrackerConfig {
            processing_height_limit: 60,
            ..TrackerConfig::default()
        };
        let mut orchestrator = TrackingOrchestrator::new(config).unwrap();
        let frame = Frame::new(3, RgbImage::from_pixel(250, 120, Rgb([10, 10, 10])));
        let output = orchestrator.process_frame(&frame).unwrap();

        assert_eq!(output.index, 3);
        assert_eq!((output.processed_width, output.processed_height), (125, 60));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = TrackerConfig::default();
        config.thresholds.saturation.min = 200;
        config.thresholds.saturation.max = 100;
        assert!(matches!(
            TrackingOrchestrator::new(config),
            Err(TrackerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_back_projection_view_toggle() {
        let mut orchestrator = TrackingOrchestrator::new(TrackerConfig::default()).unwrap();
        let frame = Frame::new(0, RgbImage::new(20, 20));

        assert!(orchestrator.process_frame(&frame).unwrap().back_projection.is_none());
        orchestrator.handle_event(InteractionEvent::ToggleBackProjectionView);
        assert!(orchestrator.shows_back_projection());
        assert!(orchestrator.process_frame(&frame).unwrap().back_projection.is_some());
    }

    #[test]
    fn test_track_result_serialization_skips_missing_fields() {
        let json = serde_json::to_string(&TrackResult::not_found()).unwrap();
        assert_eq!(json, r#"{"found":false}"#);

        let found = TrackResult {
            found: true,
            position: Some(Point2::new(1.5, 2.0)),
            orientation: None,
            size: None,
        };
        let json = serde_json::to_string(&found).unwrap();
        assert_eq!(json, r#"{"found":true,"position":[1.5,2.0]}"#);
    }
}
