use std::collections::VecDeque;
use std::f64::consts::PI;

use image::{Rgb, RgbImage};
use usv_tracker::tracker::normalize_axis_angle;
use usv_tracker::{
    Frame, FrameOutput, FrameSink, FrameSource, InteractionEvent, IterFrameSource, KernelSizes,
    PipelineMode, PoseMethod, TrackResult, TrackState, TrackerConfig, TrackerError,
    TrackingOrchestrator,
};

const TARGET: Rgb<u8> = Rgb([230, 20, 20]);
const WATER: Rgb<u8> = Rgb([20, 90, 40]);

fn config(mode: PipelineMode) -> TrackerConfig {
    TrackerConfig {
        mode,
        kernels: KernelSizes {
            blur: 1,
            erode: 1,
            dilate: 1,
        },
        ..TrackerConfig::default()
    }
}

/// Target-colored pixels where `inside(dx, dy)` holds, offsets taken from
/// `(cx, cy)`.
fn frame_with(width: u32, height: u32, cx: f64, cy: f64, inside: impl Fn(f64, f64) -> bool) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        if inside(x as f64 - cx, y as f64 - cy) {
            TARGET
        } else {
            WATER
        }
    })
}

fn rotated(dx: f64, dy: f64, angle: f64) -> (f64, f64) {
    let (sin, cos) = angle.sin_cos();
    (dx * cos + dy * sin, -dx * sin + dy * cos)
}

fn ellipse(a: f64, b: f64, angle: f64) -> impl Fn(f64, f64) -> bool {
    move |dx, dy| {
        let (u, v) = rotated(dx, dy, angle);
        (u / a).powi(2) + (v / b).powi(2) <= 1.0
    }
}

fn rectangle(w: f64, h: f64, angle: f64) -> impl Fn(f64, f64) -> bool {
    move |dx, dy| {
        let (u, v) = rotated(dx, dy, angle);
        u.abs() <= w / 2.0 && v.abs() <= h / 2.0
    }
}

fn block_frame(x0: u32, y0: u32) -> RgbImage {
    RgbImage::from_fn(160, 120, |x, y| {
        if (x0..x0 + 20).contains(&x) && (y0..y0 + 20).contains(&y) {
            TARGET
        } else {
            WATER
        }
    })
}

fn axis_difference(a: f64, b: f64) -> f64 {
    normalize_axis_angle(a - b).abs()
}

/// Replays scripted events and records every output it is handed.
struct ScriptedSink {
    script: VecDeque<Vec<InteractionEvent>>,
    seen: Vec<(u64, TrackResult)>,
}

impl ScriptedSink {
    fn new(script: Vec<Vec<InteractionEvent>>) -> Self {
        Self {
            script: script.into(),
            seen: Vec::new(),
        }
    }
}

impl FrameSink for ScriptedSink {
    type Error = std::convert::Infallible;

    fn consume(&mut self, output: &FrameOutput) -> Result<Vec<InteractionEvent>, Self::Error> {
        self.seen.push((output.index, output.result));
        Ok(self.script.pop_front().unwrap_or_default())
    }
}

struct BrokenCamera;

impl FrameSource for BrokenCamera {
    type Error = std::io::Error;

    fn next_frame(&mut self) -> Result<Option<RgbImage>, Self::Error> {
        Err(std::io::Error::other("device unplugged"))
    }
}

#[test]
fn test_static_pipeline_rotated_rectangle() {
    let angle = -0.4;
    let image = frame_with(320, 240, 160.0, 120.0, rectangle(100.0, 30.0, angle));
    let mut orchestrator = TrackingOrchestrator::new(config(PipelineMode::StaticThreshold)).unwrap();

    let output = orchestrator.process_frame(&Frame::new(0, image)).unwrap();
    let result = output.result;

    assert!(result.found);
    let position = result.position.unwrap();
    assert!((position.x - 160.0).abs() < 1.0);
    assert!((position.y - 120.0).abs() < 1.0);
    assert!(axis_difference(result.orientation.unwrap(), angle) < 0.05);
    assert!((result.size.unwrap() - 50.0).abs() < 2.0);

    let crosshair = output.overlay.crosshair.unwrap();
    assert!((crosshair.radius - result.size.unwrap()).abs() < 1e-9);
    assert!(output.overlay.axis.is_some());
}

#[test]
fn test_static_pipeline_with_default_kernels() {
    let angle = 0.5;
    let image = frame_with(320, 240, 160.0, 120.0, rectangle(120.0, 30.0, angle));
    let config = TrackerConfig {
        mode: PipelineMode::StaticThreshold,
        ..TrackerConfig::default()
    };
    assert_eq!(config.kernels, KernelSizes::default());
    let mut orchestrator = TrackingOrchestrator::new(config).unwrap();

    let result = orchestrator
        .process_frame(&Frame::new(0, image))
        .unwrap()
        .result;

    assert!(result.found);
    // Each even-sized erosion and dilation moves the mask half a pixel
    // toward +x and +y; two of each give two pixels.
    let position = result.position.unwrap();
    assert!((position.x - 162.0).abs() < 1.5, "x = {}", position.x);
    assert!((position.y - 122.0).abs() < 1.5, "y = {}", position.y);
    let orientation = result.orientation.unwrap();
    assert!(axis_difference(orientation, angle) < 0.05, "orientation = {orientation}");
    let size = result.size.unwrap();
    assert!(size > 70.0 && size < 90.0, "size = {size}");
}

#[test]
fn test_static_pipeline_ellipse_with_moment_pose() {
    let angle = 0.5;
    let image = frame_with(320, 240, 160.0, 120.0, ellipse(60.0, 15.0, angle));
    let mut config = config(PipelineMode::StaticThreshold);
    config.pose_method = PoseMethod::MomentEllipse;
    let mut orchestrator = TrackingOrchestrator::new(config).unwrap();

    let result = orchestrator
        .process_frame(&Frame::new(0, image))
        .unwrap()
        .result;

    assert!(result.found);
    let position = result.position.unwrap();
    assert!((position.x - 160.0).abs() < 0.5);
    assert!((position.y - 120.0).abs() < 0.5);
    assert!(axis_difference(result.orientation.unwrap(), angle) < 0.05);
    assert!((result.size.unwrap() - 60.0).abs() < 4.0);
}

#[test]
fn test_static_pipeline_on_downscaled_frame() {
    let image = frame_with(320, 240, 160.0, 120.0, ellipse(60.0, 15.0, PI / 2.0));
    let mut config = config(PipelineMode::StaticThreshold);
    config.processing_height_limit = 120;
    let mut orchestrator = TrackingOrchestrator::new(config).unwrap();

    let output = orchestrator.process_frame(&Frame::new(0, image)).unwrap();
    assert_eq!((output.processed_width, output.processed_height), (160, 120));
    assert!(output.result.found);
    let position = output.result.position.unwrap();
    assert!((position.x - 80.0).abs() < 1.5);
    assert!((position.y - 60.0).abs() < 1.5);
}

#[test]
fn test_static_pipeline_reports_nothing_on_empty_water() {
    let mut orchestrator = TrackingOrchestrator::new(config(PipelineMode::StaticThreshold)).unwrap();
    let output = orchestrator
        .process_frame(&Frame::new(0, RgbImage::from_pixel(80, 60, WATER)))
        .unwrap();
    assert_eq!(output.result, TrackResult::not_found());
}

#[test]
fn test_selection_reaches_tracking_on_next_frame() {
    let mut orchestrator = TrackingOrchestrator::new(config(PipelineMode::Adaptive)).unwrap();
    assert_eq!(orchestrator.track_state(), Some(TrackState::Idle));

    let first = orchestrator.process_frame(&Frame::new(0, block_frame(40, 30))).unwrap();
    assert!(!first.result.found);

    for event in InteractionEvent::selection(40, 30, 60, 50) {
        orchestrator.handle_event(event);
    }
    assert_eq!(orchestrator.track_state(), Some(TrackState::Initializing));

    let second = orchestrator.process_frame(&Frame::new(1, block_frame(40, 30))).unwrap();
    assert!(second.result.found);
    assert_eq!(orchestrator.track_state(), Some(TrackState::Tracking));

    let third = orchestrator.process_frame(&Frame::new(2, block_frame(46, 33))).unwrap();
    let position = third.result.position.unwrap();
    assert!((position.x - 55.5).abs() <= 2.0);
    assert!((position.y - 42.5).abs() <= 2.0);
}

#[test]
fn test_paused_process_frame_holds_last_output() {
    let mut orchestrator = TrackingOrchestrator::new(config(PipelineMode::Adaptive)).unwrap();
    orchestrator.process_frame(&Frame::new(0, block_frame(40, 30))).unwrap();
    for event in InteractionEvent::selection(40, 30, 60, 50) {
        orchestrator.handle_event(event);
    }
    let tracked = orchestrator
        .process_frame(&Frame::new(1, block_frame(40, 30)))
        .unwrap()
        .result;
    assert!(tracked.found);

    orchestrator.handle_event(InteractionEvent::TogglePause);
    assert!(orchestrator.is_paused());
    let held = orchestrator.process_frame(&Frame::new(2, block_frame(46, 33))).unwrap();
    assert_eq!(held.index, 1);
    assert_eq!(held.result, tracked);
    assert_eq!(orchestrator.last_output().unwrap().result, tracked);

    orchestrator.handle_event(InteractionEvent::TogglePause);
    assert_eq!(orchestrator.track_state(), Some(TrackState::Tracking));
    let resumed = orchestrator.process_frame(&Frame::new(3, block_frame(46, 33))).unwrap();
    assert_eq!(resumed.index, 3);
    assert!(resumed.result.found);
}

#[test]
fn test_zero_area_selection_returns_to_idle() {
    let mut orchestrator = TrackingOrchestrator::new(config(PipelineMode::Adaptive)).unwrap();
    orchestrator.process_frame(&Frame::new(0, block_frame(40, 30))).unwrap();

    for event in InteractionEvent::selection(40, 30, 70, 30) {
        orchestrator.handle_event(event);
    }
    assert_eq!(orchestrator.track_state(), Some(TrackState::Idle));

    let output = orchestrator.process_frame(&Frame::new(1, block_frame(40, 30))).unwrap();
    assert!(!output.result.found);
}

#[test]
fn test_stop_tracking_clears_the_model() {
    let mut orchestrator = TrackingOrchestrator::new(config(PipelineMode::Adaptive)).unwrap();
    orchestrator.process_frame(&Frame::new(0, block_frame(40, 30))).unwrap();
    for event in InteractionEvent::selection(40, 30, 60, 50) {
        orchestrator.handle_event(event);
    }
    orchestrator.process_frame(&Frame::new(1, block_frame(40, 30))).unwrap();

    orchestrator.handle_event(InteractionEvent::StopTracking);
    assert_eq!(orchestrator.track_state(), Some(TrackState::Idle));
    let output = orchestrator.process_frame(&Frame::new(2, block_frame(40, 30))).unwrap();
    assert!(!output.result.found);
    assert!(output.overlay.histogram.is_empty());
}

#[test]
fn test_run_repeats_output_while_paused() {
    let frames: Vec<RgbImage> = (0..6).map(|i| block_frame(40 + 2 * i, 30)).collect();
    let mut source = IterFrameSource::new(frames);
    // The model is learned on frame 1, where the block starts at x = 42.
    let mut sink = ScriptedSink::new(vec![
        InteractionEvent::selection(42, 30, 62, 50).to_vec(),
        vec![],
        vec![InteractionEvent::TogglePause],
        vec![],
        vec![InteractionEvent::TogglePause],
    ]);

    let mut orchestrator = TrackingOrchestrator::new(config(PipelineMode::Adaptive)).unwrap();
    let stats = orchestrator.run(&mut source, &mut sink).unwrap();

    assert_eq!(stats.frames_processed, 6);
    assert_eq!(stats.repeated_outputs, 2);
    assert!(!stats.quit);

    let indices: Vec<u64> = sink.seen.iter().map(|(index, _)| *index).collect();
    assert_eq!(indices, vec![0, 1, 2, 2, 2, 3, 4, 5]);
    assert_eq!(sink.seen[2].1, sink.seen[3].1);
    assert!(sink.seen[1..].iter().all(|(_, result)| result.found));
    assert_eq!(orchestrator.track_state(), Some(TrackState::Tracking));
}

#[test]
fn test_run_stops_on_quit() {
    let frames: Vec<RgbImage> = (0..5).map(|_| block_frame(40, 30)).collect();
    let mut source = IterFrameSource::new(frames);
    let mut sink = ScriptedSink::new(vec![vec![], vec![InteractionEvent::Quit]]);

    let mut orchestrator = TrackingOrchestrator::new(config(PipelineMode::StaticThreshold)).unwrap();
    let stats = orchestrator.run(&mut source, &mut sink).unwrap();

    assert!(stats.quit);
    assert_eq!(stats.frames_processed, 2);
    assert_eq!(sink.seen.len(), 2);
    assert_eq!(stats.frames_found, 2);
}

#[test]
fn test_run_ends_cleanly_at_end_of_stream() {
    let mut source = IterFrameSource::new(Vec::<RgbImage>::new());
    let mut sink = ScriptedSink::new(vec![]);
    let mut orchestrator = TrackingOrchestrator::new(config(PipelineMode::StaticThreshold)).unwrap();

    let stats = orchestrator.run(&mut source, &mut sink).unwrap();
    assert_eq!(stats.frames_processed, 0);
    assert!(!stats.quit);
    assert!(orchestrator.last_output().is_none());
}

#[test]
fn test_run_surfaces_source_failures() {
    let mut sink = ScriptedSink::new(vec![]);
    let mut orchestrator = TrackingOrchestrator::new(config(PipelineMode::StaticThreshold)).unwrap();

    let result = orchestrator.run(&mut BrokenCamera, &mut sink);
    assert!(matches!(result, Err(TrackerError::FrameSource(_))));
}

#[test]
fn test_config_file_round_trip() {
    let config = TrackerConfig::from_toml_str(
        r#"
        mode = "adaptive"
        pose_method = "moment-ellipse"

        [kernels]
        blur = 20
        erode = 0
        "#,
    )
    .unwrap();

    let orchestrator = TrackingOrchestrator::new(config).unwrap();
    assert_eq!(orchestrator.mode(), PipelineMode::Adaptive);
    assert_eq!(orchestrator.config().kernels.blur, 21);
    assert_eq!(orchestrator.config().kernels.erode, 1);
    assert_eq!(orchestrator.config().kernels.dilate, 16);
    assert_eq!(orchestrator.config().pose_method, PoseMethod::MomentEllipse);
}
