//! Interactive appearance tracker: a hue histogram learned from a user
//! selection, followed frame to frame with CamShift.

use ndarray::Array2;
use tracing::debug;

use crate::config::AdaptiveConfig;
use crate::segmentation::AdaptivePlanes;
use crate::tracker::histogram::AppearanceModel;
use crate::tracker::mean_shift::{TermCriteria, cam_shift, reinflate};
use crate::tracker::pose::Pose;
use crate::tracker::rect::{Rect, RotatedRect};
use crate::tracker::track_state::TrackState;

/// Outcome of tracking one frame.
#[derive(Debug, Clone)]
pub struct AdaptiveUpdate {
    pub shape: RotatedRect,
    /// Search window carried to the next frame.
    pub window: Rect,
    /// Gated back-projection of the model, indexed `[row, col]`.
    pub likelihood: Array2<u8>,
}

impl AdaptiveUpdate {
    /// The target is found when CamShift produced a non-degenerate shape.
    #[inline]
    pub fn found(&self) -> bool {
        self.shape.width > 0.0 && self.shape.height > 0.0
    }

    pub fn pose(&self) -> Option<Pose> {
        self.found().then(|| Pose::from_shape(self.shape))
    }
}

/// CamShift tracker driven by a user selection.
///
/// A completed selection is learned as a hue histogram on the next frame,
/// after which every frame moves the search window onto the back-projection
/// of that histogram. The tracker moves between `TrackState`s only through
/// the selection, pause and stop calls and `update`.
pub struct AdaptiveTracker {
    config: AdaptiveConfig,
    state: TrackState,
    /// A selection started while paused; the pause lasts until it completes.
    paused_during_selection: bool,
    origin: (i32, i32),
    selection: Option<Rect>,
    model: Option<AppearanceModel>,
    window: Option<Rect>,
    frame_size: Option<(u32, u32)>,
}

impl AdaptiveTracker {
    /// Create an idle tracker with no model.
    pub fn new(config: AdaptiveConfig) -> Self {
        Self {
            config,
            state: TrackState::Idle,
            paused_during_selection: false,
            origin: (0, 0),
            selection: None,
            model: None,
            window: None,
            frame_size: None,
        }
    }

    /// Current state of the tracking state machine.
    pub fn state(&self) -> TrackState {
        self.state
    }

    /// Frames are not consumed while paused, including while a selection
    /// started in the paused state is still being drawn.
    pub fn is_paused(&self) -> bool {
        match self.state {
            TrackState::Paused => true,
            TrackState::Selecting => self.paused_during_selection,
            _ => false,
        }
    }

    /// The selection rectangle while one is being drawn or awaits learning.
    pub fn selection(&self) -> Option<Rect> {
        match self.state {
            TrackState::Selecting | TrackState::Initializing => self.selection,
            _ => None,
        }
    }

    /// The learned appearance model, if any.
    pub fn model(&self) -> Option<&AppearanceModel> {
        self.model.as_ref()
    }

    /// Search window for the next frame.
    pub fn window(&self) -> Option<Rect> {
        self.window
    }

    /// Start a selection at `(x, y)`. Ignored while a completed selection
    /// waits to be learned.
    pub fn begin_selection(&mut self, x: i32, y: i32) {
        match self.state {
            TrackState::Initializing => {
                debug!("selection already complete, ignoring begin-selection");
                return;
            }
            TrackState::Paused => self.paused_during_selection = true,
            TrackState::Selecting => {}
            TrackState::Idle | TrackState::Tracking => self.paused_during_selection = false,
        }
        self.origin = (x, y);
        self.selection = Some(Rect::new(x, y, 0, 0));
        self.transition(TrackState::Selecting);
    }

    /// Stretch the selection between its origin and `(x, y)`, clipped to the
    /// last frame seen.
    pub fn update_selection(&mut self, x: i32, y: i32) {
        if self.state != TrackState::Selecting {
            return;
        }
        let rect = Rect::spanning(self.origin, (x, y));
        self.selection = Some(match self.frame_size {
            Some((width, height)) => rect.clip_to(width, height),
            None => rect,
        });
    }

    /// Complete the selection. An empty selection returns the tracker to idle.
    pub fn end_selection(&mut self) {
        if self.state != TrackState::Selecting {
            return;
        }
        if self.selection.is_none_or(|rect| rect.is_empty()) {
            debug!("empty selection");
            self.reset();
        } else {
            self.paused_during_selection = false;
            self.transition(TrackState::Initializing);
        }
    }

    /// Switch between tracking and paused.
    pub fn toggle_pause(&mut self) {
        match self.state {
            TrackState::Tracking => self.transition(TrackState::Paused),
            TrackState::Paused => self.transition(TrackState::Tracking),
            state => debug!(?state, "pause only applies while tracking"),
        }
    }

    /// Drop the model, window and selection and return to idle.
    pub fn stop(&mut self) {
        self.reset();
    }

    /// Process one frame.
    ///
    /// Learns the model first if a selection is waiting, then runs CamShift
    /// from the current search window. A window that collapses to a single
    /// pixel or less is reinflated around its center.
    ///
    /// # Arguments
    /// * `planes` - Hue plane and saturation/value mask of the frame
    ///
    /// # Returns
    /// The tracked shape, next search window and likelihood map, or `None`
    /// when nothing is being tracked or the tracker is paused.
    pub fn update(&mut self, planes: &AdaptivePlanes) -> Option<AdaptiveUpdate> {
        let (width, height) = planes.hue.dimensions();
        self.frame_size = Some((width, height));

        if self.state == TrackState::Initializing {
            self.initialize(planes, width, height);
        }

        match self.state {
            TrackState::Tracking => self.track(planes, width, height),
            TrackState::Selecting if !self.paused_during_selection => {
                self.track(planes, width, height)
            }
            _ => None,
        }
    }

    fn initialize(&mut self, planes: &AdaptivePlanes, width: u32, height: u32) {
        let selection = self.selection.unwrap_or_default().clip_to(width, height);
        if selection.is_empty() {
            debug!(selection = ?self.selection, "selection outside the frame");
            self.reset();
            return;
        }

        let model = AppearanceModel::learn(
            &planes.hue,
            &planes.sv_mask,
            selection,
            self.config.histogram_bins,
        );
        debug!(?selection, bins = ?model.bins().as_slice(), "appearance model learned");

        self.model = Some(model);
        self.window = Some(selection);
        self.selection = None;
        self.transition(TrackState::Tracking);
    }

    fn track(&mut self, planes: &AdaptivePlanes, width: u32, height: u32) -> Option<AdaptiveUpdate> {
        let model = self.model.as_ref()?;
        let window = self.window?;

        let likelihood = model.back_project(&planes.hue, &planes.sv_mask);
        let criteria = TermCriteria {
            max_iterations: self.config.max_iterations,
            epsilon: self.config.epsilon,
        };
        let step = cam_shift(likelihood.view(), window, criteria);

        let mut next = step.window;
        if next.area() <= 1 {
            next = reinflate(next, width, height);
            debug!(?next, "search window collapsed, reinflated");
        }
        self.window = Some(next);

        Some(AdaptiveUpdate {
            shape: step.shape,
            window: next,
            likelihood,
        })
    }

    fn transition(&mut self, next: TrackState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "track state");
        }
        self.state = next;
    }

    fn reset(&mut self) {
        self.model = None;
        self.window = None;
        self.selection = None;
        self.paused_during_selection = false;
        self.transition(TrackState::Idle);
    }
}
