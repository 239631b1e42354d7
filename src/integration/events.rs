//! Interaction events delivered between frames.

/// A user or controller command.
///
/// Points are in the coordinates of the processed (possibly downscaled)
/// frame. Events are applied in delivery order before the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionEvent {
    BeginSelection { x: i32, y: i32 },
    UpdateSelection { x: i32, y: i32 },
    EndSelection,
    TogglePause,
    StopTracking,
    ToggleBackProjectionView,
    /// Stop the frame loop before the next frame.
    Quit,
}

impl InteractionEvent {
    /// The begin/update/end sequence that draws `(x1, y1)`-`(x2, y2)`.
    pub fn selection(x1: i32, y1: i32, x2: i32, y2: i32) -> [InteractionEvent; 3] {
        [
            InteractionEvent::BeginSelection { x: x1, y: y1 },
            InteractionEvent::UpdateSelection { x: x2, y: y2 },
            InteractionEvent::EndSelection,
        ]
    }
}
