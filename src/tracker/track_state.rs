/// Lifecycle of the adaptive tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// No selection and no appearance model
    #[default]
    Idle,
    /// A selection rectangle is being drawn
    Selecting,
    /// Selection complete, model is learned on the next frame
    Initializing,
    /// Following the learned model frame to frame
    Tracking,
    /// Tracking suspended, the last result is kept
    Paused,
}
