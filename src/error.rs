//! Error type shared by the perception core and its collaborators.

use thiserror::Error;

/// Boxed error raised by an external collaborator (frame source or sink).
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors reported by the tracker.
///
/// Losing the target is never an error; it shows up as `found == false` in the
/// per-frame result.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// A frame with zero width or height reached the pipeline. No mask can be
    /// computed for it.
    #[error("degenerate frame dimensions {width}x{height}")]
    DegenerateFrame { width: u32, height: u32 },

    /// The configuration cannot be auto-corrected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("frame source failed: {0}")]
    FrameSource(#[source] CollaboratorError),

    #[error("frame sink failed: {0}")]
    FrameSink(#[source] CollaboratorError),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
