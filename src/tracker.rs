mod adaptive_tracker;
mod blob_selector;
mod histogram;
mod mean_shift;
mod moments;
mod pose;
mod rect;
mod track_state;

pub use adaptive_tracker::{AdaptiveTracker, AdaptiveUpdate};
pub use blob_selector::{AreaBounds, BlobSelector, Region, compress_chain, extract_regions};
pub use histogram::{AppearanceModel, HISTOGRAM_PEAK, hue_bin, likelihood_image};
pub use mean_shift::{CAMSHIFT_TOLERANCE, CamShift, TermCriteria, cam_shift, mean_shift, reinflate};
pub use moments::{CentralMoments, Moments};
pub use pose::{
    Pose, PoseEstimator, PoseMethod, PrincipalAxis, min_area_rect, moment_ellipse,
    normalize_axis_angle,
};
pub use rect::{Rect, RotatedRect};
pub use track_state::TrackState;
