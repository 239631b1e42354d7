//! Color segmentation and mask cleanup.

mod color_segmenter;
mod hsv;
mod morphology;

pub use color_segmenter::{AdaptivePlanes, ColorSegmenter, FOREGROUND, gaussian_sigma};
pub use hsv::{HsvPlanes, hsv_to_rgb, rgb_to_hsv};
pub use morphology::{MorphologyFilter, dilate, erode};
