//! Color-space segmentation of frames into binary masks.

use image::{GrayImage, Luma, RgbImage};
use imageproc::contrast::equalize_histogram;
use imageproc::filter::separable_filter_equal;

use crate::config::ColorThresholds;
use crate::segmentation::hsv::HsvPlanes;

/// Mask value of a foreground pixel.
pub const FOREGROUND: u8 = 255;

/// Sigma of a Gaussian kernel of the given odd size, using the usual
/// `0.3 * ((k - 1) / 2 - 1) + 0.8` rule.
pub fn gaussian_sigma(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D Gaussian with exactly `kernel_size` taps, centered on the
/// middle tap.
pub fn gaussian_kernel(kernel_size: u32) -> Vec<f32> {
    let size = kernel_size.max(1);
    let sigma = gaussian_sigma(size);
    let center = (size / 2) as f32;
    let weights: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Inputs of the adaptive tracker: the hue plane and a saturation/value mask
/// with hue left unconstrained.
#[derive(Debug, Clone)]
pub struct AdaptivePlanes {
    pub hue: GrayImage,
    pub sv_mask: GrayImage,
}

/// Turns frames into foreground masks using HSV thresholds.
#[derive(Debug, Clone)]
pub struct ColorSegmenter {
    thresholds: ColorThresholds,
    blur_kernel: u32,
    kernel: Vec<f32>,
}

impl ColorSegmenter {
    /// `blur_kernel` is expected to be odd (see `KernelSizes::normalized`).
    /// A size of 1 disables smoothing.
    pub fn new(thresholds: ColorThresholds, blur_kernel: u32) -> Self {
        Self {
            thresholds,
            blur_kernel,
            kernel: gaussian_kernel(blur_kernel),
        }
    }

    pub fn thresholds(&self) -> &ColorThresholds {
        &self.thresholds
    }

    /// Blur, convert to HSV and equalize the value plane.
    pub fn preprocess(&self, frame: &RgbImage) -> HsvPlanes {
        let mut planes = if self.blur_kernel > 1 {
            let blurred = separable_filter_equal(frame, &self.kernel);
            HsvPlanes::from_rgb(&blurred)
        } else {
            HsvPlanes::from_rgb(frame)
        };
        planes.value = equalize_histogram(&planes.value);
        planes
    }

    /// Foreground where the hue lies in either hue interval and saturation and
    /// value lie in their intervals.
    pub fn threshold(&self, planes: &HsvPlanes) -> GrayImage {
        let (width, height) = planes.dimensions();
        GrayImage::from_fn(width, height, |x, y| {
            let h = planes.hue.get_pixel(x, y)[0];
            let s = planes.saturation.get_pixel(x, y)[0];
            let v = planes.value.get_pixel(x, y)[0];
            mask_pixel(self.thresholds.matches(h, s, v))
        })
    }

    /// Saturation/value mask with the hue unconstrained.
    pub fn sv_mask(&self, planes: &HsvPlanes) -> GrayImage {
        let (width, height) = planes.dimensions();
        GrayImage::from_fn(width, height, |x, y| {
            let s = planes.saturation.get_pixel(x, y)[0];
            let v = planes.value.get_pixel(x, y)[0];
            mask_pixel(self.thresholds.matches_sv(s, v))
        })
    }

    /// Full static-threshold segmentation of a frame.
    pub fn segment(&self, frame: &RgbImage) -> GrayImage {
        self.threshold(&self.preprocess(frame))
    }

    /// Planes consumed by the adaptive tracker.
    pub fn adaptive_planes(&self, frame: &RgbImage) -> AdaptivePlanes {
        let planes = self.preprocess(frame);
        let sv_mask = self.sv_mask(&planes);
        AdaptivePlanes {
            hue: planes.hue,
            sv_mask,
        }
    }
}

#[inline]
fn mask_pixel(foreground: bool) -> Luma<u8> {
    Luma([if foreground { FOREGROUND } else { 0 }])
}
