//! Hue histogram appearance model and its back-projection.

use image::GrayImage;
use ndarray::{Array1, Array2};

use crate::config::HUE_MAX;
use crate::tracker::rect::Rect;

/// Peak value of a normalized histogram.
pub const HISTOGRAM_PEAK: f32 = 255.0;

/// Bin of a hue value for a histogram of `bins` bins spanning `[0, 180)`.
#[inline]
pub fn hue_bin(hue: u8, bins: usize) -> usize {
    (hue as usize * bins / HUE_MAX as usize).min(bins.saturating_sub(1))
}

/// Normalized hue histogram learned from a selection.
#[derive(Debug, Clone, PartialEq)]
pub struct AppearanceModel {
    bins: Array1<f32>,
}

impl AppearanceModel {
    /// Learn the hue histogram of the pixels inside `selection` whose
    /// saturation/value mask is set, min-max normalized to `[0, 255]`.
    ///
    /// `selection` must lie inside the planes. A histogram with all bins equal
    /// normalizes to all zeros.
    pub fn learn(hue: &GrayImage, sv_mask: &GrayImage, selection: Rect, bins: usize) -> Self {
        let mut counts = Array1::<f32>::zeros(bins.max(1));
        let bins = counts.len();

        if !selection.is_empty() {
            let [x1, y1, x2, y2] = selection.to_tlbr();
            for y in y1 as u32..y2 as u32 {
                for x in x1 as u32..x2 as u32 {
                    if sv_mask.get_pixel(x, y)[0] != 0 {
                        counts[hue_bin(hue.get_pixel(x, y)[0], bins)] += 1.0;
                    }
                }
            }
        }

        let max = counts.fold(f32::MIN, |acc, &v| acc.max(v));
        let min = counts.fold(f32::MAX, |acc, &v| acc.min(v));
        let range = max - min;
        if range > f32::EPSILON {
            counts.mapv_inplace(|v| (v - min) * HISTOGRAM_PEAK / range);
        } else {
            counts.fill(0.0);
        }

        Self { bins: counts }
    }

    /// Model with the given bin weights. An empty array becomes a single
    /// zero bin, which back-projects to zero everywhere.
    pub fn from_bins(bins: Array1<f32>) -> Self {
        if bins.is_empty() {
            return Self {
                bins: Array1::zeros(1),
            };
        }
        Self { bins }
    }

    pub fn bins(&self) -> &Array1<f32> {
        &self.bins
    }

    /// Likelihood of every pixel under the model, indexed `[row, col]`, zero
    /// where the saturation/value mask is not set.
    pub fn back_project(&self, hue: &GrayImage, sv_mask: &GrayImage) -> Array2<u8> {
        let (width, height) = hue.dimensions();
        let bins = self.bins.len();
        Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
            let (x, y) = (col as u32, row as u32);
            if sv_mask.get_pixel(x, y)[0] == 0 {
                return 0;
            }
            let weight = self.bins[hue_bin(hue.get_pixel(x, y)[0], bins)];
            weight.round().clamp(0.0, 255.0) as u8
        })
    }
}

/// View a likelihood map as a grayscale image.
pub fn likelihood_image(likelihood: &Array2<u8>) -> GrayImage {
    let (rows, cols) = likelihood.dim();
    let pixels: Vec<u8> = likelihood.iter().copied().collect();
    GrayImage::from_raw(cols as u32, rows as u32, pixels)
        .unwrap_or_else(|| GrayImage::new(cols as u32, rows as u32))
}
