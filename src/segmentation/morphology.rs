//! Erosion and dilation of binary masks with square structuring elements.
//!
//! The element of size `k` covers offsets `-k/2 ..= k - 1 - k/2` in both axes,
//! so even sizes are allowed. Pixels outside the image never take part in the
//! minimum or maximum.

use image::{GrayImage, Luma};
use imageproc::morphology::{Mask, grayscale_dilate, grayscale_erode};

use crate::config::KernelSizes;

/// Largest element side `imageproc::morphology::Mask` can hold.
const MAX_MASK_SIZE: u32 = 511;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extremum {
    Min,
    Max,
}

/// Denoises a mask: two erosions remove speckles, two dilations restore and
/// merge what survived.
#[derive(Debug, Clone)]
pub struct MorphologyFilter {
    erode: SquareElement,
    dilate: SquareElement,
}

impl MorphologyFilter {
    pub fn new(kernels: &KernelSizes) -> Self {
        let kernels = kernels.normalized();
        Self {
            erode: SquareElement::new(kernels.erode),
            dilate: SquareElement::new(kernels.dilate),
        }
    }

    pub fn apply(&self, mask: &GrayImage) -> GrayImage {
        let eroded = self.erode.erode(&self.erode.erode(mask));
        self.dilate.dilate(&self.dilate.dilate(&eroded))
    }
}

/// Square structuring element, backed by an imageproc mask when it fits.
#[derive(Debug, Clone)]
struct SquareElement {
    size: u32,
    mask: Option<Mask>,
}

impl SquareElement {
    fn new(size: u32) -> Self {
        let size = size.max(1);
        let mask = (size > 1 && size <= MAX_MASK_SIZE).then(|| {
            let anchor = (size / 2) as u8;
            Mask::from_image(&GrayImage::from_pixel(size, size, Luma([255])), anchor, anchor)
        });
        Self { size, mask }
    }

    fn erode(&self, mask: &GrayImage) -> GrayImage {
        match &self.mask {
            Some(element) => grayscale_erode(mask, element),
            None => square_filter(mask, self.size, Extremum::Min),
        }
    }

    fn dilate(&self, mask: &GrayImage) -> GrayImage {
        match &self.mask {
            Some(element) => grayscale_dilate(mask, element),
            None => square_filter(mask, self.size, Extremum::Max),
        }
    }
}

pub fn erode(mask: &GrayImage, size: u32) -> GrayImage {
    SquareElement::new(size).erode(mask)
}

pub fn dilate(mask: &GrayImage, size: u32) -> GrayImage {
    SquareElement::new(size).dilate(mask)
}

/// Separable square min/max filter, rows first, then columns. Used for sizes
/// of 1 and for elements too large for an imageproc mask.
fn square_filter(mask: &GrayImage, size: u32, extremum: Extremum) -> GrayImage {
    let size = size.max(1);
    if size == 1 {
        return mask.clone();
    }

    let (width, height) = mask.dimensions();
    let before = (size / 2) as i64;
    let after = size as i64 - 1 - before;

    let pick = |acc: u8, v: u8| match extremum {
        Extremum::Min => acc.min(v),
        Extremum::Max => acc.max(v),
    };
    let identity = match extremum {
        Extremum::Min => u8::MAX,
        Extremum::Max => u8::MIN,
    };

    let horizontal = GrayImage::from_fn(width, height, |x, y| {
        let lo = (x as i64 - before).max(0) as u32;
        let hi = (x as i64 + after).min(width as i64 - 1) as u32;
        let value = (lo..=hi).fold(identity, |acc, xx| pick(acc, mask.get_pixel(xx, y)[0]));
        Luma([value])
    });

    GrayImage::from_fn(width, height, |x, y| {
        let lo = (y as i64 - before).max(0) as u32;
        let hi = (y as i64 + after).min(height as i64 - 1) as u32;
        let value = (lo..=hi).fold(identity, |acc, yy| pick(acc, horizontal.get_pixel(x, yy)[0]));
        Luma([value])
    })
}
