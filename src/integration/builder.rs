//! Builder for color thresholds.

use crate::config::{ColorThresholds, HUE_MAX, Interval};
use crate::error::Result;

/// Builder for `ColorThresholds`, starting from the defaults.
#[derive(Debug, Clone, Default)]
pub struct ColorThresholdsBuilder {
    thresholds: ColorThresholds,
}

impl ColorThresholdsBuilder {
    /// Create a new builder with the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hue_1(mut self, min: u8, max: u8) -> Self {
        self.thresholds.hue_1 = Interval::new(min, max);
        self
    }

    pub fn hue_2(mut self, min: u8, max: u8) -> Self {
        self.thresholds.hue_2 = Interval::new(min, max);
        self
    }

    /// Hue intervals covering `hue ± tolerance` on the hue circle. When the
    /// range crosses the wrap-around it is split over both intervals;
    /// otherwise both intervals hold the same range.
    pub fn around_hue(mut self, hue: u8, tolerance: u8) -> Self {
        let hue = hue.min(HUE_MAX - 1) as i32;
        let tolerance = (tolerance as i32).min(HUE_MAX as i32 / 2);
        let max = HUE_MAX as i32;

        let (first, second) = if hue - tolerance < 0 {
            ((0, hue + tolerance), (max + hue - tolerance, max))
        } else if hue + tolerance > max {
            ((hue - tolerance, max), (0, hue + tolerance - max))
        } else {
            ((hue - tolerance, hue + tolerance), (hue - tolerance, hue + tolerance))
        };

        self.thresholds.hue_1 = Interval::new(first.0 as u8, first.1 as u8);
        self.thresholds.hue_2 = Interval::new(second.0 as u8, second.1 as u8);
        self
    }

    pub fn saturation(mut self, min: u8, max: u8) -> Self {
        self.thresholds.saturation = Interval::new(min, max);
        self
    }

    pub fn value(mut self, min: u8, max: u8) -> Self {
        self.thresholds.value = Interval::new(min, max);
        self
    }

    /// Build the thresholds, rejecting empty or out-of-range intervals.
    pub fn build(self) -> Result<ColorThresholds> {
        self.thresholds.validate()?;
        Ok(self.thresholds)
    }
}
