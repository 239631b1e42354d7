//! Tracker configuration.
//!
//! Every field has a default, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! mode = "adaptive"
//! processing_height_limit = 720
//!
//! [thresholds]
//! saturation = { min = 120, max = 255 }
//!
//! [kernels]
//! blur = 21
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::{Result, TrackerError};
use crate::tracker::PoseMethod;

/// Largest hue value in the 8-bit HSV representation.
pub const HUE_MAX: u8 = 180;

/// Inclusive `[min, max]` interval of 8-bit channel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Interval {
    pub min: u8,
    pub max: u8,
}

impl Interval {
    #[inline]
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(&self, value: u8) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Color thresholds used for segmentation.
///
/// Two hue intervals let a color straddle the hue wrap-around (red sits at both
/// ends of the hue circle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColorThresholds {
    pub hue_1: Interval,
    pub hue_2: Interval,
    pub saturation: Interval,
    pub value: Interval,
}

impl Default for ColorThresholds {
    fn default() -> Self {
        Self {
            hue_1: Interval::new(0, 10),
            hue_2: Interval::new(160, HUE_MAX),
            saturation: Interval::new(120, 255),
            value: Interval::new(100, 255),
        }
    }
}

impl ColorThresholds {
    /// Whether an HSV triple passes the thresholds.
    #[inline]
    pub fn matches(&self, hue: u8, saturation: u8, value: u8) -> bool {
        (self.hue_1.contains(hue) || self.hue_2.contains(hue)) && self.matches_sv(saturation, value)
    }

    /// Saturation and value test only, hue unconstrained.
    #[inline]
    pub fn matches_sv(&self, saturation: u8, value: u8) -> bool {
        self.saturation.contains(saturation) && self.value.contains(value)
    }

    pub fn validate(&self) -> Result<()> {
        let named = [
            ("hue_1", self.hue_1),
            ("hue_2", self.hue_2),
            ("saturation", self.saturation),
            ("value", self.value),
        ];
        for (name, interval) in named {
            if interval.min > interval.max {
                return Err(TrackerError::InvalidConfig(format!(
                    "{name} interval has min {} > max {}",
                    interval.min, interval.max
                )));
            }
        }
        for (name, interval) in [("hue_1", self.hue_1), ("hue_2", self.hue_2)] {
            if interval.max > HUE_MAX {
                return Err(TrackerError::InvalidConfig(format!(
                    "{name} max {} exceeds {HUE_MAX}",
                    interval.max
                )));
            }
        }
        Ok(())
    }
}

/// Kernel sizes of the smoothing and morphology stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KernelSizes {
    pub blur: u32,
    pub erode: u32,
    pub dilate: u32,
}

impl Default for KernelSizes {
    fn default() -> Self {
        Self {
            blur: 21,
            erode: 2,
            dilate: 16,
        }
    }
}

impl KernelSizes {
    /// Auto-correct sizes the filters cannot use: the blur kernel must be odd,
    /// erode and dilate kernels must be at least 1.
    pub fn normalized(self) -> Self {
        let mut sizes = self;
        if sizes.blur % 2 == 0 {
            sizes.blur += 1;
            warn!(from = self.blur, to = sizes.blur, "blur kernel size must be odd");
        }
        if sizes.erode == 0 {
            sizes.erode = 1;
            warn!("erode kernel size 0 replaced by 1");
        }
        if sizes.dilate == 0 {
            sizes.dilate = 1;
            warn!("dilate kernel size 0 replaced by 1");
        }
        sizes
    }
}

/// Which perception pipeline processes the frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineMode {
    /// Threshold, morphology, blob selection and pose estimation.
    #[default]
    StaticThreshold,
    /// Histogram back-projection tracked with CamShift.
    Adaptive,
}

/// Parameters of the adaptive (CamShift) tracker.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Number of hue histogram bins over `[0, 180)`.
    pub histogram_bins: usize,
    /// Mean-shift iteration cap.
    pub max_iterations: u32,
    /// Mean-shift stops once the window moves less than this many pixels.
    pub epsilon: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            histogram_bins: 16,
            max_iterations: 10,
            epsilon: 1.0,
        }
    }
}

/// Configuration for the whole tracker.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub mode: PipelineMode,
    pub thresholds: ColorThresholds,
    pub kernels: KernelSizes,
    /// Frames taller than this are downscaled before processing.
    pub processing_height_limit: u32,
    /// Regions must be strictly larger than this area.
    pub min_blob_area: u32,
    pub pose_method: PoseMethod,
    pub adaptive: AdaptiveConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            mode: PipelineMode::default(),
            thresholds: ColorThresholds::default(),
            kernels: KernelSizes::default(),
            processing_height_limit: 1080,
            min_blob_area: 1,
            pose_method: PoseMethod::default(),
            adaptive: AdaptiveConfig::default(),
        }
    }
}

impl TrackerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: TrackerConfig = toml::from_str(source)?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Copy of the configuration with kernel sizes auto-corrected.
    pub fn normalized(&self) -> Self {
        Self {
            kernels: self.kernels.normalized(),
            ..self.clone()
        }
    }

    /// Reject settings that cannot be auto-corrected.
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        if self.processing_height_limit == 0 {
            return Err(TrackerError::InvalidConfig(
                "processing_height_limit must be positive".into(),
            ));
        }
        if self.min_blob_area == 0 {
            return Err(TrackerError::InvalidConfig(
                "min_blob_area must be at least 1".into(),
            ));
        }
        if self.adaptive.histogram_bins == 0 {
            return Err(TrackerError::InvalidConfig(
                "histogram_bins must be positive".into(),
            ));
        }
        if self.adaptive.epsilon.is_nan() || self.adaptive.epsilon < 0.0 {
            return Err(TrackerError::InvalidConfig(
                "epsilon must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}
