//! Annotation geometry handed to the renderer. Nothing is drawn here.

use nalgebra::Point2;
use serde::Serialize;

use crate::segmentation::hsv_to_rgb;
use crate::tracker::{AppearanceModel, Pose, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub start: Point2<f64>,
    pub end: Point2<f64>,
}

impl Segment {
    pub fn new(start: Point2<f64>, end: Point2<f64>) -> Self {
        Self { start, end }
    }
}

/// Four arms from the target position, each clipped at the frame border.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Crosshair {
    pub center: Point2<f64>,
    pub radius: f64,
    /// Up, down, left, right.
    pub arms: [Segment; 4],
}

impl Crosshair {
    pub fn new(center: Point2<f64>, radius: f64, width: u32, height: u32) -> Self {
        let (x, y) = (center.x, center.y);
        let (width, height) = (width as f64, height as f64);

        let up = if y - radius > 0.0 { y - radius } else { 0.0 };
        let down = if y + radius < height { y + radius } else { height };
        let left = if x - radius > 0.0 { x - radius } else { 0.0 };
        let right = if x + radius < width { x + radius } else { width };

        Self {
            center,
            radius,
            arms: [
                Segment::new(center, Point2::new(x, up)),
                Segment::new(center, Point2::new(x, down)),
                Segment::new(center, Point2::new(left, y)),
                Segment::new(center, Point2::new(right, y)),
            ],
        }
    }
}

/// One histogram bin and the display color of its hue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBar {
    pub value: f32,
    pub color: [u8; 3],
}

/// Bars of a learned appearance model, colored by the hue at each bin start.
pub fn histogram_bars(model: &AppearanceModel) -> Vec<HistogramBar> {
    let bins = model.bins();
    let count = bins.len();
    bins.iter()
        .enumerate()
        .map(|(i, &value)| {
            let hue = (i as f64 * 180.0 / count as f64).round().min(255.0) as u8;
            HistogramBar {
                value,
                color: hsv_to_rgb(hue, 255, 255),
            }
        })
        .collect()
}

/// Everything a renderer needs to annotate one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Overlay {
    pub crosshair: Option<Crosshair>,
    /// Principal axis of the target.
    pub axis: Option<Segment>,
    /// Corners of the rotated bounding shape.
    pub corners: Option<[Point2<f64>; 4]>,
    /// Selection being drawn.
    pub selection: Option<Rect>,
    /// Search window of the adaptive tracker.
    pub search_window: Option<Rect>,
    pub histogram: Vec<HistogramBar>,
}

impl Overlay {
    /// Crosshair, axis and shape corners of a pose.
    pub fn with_pose(
        mut self,
        pose: &Pose,
        center: Point2<f64>,
        radius: f64,
        width: u32,
        height: u32,
    ) -> Self {
        self.crosshair = Some(Crosshair::new(center, radius, width, height));
        self.axis = Some(Segment::new(pose.axis.start, pose.axis.end));
        self.corners = Some(pose.shape.corners());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    #[test]
    fn test_crosshair_inside_frame() {
        let crosshair = Crosshair::new(Point2::new(50.0, 40.0), 10.0, 100, 80);
        assert_eq!(crosshair.arms[0].end, Point2::new(50.0, 30.0));
        assert_eq!(crosshair.arms[1].end, Point2::new(50.0, 50.0));
        assert_eq!(crosshair.arms[2].end, Point2::new(40.0, 40.0));
        assert_eq!(crosshair.arms[3].end, Point2::new(60.0, 40.0));
    }

    #[test]
    fn test_crosshair_clipped_at_borders() {
        let crosshair = Crosshair::new(Point2::new(5.0, 75.0), 10.0, 100, 80);
        assert_eq!(crosshair.arms[0].end, Point2::new(5.0, 65.0));
        assert_eq!(crosshair.arms[1].end, Point2::new(5.0, 80.0));
        assert_eq!(crosshair.arms[2].end, Point2::new(0.0, 75.0));
        assert_eq!(crosshair.arms[3].end, Point2::new(15.0, 75.0));
    }

    #[test]
    fn test_histogram_bar_colors() {
        let model = AppearanceModel::from_bins(Array1::from(vec![255.0, 0.0, 0.0]));
        let bars = histogram_bars(&model);
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].value, 255.0);
        assert_eq!(bars[0].color, [255, 0, 0]);
        assert_eq!(bars[1].color, [0, 255, 0]);
        assert_eq!(bars[2].color, [0, 0, 255]);
    }
}
