//! Extraction of connected foreground regions and selection of the best one.

use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::point::Point;
use nalgebra::Point2;
use tracing::debug;

use crate::tracker::moments::Moments;

/// Admissible region areas. Both bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaBounds {
    pub min_area: f64,
    pub max_area: f64,
}

impl AreaBounds {
    pub fn new(min_area: f64, max_area: f64) -> Self {
        Self { min_area, max_area }
    }

    /// Bounds for a processed frame: anything up to the full frame area.
    pub fn for_frame(min_area: u32, width: u32, height: u32) -> Self {
        Self::new(min_area.max(1) as f64, width as f64 * height as f64)
    }

    /// `min_area < area < max_area`.
    #[inline]
    pub fn admits(&self, area: f64) -> bool {
        self.min_area < area && area < self.max_area
    }
}

/// A connected foreground region of a mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Outer boundary, straight runs collapsed to their end points.
    pub boundary: Vec<Point<i32>>,
    pub area: f64,
    pub centroid: Point2<f64>,
}

/// Picks the largest admissible region of a mask.
#[derive(Debug, Clone, Copy)]
pub struct BlobSelector {
    bounds: AreaBounds,
}

impl BlobSelector {
    pub fn new(bounds: AreaBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> AreaBounds {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: AreaBounds) {
        self.bounds = bounds;
    }

    /// Select the region with the strictly largest admissible area. Among equal
    /// areas the first region in raster order wins.
    pub fn select(&self, mask: &GrayImage) -> Option<Region> {
        self.select_from(extract_regions(mask))
    }

    pub fn select_from(&self, regions: Vec<Region>) -> Option<Region> {
        let total = regions.len();
        let mut best: Option<Region> = None;
        let mut admitted = 0usize;

        for region in regions {
            if !self.bounds.admits(region.area) {
                continue;
            }
            admitted += 1;
            if best.as_ref().is_none_or(|b| region.area > b.area) {
                best = Some(region);
            }
        }

        debug!(total, admitted, found = best.is_some(), "blob selection");
        best
    }
}

/// Outer boundaries of all foreground components, in raster discovery order.
///
/// Regions enclosing no area (single pixels, one pixel wide lines) are dropped
/// since no bounds can admit them.
pub fn extract_regions(mask: &GrayImage) -> Vec<Region> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|contour| contour.border_type == BorderType::Outer)
        .filter_map(|contour| {
            let boundary = compress_chain(&contour.points);
            let moments = Moments::of_polygon(&boundary);
            let centroid = moments.centroid()?;
            Some(Region {
                boundary,
                area: moments.area(),
                centroid,
            })
        })
        .collect()
}

/// Keep only the points of a closed chain where its direction changes.
///
/// Horizontal, vertical and diagonal runs are reduced to their end points, so
/// an axis-aligned rectangle collapses to its four corners. The enclosed
/// polygon is unchanged.
pub fn compress_chain(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let mut chain: Vec<Point<i32>> = Vec::with_capacity(points.len());
    for &point in points {
        if chain.last() != Some(&point) {
            chain.push(point);
        }
    }
    while chain.len() > 1 && chain.first() == chain.last() {
        chain.pop();
    }
    if chain.len() <= 2 {
        return chain;
    }

    let n = chain.len();
    let direction = |from: Point<i32>, to: Point<i32>| {
        ((to.x - from.x).signum(), (to.y - from.y).signum())
    };

    let compressed: Vec<Point<i32>> = (0..n)
        .filter(|&i| {
            let prev = chain[(i + n - 1) % n];
            let next = chain[(i + 1) % n];
            direction(prev, chain[i]) != direction(chain[i], next)
        })
        .map(|i| chain[i])
        .collect();

    if compressed.is_empty() {
        chain.truncate(1);
        chain
    } else {
        compressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn mask_with(width: u32, height: u32, on: impl Fn(u32, u32) -> bool) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([if on(x, y) { 255 } else { 0 }]))
    }

    fn block(x0: u32, y0: u32, w: u32, h: u32) -> impl Fn(u32, u32) -> bool {
        move |x, y| (x0..x0 + w).contains(&x) && (y0..y0 + h).contains(&y)
    }

    #[test]
    fn test_rectangle_collapses_to_corners() {
        let mask = mask_with(30, 30, block(10, 5, 10, 10));
        let regions = extract_regions(&mask);
        assert_eq!(regions.len(), 1);

        let region = &regions[0];
        assert_eq!(region.boundary.len(), 4);
        assert!(region.boundary.contains(&Point::new(10, 5)));
        assert!(region.boundary.contains(&Point::new(19, 14)));
    }

    #[test]
    fn test_single_region_exact_centroid() {
        let mask = mask_with(30, 30, block(10, 5, 10, 10));
        let selector = BlobSelector::new(AreaBounds::for_frame(1, 30, 30));
        let region = selector.select(&mask).unwrap();

        // Polygon through pixel centers: 9 x 9.
        assert!((region.area - 81.0).abs() < 1e-9);
        assert!((region.centroid.x - 14.5).abs() < 1e-9);
        assert!((region.centroid.y - 9.5).abs() < 1e-9);
    }

    #[test]
    fn test_largest_region_wins() {
        let small = block(2, 2, 5, 5);
        let large = block(15, 15, 10, 12);
        let mask = mask_with(40, 40, |x, y| small(x, y) || large(x, y));
        let selector = BlobSelector::new(AreaBounds::for_frame(1, 40, 40));

        let region = selector.select(&mask).unwrap();
        assert!((region.area - 99.0).abs() < 1e-9);
        assert!((region.centroid.x - 19.5).abs() < 1e-9);
        assert!((region.centroid.y - 20.5).abs() < 1e-9);
    }

    #[test]
    fn test_equal_areas_pick_first_in_raster_order() {
        let upper = block(20, 2, 6, 6);
        let lower = block(2, 20, 6, 6);
        let mask = mask_with(40, 40, |x, y| upper(x, y) || lower(x, y));
        let selector = BlobSelector::new(AreaBounds::for_frame(1, 40, 40));

        for _ in 0..3 {
            let region = selector.select(&mask).unwrap();
            assert!((region.centroid.x - 22.5).abs() < 1e-9);
            assert!((region.centroid.y - 4.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_area_bounds_are_exclusive() {
        // Region area is 81.
        let mask = mask_with(30, 30, block(10, 5, 10, 10));

        let at_min = BlobSelector::new(AreaBounds::new(81.0, 900.0));
        assert!(at_min.select(&mask).is_none());

        let below_min = BlobSelector::new(AreaBounds::new(80.0, 900.0));
        assert!(below_min.select(&mask).is_some());

        let at_max = BlobSelector::new(AreaBounds::new(1.0, 81.0));
        assert!(at_max.select(&mask).is_none());
    }

    #[test]
    fn test_empty_mask_finds_nothing() {
        let mask = GrayImage::new(16, 16);
        let selector = BlobSelector::new(AreaBounds::for_frame(1, 16, 16));
        assert!(selector.select(&mask).is_none());
    }

    #[test]
    fn test_selection_does_not_mutate_mask() {
        let mask = mask_with(30, 30, block(3, 3, 8, 8));
        let copy = mask.clone();
        let selector = BlobSelector::new(AreaBounds::for_frame(1, 30, 30));
        selector.select(&mask);
        assert_eq!(mask, copy);
    }

    #[test]
    fn test_compress_chain_keeps_turns() {
        let chain = vec![
            Point::new(0, 0),
            Point::new(1, 0),
            Point::new(2, 0),
            Point::new(2, 1),
            Point::new(2, 2),
            Point::new(1, 1),
        ];
        assert_eq!(
            compress_chain(&chain),
            vec![Point::new(0, 0), Point::new(2, 0), Point::new(2, 2)]
        );
    }

    #[test]
    fn test_compress_short_chains_untouched() {
        let chain = vec![Point::new(4, 4), Point::new(4, 4), Point::new(5, 4)];
        assert_eq!(compress_chain(&chain), vec![Point::new(4, 4), Point::new(5, 4)]);
    }
}
