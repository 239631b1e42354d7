//! Orientation and size of a region from its rotated bounding shape.
//!
//! Angles are in radians in image coordinates (x right, y down), measured from
//! the x axis towards the y axis. An axis has no direction, so orientations are
//! reported in `[-pi/2, pi/2)`.

use std::f64::consts::{FRAC_PI_2, PI};

use imageproc::geometry::convex_hull;
use imageproc::point::Point;
use nalgebra::{Matrix2, Point2, Vector2};
use serde::Deserialize;

use crate::tracker::moments::Moments;
use crate::tracker::rect::RotatedRect;

/// How the rotated bounding shape of a region is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PoseMethod {
    /// Minimum-area enclosing rectangle of the boundary.
    #[default]
    MinAreaRect,
    /// Rectangle bounding the ellipse with the same second moments as the
    /// enclosed area.
    MomentEllipse,
}

/// Segment through the midpoints of the two shortest edges of a rotated
/// rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrincipalAxis {
    pub start: Point2<f64>,
    pub end: Point2<f64>,
}

impl PrincipalAxis {
    pub fn of_rect(rect: &RotatedRect) -> Self {
        let corners = rect.corners();
        let edges = rect.edge_lengths();

        let mut shortest_index = 0;
        let mut shortest = f64::MAX;
        for (index, &length) in edges.iter().enumerate() {
            if length < shortest {
                shortest = length;
                shortest_index = index;
            }
        }

        let k = shortest_index;
        Self {
            start: nalgebra::center(&corners[k], &corners[(k + 1) % 4]),
            end: nalgebra::center(&corners[(k + 2) % 4], &corners[(k + 3) % 4]),
        }
    }

    #[inline]
    pub fn length(&self) -> f64 {
        nalgebra::distance(&self.start, &self.end)
    }

    pub fn orientation(&self) -> f64 {
        let direction = self.end - self.start;
        normalize_axis_angle(direction.y.atan2(direction.x))
    }
}

/// Pose of the tracked object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub shape: RotatedRect,
    pub axis: PrincipalAxis,
    /// Direction of the principal axis.
    pub orientation: f64,
    /// Half the principal axis length.
    pub size: f64,
}

impl Pose {
    pub fn from_shape(shape: RotatedRect) -> Self {
        let axis = PrincipalAxis::of_rect(&shape);
        Self {
            shape,
            axis,
            orientation: axis.orientation(),
            size: axis.length() / 2.0,
        }
    }
}

/// Estimates position, orientation and size of a region from its boundary.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoseEstimator {
    method: PoseMethod,
}

impl PoseEstimator {
    /// Boundaries need more than this many points to define a pose.
    pub const MIN_BOUNDARY_POINTS: usize = 4;

    /// Create an estimator fitting shapes with `method`.
    pub fn new(method: PoseMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> PoseMethod {
        self.method
    }

    /// Pose of a region boundary.
    ///
    /// # Arguments
    /// * `boundary` - Outer boundary points of the region, in order
    ///
    /// # Returns
    /// The fitted shape with its principal axis, or `None` when the boundary
    /// has four points or fewer.
    pub fn estimate(&self, boundary: &[Point<i32>]) -> Option<Pose> {
        if boundary.len() <= Self::MIN_BOUNDARY_POINTS {
            return None;
        }
        let shape = match self.method {
            PoseMethod::MinAreaRect => min_area_rect(boundary)?,
            PoseMethod::MomentEllipse => moment_ellipse(boundary)?,
        };
        Some(Pose::from_shape(shape))
    }
}

/// Map an undirected axis angle into `[-pi/2, pi/2)`.
pub fn normalize_axis_angle(angle: f64) -> f64 {
    let wrapped = (angle + FRAC_PI_2).rem_euclid(PI) - FRAC_PI_2;
    if wrapped >= FRAC_PI_2 { wrapped - PI } else { wrapped }
}

/// Minimum-area rectangle enclosing a point set, by rotating calipers over
/// the convex hull. The rectangle's width runs along the hull edge it rests on.
pub fn min_area_rect(points: &[Point<i32>]) -> Option<RotatedRect> {
    let hull: Vec<Point2<f64>> = convex_hull(points)
        .into_iter()
        .map(|p| Point2::new(p.x as f64, p.y as f64))
        .collect();

    let first = *hull.first()?;
    let n = hull.len();
    let mut best: Option<(f64, RotatedRect)> = None;

    for i in 0..n {
        let edge = hull[(i + 1) % n] - hull[i];
        let length = edge.norm();
        if length <= f64::EPSILON {
            continue;
        }
        let u = edge / length;
        let v = Vector2::new(-u.y, u.x);

        let (mut min_u, mut max_u) = (f64::MAX, f64::MIN);
        let (mut min_v, mut max_v) = (f64::MAX, f64::MIN);
        for p in &hull {
            let (pu, pv) = (p.coords.dot(&u), p.coords.dot(&v));
            min_u = min_u.min(pu);
            max_u = max_u.max(pu);
            min_v = min_v.min(pv);
            max_v = max_v.max(pv);
        }

        let area = (max_u - min_u) * (max_v - min_v);
        if best.as_ref().is_none_or(|(best_area, _)| area < *best_area) {
            let center = u * ((min_u + max_u) / 2.0) + v * ((min_v + max_v) / 2.0);
            let rect = RotatedRect::new(
                Point2::from(center),
                max_u - min_u,
                max_v - min_v,
                u.y.atan2(u.x),
            );
            best = Some((area, rect));
        }
    }

    Some(match best {
        Some((_, rect)) => rect,
        None => RotatedRect::new(first, 0.0, 0.0, 0.0),
    })
}

/// Rectangle bounding the ellipse whose second moments match the area the
/// boundary encloses. A uniform ellipse with semi-axis `a` has variance
/// `a^2 / 4` along that axis, so the full axis is `4 * sqrt(variance)`.
pub fn moment_ellipse(points: &[Point<i32>]) -> Option<RotatedRect> {
    let moments = Moments::of_polygon(points);
    let centroid = moments.centroid()?;
    let central = moments.central();

    let covariance = Matrix2::new(
        central.mu20 / moments.m00,
        central.mu11 / moments.m00,
        central.mu11 / moments.m00,
        central.mu02 / moments.m00,
    );
    let eigen = covariance.symmetric_eigen();
    let (major, minor) = if eigen.eigenvalues[0] >= eigen.eigenvalues[1] {
        (0, 1)
    } else {
        (1, 0)
    };

    let direction = eigen.eigenvectors.column(major);
    Some(RotatedRect::new(
        centroid,
        4.0 * eigen.eigenvalues[major].max(0.0).sqrt(),
        4.0 * eigen.eigenvalues[minor].max(0.0).sqrt(),
        direction[1].atan2(direction[0]),
    ))
}
