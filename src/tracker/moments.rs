//! Spatial image moments up to second order.

use imageproc::point::Point;
use nalgebra::Point2;
use ndarray::ArrayView2;

/// Raw spatial moments `m_pq = sum(x^p * y^q * w)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub m20: f64,
    pub m11: f64,
    pub m02: f64,
}

/// Second-order moments about the centroid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CentralMoments {
    pub mu20: f64,
    pub mu11: f64,
    pub mu02: f64,
}

impl Moments {
    /// Moments of the area enclosed by a closed polygon, computed with Green's
    /// theorem. The winding direction does not matter. Polygons enclosing no
    /// area (single points, segments) have all moments zero.
    pub fn of_polygon(points: &[Point<i32>]) -> Self {
        let Some(last) = points.last() else {
            return Self::default();
        };

        let (mut a00, mut a10, mut a01) = (0.0, 0.0, 0.0);
        let (mut a20, mut a11, mut a02) = (0.0, 0.0, 0.0);
        let (mut xp, mut yp) = (last.x as f64, last.y as f64);

        for point in points {
            let (x, y) = (point.x as f64, point.y as f64);
            let cross = xp * y - x * yp;

            a00 += cross;
            a10 += cross * (xp + x);
            a01 += cross * (yp + y);
            a20 += cross * (xp * xp + xp * x + x * x);
            a11 += cross * (xp * (2.0 * yp + y) + x * (yp + 2.0 * y));
            a02 += cross * (yp * yp + yp * y + y * y);

            xp = x;
            yp = y;
        }

        if a00.abs() <= f64::EPSILON {
            return Self::default();
        }

        let sign = a00.signum();
        Self {
            m00: sign * a00 / 2.0,
            m10: sign * a10 / 6.0,
            m01: sign * a01 / 6.0,
            m20: sign * a20 / 12.0,
            m11: sign * a11 / 24.0,
            m02: sign * a02 / 12.0,
        }
    }

    /// Moments of a weight map, with `x` the column and `y` the row index of the
    /// view.
    pub fn of_raster(weights: ArrayView2<'_, u8>) -> Self {
        let mut moments = Self::default();
        for ((row, col), &weight) in weights.indexed_iter() {
            if weight == 0 {
                continue;
            }
            let (x, y, w) = (col as f64, row as f64, weight as f64);
            moments.m00 += w;
            moments.m10 += x * w;
            moments.m01 += y * w;
            moments.m20 += x * x * w;
            moments.m11 += x * y * w;
            moments.m02 += y * y * w;
        }
        moments
    }

    /// Zeroth-order moment: area for polygons, total weight for rasters.
    #[inline]
    pub fn area(&self) -> f64 {
        self.m00
    }

    /// Center of mass, absent when the moments enclose no mass.
    pub fn centroid(&self) -> Option<Point2<f64>> {
        if self.m00.abs() < f64::EPSILON {
            return None;
        }
        Some(Point2::new(self.m10 / self.m00, self.m01 / self.m00))
    }

    pub fn central(&self) -> CentralMoments {
        let Some(c) = self.centroid() else {
            return CentralMoments::default();
        };
        CentralMoments {
            mu20: self.m20 - c.x * self.m10,
            mu11: self.m11 - c.x * self.m01,
            mu02: self.m02 - c.y * self.m01,
        }
    }
}
