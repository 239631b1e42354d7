//! Mode seeking over a likelihood map: mean-shift and CamShift.

use nalgebra::Point2;
use ndarray::{ArrayView2, s};

use crate::tracker::moments::Moments;
use crate::tracker::rect::{Rect, RotatedRect};

/// Pixels added on every side of the converged mean-shift window before the
/// CamShift size estimate.
pub const CAMSHIFT_TOLERANCE: i32 = 10;

/// Stopping rule of the mean-shift iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermCriteria {
    pub max_iterations: u32,
    /// The iteration stops once the window moves by less than this distance.
    pub epsilon: f64,
}

impl Default for TermCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            epsilon: 1.0,
        }
    }
}

/// Result of one CamShift step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CamShift {
    /// Oriented extent of the likelihood mass. Zero-sized when the window
    /// holds no likelihood at all.
    pub shape: RotatedRect,
    /// Search window for the next frame.
    pub window: Rect,
    pub iterations: u32,
}

/// Moments of the likelihood inside `window` of `likelihood` (indexed `[row, col]`).
fn window_moments(likelihood: &ArrayView2<'_, u8>, window: Rect) -> Moments {
    let [x1, y1, x2, y2] = window.to_tlbr();
    Moments::of_raster(likelihood.slice(s![y1 as usize..y2 as usize, x1 as usize..x2 as usize]))
}

/// Shift `window` towards the local mode of the likelihood.
///
/// Returns the converged window and the number of iterations run. An empty or
/// off-frame window restarts from the frame center.
pub fn mean_shift(
    likelihood: ArrayView2<'_, u8>,
    window: Rect,
    criteria: TermCriteria,
) -> (Rect, u32) {
    let (rows, cols) = likelihood.dim();
    let (cols, rows) = (cols as i32, rows as i32);
    let min_shift = (criteria.epsilon.max(0.0).powi(2)).round_ties_even() as i32;
    let max_iterations = criteria.max_iterations.max(1);

    let mut current = window;
    let mut iteration = 0;
    while iteration < max_iterations {
        current = current.intersect(&Rect::new(0, 0, cols, rows));
        if current == Rect::default() {
            current.x = cols / 2;
            current.y = rows / 2;
        }
        current.width = current.width.max(1);
        current.height = current.height.max(1);

        let moments = window_moments(&likelihood, current);
        if moments.m00.abs() < f64::EPSILON {
            break;
        }

        let dx = (moments.m10 / moments.m00 - current.width as f64 * 0.5).round_ties_even() as i32;
        let dy = (moments.m01 / moments.m00 - current.height as f64 * 0.5).round_ties_even() as i32;
        let nx = (current.x + dx).max(0).min(cols - current.width);
        let ny = (current.y + dy).max(0).min(rows - current.height);
        let (dx, dy) = (nx - current.x, ny - current.y);
        current.x = nx;
        current.y = ny;

        iteration += 1;
        if dx * dx + dy * dy < min_shift {
            break;
        }
    }

    (current, iteration)
}

/// Mean-shift followed by an orientation and size estimate from the second
/// moments of the likelihood around the converged window.
pub fn cam_shift(likelihood: ArrayView2<'_, u8>, window: Rect, criteria: TermCriteria) -> CamShift {
    let (rows, cols) = likelihood.dim();
    let (cols, rows) = (cols as i32, rows as i32);
    let (converged, iterations) = mean_shift(likelihood, window, criteria);

    let mut window = converged;
    window.x = (window.x - CAMSHIFT_TOLERANCE).max(0);
    window.y = (window.y - CAMSHIFT_TOLERANCE).max(0);
    window.width = (window.width + 2 * CAMSHIFT_TOLERANCE).min(cols - window.x);
    window.height = (window.height + 2 * CAMSHIFT_TOLERANCE).min(rows - window.y);

    let moments = window_moments(&likelihood, window);
    if moments.m00.abs() < f64::EPSILON {
        return CamShift {
            shape: RotatedRect::new(Point2::origin(), 0.0, 0.0, 0.0),
            window,
            iterations,
        };
    }

    let inv_m00 = 1.0 / moments.m00;
    let central = moments.central();
    let xc = (moments.m10 * inv_m00 + window.x as f64).round_ties_even() as i32;
    let yc = (moments.m01 * inv_m00 + window.y as f64).round_ties_even() as i32;

    let a = central.mu20 * inv_m00;
    let b = central.mu11 * inv_m00;
    let c = central.mu02 * inv_m00;
    let square = (4.0 * b * b + (a - c) * (a - c)).sqrt();
    let mut theta = (2.0 * b).atan2(a - c + square);

    let (mut sn, mut cs) = theta.sin_cos();
    let rotate_a =
        (cs * cs * central.mu20 + 2.0 * cs * sn * central.mu11 + sn * sn * central.mu02).max(0.0);
    let rotate_c =
        (sn * sn * central.mu20 - 2.0 * cs * sn * central.mu11 + cs * cs * central.mu02).max(0.0);
    let mut length = (rotate_a * inv_m00).sqrt() * 4.0;
    let mut width = (rotate_c * inv_m00).sqrt() * 4.0;

    if length < width {
        std::mem::swap(&mut length, &mut width);
        std::mem::swap(&mut cs, &mut sn);
        theta = std::f64::consts::FRAC_PI_2 - theta;
    }

    let round = |v: f64| v.abs().round_ties_even() as i32;
    let extent_x = round(length * cs).max(round(width * sn)) + 2;
    let extent_y = round(length * sn).max(round(width * cs)) + 2;

    window.width = extent_x.min((cols - xc) * 2);
    window.height = extent_y.min((rows - yc) * 2);
    window.x = (xc - window.width / 2).max(0);
    window.y = (yc - window.height / 2).max(0);
    window.width = window.width.min(cols - window.x);
    window.height = window.height.min(rows - window.y);

    let center = Point2::new(
        window.x as f64 + window.width as f64 * 0.5,
        window.y as f64 + window.height as f64 * 0.5,
    );
    CamShift {
        shape: RotatedRect::new(center, length, width, theta),
        window,
        iterations,
    }
}

/// Default search window around `window`'s center for a frame of
/// `cols` x `rows`: half-extent `(min(rows, cols) + 5) / 6`, clipped to the
/// frame.
pub fn reinflate(window: Rect, cols: u32, rows: u32) -> Rect {
    let half_extent = ((rows.min(cols) + 5) / 6) as i32;
    let (cx, cy) = window.center();
    Rect::from_tlbr(
        cx - half_extent,
        cy - half_extent,
        cx + half_extent,
        cy + half_extent,
    )
    .clip_to(cols, rows)
}
