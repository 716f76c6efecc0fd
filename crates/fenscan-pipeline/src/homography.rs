//! Planar homography from four point correspondences.
//!
//! Solved as an 8x8 linear system on Hartley-normalized points with
//! `h33 = 1`. The result converts into an `imageproc` [`Projection`] for
//! warping.

use imageproc::geometric_transformations::Projection;
use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

use crate::types::Point;

/// A 3x3 projective transform mapping source points to destination
/// points: `dst ~ H * src`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    h: Matrix3<f64>,
}

impl Homography {
    #[must_use]
    pub const fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[must_use]
    pub const fn matrix(&self) -> &Matrix3<f64> {
        &self.h
    }

    /// Compute the homography taking each `src[i]` to `dst[i]`.
    ///
    /// Returns `None` when the system is singular, e.g. three of the
    /// points are collinear.
    #[must_use]
    pub fn from_correspondences(src: &[Point; 4], dst: &[Point; 4]) -> Option<Self> {
        let (src_n, t_src) = normalize(src);
        let (dst_n, t_dst) = normalize(dst);

        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();
        for k in 0..4 {
            let (x, y) = (src_n[k].x, src_n[k].y);
            let (u, v) = (dst_n[k].x, dst_n[k].y);

            let r0 = 2 * k;
            a[(r0, 0)] = x;
            a[(r0, 1)] = y;
            a[(r0, 2)] = 1.0;
            a[(r0, 6)] = -u * x;
            a[(r0, 7)] = -u * y;
            b[r0] = u;

            let r1 = r0 + 1;
            a[(r1, 3)] = x;
            a[(r1, 4)] = y;
            a[(r1, 5)] = 1.0;
            a[(r1, 6)] = -v * x;
            a[(r1, 7)] = -v * y;
            b[r1] = v;
        }

        let x = a.lu().solve(&b)?;
        let hn = Matrix3::new(x[0], x[1], x[2], x[3], x[4], x[5], x[6], x[7], 1.0);
        let h = t_dst.try_inverse()? * hn * t_src;

        let scale = h[(2, 2)];
        if scale.abs() < 1e-12 || !h.iter().all(|v| v.is_finite()) {
            return None;
        }
        Some(Self::new(h / scale))
    }

    /// Map a point through the transform.
    #[must_use]
    pub fn apply(&self, p: Point) -> Point {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        Point::new(v[0] / v[2], v[1] / v[2])
    }

    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }

    /// Convert to an `imageproc` projection (single precision, row-major).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_projection(&self) -> Option<Projection> {
        let mut rows = [0.0_f32; 9];
        for (i, cell) in rows.iter_mut().enumerate() {
            *cell = self.h[(i / 3, i % 3)] as f32;
        }
        Projection::from_matrix(rows)
    }
}

/// Translate to the centroid and scale so the mean distance is sqrt(2).
fn normalize(points: &[Point; 4]) -> ([Point; 4], Matrix3<f64>) {
    let cx = points.iter().map(|p| p.x).sum::<f64>() / 4.0;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / 4.0;
    let centroid = Point::new(cx, cy);
    let mean_dist = points.iter().map(|p| p.distance(centroid)).sum::<f64>() / 4.0;
    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let out = points.map(|p| Point::new(s * (p.x - cx), s * (p.y - cy)));
    (out, t)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn assert_close(a: Point, b: Point, tol: f64) {
        assert!(
            (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol,
            "expected ({:.4},{:.4}) ~ ({:.4},{:.4})",
            a.x,
            a.y,
            b.x,
            b.y
        );
    }

    fn unit_square(side: f64) -> [Point; 4] {
        [
            Point::new(0.0, 0.0),
            Point::new(side, 0.0),
            Point::new(side, side),
            Point::new(0.0, side),
        ]
    }

    #[test]
    fn identity_for_matching_points() {
        let pts = unit_square(100.0);
        let h = Homography::from_correspondences(&pts, &pts).unwrap();
        assert_close(h.apply(Point::new(37.0, 61.0)), Point::new(37.0, 61.0), 1e-9);
    }

    #[test]
    fn recovers_known_projective_transform() {
        let truth = Homography::new(Matrix3::new(
            0.8, 0.05, 120.0, //
            -0.02, 1.1, 80.0, //
            0.0009, -0.0004, 1.0,
        ));
        let src = unit_square(180.0);
        let dst = src.map(|p| truth.apply(p));
        let recovered = Homography::from_correspondences(&src, &dst).unwrap();
        for p in [Point::new(10.0, 20.0), Point::new(90.0, 90.0), Point::new(170.0, 5.0)] {
            assert_close(recovered.apply(p), truth.apply(p), 1e-6);
        }
    }

    #[test]
    fn corners_map_exactly() {
        let quad = [
            Point::new(112.0, 80.0),
            Point::new(530.0, 95.0),
            Point::new(590.0, 470.0),
            Point::new(60.0, 430.0),
        ];
        let square = unit_square(799.0);
        let h = Homography::from_correspondences(&quad, &square).unwrap();
        for (q, s) in quad.iter().zip(&square) {
            assert_close(h.apply(*q), *s, 1e-6);
        }
    }

    #[test]
    fn inverse_round_trips() {
        let src = unit_square(50.0);
        let dst = [
            Point::new(5.0, 3.0),
            Point::new(70.0, 10.0),
            Point::new(60.0, 55.0),
            Point::new(2.0, 48.0),
        ];
        let h = Homography::from_correspondences(&src, &dst).unwrap();
        let inv = h.inverse().unwrap();
        let p = Point::new(21.0, 33.0);
        assert_close(inv.apply(h.apply(p)), p, 1e-9);
    }

    #[test]
    fn collinear_points_are_rejected() {
        let src = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(30.0, 0.0),
        ];
        assert!(Homography::from_correspondences(&src, &unit_square(10.0)).is_none());
    }

    #[test]
    fn converts_to_projection() {
        let h = Homography::from_correspondences(&unit_square(10.0), &unit_square(20.0)).unwrap();
        assert!(h.to_projection().is_some());
    }
}
