//! Closed-polygon geometry: area, perimeter, convexity, and
//! Ramer-Douglas-Peucker approximation of closed curves.
//!
//! Implemented directly on [`Point`] slices to avoid pulling in the
//! `geo` dependency tree for four small routines.

use crate::types::Point;

/// Absolute area of a closed polygon (shoelace formula).
///
/// Returns 0.0 for fewer than 3 vertices.
#[must_use]
pub fn area(points: &[Point]) -> f64 {
    signed_area(points).abs()
}

/// Signed shoelace area. Positive when the vertices run clockwise in
/// image coordinates (y pointing down).
#[must_use]
pub fn signed_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x.mul_add(b.y, -(b.x * a.y)))
        .sum();
    twice / 2.0
}

/// Perimeter of the closed polygon, including the closing edge.
#[must_use]
pub fn perimeter(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.distance(*b))
        .sum()
}

/// Whether the closed polygon is strictly convex: every turn has the same
/// orientation and none is collinear within `tolerance`.
#[must_use]
pub fn is_strictly_convex(points: &[Point], tolerance: f64) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0_f64;
    for i in 0..n {
        let cross = turn(points[i], points[(i + 1) % n], points[(i + 2) % n]);
        if cross.abs() <= tolerance {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

/// Approximate a closed curve with a polygon whose edges stay within
/// `epsilon` of the curve.
///
/// The ring is split at two far-apart points (the point farthest from the
/// first, then the point farthest from that), each arc is simplified with
/// Ramer-Douglas-Peucker, and finally vertices lying within `epsilon` of
/// the chord between their neighbors are dropped so the seam points do
/// not survive as spurious vertices.
///
/// Inputs with fewer than 3 points are returned unchanged.
#[must_use = "returns the approximated polygon"]
pub fn approximate_closed(points: &[Point], epsilon: f64) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let k = farthest_from(points, points[0]);
    let j = farthest_from(points, points[k]);
    if j == k {
        return vec![points[k]];
    }

    let arc = |from: usize, to: usize| -> Vec<Point> {
        let len = (to + n - from) % n;
        (0..=len).map(|step| points[(from + step) % n]).collect()
    };

    let mut polygon = simplify_open(&arc(k, j), epsilon);
    let mut back = simplify_open(&arc(j, k), epsilon);
    // Both arcs include the split points; keep each once.
    polygon.pop();
    back.pop();
    polygon.extend(back);

    drop_flat_vertices(&mut polygon, epsilon);
    polygon
}

/// Ramer-Douglas-Peucker on an open polyline. Endpoints are always kept.
fn simplify_open(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;
    rdp(points, 0, points.len() - 1, tolerance, &mut kept);

    points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

fn rdp(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let (max_idx, max_dist) = ((start + 1)..end)
        .map(|i| (i, perpendicular_distance(points[i], points[start], points[end])))
        .fold((start, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp(points, start, max_idx, tolerance, kept);
        rdp(points, max_idx, end, tolerance, kept);
    }
}

/// Remove vertices within `tolerance` of the segment joining their
/// neighbors until none remain or the polygon is a triangle.
fn drop_flat_vertices(polygon: &mut Vec<Point>, tolerance: f64) {
    loop {
        let n = polygon.len();
        if n <= 3 {
            return;
        }
        let flattest = (0..n)
            .map(|i| {
                let prev = polygon[(i + n - 1) % n];
                let next = polygon[(i + 1) % n];
                (i, perpendicular_distance(polygon[i], prev, next))
            })
            .filter(|&(_, d)| d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1));
        match flattest {
            Some((i, _)) => {
                polygon.remove(i);
            }
            None => return,
        }
    }
}

fn farthest_from(points: &[Point], origin: Point) -> usize {
    points
        .iter()
        .enumerate()
        .fold((0, -1.0), |best, (i, p)| {
            let d = origin.distance_squared(*p);
            if d > best.1 { (i, d) } else { best }
        })
        .0
}

/// Z component of `(b - a) x (c - b)`.
fn turn(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x).mul_add(c.y - b.y, -((b.y - a.y) * (c.x - b.x)))
}

/// Perpendicular distance from `p` to the line through `a` and `b`.
/// When `a` and `b` coincide, the distance from `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);
    if length_sq == 0.0 {
        return p.distance(a);
    }
    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}
