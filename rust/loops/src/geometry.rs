// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar geometry used by the loop search.
//!
//! Signed areas, containment, segment intersection and turn angles, computed
//! with standard computational geometry formulas (no external kernel).

use std::f64::consts::TAU;

use nalgebra::{Point2, Vector2};
use smallvec::SmallVec;

use crate::arena::TopologyArena;
use crate::config::LoopConfig;
use crate::keys::*;

/// 2D cross product (z component of the 3D cross product).
#[inline]
pub fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Returns the unit vector of `v`, or zero for a degenerate vector.
pub fn normalize_or_zero(v: Vector2<f64>) -> Vector2<f64> {
    let len = v.norm();
    if len < 1e-15 {
        Vector2::zeros()
    } else {
        v / len
    }
}

/// Signed polygon area by the shoelace formula.
///
/// Positive for counter-clockwise rings, negative for clockwise rings. The
/// ring is implicitly closed; fewer than 3 points give zero.
pub fn signed_area(points: &[Point2<f64>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let mut twice = 0.0;
    for i in 0..n {
        let p = &points[i];
        let q = &points[(i + 1) % n];
        twice += p.x * q.y - q.x * p.y;
    }
    twice / 2.0
}

/// Distance from `p` to the segment `a`-`b`.
pub fn distance_to_segment(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < 1e-30 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Returns `true` if `p` lies on the segment `a`-`b` within `tolerance`.
pub fn point_on_segment(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>, tolerance: f64) -> bool {
    distance_to_segment(p, a, b) <= tolerance
}

/// Point-in-polygon test by ray casting. Points on the boundary (within
/// `tolerance`) count as inside. Polygons with fewer than 3 points contain
/// nothing.
pub fn point_in_polygon(p: &Point2<f64>, polygon: &[Point2<f64>], tolerance: f64) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    for i in 0..n {
        if point_on_segment(p, &polygon[i], &polygon[(i + 1) % n], tolerance) {
            return true;
        }
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (&polygon[i], &polygon[j]);
        if (pi.y > p.y) != (pj.y > p.y) {
            let x_cross = pj.x + (p.y - pj.y) * (pi.x - pj.x) / (pi.y - pj.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Intersection points of segments `a0`-`a1` and `b0`-`b1`.
///
/// Reports a proper crossing as well as every endpoint of one segment lying on
/// the other (T-junctions and the ends of collinear overlaps). Points closer
/// than `tolerance` to an already reported point are dropped.
pub fn segment_intersections(
    a0: &Point2<f64>,
    a1: &Point2<f64>,
    b0: &Point2<f64>,
    b1: &Point2<f64>,
    tolerance: f64,
) -> SmallVec<[Point2<f64>; 2]> {
    let mut points: SmallVec<[Point2<f64>; 2]> = SmallVec::new();
    let push = |p: Point2<f64>, points: &mut SmallVec<[Point2<f64>; 2]>| {
        if points.iter().all(|q| (q - p).norm() > tolerance) {
            points.push(p);
        }
    };

    for (p, s0, s1) in [(a0, b0, b1), (a1, b0, b1), (b0, a0, a1), (b1, a0, a1)] {
        if point_on_segment(p, s0, s1, tolerance) {
            push(*p, &mut points);
        }
    }

    let r = a1 - a0;
    let s = b1 - b0;
    let denom = cross(&r, &s);
    if denom.abs() > 1e-12 * r.norm() * s.norm() {
        let qp = b0 - a0;
        let t = cross(&qp, &s) / denom;
        let u = cross(&qp, &r) / denom;
        if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
            push(a0 + r * t, &mut points);
        }
    }

    points
}

/// Clockwise turn from `reference` to `direction`, in `(0, 2π]`.
///
/// A direction equal to the reference (within `tolerance`) maps to a full
/// turn, so going straight back along the reference always sorts last.
pub fn clockwise_angle(reference: &Vector2<f64>, direction: &Vector2<f64>, tolerance: f64) -> f64 {
    let ccw = cross(reference, direction).atan2(reference.dot(direction));
    let mut cw = -ccw;
    if cw <= tolerance {
        cw += TAU;
    }
    cw
}

/// Axis-aligned bounds `(min, max)` of a point set.
pub fn bounds(points: &[Point2<f64>]) -> Option<(Point2<f64>, Point2<f64>)> {
    let first = points.first()?;
    let mut min = *first;
    let mut max = *first;
    for p in &points[1..] {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    Some((min, max))
}

impl TopologyArena {
    /// Returns the position of a vertex as a nalgebra Point2.
    pub fn vertex_point(&self, key: VertexKey) -> Option<Point2<f64>> {
        self.vertices.get(key).map(|v| Point2::new(v.x, v.y))
    }

    /// Samples a wall into a polyline from its start vertex to its end vertex.
    pub fn wall_discrete_points(&self, key: WallKey, config: &LoopConfig) -> Option<Vec<Point2<f64>>> {
        let wall = self.walls.get(key)?;
        let from = self.vertex_point(wall.from)?;
        let to = self.vertex_point(wall.to)?;
        Some(wall.curve.discrete_points(&from, &to, config))
    }

    /// Computes the length of a wall along its sampled curve.
    pub fn wall_length(&self, key: WallKey, config: &LoopConfig) -> Option<f64> {
        let points = self.wall_discrete_points(key, config)?;
        Some(points.windows(2).map(|w| (w[1] - w[0]).norm()).sum())
    }
}
