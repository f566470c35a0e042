// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Curve shapes carried by walls and edges.
//!
//! A curve only describes the shape between two endpoints; the endpoints
//! themselves come from the owning wall or edge. Arcs and circles are sampled
//! into polylines for area and containment tests.

use std::f64::consts::TAU;

use nalgebra::{Point2, Vector2};

use crate::config::LoopConfig;
use crate::geometry::normalize_or_zero;

/// Shape of a wall or edge between its two endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Curve {
    /// Straight segment.
    Line,
    /// Circular arc around `center`, swept clockwise or counter-clockwise
    /// from the start point to the end point.
    Arc {
        center: Point2<f64>,
        radius: f64,
        clockwise: bool,
    },
    /// Full circle starting and ending at the same point.
    Circle { center: Point2<f64>, radius: f64 },
}

impl Curve {
    /// Returns `true` for curves whose start and end coincide.
    pub fn is_closed(&self) -> bool {
        matches!(self, Curve::Circle { .. })
    }

    /// Returns the same shape traversed in the opposite direction.
    pub fn reversed(&self) -> Curve {
        match *self {
            Curve::Arc {
                center,
                radius,
                clockwise,
            } => Curve::Arc {
                center,
                radius,
                clockwise: !clockwise,
            },
            other => other,
        }
    }

    /// Returns `true` if both curves describe the same shape within `tolerance`.
    pub fn is_same(&self, other: &Curve, tolerance: f64) -> bool {
        match (self, other) {
            (Curve::Line, Curve::Line) => true,
            (
                Curve::Arc {
                    center: c0,
                    radius: r0,
                    clockwise: cw0,
                },
                Curve::Arc {
                    center: c1,
                    radius: r1,
                    clockwise: cw1,
                },
            ) => cw0 == cw1 && (c0 - c1).norm() <= tolerance && (r0 - r1).abs() <= tolerance,
            (
                Curve::Circle {
                    center: c0,
                    radius: r0,
                },
                Curve::Circle {
                    center: c1,
                    radius: r1,
                },
            ) => (c0 - c1).norm() <= tolerance && (r0 - r1).abs() <= tolerance,
            _ => false,
        }
    }

    /// Signed sweep angle from `from` to `to` (positive is counter-clockwise).
    fn sweep(&self, from: &Point2<f64>, to: &Point2<f64>) -> f64 {
        match *self {
            Curve::Line => 0.0,
            Curve::Arc {
                center, clockwise, ..
            } => {
                let a0 = angle_of(&center, from);
                let a1 = angle_of(&center, to);
                if clockwise {
                    -positive_angle(a0 - a1)
                } else {
                    positive_angle(a1 - a0)
                }
            }
            Curve::Circle { .. } => TAU,
        }
    }

    fn point_at(&self, from: &Point2<f64>, to: &Point2<f64>, t: f64) -> Point2<f64> {
        match *self {
            Curve::Line => from + (to - from) * t,
            Curve::Arc { center, radius, .. } | Curve::Circle { center, radius } => {
                let angle = angle_of(&center, from) + self.sweep(from, to) * t;
                center + Vector2::new(angle.cos(), angle.sin()) * radius
            }
        }
    }

    /// Samples the curve into a polyline that starts at `from` and ends at
    /// `to` (both included; a circle ends back at `from`).
    pub fn discrete_points(
        &self,
        from: &Point2<f64>,
        to: &Point2<f64>,
        config: &LoopConfig,
    ) -> Vec<Point2<f64>> {
        match self {
            Curve::Line => vec![*from, *to],
            Curve::Arc { .. } | Curve::Circle { .. } => {
                let sweep = self.sweep(from, to).abs();
                let segments = ((sweep / config.arc_segment_angle - 1e-9).ceil() as usize)
                    .max(config.min_arc_segments)
                    .max(1);

                let mut points = Vec::with_capacity(segments + 1);
                points.push(*from);
                for i in 1..segments {
                    points.push(self.point_at(from, to, i as f64 / segments as f64));
                }
                points.push(if self.is_closed() { *from } else { *to });
                points
            }
        }
    }

    /// Point halfway along the curve.
    pub fn middle(&self, from: &Point2<f64>, to: &Point2<f64>) -> Point2<f64> {
        self.point_at(from, to, 0.5)
    }

    /// Unit chord direction from `from` to `to`.
    pub fn chord_direction(from: &Point2<f64>, to: &Point2<f64>) -> Vector2<f64> {
        normalize_or_zero(to - from)
    }

    /// Normalized position of `point` along the curve, in `[0, 1]`.
    ///
    /// The point is projected onto the curve: onto the segment for lines,
    /// by angle around the center for arcs and circles.
    pub fn param_of(&self, from: &Point2<f64>, to: &Point2<f64>, point: &Point2<f64>) -> f64 {
        match *self {
            Curve::Line => {
                let d = to - from;
                let len_sq = d.norm_squared();
                if len_sq < 1e-30 {
                    return 0.0;
                }
                ((point - from).dot(&d) / len_sq).clamp(0.0, 1.0)
            }
            Curve::Arc {
                center, clockwise, ..
            } => {
                let sweep = self.sweep(from, to).abs();
                if sweep < 1e-15 {
                    return 0.0;
                }
                let a0 = angle_of(&center, from);
                let ap = angle_of(&center, point);
                let delta = if clockwise {
                    positive_angle(a0 - ap)
                } else {
                    positive_angle(ap - a0)
                };
                // Points just before the start wrap to a full turn; clamp them back
                if delta > sweep && delta - sweep > (TAU - delta) {
                    0.0
                } else {
                    (delta / sweep).min(1.0)
                }
            }
            Curve::Circle { center, .. } => {
                let a0 = angle_of(&center, from);
                let ap = angle_of(&center, point);
                positive_angle(ap - a0) / TAU
            }
        }
    }
}

fn angle_of(center: &Point2<f64>, p: &Point2<f64>) -> f64 {
    (p.y - center.y).atan2(p.x - center.x)
}

/// Wraps an angle into `(0, 2π]`, so a zero difference means a full turn.
fn positive_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped <= 1e-12 {
        TAU
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn half_circle(clockwise: bool) -> Curve {
        Curve::Arc {
            center: Point2::new(0.0, 0.0),
            radius: 1.0,
            clockwise,
        }
    }

    #[test]
    fn line_samples_endpoints_only() {
        let points = Curve::Line.discrete_points(
            &Point2::new(0.0, 0.0),
            &Point2::new(2.0, 0.0),
            &LoopConfig::default(),
        );
        assert_eq!(points.len(), 2);
        assert_relative_eq!(Curve::Line.middle(&points[0], &points[1]).x, 1.0);
    }

    #[test]
    fn arc_samples_stay_on_circle() {
        let from = Point2::new(1.0, 0.0);
        let to = Point2::new(-1.0, 0.0);
        let arc = half_circle(false);
        let points = arc.discrete_points(&from, &to, &LoopConfig::default());

        // 180 degrees at 10 degrees per segment
        assert_eq!(points.len(), 19);
        assert_eq!(points[0], from);
        assert_eq!(*points.last().unwrap(), to);
        for p in &points {
            assert_relative_eq!(p.coords.norm(), 1.0, epsilon = 1e-12);
        }
        // Counter-clockwise from (1,0) passes through the upper half
        assert!(arc.middle(&from, &to).y > 0.9);
        assert!(half_circle(true).middle(&from, &to).y < -0.9);
    }

    #[test]
    fn circle_closes_on_start() {
        let start = Point2::new(2.0, 1.0);
        let circle = Curve::Circle {
            center: Point2::new(1.0, 1.0),
            radius: 1.0,
        };
        let points = circle.discrete_points(&start, &start, &LoopConfig::default());
        assert_eq!(points.len(), 37);
        assert_eq!(points[0], start);
        assert_eq!(*points.last().unwrap(), start);
        assert!(circle.is_closed());
    }

    #[test]
    fn param_projects_onto_curve() {
        let from = Point2::new(0.0, 0.0);
        let to = Point2::new(4.0, 0.0);
        assert_relative_eq!(Curve::Line.param_of(&from, &to, &Point2::new(1.0, 3.0)), 0.25);

        let arc = half_circle(false);
        let p = Point2::new(0.0, 1.0);
        assert_relative_eq!(
            arc.param_of(&Point2::new(1.0, 0.0), &Point2::new(-1.0, 0.0), &p),
            0.5,
            epsilon = 1e-12
        );
    }

    #[test]
    fn reversed_arc_is_the_same_shape_backwards() {
        let arc = half_circle(false);
        assert!(arc.reversed().is_same(&half_circle(true), 1e-9));
        assert!(!arc.is_same(&half_circle(true), 1e-9));
        assert!(Curve::Line.reversed().is_same(&Curve::Line, 1e-9));
    }
}
