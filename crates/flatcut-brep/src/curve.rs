//! Edge geometry: lines, circular arcs, and pre-sampled curves.

use flatcut_math::{Dir3, Point3, Vec3};
use std::f64::consts::TAU;

/// Distance below which two vertices are treated as the same point when
/// deciding whether a circular edge is closed.
const CLOSED_EDGE_TOLERANCE: f64 = 1e-7;

/// A circle carrying an edge.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleArc {
    /// Center of the circle.
    pub center: Point3,
    /// Radius.
    pub radius: f64,
    /// Normal to the circle plane.
    pub normal: Dir3,
    /// Whether the edge runs counter-clockwise about `normal`.
    pub ccw: bool,
}

/// Geometry of an edge between its two vertices.
#[derive(Debug, Clone, PartialEq)]
pub enum Curve {
    /// Straight segment.
    Line,
    /// Circular arc or full circle (when the vertices coincide).
    Circle(CircleArc),
    /// Any other curve, already sampled from start to end inclusive.
    Polyline(Vec<Point3>),
}

/// An oriented edge: traversal runs from `start` to `end`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// First vertex of the traversal.
    pub start: Point3,
    /// Last vertex of the traversal.
    pub end: Point3,
    /// Edge geometry.
    pub curve: Curve,
}

impl Edge {
    /// Straight edge.
    pub fn line(start: Point3, end: Point3) -> Self {
        Self {
            start,
            end,
            curve: Curve::Line,
        }
    }

    /// Circular edge. `start == end` describes a full circle.
    pub fn arc(start: Point3, end: Point3, center: Point3, normal: Dir3, ccw: bool) -> Self {
        let radius = (start - center).norm();
        Self {
            start,
            end,
            curve: Curve::Circle(CircleArc {
                center,
                radius,
                normal,
                ccw,
            }),
        }
    }

    /// Sampled edge.
    pub fn polyline(points: Vec<Point3>) -> Option<Self> {
        let start = *points.first()?;
        let end = *points.last()?;
        Some(Self {
            start,
            end,
            curve: Curve::Polyline(points),
        })
    }

    /// Whether the edge starts and ends at the same point.
    pub fn is_closed(&self) -> bool {
        (self.end - self.start).norm() <= CLOSED_EDGE_TOLERANCE
    }

    /// The same edge traversed in the opposite direction.
    pub fn reversed(&self) -> Self {
        let curve = match &self.curve {
            Curve::Line => Curve::Line,
            Curve::Circle(c) => Curve::Circle(CircleArc {
                ccw: !c.ccw,
                ..c.clone()
            }),
            Curve::Polyline(pts) => Curve::Polyline(pts.iter().rev().copied().collect()),
        };
        Self {
            start: self.end,
            end: self.start,
            curve,
        }
    }

    /// In-plane frame and signed sweep of a circular edge.
    ///
    /// Returns `(u, v, sweep)` where `u` points from the center to `start`,
    /// `v = normal × u`, and points are `center + r (cos φ u + sin φ v)` for
    /// φ running from 0 to `sweep`.
    pub fn circle_frame(&self) -> Option<(Vec3, Vec3, f64)> {
        let Curve::Circle(c) = &self.curve else {
            return None;
        };
        let radial = self.start - c.center;
        if radial.norm() <= CLOSED_EDGE_TOLERANCE {
            return None;
        }
        let u = radial.normalize();
        let v = c.normal.cross(&u);
        let sweep = if self.is_closed() {
            TAU
        } else {
            let d = self.end - c.center;
            let phi = d.dot(&v).atan2(d.dot(&u)).rem_euclid(TAU);
            if c.ccw {
                phi
            } else {
                phi - TAU
            }
        };
        let sweep = if c.ccw { sweep } else { -sweep.abs() };
        Some((u, v, sweep))
    }

    /// Point at normalized parameter `t` in [0, 1] along the traversal.
    pub fn point_at(&self, t: f64) -> Point3 {
        match &self.curve {
            Curve::Line => self.start + (self.end - self.start) * t,
            Curve::Circle(c) => match self.circle_frame() {
                Some((u, v, sweep)) => {
                    let phi = sweep * t;
                    c.center + c.radius * (phi.cos() * u + phi.sin() * v)
                }
                None => self.start,
            },
            Curve::Polyline(pts) => polyline_point_at(pts, t),
        }
    }

    /// Sample the traversal, `segments_per_turn` pieces per full circle.
    ///
    /// The result starts at `start` and ends at `end` (both included).
    pub fn sample(&self, segments_per_turn: usize) -> Vec<Point3> {
        match &self.curve {
            Curve::Line => vec![self.start, self.end],
            Curve::Circle(c) => match self.circle_frame() {
                Some((u, v, sweep)) => {
                    let per_turn = segments_per_turn.max(4) as f64;
                    let n = ((sweep.abs() / TAU) * per_turn).ceil().max(2.0) as usize;
                    let mut pts: Vec<Point3> = (0..=n)
                        .map(|i| {
                            let phi = sweep * i as f64 / n as f64;
                            c.center + c.radius * (phi.cos() * u + phi.sin() * v)
                        })
                        .collect();
                    // pin the ends to the exact vertices
                    pts[0] = self.start;
                    pts[n] = self.end;
                    pts
                }
                None => vec![self.start, self.end],
            },
            Curve::Polyline(pts) => pts.clone(),
        }
    }

    /// Approximate arc length.
    pub fn length(&self) -> f64 {
        match &self.curve {
            Curve::Line => (self.end - self.start).norm(),
            Curve::Circle(c) => self
                .circle_frame()
                .map(|(_, _, sweep)| sweep.abs() * c.radius)
                .unwrap_or(0.0),
            Curve::Polyline(pts) => pts.windows(2).map(|w| (w[1] - w[0]).norm()).sum(),
        }
    }
}

fn polyline_point_at(pts: &[Point3], t: f64) -> Point3 {
    if pts.len() < 2 {
        return pts.first().copied().unwrap_or_else(Point3::origin);
    }
    let total: f64 = pts.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
    if total <= 0.0 {
        return pts[0];
    }
    let mut remaining = t.clamp(0.0, 1.0) * total;
    for w in pts.windows(2) {
        let len = (w[1] - w[0]).norm();
        if remaining <= len && len > 0.0 {
            return w[0] + (w[1] - w[0]) * (remaining / len);
        }
        remaining -= len;
    }
    pts[pts.len() - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn z() -> Dir3 {
        Dir3::new_normalize(Vec3::z())
    }

    #[test]
    fn test_quarter_arc_ccw() {
        let e = Edge::arc(
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::origin(),
            z(),
            true,
        );
        let (_, _, sweep) = e.circle_frame().unwrap();
        assert_relative_eq!(sweep, PI / 2.0, epsilon = 1e-12);
        let mid = e.point_at(0.5);
        assert_relative_eq!(mid.x, mid.y, epsilon = 1e-12);
        assert!(mid.x > 0.0);
    }

    #[test]
    fn test_quarter_arc_cw_goes_the_long_way() {
        let e = Edge::arc(
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::origin(),
            z(),
            false,
        );
        let (_, _, sweep) = e.circle_frame().unwrap();
        assert_relative_eq!(sweep, -1.5 * PI, epsilon = 1e-12);
        assert!(e.point_at(0.5).x < 0.0);
    }

    #[test]
    fn test_full_circle_sampling() {
        let p = Point3::new(2.0, 0.0, 0.0);
        let e = Edge::arc(p, p, Point3::origin(), z(), true);
        let pts = e.sample(32);
        assert_eq!(pts.len(), 33);
        assert_relative_eq!(e.length(), 2.0 * TAU, epsilon = 1e-12);
        for q in &pts {
            assert_relative_eq!(q.coords.norm(), 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_reversed_arc_keeps_geometry() {
        let e = Edge::arc(
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::origin(),
            z(),
            true,
        );
        let r = e.reversed();
        assert_relative_eq!(e.point_at(0.5), r.point_at(0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_polyline_midpoint() {
        let e = Edge::polyline(vec![
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ])
        .unwrap();
        assert_relative_eq!(e.point_at(0.5), Point3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(e.length(), 2.0);
    }
}
