//! Boundary segments: straight lines and circular arcs.

use crate::bbox::Aabb2;
use flatcut_math::{Point2, Rigid2, Vec2};
use std::f64::consts::{FRAC_PI_2, TAU};

/// Relative slack when deciding that an arc sweeps a full turn.
const FULL_TURN_SLACK: f64 = 1e-9;

/// One piece of a loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    /// Straight segment.
    Line {
        /// First point.
        start: Point2,
        /// Last point.
        end: Point2,
    },
    /// Circular arc. Points are `center + radius (cos φ, sin φ)` for φ from
    /// `start_angle` to `start_angle + sweep`; a positive sweep runs
    /// counter-clockwise. `|sweep| = 2π` is a full circle.
    Arc {
        /// Circle center.
        center: Point2,
        /// Radius.
        radius: f64,
        /// Angle of the first point, radians.
        start_angle: f64,
        /// Signed angular extent, radians.
        sweep: f64,
    },
}

impl Segment {
    /// Straight segment.
    pub fn line(start: Point2, end: Point2) -> Self {
        Segment::Line { start, end }
    }

    /// Arc by center, radius, start angle, and signed sweep.
    pub fn arc(center: Point2, radius: f64, start_angle: f64, sweep: f64) -> Self {
        Segment::Arc {
            center,
            radius,
            start_angle,
            sweep,
        }
    }

    /// Full counter-clockwise circle starting at angle 0.
    pub fn circle(center: Point2, radius: f64) -> Self {
        Self::arc(center, radius, 0.0, TAU)
    }

    /// Arc from `start` to `end` around `center`, running counter-clockwise
    /// when `ccw`. Coincident endpoints give a full circle.
    pub fn arc_through(start: Point2, end: Point2, center: Point2, ccw: bool) -> Self {
        let radius = (start - center).norm();
        let a0 = (start.y - center.y).atan2(start.x - center.x);
        let a1 = (end.y - center.y).atan2(end.x - center.x);
        let sweep = if (end - start).norm() <= radius * FULL_TURN_SLACK {
            if ccw {
                TAU
            } else {
                -TAU
            }
        } else if ccw {
            (a1 - a0).rem_euclid(TAU)
        } else {
            -(a0 - a1).rem_euclid(TAU)
        };
        Self::arc(center, radius, a0, sweep)
    }

    /// Segment from a DXF-style bulge (`tan(sweep / 4)`, positive is
    /// counter-clockwise). A zero bulge is a straight line.
    pub fn from_bulge(start: Point2, end: Point2, bulge: f64) -> Self {
        let chord = end - start;
        let len = chord.norm();
        if bulge.abs() < 1e-12 || len <= f64::EPSILON {
            return Self::line(start, end);
        }
        let sweep = 4.0 * bulge.atan();
        let radius = len / (2.0 * (sweep / 2.0).sin().abs());
        // center sits on the chord's perpendicular bisector
        let mid = start + chord * 0.5;
        let normal = Vec2::new(-chord.y, chord.x) / len;
        let sagitta_offset = (radius * radius - len * len / 4.0).max(0.0).sqrt();
        let side = if (bulge.abs() < 1.0) == (bulge > 0.0) {
            1.0
        } else {
            -1.0
        };
        let center = mid + normal * (sagitta_offset * side);
        let start_angle = (start.y - center.y).atan2(start.x - center.x);
        Self::arc(center, radius, start_angle, sweep)
    }

    /// First point.
    pub fn start(&self) -> Point2 {
        match *self {
            Segment::Line { start, .. } => start,
            Segment::Arc {
                center,
                radius,
                start_angle,
                ..
            } => polar(center, radius, start_angle),
        }
    }

    /// Last point.
    pub fn end(&self) -> Point2 {
        match *self {
            Segment::Line { end, .. } => end,
            Segment::Arc {
                center,
                radius,
                start_angle,
                sweep,
            } => polar(center, radius, start_angle + sweep),
        }
    }

    /// Point at normalized parameter `t` in [0, 1].
    pub fn point_at(&self, t: f64) -> Point2 {
        match *self {
            Segment::Line { start, end } => start + (end - start) * t,
            Segment::Arc {
                center,
                radius,
                start_angle,
                sweep,
            } => polar(center, radius, start_angle + sweep * t),
        }
    }

    /// Whether this is an arc sweeping a whole turn.
    pub fn is_full_circle(&self) -> bool {
        matches!(*self, Segment::Arc { sweep, .. } if sweep.abs() >= TAU * (1.0 - FULL_TURN_SLACK))
    }

    /// Whether this is an arc.
    pub fn is_arc(&self) -> bool {
        matches!(self, Segment::Arc { .. })
    }

    /// DXF bulge of the segment (0 for lines).
    pub fn bulge(&self) -> f64 {
        match *self {
            Segment::Line { .. } => 0.0,
            Segment::Arc { sweep, .. } => (sweep / 4.0).tan(),
        }
    }

    /// Length.
    pub fn length(&self) -> f64 {
        match *self {
            Segment::Line { start, end } => (end - start).norm(),
            Segment::Arc { radius, sweep, .. } => radius * sweep.abs(),
        }
    }

    /// The same segment traversed backwards.
    pub fn reversed(&self) -> Self {
        match *self {
            Segment::Line { start, end } => Self::line(end, start),
            Segment::Arc {
                center,
                radius,
                start_angle,
                sweep,
            } => Self::arc(center, radius, start_angle + sweep, -sweep),
        }
    }

    /// Apply a rigid motion.
    pub fn transformed(&self, t: &Rigid2) -> Self {
        match *self {
            Segment::Line { start, end } => Self::line(t.apply_point(&start), t.apply_point(&end)),
            Segment::Arc {
                center,
                radius,
                start_angle,
                sweep,
            } => Self::arc(t.apply_point(&center), radius, t.apply_angle(start_angle), sweep),
        }
    }

    /// Uniform scale about the origin.
    pub fn scaled(&self, factor: f64) -> Self {
        match *self {
            Segment::Line { start, end } => {
                Self::line(Point2::from(start.coords * factor), Point2::from(end.coords * factor))
            }
            Segment::Arc {
                center,
                radius,
                start_angle,
                sweep,
            } => Self::arc(
                Point2::from(center.coords * factor),
                radius * factor.abs(),
                start_angle,
                sweep,
            ),
        }
    }

    /// Exact bounding box, arc extremes included.
    pub fn bbox(&self) -> Aabb2 {
        let mut bb = Aabb2::empty();
        bb.include(&self.start());
        bb.include(&self.end());
        if let Segment::Arc {
            center,
            radius,
            start_angle,
            sweep,
        } = *self
        {
            for k in 0..4 {
                let cardinal = FRAC_PI_2 * k as f64;
                if angle_within(cardinal, start_angle, sweep) {
                    bb.include(&polar(center, radius, cardinal));
                }
            }
        }
        bb
    }

    /// Twice the contribution of this segment to the enclosed signed area
    /// of its loop (Green's theorem, exact for arcs).
    pub fn area_term(&self) -> f64 {
        match *self {
            Segment::Line { start, end } => start.x * end.y - end.x * start.y,
            Segment::Arc {
                center,
                radius,
                start_angle,
                sweep,
            } => {
                let (a, b) = (start_angle, start_angle + sweep);
                radius * center.x * (b.sin() - a.sin()) - radius * center.y * (b.cos() - a.cos())
                    + radius * radius * sweep
            }
        }
    }

    /// Points along the segment, `per_turn` pieces per full circle (at least
    /// `min_pieces` per arc). Starts at `start()`, ends at `end()`.
    pub fn sample(&self, per_turn: usize, min_pieces: usize) -> Vec<Point2> {
        match *self {
            Segment::Line { start, end } => vec![start, end],
            Segment::Arc { sweep, .. } => {
                let n = ((sweep.abs() / TAU) * per_turn as f64)
                    .ceil()
                    .max(min_pieces.max(1) as f64) as usize;
                (0..=n).map(|i| self.point_at(i as f64 / n as f64)).collect()
            }
        }
    }
}

fn polar(center: Point2, radius: f64, angle: f64) -> Point2 {
    Point2::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
}

/// Whether `angle` is passed by an arc starting at `start` with signed
/// `sweep`.
fn angle_within(angle: f64, start: f64, sweep: f64) -> bool {
    if sweep.abs() >= TAU {
        return true;
    }
    let offset = if sweep >= 0.0 {
        (angle - start).rem_euclid(TAU)
    } else {
        (start - angle).rem_euclid(TAU)
    };
    offset <= sweep.abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_arc_endpoints_and_length() {
        let arc = Segment::arc(Point2::new(1.0, 1.0), 2.0, 0.0, FRAC_PI_2);
        assert_relative_eq!(arc.start(), Point2::new(3.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(arc.end(), Point2::new(1.0, 3.0), epsilon = 1e-12);
        assert_relative_eq!(arc.length(), PI);
    }

    #[test]
    fn test_arc_through_direction() {
        let s = Point2::new(1.0, 0.0);
        let e = Point2::new(0.0, 1.0);
        let ccw = Segment::arc_through(s, e, Point2::origin(), true);
        let cw = Segment::arc_through(s, e, Point2::origin(), false);
        let Segment::Arc { sweep: a, .. } = ccw else { panic!() };
        let Segment::Arc { sweep: b, .. } = cw else { panic!() };
        assert_relative_eq!(a, FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(b, -1.5 * PI, epsilon = 1e-12);
        assert!(Segment::arc_through(s, s, Point2::origin(), false).is_full_circle());
    }

    #[test]
    fn test_bulge_round_trip() {
        let s = Point2::new(0.0, 0.0);
        let e = Point2::new(2.0, 0.0);
        // half circle bulging below the chord (counter-clockwise from s to e)
        let seg = Segment::from_bulge(s, e, 1.0);
        assert_relative_eq!(seg.bulge(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(seg.start(), s, epsilon = 1e-12);
        assert_relative_eq!(seg.end(), e, epsilon = 1e-12);
        assert!(seg.point_at(0.5).y < -0.99);

        // large clockwise arc
        let big = Segment::from_bulge(s, e, -2.0);
        assert_relative_eq!(big.end(), e, epsilon = 1e-12);
        assert_relative_eq!(big.bulge(), -2.0, epsilon = 1e-12);
        assert!(big.point_at(0.5).y > 1.0);
    }

    #[test]
    fn test_exact_arc_bbox() {
        let quarter = Segment::arc(Point2::origin(), 1.0, PI / 4.0, FRAC_PI_2);
        let bb = quarter.bbox();
        assert_relative_eq!(bb.max.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(bb.min.y, 0.5_f64.sqrt(), epsilon = 1e-12);

        let circle = Segment::circle(Point2::new(5.0, 5.0), 2.0);
        let bb = circle.bbox();
        assert_relative_eq!(bb.width(), 4.0, epsilon = 1e-12);
        assert_relative_eq!(bb.height(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_circle_area_term() {
        let circle = Segment::circle(Point2::new(3.0, -2.0), 2.0);
        assert_relative_eq!(circle.area_term() / 2.0, 4.0 * PI, epsilon = 1e-12);
        assert_relative_eq!(circle.reversed().area_term() / 2.0, -4.0 * PI, epsilon = 1e-12);
    }

    #[test]
    fn test_transform_keeps_sweep() {
        let arc = Segment::arc(Point2::origin(), 1.0, 0.0, PI);
        let t = Rigid2::new(FRAC_PI_2, Vec2::new(1.0, 0.0));
        let moved = arc.transformed(&t);
        assert_relative_eq!(moved.start(), Point2::new(1.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(moved.end(), Point2::new(1.0, -1.0), epsilon = 1e-12);
        assert_relative_eq!(moved.length(), arc.length());
    }
}
