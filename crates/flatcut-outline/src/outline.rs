//! Closed loops and the outer-boundary-plus-holes outline of a part.

use crate::bbox::Aabb2;
use crate::error::{OutlineError, Result};
use crate::segment::Segment;
use flatcut_math::{Point2, Rigid2, Tolerance};
use tracing::debug;

/// Pieces per full turn when arcs are flattened for containment and
/// self-intersection checks.
const CHECK_SEGMENTS_PER_TURN: usize = 64;

/// A closed sequence of segments, each ending where the next starts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Loop {
    /// Segments in traversal order.
    pub segments: Vec<Segment>,
}

impl Loop {
    /// Create a loop from segments.
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Closed polygon through `points` (no repeated closing point).
    pub fn polygon(points: &[Point2]) -> Self {
        let n = points.len();
        Self::new(
            (0..n)
                .map(|i| Segment::line(points[i], points[(i + 1) % n]))
                .collect(),
        )
    }

    /// Whether the loop has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Largest distance between one segment's end and the next one's start,
    /// including the wrap from last to first.
    pub fn max_gap(&self) -> f64 {
        let n = self.segments.len();
        (0..n)
            .map(|i| (self.segments[(i + 1) % n].start() - self.segments[i].end()).norm())
            .fold(0.0, f64::max)
    }

    /// Signed enclosed area; positive when counter-clockwise.
    pub fn signed_area(&self) -> f64 {
        self.segments.iter().map(Segment::area_term).sum::<f64>() / 2.0
    }

    /// Whether the loop runs counter-clockwise.
    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Total length.
    pub fn perimeter(&self) -> f64 {
        self.segments.iter().map(Segment::length).sum()
    }

    /// The loop traversed backwards.
    pub fn reversed(&self) -> Self {
        Self::new(self.segments.iter().rev().map(Segment::reversed).collect())
    }

    /// Single full-circle arc.
    pub fn as_circle(&self) -> Option<(Point2, f64)> {
        match self.segments.as_slice() {
            [seg @ Segment::Arc { center, radius, .. }] if seg.is_full_circle() => {
                Some((*center, *radius))
            }
            _ => None,
        }
    }

    /// Exact bounding box.
    pub fn bbox(&self) -> Aabb2 {
        self.segments
            .iter()
            .fold(Aabb2::empty(), |bb, s| bb.union(&s.bbox()))
    }

    /// Flattened polygon, `per_turn` pieces per full circle, without the
    /// closing point.
    pub fn sample(&self, per_turn: usize) -> Vec<Point2> {
        let mut pts = Vec::new();
        for seg in &self.segments {
            let sampled = seg.sample(per_turn, 1);
            pts.extend_from_slice(&sampled[..sampled.len() - 1]);
        }
        pts
    }

    /// Apply a rigid motion.
    pub fn transformed(&self, t: &Rigid2) -> Self {
        Self::new(self.segments.iter().map(|s| s.transformed(t)).collect())
    }

    /// Uniform scale about the origin.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.segments.iter().map(|s| s.scaled(factor)).collect())
    }

    /// Number of arc segments.
    pub fn arc_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_arc()).count()
    }

    /// Whether the flattened loop crosses itself by more than `tol`.
    pub fn self_intersects(&self, tol: f64) -> bool {
        polygon_self_intersects(&self.sample(CHECK_SEGMENTS_PER_TURN), tol)
    }
}

/// A part outline: one counter-clockwise outer boundary and clockwise holes
/// inside it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Outline2D {
    /// Outer boundary (counter-clockwise).
    pub outer: Loop,
    /// Holes (clockwise).
    pub holes: Vec<Loop>,
}

impl Outline2D {
    /// Build an outline from unordered, arbitrarily wound loops.
    ///
    /// The loop enclosing the largest area becomes the outer boundary and is
    /// made counter-clockwise; all others must lie inside it and are made
    /// clockwise. Empty and zero-area holes are dropped.
    pub fn from_loops(loops: Vec<Loop>, tol: &Tolerance) -> Result<Self> {
        let loops: Vec<(usize, Loop)> = loops
            .into_iter()
            .enumerate()
            .filter(|(_, l)| !l.is_empty())
            .collect();
        if loops.is_empty() {
            return Err(OutlineError::Empty);
        }

        for (index, l) in &loops {
            let gap = l.max_gap();
            if gap > tol.linear {
                return Err(OutlineError::OpenLoop { index: *index, gap });
            }
        }

        let areas: Vec<f64> = loops.iter().map(|(_, l)| l.signed_area()).collect();
        let outer_pos = areas
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(i, _)| i)
            .ok_or(OutlineError::Empty)?;
        let min_area = (tol.linear * tol.linear).max(f64::MIN_POSITIVE);
        if areas[outer_pos].abs() <= min_area {
            return Err(OutlineError::ZeroArea);
        }

        let (outer_index, outer) = &loops[outer_pos];
        let outer = if areas[outer_pos] > 0.0 {
            outer.clone()
        } else {
            outer.reversed()
        };
        if outer.self_intersects(tol.linear) {
            return Err(OutlineError::SelfIntersection {
                index: *outer_index,
            });
        }
        let outer_polygon = outer.sample(CHECK_SEGMENTS_PER_TURN);
        let outer_bbox = outer.bbox();

        let mut holes = Vec::new();
        for (pos, (index, l)) in loops.iter().enumerate() {
            if pos == outer_pos {
                continue;
            }
            if areas[pos].abs() <= min_area {
                debug!(loop_index = index, "dropping zero-area loop");
                continue;
            }
            let hole = if areas[pos] < 0.0 { l.clone() } else { l.reversed() };
            let inside = hole.sample(CHECK_SEGMENTS_PER_TURN).iter().all(|p| {
                outer_bbox.contains(p, tol.linear)
                    && (point_in_polygon(p, &outer_polygon)
                        || distance_to_polygon(p, &outer_polygon) <= tol.linear)
            });
            if !inside {
                return Err(OutlineError::HoleOutside { index: *index });
            }
            if hole.self_intersects(tol.linear) {
                return Err(OutlineError::SelfIntersection { index: *index });
            }
            holes.push(hole);
        }

        Ok(Self { outer, holes })
    }

    /// All loops, outer first.
    pub fn loops(&self) -> impl Iterator<Item = &Loop> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }

    /// Whether the outline has no geometry.
    pub fn is_empty(&self) -> bool {
        self.outer.is_empty()
    }

    /// Material area: outer minus holes.
    pub fn area(&self) -> f64 {
        self.outer.signed_area().abs() - self.holes.iter().map(|h| h.signed_area().abs()).sum::<f64>()
    }

    /// Exact bounding box.
    pub fn bbox(&self) -> Aabb2 {
        self.loops().fold(Aabb2::empty(), |bb, l| bb.union(&l.bbox()))
    }

    /// Apply a rigid motion to every loop.
    pub fn transformed(&self, t: &Rigid2) -> Self {
        Self {
            outer: self.outer.transformed(t),
            holes: self.holes.iter().map(|h| h.transformed(t)).collect(),
        }
    }

    /// Uniform scale about the origin (unit conversion).
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            outer: self.outer.scaled(factor),
            holes: self.holes.iter().map(|h| h.scaled(factor)).collect(),
        }
    }

    /// Total number of segments.
    pub fn segment_count(&self) -> usize {
        self.loops().map(|l| l.segments.len()).sum()
    }

    /// Total number of arc segments.
    pub fn arc_count(&self) -> usize {
        self.loops().map(Loop::arc_count).sum()
    }

    /// Points describing the outline for hull computations: line endpoints
    /// and arcs sampled `arc_samples` per turn (at least 8 per arc).
    pub fn sample_points(&self, arc_samples: usize) -> Vec<Point2> {
        let mut pts = Vec::new();
        for seg in self.loops().flat_map(|l| l.segments.iter()) {
            pts.extend(seg.sample(arc_samples, 8));
        }
        pts
    }
}

/// Ray-casting point-in-polygon test.
pub fn point_in_polygon(p: &Point2, polygon: &[Point2]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (&polygon[i], &polygon[j]);
        if ((pi.y > p.y) != (pj.y > p.y))
            && (p.x < (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn distance_to_segment(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 <= f64::EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

fn distance_to_polygon(p: &Point2, polygon: &[Point2]) -> f64 {
    let n = polygon.len();
    (0..n)
        .map(|i| distance_to_segment(p, &polygon[i], &polygon[(i + 1) % n]))
        .fold(f64::INFINITY, f64::min)
}

fn orient(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    (b - a).perp(&(c - a))
}

/// Proper crossings between non-adjacent edges of a closed polygon. Edges
/// that merely touch within `tol` do not count.
fn polygon_self_intersects(pts: &[Point2], tol: f64) -> bool {
    let n = pts.len();
    if n < 4 {
        return false;
    }
    let edge_box = |i: usize| Aabb2::from_points([&pts[i], &pts[(i + 1) % n]]);
    for i in 0..n {
        let (a, b) = (&pts[i], &pts[(i + 1) % n]);
        let box_i = edge_box(i);
        let len_ab = (b - a).norm();
        for j in (i + 2)..n {
            // first and last edges share a vertex
            if i == 0 && j == n - 1 {
                continue;
            }
            let box_j = edge_box(j);
            if box_j.min.x > box_i.max.x + tol
                || box_j.max.x < box_i.min.x - tol
                || box_j.min.y > box_i.max.y + tol
                || box_j.max.y < box_i.min.y - tol
            {
                continue;
            }
            let (c, d) = (&pts[j], &pts[(j + 1) % n]);
            let len_cd = (d - c).norm();
            let (o1, o2) = (orient(a, b, c), orient(a, b, d));
            let (o3, o4) = (orient(c, d, a), orient(c, d, b));
            let eps_ab = tol * len_ab;
            let eps_cd = tol * len_cd;
            if ((o1 > eps_ab && o2 < -eps_ab) || (o1 < -eps_ab && o2 > eps_ab))
                && ((o3 > eps_cd && o4 < -eps_cd) || (o3 < -eps_cd && o4 > eps_cd))
            {
                return true;
            }
        }
    }
    false
}
