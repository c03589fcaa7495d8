//! Faces, their supporting surfaces, and boundary loops.

use crate::curve::{Curve, Edge};
use flatcut_math::{Dir3, Point3, Vec3};

/// Surface underlying a face.
#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    /// Plane through `origin`. `normal` points out of the material.
    Plane {
        /// A point on the plane.
        origin: Point3,
        /// Outward normal.
        normal: Dir3,
    },
    /// Any non-planar surface, identified by kind (e.g. `CYLINDRICAL_SURFACE`).
    Other(String),
}

/// A closed boundary of a face.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FaceLoop {
    /// Edges in traversal order; each edge ends where the next starts.
    pub edges: Vec<Edge>,
}

impl FaceLoop {
    /// Create a loop from edges.
    pub fn new(edges: Vec<Edge>) -> Self {
        Self { edges }
    }

    /// Polygon through the sampled edges, without repeating the first point.
    pub fn polygon(&self, segments_per_turn: usize) -> Vec<Point3> {
        let mut pts = Vec::new();
        for edge in &self.edges {
            let sampled = edge.sample(segments_per_turn);
            let take = sampled.len().saturating_sub(1);
            pts.extend_from_slice(&sampled[..take]);
        }
        pts
    }

    /// Vector area (Newell's method). Its length is the enclosed area and
    /// its direction the right-hand normal of the traversal.
    pub fn vector_area(&self, segments_per_turn: usize) -> Vec3 {
        let pts = self.polygon(segments_per_turn);
        let n = pts.len();
        let mut acc = Vec3::zeros();
        for i in 0..n {
            let a = pts[i].coords;
            let b = pts[(i + 1) % n].coords;
            acc += a.cross(&b);
        }
        acc * 0.5
    }

    /// Largest gap between consecutive edges (0 for a well-formed loop).
    pub fn max_gap(&self) -> f64 {
        let n = self.edges.len();
        (0..n)
            .map(|i| (self.edges[(i + 1) % n].start - self.edges[i].end).norm())
            .fold(0.0, f64::max)
    }
}

/// A bounded portion of a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Supporting surface.
    pub surface: Surface,
    /// Outer boundary.
    pub outer: FaceLoop,
    /// Holes.
    pub inner: Vec<FaceLoop>,
}

/// Samples per full turn used for area and box estimates.
pub(crate) const AREA_SEGMENTS: usize = 128;

impl Face {
    /// Outward normal if the face is planar.
    pub fn plane_normal(&self) -> Option<Dir3> {
        match &self.surface {
            Surface::Plane { normal, .. } => Some(*normal),
            Surface::Other(_) => None,
        }
    }

    /// Whether the face lies on a plane.
    pub fn is_planar(&self) -> bool {
        matches!(self.surface, Surface::Plane { .. })
    }

    /// All boundary loops, outer first.
    pub fn loops(&self) -> impl Iterator<Item = &FaceLoop> {
        std::iter::once(&self.outer).chain(self.inner.iter())
    }

    /// All boundary edges.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.loops().flat_map(|l| l.edges.iter())
    }

    /// Area of a planar face (outer minus holes); 0 for other surfaces.
    pub fn area(&self) -> f64 {
        let Some(normal) = self.plane_normal() else {
            return 0.0;
        };
        let outer = self.outer.vector_area(AREA_SEGMENTS).dot(&normal).abs();
        let holes: f64 = self
            .inner
            .iter()
            .map(|l| l.vector_area(AREA_SEGMENTS).dot(&normal).abs())
            .sum();
        (outer - holes).max(0.0)
    }

    /// Whether the face is a bare rectangle: no holes, four straight edges
    /// meeting at right angles (`|cos| <= right_angle_tolerance`).
    pub fn is_plain_rectangle(&self, right_angle_tolerance: f64) -> bool {
        if !self.inner.is_empty() || self.outer.edges.len() != 4 {
            return false;
        }
        if self
            .outer
            .edges
            .iter()
            .any(|e| !matches!(e.curve, Curve::Line))
        {
            return false;
        }
        let dirs: Vec<Vec3> = self
            .outer
            .edges
            .iter()
            .map(|e| e.end - e.start)
            .collect();
        if dirs.iter().any(|d| d.norm() <= f64::EPSILON) {
            return false;
        }
        (0..4).all(|i| {
            let a = dirs[i].normalize();
            let b = dirs[(i + 1) % 4].normalize();
            a.dot(&b).abs() <= right_angle_tolerance
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(size: f64) -> FaceLoop {
        let p = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(size, 0.0, 0.0),
            Point3::new(size, size, 0.0),
            Point3::new(0.0, size, 0.0),
        ];
        FaceLoop::new((0..4).map(|i| Edge::line(p[i], p[(i + 1) % 4])).collect())
    }

    fn plane_z() -> Surface {
        Surface::Plane {
            origin: Point3::origin(),
            normal: Dir3::new_normalize(Vec3::z()),
        }
    }

    #[test]
    fn test_square_area_and_rectangle() {
        let face = Face {
            surface: plane_z(),
            outer: square(10.0),
            inner: vec![],
        };
        assert_relative_eq!(face.area(), 100.0, epsilon = 1e-9);
        assert!(face.is_plain_rectangle(0.05));
        assert_relative_eq!(face.outer.max_gap(), 0.0);
    }

    #[test]
    fn test_hole_makes_face_non_rectangular() {
        let c = Point3::new(5.0, 5.0, 0.0);
        let start = Point3::new(6.0, 5.0, 0.0);
        let hole = FaceLoop::new(vec![Edge::arc(
            start,
            start,
            c,
            Dir3::new_normalize(-Vec3::z()),
            true,
        )]);
        let face = Face {
            surface: plane_z(),
            outer: square(10.0),
            inner: vec![hole],
        };
        assert!(!face.is_plain_rectangle(0.05));
        assert_relative_eq!(face.area(), 100.0 - std::f64::consts::PI, epsilon = 1e-2);
    }

    #[test]
    fn test_non_planar_face_has_no_area() {
        let face = Face {
            surface: Surface::Other("CYLINDRICAL_SURFACE".into()),
            outer: square(1.0),
            inner: vec![],
        };
        assert_eq!(face.area(), 0.0);
        assert!(face.plane_normal().is_none());
    }
}
