//! Prismatic solid construction: extrude a planar profile along an axis.
//!
//! Produces the same face/loop conventions as the STEP reader (outer loops
//! counter-clockwise about the outward normal, holes clockwise), which makes
//! these solids usable as stand-ins for loaded parts.

use crate::curve::Edge;
use crate::face::{Face, FaceLoop, Surface};
use crate::solid::Solid;
use flatcut_math::{Axis, Dir3, Point2, Vec2};

/// One edge of a planar profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfileEdge {
    /// Straight segment.
    Line {
        /// Start point.
        start: Point2,
        /// End point.
        end: Point2,
    },
    /// Circular arc; `start == end` is a full circle.
    Arc {
        /// Start point.
        start: Point2,
        /// End point.
        end: Point2,
        /// Arc center.
        center: Point2,
        /// Counter-clockwise traversal.
        ccw: bool,
    },
}

impl ProfileEdge {
    fn start(&self) -> Point2 {
        match self {
            ProfileEdge::Line { start, .. } | ProfileEdge::Arc { start, .. } => *start,
        }
    }

    fn end(&self) -> Point2 {
        match self {
            ProfileEdge::Line { end, .. } | ProfileEdge::Arc { end, .. } => *end,
        }
    }

    fn reversed(&self) -> Self {
        match *self {
            ProfileEdge::Line { start, end } => ProfileEdge::Line {
                start: end,
                end: start,
            },
            ProfileEdge::Arc {
                start,
                end,
                center,
                ccw,
            } => ProfileEdge::Arc {
                start: end,
                end: start,
                center,
                ccw: !ccw,
            },
        }
    }

    fn lift(&self, axis: Axis, w: f64) -> Edge {
        match self {
            ProfileEdge::Line { start, end } => Edge::line(axis.lift(start, w), axis.lift(end, w)),
            ProfileEdge::Arc {
                start,
                end,
                center,
                ccw,
            } => Edge::arc(
                axis.lift(start, w),
                axis.lift(end, w),
                axis.lift(center, w),
                axis.unit(),
                *ccw,
            ),
        }
    }
}

/// A closed planar profile loop.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileLoop {
    /// Edges in order.
    pub edges: Vec<ProfileEdge>,
}

impl ProfileLoop {
    /// Closed polygon through `points`.
    pub fn polygon(points: &[Point2]) -> Self {
        let n = points.len();
        Self {
            edges: (0..n)
                .map(|i| ProfileEdge::Line {
                    start: points[i],
                    end: points[(i + 1) % n],
                })
                .collect(),
        }
    }

    /// Axis-aligned rectangle with its minimum corner at `min`.
    pub fn rectangle(min: Point2, width: f64, height: f64) -> Self {
        Self::polygon(&[
            min,
            min + Vec2::new(width, 0.0),
            min + Vec2::new(width, height),
            min + Vec2::new(0.0, height),
        ])
    }

    /// Full circle.
    pub fn circle(center: Point2, radius: f64) -> Self {
        let start = center + Vec2::new(radius, 0.0);
        Self {
            edges: vec![ProfileEdge::Arc {
                start,
                end: start,
                center,
                ccw: true,
            }],
        }
    }

    /// Signed area (positive when counter-clockwise).
    pub fn signed_area(&self) -> f64 {
        self.to_face_loop(Axis::Z, 0.0)
            .vector_area(crate::face::AREA_SEGMENTS)
            .z
    }

    /// The loop traversed backwards.
    pub fn reversed(&self) -> Self {
        Self {
            edges: self.edges.iter().rev().map(ProfileEdge::reversed).collect(),
        }
    }

    fn oriented(&self, ccw: bool) -> Self {
        if (self.signed_area() > 0.0) == ccw {
            self.clone()
        } else {
            self.reversed()
        }
    }

    fn to_face_loop(&self, axis: Axis, w: f64) -> FaceLoop {
        FaceLoop::new(self.edges.iter().map(|e| e.lift(axis, w)).collect())
    }
}

/// Extrude a profile (outer loop plus holes) from 0 to `thickness` along
/// `axis`. Loop windings are normalized, so callers may pass either
/// orientation.
pub fn extrude(
    name: &str,
    axis: Axis,
    outer: &ProfileLoop,
    holes: &[ProfileLoop],
    thickness: f64,
) -> Solid {
    let outer = outer.oriented(true);
    let holes: Vec<ProfileLoop> = holes.iter().map(|h| h.oriented(false)).collect();

    let up = axis.unit();
    let down = Dir3::new_unchecked(-up.into_inner());
    let mut faces = Vec::new();

    faces.push(Face {
        surface: Surface::Plane {
            origin: axis.lift(&Point2::origin(), thickness),
            normal: up,
        },
        outer: outer.to_face_loop(axis, thickness),
        inner: holes.iter().map(|h| h.to_face_loop(axis, thickness)).collect(),
    });
    faces.push(Face {
        surface: Surface::Plane {
            origin: axis.lift(&Point2::origin(), 0.0),
            normal: down,
        },
        outer: outer.reversed().to_face_loop(axis, 0.0),
        inner: holes
            .iter()
            .map(|h| h.reversed().to_face_loop(axis, 0.0))
            .collect(),
    });

    for profile in std::iter::once(&outer).chain(holes.iter()) {
        for edge in &profile.edges {
            faces.push(side_face(axis, edge, thickness));
        }
    }

    Solid::new(name, faces)
}

fn side_face(axis: Axis, edge: &ProfileEdge, thickness: f64) -> Face {
    let (s, e) = (edge.start(), edge.end());
    let bottom = edge.lift(axis, 0.0);
    let top = edge.lift(axis, thickness).reversed();
    let up_at_end = Edge::line(axis.lift(&e, 0.0), axis.lift(&e, thickness));
    let down_at_start = Edge::line(axis.lift(&s, thickness), axis.lift(&s, 0.0));

    let surface = match edge {
        ProfileEdge::Line { .. } => {
            let d = e - s;
            let outward = Vec2::new(d.y, -d.x);
            let normal = axis.lift(&Point2::from(outward), 0.0).coords;
            Surface::Plane {
                origin: axis.lift(&s, 0.0),
                normal: Dir3::new_normalize(normal),
            }
        }
        ProfileEdge::Arc { .. } => Surface::Other("CYLINDRICAL_SURFACE".into()),
    };

    Face {
        surface,
        outer: FaceLoop::new(vec![bottom, up_at_end, top, down_at_start]),
        inner: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solid::SolidGeometry;
    use approx::assert_relative_eq;

    #[test]
    fn test_plate_faces_and_box() {
        let plate = extrude(
            "plate",
            Axis::Z,
            &ProfileLoop::rectangle(Point2::origin(), 10.0, 10.0),
            &[],
            1.0,
        );
        assert_eq!(plate.faces().len(), 6);
        let bb = plate.bounding_box();
        assert_relative_eq!(bb.extent(Axis::X), 10.0);
        assert_relative_eq!(bb.extent(Axis::Z), 1.0);
    }

    #[test]
    fn test_windings_are_normalized() {
        let cw = ProfileLoop::rectangle(Point2::origin(), 4.0, 2.0).reversed();
        assert!(cw.signed_area() < 0.0);
        let solid = extrude("p", Axis::Z, &cw, &[], 1.0);
        let top = &solid.faces[0];
        let n = top.plane_normal().unwrap();
        assert!(top.outer.vector_area(32).dot(&n) > 0.0);
        assert_relative_eq!(top.area(), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_side_normals_point_outward() {
        let solid = extrude(
            "p",
            Axis::Y,
            &ProfileLoop::rectangle(Point2::origin(), 3.0, 2.0),
            &[],
            1.0,
        );
        let bb = solid.bounding_box();
        let center = box_center(&bb);
        for face in &solid.faces {
            if let Surface::Plane { origin, normal } = &face.surface {
                let probe = face.outer.polygon(8)[0];
                // plane passes through its loop
                assert!((probe - origin).dot(normal).abs() < 1e-9);
                assert!((probe - center).dot(normal) > 0.0);
            }
        }
    }

    fn box_center(bb: &crate::solid::Aabb3) -> flatcut_math::Point3 {
        flatcut_math::Point3::from((bb.min.coords + bb.max.coords) * 0.5)
    }

    #[test]
    fn test_circular_hole_has_cylindrical_side() {
        let solid = extrude(
            "washer",
            Axis::Z,
            &ProfileLoop::rectangle(Point2::origin(), 10.0, 10.0),
            &[ProfileLoop::circle(Point2::new(5.0, 5.0), 2.0)],
            1.0,
        );
        assert_eq!(solid.faces[0].inner.len(), 1);
        assert!(solid
            .faces
            .iter()
            .any(|f| f.surface == Surface::Other("CYLINDRICAL_SURFACE".into())));
    }
}
