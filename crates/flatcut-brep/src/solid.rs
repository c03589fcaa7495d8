//! Solids and their bounding boxes.

use crate::curve::Edge;
use crate::face::{Face, AREA_SEGMENTS};
use flatcut_math::{Axis, Point3};

/// Axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb3 {
    /// An empty (inverted) box that any point will expand.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Expand to include a point.
    pub fn include(&mut self, p: &Point3) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    /// Whether at least one point was included.
    pub fn is_valid(&self) -> bool {
        (0..3).all(|i| self.min[i] <= self.max[i])
    }

    /// Extent along an axis (0 for an empty box).
    pub fn extent(&self, axis: Axis) -> f64 {
        let i = axis.index();
        if self.is_valid() {
            self.max[i] - self.min[i]
        } else {
            0.0
        }
    }

    /// Box volume.
    pub fn volume(&self) -> f64 {
        Axis::ALL.iter().map(|a| self.extent(*a)).product()
    }
}

/// The capabilities downstream stages need from a loaded body.
///
/// Implemented by [`Solid`]; tests may provide synthetic bodies.
pub trait SolidGeometry {
    /// Human-readable name (file stem or product name).
    fn name(&self) -> &str;

    /// Faces of the body.
    fn faces(&self) -> &[Face];

    /// All boundary edges, once per face use.
    fn edges(&self) -> Vec<&Edge> {
        self.faces().iter().flat_map(|f| f.edges()).collect()
    }

    /// Axis-aligned bounding box of the boundary.
    fn bounding_box(&self) -> Aabb3 {
        let mut bb = Aabb3::empty();
        for edge in self.edges() {
            for p in edge.sample(AREA_SEGMENTS) {
                bb.include(&p);
            }
        }
        bb
    }
}

/// A boundary-represented solid body.
#[derive(Debug, Clone, PartialEq)]
pub struct Solid {
    /// Body name.
    pub name: String,
    /// Faces of the outer shell.
    pub faces: Vec<Face>,
}

impl Solid {
    /// Create a solid from faces.
    pub fn new(name: impl Into<String>, faces: Vec<Face>) -> Self {
        Self {
            name: name.into(),
            faces,
        }
    }

    /// Uniformly scale all coordinates about the origin.
    pub fn scaled(&self, factor: f64) -> Self {
        use crate::curve::{CircleArc, Curve};
        use crate::face::{FaceLoop, Surface};

        let sp = |p: &Point3| Point3::from(p.coords * factor);
        let scale_edge = |e: &Edge| Edge {
            start: sp(&e.start),
            end: sp(&e.end),
            curve: match &e.curve {
                Curve::Line => Curve::Line,
                Curve::Circle(c) => Curve::Circle(CircleArc {
                    center: sp(&c.center),
                    radius: c.radius * factor,
                    ..c.clone()
                }),
                Curve::Polyline(pts) => Curve::Polyline(pts.iter().map(sp).collect()),
            },
        };
        let scale_loop = |l: &FaceLoop| FaceLoop::new(l.edges.iter().map(scale_edge).collect());
        let faces = self
            .faces
            .iter()
            .map(|f| Face {
                surface: match &f.surface {
                    Surface::Plane { origin, normal } => Surface::Plane {
                        origin: sp(origin),
                        normal: *normal,
                    },
                    other => other.clone(),
                },
                outer: scale_loop(&f.outer),
                inner: f.inner.iter().map(scale_loop).collect(),
            })
            .collect();
        Self {
            name: self.name.clone(),
            faces,
        }
    }
}

impl SolidGeometry for Solid {
    fn name(&self) -> &str {
        &self.name
    }

    fn faces(&self) -> &[Face] {
        &self.faces
    }
}
