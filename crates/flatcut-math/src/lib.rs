#![warn(missing_docs)]

//! Math types for the flatcut pipeline.
//!
//! Thin wrappers around nalgebra: point and vector aliases for the 3D
//! solid model, a planar rigid transform for outline rotation, length units,
//! and tolerance constants.

use nalgebra::{Isometry2, Translation2, UnitComplex, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = nalgebra::Unit<Vector3<f64>>;

/// A point in the drawing plane.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in the drawing plane.
pub type Vec2 = Vector2<f64>;

/// A planar rigid transform: rotation about the origin followed by a
/// translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rigid2 {
    iso: Isometry2<f64>,
}

impl Rigid2 {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            iso: Isometry2::identity(),
        }
    }

    /// Counter-clockwise rotation about the origin by `angle` radians.
    pub fn rotation(angle: f64) -> Self {
        Self {
            iso: Isometry2::from_parts(Translation2::identity(), UnitComplex::new(angle)),
        }
    }

    /// Translation by `(dx, dy)`.
    pub fn translation(dx: f64, dy: f64) -> Self {
        Self {
            iso: Isometry2::from_parts(Translation2::new(dx, dy), UnitComplex::identity()),
        }
    }

    /// Rotation by `angle` about the origin, then translation by `offset`.
    pub fn new(angle: f64, offset: Vec2) -> Self {
        Self {
            iso: Isometry2::from_parts(Translation2::from(offset), UnitComplex::new(angle)),
        }
    }

    /// Compose: apply `self` first, then `next`.
    pub fn then(&self, next: &Rigid2) -> Self {
        Self {
            iso: next.iso * self.iso,
        }
    }

    /// Rotation component in radians, in (-π, π].
    pub fn angle(&self) -> f64 {
        self.iso.rotation.angle()
    }

    /// Translation component.
    pub fn offset(&self) -> Vec2 {
        self.iso.translation.vector
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point2) -> Point2 {
        self.iso.transform_point(p)
    }

    /// Transform a direction vector (rotation only).
    pub fn apply_vec(&self, v: &Vec2) -> Vec2 {
        self.iso.transform_vector(v)
    }

    /// Transform a polar angle (radians) measured from +X.
    pub fn apply_angle(&self, angle: f64) -> f64 {
        angle + self.angle()
    }

    /// Inverse transform.
    pub fn inverse(&self) -> Self {
        Self {
            iso: self.iso.inverse(),
        }
    }

    /// The same motion expressed in a frame whose X axis is mirrored.
    ///
    /// DXF entities with a `(0, 0, -1)` extrusion store coordinates in such a
    /// frame; applying the result to their raw coordinates moves them the
    /// same way `self` moves world coordinates.
    pub fn mirrored_x(&self) -> Self {
        let t = self.offset();
        Self::new(-self.angle(), Vec2::new(-t.x, t.y))
    }

    /// Check whether two transforms agree within `tol`.
    pub fn approx_eq(&self, other: &Rigid2, tol: &Tolerance) -> bool {
        tol.angles_equal(
            normalize_signed(self.angle() - other.angle()),
            0.0,
        ) && (self.offset() - other.offset()).norm() <= tol.linear
    }
}

impl Default for Rigid2 {
    fn default() -> Self {
        Self::identity()
    }
}

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Linear distance tolerance (model units).
    pub linear: f64,
    /// Angular tolerance in radians.
    pub angular: f64,
}

impl Tolerance {
    /// Default tolerances (1e-6 linear, 1e-9 rad angular).
    pub const DEFAULT: Self = Self {
        linear: 1e-6,
        angular: 1e-9,
    };

    /// Tolerance with the given linear distance and the default angular one.
    pub fn linear(linear: f64) -> Self {
        Self {
            linear,
            ..Self::DEFAULT
        }
    }

    /// Check if two planar points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point2, b: &Point2) -> bool {
        (a - b).norm() <= self.linear
    }

    /// Check if two 3D points are coincident within tolerance.
    pub fn points_equal_3d(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() <= self.linear
    }

    /// Check if a scalar distance is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() <= self.linear
    }

    /// Check if two angles are effectively equal (in radians).
    pub fn angles_equal(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.angular
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// One of the three principal axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// The X axis.
    X,
    /// The Y axis.
    Y,
    /// The Z axis.
    Z,
}

impl Axis {
    /// All principal axes in order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Coordinate index (0, 1, 2).
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Positive unit direction.
    pub fn unit(self) -> Dir3 {
        let mut v = Vec3::zeros();
        v[self.index()] = 1.0;
        Dir3::new_unchecked(v)
    }

    /// Orthographic projection onto the plane perpendicular to this axis.
    ///
    /// The two remaining coordinates are taken in cyclic order
    /// (X → (y, z), Y → (z, x), Z → (x, y)) so the plane is viewed from the
    /// positive axis without mirroring.
    pub fn project(self, p: &Point3) -> Point2 {
        match self {
            Axis::X => Point2::new(p.y, p.z),
            Axis::Y => Point2::new(p.z, p.x),
            Axis::Z => Point2::new(p.x, p.y),
        }
    }

    /// Inverse of [`Axis::project`]: place a planar point at height `w`
    /// along this axis.
    pub fn lift(self, p: &Point2, w: f64) -> Point3 {
        match self {
            Axis::X => Point3::new(w, p.x, p.y),
            Axis::Y => Point3::new(p.y, w, p.x),
            Axis::Z => Point3::new(p.x, p.y, w),
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        })
    }
}

/// Length unit of a drawing or model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Millimetres.
    Mm,
    /// Inches.
    #[default]
    Inch,
}

impl Units {
    /// Millimetres per one unit.
    pub fn mm_per_unit(self) -> f64 {
        match self {
            Units::Mm => 1.0,
            Units::Inch => 25.4,
        }
    }

    /// Factor converting millimetres into this unit.
    pub fn from_mm(self) -> f64 {
        1.0 / self.mm_per_unit()
    }

    /// Short suffix used in drawings (`mm`, `in`).
    pub fn suffix(self) -> &'static str {
        match self {
            Units::Mm => "mm",
            Units::Inch => "in",
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

impl std::str::FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mm" | "millimeter" | "millimetre" | "millimeters" | "millimetres" => Ok(Units::Mm),
            "in" | "inch" | "inches" => Ok(Units::Inch),
            other => Err(format!("unknown unit '{other}' (expected mm or inch)")),
        }
    }
}

/// Normalize an angle in radians to `[0, 2π)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// Normalize an angle in radians to `(-π, π]`.
pub fn normalize_signed(angle: f64) -> f64 {
    let a = normalize_angle(angle);
    if a > PI {
        a - TAU
    } else {
        a
    }
}

/// Normalize an angle in degrees to `[0, 360)`.
pub fn normalize_degrees(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}
