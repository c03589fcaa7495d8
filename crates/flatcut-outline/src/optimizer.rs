//! Minimum-area bounding box rotation.
//!
//! Candidate angles come from two sources: every convex hull edge aligned
//! with the X axis (rotating calipers) and a uniform sweep over a half turn.
//! Each candidate is scored with the exact bounding box of the rotated
//! outline, arcs included. The winner is rotated about the origin and then
//! shifted so its box starts at (0, 0).

use crate::bbox::Aabb2;
use crate::error::{OutlineError, Result};
use crate::hull::convex_hull;
use crate::outline::Outline2D;
use flatcut_math::{Point2, Rigid2, Vec2};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};
use tracing::debug;

/// Relative tolerance when comparing candidate areas and perimeters.
const TIE_TOLERANCE: f64 = 1e-9;
/// Golden-section iterations for the optional refinement.
const REFINE_ITERATIONS: usize = 60;

/// Search settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    /// Uniform sweep samples over [0, π).
    pub sweep_steps: usize,
    /// Samples per full turn when arcs feed the convex hull.
    pub arc_samples: usize,
    /// Polish the winner with a golden-section search.
    pub refine: bool,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            sweep_steps: 180,
            arc_samples: 64,
            refine: true,
        }
    }
}

/// The chosen rotation and the box it produces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationResult {
    /// Rotation in radians, in (-π/4, π/4].
    pub angle: f64,
    /// Box width after rotation.
    pub width: f64,
    /// Box height after rotation.
    pub height: f64,
    /// Box area.
    pub area: f64,
    /// Box perimeter.
    pub perimeter: f64,
}

impl RotationResult {
    /// Rotation in degrees.
    pub fn angle_degrees(&self) -> f64 {
        self.angle.to_degrees()
    }

    fn from_box(angle: f64, bb: &Aabb2) -> Self {
        Self {
            angle,
            width: bb.width(),
            height: bb.height(),
            area: bb.area(),
            perimeter: bb.perimeter(),
        }
    }
}

/// Result of [`optimize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Optimized {
    /// Chosen rotation and box.
    pub result: RotationResult,
    /// Rotation about the origin followed by the shift to (0, 0).
    pub transform: Rigid2,
    /// The outline with `transform` applied.
    pub outline: Outline2D,
}

/// Map an angle to its representative in (-π/4, π/4]. Bounding boxes repeat
/// every quarter turn, so this loses nothing.
pub fn canonical_angle(angle: f64) -> f64 {
    let a = (angle + FRAC_PI_4).rem_euclid(FRAC_PI_2) - FRAC_PI_4;
    // rem_euclid maps the upper boundary to the lower one
    if a <= -FRAC_PI_4 {
        a + FRAC_PI_2
    } else {
        a
    }
}

/// Exact bounding box of `outline` after rotating it by `angle` about the
/// origin.
pub fn rotated_bbox(outline: &Outline2D, angle: f64) -> Aabb2 {
    let rotation = Rigid2::rotation(angle);
    // holes lie inside the outer boundary
    outline
        .outer
        .segments
        .iter()
        .fold(Aabb2::empty(), |bb, s| bb.union(&s.transformed(&rotation).bbox()))
}

/// Bounding box of a point set rotated by `angle` about the origin.
pub fn rotated_points_bbox(points: &[Point2], angle: f64) -> Aabb2 {
    let (s, c) = angle.sin_cos();
    let mut bb = Aabb2::empty();
    for p in points {
        bb.include(&Point2::new(c * p.x - s * p.y, s * p.x + c * p.y));
    }
    bb
}

/// Find the rotation that minimizes the outline's bounding box area.
pub fn optimize(outline: &Outline2D, settings: &OptimizerSettings) -> Result<Optimized> {
    if outline.is_empty() {
        return Err(OutlineError::Convergence("outline is empty".into()));
    }
    let points = outline.sample_points(settings.arc_samples);
    let result = search(&points, settings, |a| rotated_bbox(outline, a))?;

    let bb = rotated_bbox(outline, result.angle);
    let transform = Rigid2::new(result.angle, -bb.min.coords);
    let rotated = outline.transformed(&transform);
    debug!(
        angle_deg = result.angle_degrees(),
        width = result.width,
        height = result.height,
        "optimized rotation"
    );
    Ok(Optimized {
        result,
        transform,
        outline: rotated,
    })
}

/// Find the rotation that minimizes the bounding box of a point set.
///
/// Returns the result and the rigid transform (rotation about the origin,
/// then the shift that puts the box minimum at (0, 0)).
pub fn optimize_points(
    points: &[Point2],
    settings: &OptimizerSettings,
) -> Result<(RotationResult, Rigid2)> {
    if points.is_empty() {
        return Err(OutlineError::Convergence("no points".into()));
    }
    let result = search(points, settings, |a| rotated_points_bbox(points, a))?;
    let bb = rotated_points_bbox(points, result.angle);
    Ok((result, Rigid2::new(result.angle, Vec2::new(-bb.min.x, -bb.min.y))))
}

/// Whether `a` beats `b`: smaller area, then smaller perimeter, then
/// smaller rotation.
fn better(a: &RotationResult, b: &RotationResult) -> bool {
    let area_scale = a.area.abs().max(b.area.abs()).max(f64::MIN_POSITIVE);
    if (a.area - b.area).abs() > TIE_TOLERANCE * area_scale {
        return a.area < b.area;
    }
    let perimeter_scale = a.perimeter.max(b.perimeter).max(f64::MIN_POSITIVE);
    if (a.perimeter - b.perimeter).abs() > TIE_TOLERANCE * perimeter_scale {
        return a.perimeter < b.perimeter;
    }
    a.angle.abs() < b.angle.abs()
}

fn candidate_angles(points: &[Point2], sweep_steps: usize) -> Vec<f64> {
    let hull = convex_hull(points);
    let mut angles = Vec::with_capacity(hull.len() + sweep_steps + 1);
    angles.push(0.0);
    if hull.len() >= 2 {
        for i in 0..hull.len() {
            let d = hull[(i + 1) % hull.len()] - hull[i];
            if d.norm_squared() > 0.0 {
                // rotate the edge onto +X
                angles.push(-d.y.atan2(d.x));
            }
        }
    }
    for k in 0..sweep_steps {
        angles.push(PI * k as f64 / sweep_steps as f64);
    }
    angles.into_iter().map(canonical_angle).collect()
}

fn search(
    points: &[Point2],
    settings: &OptimizerSettings,
    eval: impl Fn(f64) -> Aabb2,
) -> Result<RotationResult> {
    let extent = Aabb2::from_points(points);
    if !extent.is_valid() || (extent.width() <= f64::EPSILON && extent.height() <= f64::EPSILON)
    {
        return Err(OutlineError::Convergence(
            "all points coincide".into(),
        ));
    }

    let score = |angle: f64| -> Option<RotationResult> {
        let bb = eval(angle);
        let r = RotationResult::from_box(angle, &bb);
        (bb.is_valid() && r.area.is_finite() && r.perimeter.is_finite()).then_some(r)
    };

    let mut best: Option<RotationResult> = None;
    for angle in candidate_angles(points, settings.sweep_steps) {
        if let Some(r) = score(angle) {
            if best.as_ref().map_or(true, |b| better(&r, b)) {
                best = Some(r);
            }
        }
    }
    let mut best = best.ok_or_else(|| OutlineError::Convergence("no finite candidate".into()))?;

    if settings.refine {
        let half_window = PI / settings.sweep_steps.max(4) as f64;
        if let Some(r) = golden_section(best.angle - half_window, best.angle + half_window, &score)
        {
            let r = RotationResult {
                angle: canonical_angle(r.angle),
                ..r
            };
            if r.area < best.area * (1.0 - TIE_TOLERANCE) {
                best = r;
            }
        }
    }
    Ok(best)
}

/// Minimize box area over [lo, hi].
fn golden_section(
    mut lo: f64,
    mut hi: f64,
    score: &impl Fn(f64) -> Option<RotationResult>,
) -> Option<RotationResult> {
    let ratio = (5.0_f64.sqrt() - 1.0) / 2.0;
    let area = |a: f64| score(a).map_or(f64::INFINITY, |r| r.area);
    let mut x1 = hi - ratio * (hi - lo);
    let mut x2 = lo + ratio * (hi - lo);
    let (mut f1, mut f2) = (area(x1), area(x2));
    for _ in 0..REFINE_ITERATIONS {
        if f1 <= f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - ratio * (hi - lo);
            f1 = area(x1);
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + ratio * (hi - lo);
            f2 = area(x2);
        }
    }
    score((lo + hi) / 2.0)
}
