//! Extrusion axis detection.
//!
//! A laser-cut part is a profile extruded along one principal axis. The
//! thinnest axis usually wins; near-cubic parts fall back to the planar
//! faces each axis sees.

use crate::error::{FlattenError, Result};
use crate::settings::ProjectionSettings;
use flatcut_brep::{Face, SolidGeometry};
use flatcut_math::Axis;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// `|cos|` between consecutive edges allowed for a face to count as a plain
/// rectangle.
const RIGHT_ANGLE_TOLERANCE: f64 = 0.05;

/// What one principal axis looks like from the solid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisCandidate {
    /// The axis.
    pub axis: Axis,
    /// Bounding box extent along the axis.
    pub extent: f64,
    /// Planar faces whose normal is parallel to the axis.
    pub face_count: usize,
    /// Area of the largest such face.
    pub largest_face_area: f64,
    /// Whether that largest face is a bare rectangle.
    pub largest_is_rectangle: bool,
}

/// Why an axis was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisReason {
    /// Only one axis has a parallel planar face.
    OnlyCandidate,
    /// Clearly thinner than every other axis.
    Thinnest,
    /// Tied on extent; has the dominant planar face.
    LargestFace,
    /// Tied on extent and face area; has the most planar faces.
    MostFaces,
}

impl fmt::Display for AxisReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AxisReason::OnlyCandidate => "only axis with a planar profile",
            AxisReason::Thinnest => "thinnest extent",
            AxisReason::LargestFace => "largest planar face",
            AxisReason::MostFaces => "most planar faces",
        })
    }
}

/// Outcome of axis detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisChoice {
    /// Chosen extrusion axis.
    pub axis: Axis,
    /// Extent along the axis (part thickness), millimetres.
    pub thickness: f64,
    /// Why it was chosen.
    pub reason: AxisReason,
    /// Every principal axis as evaluated.
    pub candidates: Vec<AxisCandidate>,
}

/// Measure one axis.
pub fn evaluate_axis(
    solid: &impl SolidGeometry,
    axis: Axis,
    settings: &ProjectionSettings,
) -> AxisCandidate {
    let extent = solid.bounding_box().extent(axis);
    let faces = parallel_faces(solid.faces(), axis, settings.parallel_cos());
    let largest = faces
        .iter()
        .map(|f| (f.area(), *f))
        .max_by(|a, b| a.0.total_cmp(&b.0));
    AxisCandidate {
        axis,
        extent,
        face_count: faces.len(),
        largest_face_area: largest.map_or(0.0, |(a, _)| a),
        largest_is_rectangle: largest
            .is_some_and(|(_, f)| f.is_plain_rectangle(RIGHT_ANGLE_TOLERANCE)),
    }
}

/// Planar faces whose normal is within the angular tolerance of `axis`.
pub fn parallel_faces(faces: &[Face], axis: Axis, min_cos: f64) -> Vec<&Face> {
    let dir = axis.unit();
    faces
        .iter()
        .filter(|f| {
            f.plane_normal()
                .is_some_and(|n| n.dot(&dir).abs() >= min_cos)
        })
        .collect()
}

/// Pick the extrusion axis of `solid`.
pub fn detect_axis(solid: &impl SolidGeometry, settings: &ProjectionSettings) -> Result<AxisChoice> {
    let all: Vec<AxisCandidate> = Axis::ALL
        .iter()
        .map(|&axis| evaluate_axis(solid, axis, settings))
        .collect();
    for c in &all {
        debug!(
            axis = %c.axis,
            extent = c.extent,
            faces = c.face_count,
            largest = c.largest_face_area,
            rectangle = c.largest_is_rectangle,
            "axis candidate"
        );
    }

    let choose = |axis: Axis, reason: AxisReason| {
        let thickness = all
            .iter()
            .find(|c| c.axis == axis)
            .map_or(0.0, |c| c.extent);
        debug!(%axis, thickness, %reason, "extrusion axis");
        Ok(AxisChoice {
            axis,
            thickness,
            reason,
            candidates: all.clone(),
        })
    };

    let mut candidates: Vec<AxisCandidate> =
        all.iter().copied().filter(|c| c.face_count > 0).collect();
    if candidates.is_empty() {
        return Err(FlattenError::AmbiguousAxis {
            reason: "no planar face is orthogonal to any principal axis".into(),
        });
    }

    if settings.skip_rectangular_profiles
        && candidates.iter().any(|c| !c.largest_is_rectangle)
        && candidates.iter().any(|c| c.largest_is_rectangle)
    {
        candidates.retain(|c| !c.largest_is_rectangle);
    }

    if let [only] = candidates.as_slice() {
        return choose(only.axis, AxisReason::OnlyCandidate);
    }

    candidates.sort_by(|a, b| a.extent.total_cmp(&b.extent));
    let tol = settings.axis_tolerance;
    let (thinnest, runner_up) = (candidates[0], candidates[1]);
    if runner_up.extent - thinnest.extent > tol * runner_up.extent {
        return choose(thinnest.axis, AxisReason::Thinnest);
    }

    // near tie on extent
    let mut tied: Vec<AxisCandidate> = candidates
        .iter()
        .copied()
        .filter(|c| c.extent - thinnest.extent <= tol * c.extent)
        .collect();

    tied.sort_by(|a, b| b.largest_face_area.total_cmp(&a.largest_face_area));
    let (first, second) = (tied[0], tied[1]);
    if first.largest_face_area - second.largest_face_area > tol * first.largest_face_area {
        return choose(first.axis, AxisReason::LargestFace);
    }

    tied.sort_by(|a, b| b.face_count.cmp(&a.face_count));
    if tied[0].face_count > tied[1].face_count {
        return choose(tied[0].axis, AxisReason::MostFaces);
    }

    let names: Vec<String> = tied.iter().map(|c| c.axis.to_string()).collect();
    Err(FlattenError::AmbiguousAxis {
        reason: format!(
            "axes {} have matching extents, face areas, and face counts",
            names.join(", ")
        ),
    })
}
