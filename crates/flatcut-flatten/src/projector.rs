//! Orthographic projection of a solid's profile face.

use crate::axis::{detect_axis, parallel_faces, AxisChoice};
use crate::error::{FlattenError, Result};
use crate::settings::ProjectionSettings;
use flatcut_brep::{CircleArc, Curve, Edge, Face, FaceLoop, SolidGeometry};
use flatcut_math::{Axis, Point2, Tolerance};
use flatcut_outline::{Loop, Outline2D, Segment};
use std::f64::consts::TAU;
use tracing::{debug, trace};

/// A solid flattened along its extrusion axis. Lengths are millimetres.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatProfile {
    /// Name of the source body.
    pub name: String,
    /// Projected profile.
    pub outline: Outline2D,
    /// Axis the profile was projected along.
    pub axis: Axis,
    /// Extent of the solid along `axis`.
    pub thickness: f64,
    /// Area of the face the profile came from.
    pub face_area: f64,
}

/// Detect the extrusion axis of `solid` and project it.
pub fn flatten(
    solid: &impl SolidGeometry,
    settings: &ProjectionSettings,
) -> Result<(AxisChoice, FlatProfile)> {
    let choice = detect_axis(solid, settings)?;
    let profile = project(solid, choice.axis, settings)?;
    Ok((choice, profile))
}

/// Project the largest planar face orthogonal to `axis`.
pub fn project(
    solid: &impl SolidGeometry,
    axis: Axis,
    settings: &ProjectionSettings,
) -> Result<FlatProfile> {
    let face = parallel_faces(solid.faces(), axis, settings.parallel_cos())
        .into_iter()
        .map(|f| (f.area(), f))
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .ok_or(FlattenError::NoProfileFace { axis })?;
    let (face_area, face) = face;

    let loops = project_face(face, axis, settings);
    let tol = Tolerance::linear(settings.tolerance);
    let outline = Outline2D::from_loops(loops, &tol)
        .map_err(|source| FlattenError::DegenerateProjection { axis, source })?;

    debug!(
        solid = solid.name(),
        %axis,
        holes = outline.holes.len(),
        segments = outline.segment_count(),
        arcs = outline.arc_count(),
        area = outline.area(),
        "projected profile"
    );

    Ok(FlatProfile {
        name: solid.name().to_string(),
        outline,
        axis,
        thickness: solid.bounding_box().extent(axis),
        face_area,
    })
}

/// Project every boundary loop of `face` onto the plane of `axis`.
pub fn project_face(face: &Face, axis: Axis, settings: &ProjectionSettings) -> Vec<Loop> {
    face.loops()
        .map(|l| project_loop(l, axis, settings))
        .filter(|l| !l.is_empty())
        .collect()
}

fn project_loop(face_loop: &FaceLoop, axis: Axis, settings: &ProjectionSettings) -> Loop {
    let segments = face_loop
        .edges
        .iter()
        .flat_map(|e| project_edge(e, axis, settings))
        .collect();
    Loop::new(segments)
}

/// Project one edge. Circles lying in the projection plane stay arcs; every
/// other curve becomes a chain of lines.
pub fn project_edge(edge: &Edge, axis: Axis, settings: &ProjectionSettings) -> Vec<Segment> {
    let start = axis.project(&edge.start);
    let end = axis.project(&edge.end);
    match &edge.curve {
        Curve::Line => {
            if (end - start).norm() < settings.tolerance {
                trace!("dropping degenerate edge");
                Vec::new()
            } else {
                vec![Segment::line(start, end)]
            }
        }
        Curve::Circle(circle)
            if circle.normal.dot(&axis.unit()).abs() >= settings.parallel_cos() =>
        {
            project_arc(edge, circle, axis, settings.tolerance)
                .into_iter()
                .collect()
        }
        Curve::Circle(circle) => {
            let per_turn = settings.segments_per_turn(circle.radius);
            polyline(edge.sample(per_turn).iter().map(|p| axis.project(p)), settings)
        }
        Curve::Polyline(points) => polyline(points.iter().map(|p| axis.project(p)), settings),
    }
}

fn project_arc(edge: &Edge, circle: &CircleArc, axis: Axis, tol: f64) -> Option<Segment> {
    let center = axis.project(&circle.center);
    let start = axis.project(&edge.start);
    let radius = (start - center).norm();
    if radius < tol {
        return None;
    }
    // seen from the positive axis, a circle whose normal points away winds
    // the other way
    let facing = circle.normal.dot(&axis.unit()) > 0.0;
    if edge.is_closed() {
        let sweep = if circle.ccw == facing { TAU } else { -TAU };
        let a0 = (start.y - center.y).atan2(start.x - center.x);
        return Some(Segment::arc(center, radius, a0, sweep));
    }

    let end = axis.project(&edge.end);
    if (end - start).norm() < tol {
        return None;
    }
    let mid = axis.project(&edge.point_at(0.5));
    Some(Segment::arc_through(
        start,
        end,
        center,
        passes_ccw(center, start, end, mid),
    ))
}

/// Whether the counter-clockwise arc from `start` to `end` passes `mid`.
fn passes_ccw(center: Point2, start: Point2, end: Point2, mid: Point2) -> bool {
    let angle = |p: Point2| (p.y - center.y).atan2(p.x - center.x);
    let a0 = angle(start);
    let span = (angle(end) - a0).rem_euclid(TAU);
    let to_mid = (angle(mid) - a0).rem_euclid(TAU);
    to_mid < span
}

fn polyline(points: impl Iterator<Item = Point2>, settings: &ProjectionSettings) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last: Option<Point2> = None;
    for p in points {
        match last {
            Some(prev) if (p - prev).norm() < settings.tolerance => continue,
            Some(prev) => segments.push(Segment::line(prev, p)),
            None => {}
        }
        last = Some(p);
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use flatcut_brep::{extrude, ProfileEdge, ProfileLoop, Solid, Surface};
    use flatcut_math::{Dir3, Point3, Vec3};
    use flatcut_outline::OutlineError;
    use std::f64::consts::PI;

    fn plate_with_hole() -> Solid {
        extrude(
            "plate",
            Axis::Z,
            &ProfileLoop::rectangle(Point2::origin(), 100.0, 50.0),
            &[ProfileLoop::circle(Point2::new(30.0, 25.0), 10.0)],
            3.0,
        )
    }

    #[test]
    fn test_plate_keeps_hole_as_circle() {
        let settings = ProjectionSettings::default();
        let (choice, profile) = flatten(&plate_with_hole(), &settings).unwrap();
        assert_eq!(choice.axis, Axis::Z);
        assert_relative_eq!(profile.thickness, 3.0, epsilon = 1e-9);
        assert_eq!(profile.outline.holes.len(), 1);
        assert!(profile.outline.outer.is_ccw());
        assert!(!profile.outline.holes[0].is_ccw());
        let (center, radius) = profile.outline.holes[0].as_circle().unwrap();
        assert_relative_eq!(center.x, 30.0, epsilon = 1e-9);
        assert_relative_eq!(center.y, 25.0, epsilon = 1e-9);
        assert_relative_eq!(radius, 10.0, epsilon = 1e-9);
        assert_relative_eq!(profile.outline.area(), 5000.0 - 100.0 * PI, epsilon = 1e-6);
    }

    #[test]
    fn test_rounded_slot_keeps_partial_arcs() {
        // 60 x 20 stadium: two half circles joined by lines
        let outer = ProfileLoop {
            edges: vec![
                ProfileEdge::Line {
                    start: Point2::new(10.0, 0.0),
                    end: Point2::new(50.0, 0.0),
                },
                ProfileEdge::Arc {
                    start: Point2::new(50.0, 0.0),
                    end: Point2::new(50.0, 20.0),
                    center: Point2::new(50.0, 10.0),
                    ccw: true,
                },
                ProfileEdge::Line {
                    start: Point2::new(50.0, 20.0),
                    end: Point2::new(10.0, 20.0),
                },
                ProfileEdge::Arc {
                    start: Point2::new(10.0, 20.0),
                    end: Point2::new(10.0, 0.0),
                    center: Point2::new(10.0, 10.0),
                    ccw: true,
                },
            ],
        };
        let slot = extrude("slot", Axis::Z, &outer, &[], 1.5);
        let profile = project(&slot, Axis::Z, &ProjectionSettings::default()).unwrap();
        assert_eq!(profile.outline.arc_count(), 2);
        let bbox = profile.outline.bbox();
        assert_relative_eq!(bbox.width(), 60.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.height(), 20.0, epsilon = 1e-9);
        assert_relative_eq!(profile.outline.area(), 800.0 + 100.0 * PI, epsilon = 1e-6);
    }

    #[test]
    fn test_projection_along_x_uses_yz_plane() {
        let side = extrude(
            "side",
            Axis::X,
            &ProfileLoop::rectangle(Point2::new(5.0, 2.0), 40.0, 25.0),
            &[ProfileLoop::circle(Point2::new(15.0, 12.0), 3.0)],
            2.0,
        );
        let profile = project(&side, Axis::X, &ProjectionSettings::default()).unwrap();
        let bbox = profile.outline.bbox();
        assert_relative_eq!(bbox.min.x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.min.y, 2.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.width(), 40.0, epsilon = 1e-9);
        assert_eq!(profile.outline.holes.len(), 1);
    }

    #[test]
    fn test_oblique_circle_is_polygonized() {
        let edge = Edge::arc(
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::origin(),
            Dir3::new_normalize(Vec3::new(0.0, 1.0, 1.0)),
            true,
        );
        let segments = project_edge(&edge, Axis::Z, &ProjectionSettings::default());
        assert!(segments.len() > 8);
        assert!(segments.iter().all(|s| !s.is_arc()));
    }

    #[test]
    fn test_missing_profile_face() {
        let solid = Solid::new(
            "tube",
            vec![Face {
                surface: Surface::Other("CYLINDRICAL_SURFACE".into()),
                outer: FaceLoop::default(),
                inner: Vec::new(),
            }],
        );
        assert_eq!(
            project(&solid, Axis::Z, &ProjectionSettings::default()),
            Err(FlattenError::NoProfileFace { axis: Axis::Z })
        );
    }

    #[test]
    fn test_open_loop_is_degenerate() {
        let face = Face {
            surface: Surface::Plane {
                origin: Point3::origin(),
                normal: Axis::Z.unit(),
            },
            outer: FaceLoop::new(vec![
                Edge::line(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0)),
                Edge::line(Point3::new(10.0, 0.0, 0.0), Point3::new(10.0, 10.0, 0.0)),
                Edge::line(Point3::new(10.0, 10.0, 0.0), Point3::new(0.0, 10.0, 0.0)),
            ]),
            inner: Vec::new(),
        };
        let solid = Solid::new("open", vec![face]);
        let err = project(&solid, Axis::Z, &ProjectionSettings::default()).unwrap_err();
        assert!(matches!(
            err,
            FlattenError::DegenerateProjection {
                axis: Axis::Z,
                source: OutlineError::OpenLoop { .. }
            }
        ));
    }
}
