//! Minimum-area rotation of a whole DXF drawing.

use crate::document::DxfDocument;
use crate::drawing::build_outline;
use crate::entity::decode_entities;
use crate::error::{DxfError, Result};
use crate::rewrite::rewrite_entities;
use flatcut_math::{Point2, Rigid2};
use flatcut_outline::{optimize, optimize_points, Aabb2, OptimizerSettings, RotationResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// What to do with entities the rewriter cannot transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedPolicy {
    /// Write them back untransformed and log a warning.
    #[default]
    Warn,
    /// Fail the file without writing anything.
    Reject,
}

impl fmt::Display for UnsupportedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnsupportedPolicy::Warn => "warn",
            UnsupportedPolicy::Reject => "reject",
        })
    }
}

impl FromStr for UnsupportedPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(UnsupportedPolicy::Warn),
            "reject" => Ok(UnsupportedPolicy::Reject),
            other => Err(format!("unknown policy '{other}' (expected warn or reject)")),
        }
    }
}

/// Rotator settings. Lengths are drawing units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatorSettings {
    /// Endpoint matching tolerance when chaining entities.
    pub tolerance: f64,
    /// Unsupported entity policy.
    pub unsupported: UnsupportedPolicy,
    /// Rotation search settings.
    pub optimizer: OptimizerSettings,
}

impl Default for RotatorSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-4,
            unsupported: UnsupportedPolicy::default(),
            optimizer: OptimizerSettings::default(),
        }
    }
}

/// What the rotator did to a drawing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RotationReport {
    /// Chosen rotation and resulting box.
    pub result: RotationResult,
    /// Translation applied after the rotation.
    pub offset: [f64; 2],
    /// Top-level entities in the drawing.
    pub entities: usize,
    /// Entities whose geometry was transformed.
    pub transformed: usize,
    /// Entities written back untransformed.
    pub passed_through: Vec<String>,
    /// Whether the rotation came from the convex hull of loose geometry
    /// rather than a closed outline.
    pub hull_fallback: bool,
}

/// Rotate `doc` in place so its drawing has the smallest axis-aligned
/// bounding box, with the box corner at the origin.
///
/// Under [`UnsupportedPolicy::Reject`] the document is left untouched when
/// it contains an entity that cannot be transformed.
pub fn rotate_document(doc: &mut DxfDocument, settings: &RotatorSettings) -> Result<RotationReport> {
    let entities = decode_entities(doc)?;
    if settings.unsupported == UnsupportedPolicy::Reject {
        if let Some(e) = entities.iter().find(|e| !e.is_supported()) {
            return Err(DxfError::UnsupportedEntity(e.description.clone()));
        }
    }

    let arc_samples = settings.optimizer.arc_samples;
    let drawing = build_outline(&entities, settings.tolerance, arc_samples);
    if drawing.points.is_empty() {
        return Err(DxfError::NoGeometry);
    }

    let (result, transform) = match &drawing.outline {
        Some(outline) => {
            let best = optimize(outline, &settings.optimizer)?;
            (best.result, best.transform)
        }
        None => optimize_points(&drawing.points, &settings.optimizer)?,
    };
    // loose geometry may reach past the outline; park the full drawing
    let transform = park_at_origin(&transform, &drawing.points);

    let summary = rewrite_entities(doc, &entities, &transform);
    update_extents(doc, arc_samples)?;

    info!(
        angle_deg = result.angle_degrees(),
        width = result.width,
        height = result.height,
        passed_through = summary.passed_through.len(),
        "rotated drawing"
    );
    let offset = transform.offset();
    Ok(RotationReport {
        result,
        offset: [offset.x, offset.y],
        entities: entities.len(),
        transformed: summary.transformed,
        passed_through: summary.passed_through,
        hull_fallback: drawing.outline.is_none(),
    })
}

fn park_at_origin(transform: &Rigid2, points: &[Point2]) -> Rigid2 {
    let moved: Vec<Point2> = points.iter().map(|p| transform.apply_point(p)).collect();
    let bb = Aabb2::from_points(&moved);
    if !bb.is_valid() {
        return *transform;
    }
    transform.then(&Rigid2::translation(-bb.min.x, -bb.min.y))
}

/// Recompute `$EXTMIN`/`$EXTMAX` from the drawing when the header has them.
fn update_extents(doc: &mut DxfDocument, arc_samples: usize) -> Result<()> {
    if doc.header_point("$EXTMIN").is_none() && doc.header_point("$EXTMAX").is_none() {
        return Ok(());
    }
    let entities = decode_entities(doc)?;
    let mut bb = Aabb2::empty();
    for e in &entities {
        for s in e.segments(arc_samples) {
            bb = bb.union(&s.bbox());
        }
        for p in e.sample_points(arc_samples) {
            bb.include(&p);
        }
    }
    if bb.is_valid() {
        doc.set_header_point("$EXTMIN", &bb.min);
        doc.set_header_point("$EXTMAX", &bb.max);
        debug!(min = ?bb.min, max = ?bb.max, "updated drawing extents");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::GroupPair;
    use crate::document::EntityRecord;

    fn drawing(records: Vec<EntityRecord>) -> DxfDocument {
        DxfDocument {
            head: Vec::new(),
            entities: records,
            tail: Vec::new(),
            line_ending: Default::default(),
        }
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("Reject".parse::<UnsupportedPolicy>(), Ok(UnsupportedPolicy::Reject));
        assert_eq!(UnsupportedPolicy::default(), UnsupportedPolicy::Warn);
        assert!("ignore".parse::<UnsupportedPolicy>().is_err());
    }

    #[test]
    fn test_reject_leaves_document_untouched() {
        let records = vec![
            EntityRecord::new(
                "LINE",
                vec![
                    GroupPair::real(10, 0.0),
                    GroupPair::real(20, 0.0),
                    GroupPair::real(11, 3.0),
                    GroupPair::real(21, 4.0),
                ],
            ),
            EntityRecord::new("INSERT", vec![GroupPair::new(2, "BOLT")]),
        ];
        let mut doc = drawing(records);
        let before = doc.clone();
        let settings = RotatorSettings {
            unsupported: UnsupportedPolicy::Reject,
            ..Default::default()
        };
        assert!(matches!(
            rotate_document(&mut doc, &settings),
            Err(DxfError::UnsupportedEntity(kind)) if kind == "INSERT"
        ));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_empty_drawing() {
        let mut doc = drawing(vec![EntityRecord::new("TEXT", vec![])]);
        assert!(matches!(
            rotate_document(&mut doc, &RotatorSettings::default()),
            Err(DxfError::NoGeometry)
        ));
    }

    #[test]
    fn test_loose_lines_use_hull() {
        // an open "V" cannot form an outline
        let line = |x0: f64, y0: f64, x1: f64, y1: f64| {
            EntityRecord::new(
                "LINE",
                vec![
                    GroupPair::real(10, x0),
                    GroupPair::real(20, y0),
                    GroupPair::real(11, x1),
                    GroupPair::real(21, y1),
                ],
            )
        };
        let mut doc = drawing(vec![line(0.0, 0.0, 10.0, 10.0), line(10.0, 10.0, 20.0, 0.0)]);
        let report = rotate_document(&mut doc, &RotatorSettings::default()).unwrap();
        assert!(report.hull_fallback);
        assert_eq!(report.transformed, 2);
        for e in decode_entities(&doc).unwrap() {
            for p in e.sample_points(8) {
                assert!(p.x >= -1e-9 && p.y >= -1e-9);
            }
        }
    }
}
