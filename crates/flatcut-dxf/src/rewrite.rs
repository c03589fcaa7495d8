//! Rigid rewriting of entity records in place.
//!
//! Only coordinate and angle groups change; every other group of an entity
//! (layer, color, handle, extended data) is left untouched.

use crate::codes::GroupPair;
use crate::document::{DxfDocument, EntityRecord};
use crate::entity::DecodedEntity;
use flatcut_math::{normalize_degrees, Point2, Rigid2, Vec2};
use tracing::{trace, warn};

/// Outcome of [`rewrite_entities`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Entities whose geometry was transformed.
    pub transformed: usize,
    /// Descriptions of entities passed through unchanged.
    pub passed_through: Vec<String>,
}

/// Apply `transform` (world coordinates) to every supported entity.
/// Unsupported entities are left as they are and listed in the summary.
pub fn rewrite_entities(
    doc: &mut DxfDocument,
    entities: &[DecodedEntity],
    transform: &Rigid2,
) -> RewriteSummary {
    let mirrored = transform.mirrored_x();
    let mut summary = RewriteSummary::default();
    for entity in entities {
        if !entity.is_supported() {
            warn!(entity = %entity.description, "passing unsupported entity through untransformed");
            summary.passed_through.push(entity.description.clone());
            continue;
        }
        let ocs = if entity.mirrored { &mirrored } else { transform };
        for index in entity.records.clone() {
            let record = &mut doc.entities[index];
            let kind = record.kind().to_string();
            match kind.as_str() {
                "LINE" => {
                    move_point(record, 10, transform);
                    move_point(record, 11, transform);
                }
                "POINT" => move_point(record, 10, transform),
                "CIRCLE" => move_point(record, 10, ocs),
                "ARC" => {
                    move_point(record, 10, ocs);
                    turn_angle(record, 50, ocs);
                    turn_angle(record, 51, ocs);
                }
                "LWPOLYLINE" => move_all_points(record, ocs),
                "VERTEX" => move_point(record, 10, ocs),
                "ELLIPSE" => {
                    move_point(record, 10, transform);
                    turn_vector(record, 11, transform);
                }
                // POLYLINE's own 10/20 only carries the elevation
                _ => {}
            }
        }
        trace!(entity = %entity.description, "transformed");
        summary.transformed += 1;
    }
    summary
}

fn move_point(record: &mut EntityRecord, code: i32, t: &Rigid2) {
    if let (Some(x), Some(y)) = (record.real(code), record.real(code + 10)) {
        let p = t.apply_point(&Point2::new(x, y));
        record.set_real(code, p.x);
        record.set_real(code + 10, p.y);
    }
}

fn turn_vector(record: &mut EntityRecord, code: i32, t: &Rigid2) {
    if let (Some(x), Some(y)) = (record.real(code), record.real(code + 10)) {
        let v = t.apply_vec(&Vec2::new(x, y));
        record.set_real(code, v.x);
        record.set_real(code + 10, v.y);
    }
}

fn turn_angle(record: &mut EntityRecord, code: i32, t: &Rigid2) {
    if let Some(deg) = record.real(code) {
        record.set_real(code, normalize_degrees(deg + t.angle().to_degrees()));
    }
}

/// LWPOLYLINE: every 10/20 pair is a vertex; bulges (42) stay as they are.
fn move_all_points(record: &mut EntityRecord, t: &Rigid2) {
    let mut pending_x: Option<usize> = None;
    for i in 1..record.pairs.len() {
        match record.pairs[i].code {
            10 => pending_x = Some(i),
            20 => {
                let Some(xi) = pending_x.take() else {
                    continue;
                };
                let (Some(x), Some(y)) = (record.pairs[xi].as_f64(), record.pairs[i].as_f64())
                else {
                    continue;
                };
                let p = t.apply_point(&Point2::new(x, y));
                record.pairs[xi] = GroupPair::real(10, p.x);
                record.pairs[i] = GroupPair::real(20, p.y);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::decode_entities;
    use approx::assert_relative_eq;

    fn doc(records: Vec<EntityRecord>) -> DxfDocument {
        DxfDocument {
            head: Vec::new(),
            entities: records,
            tail: Vec::new(),
            line_ending: Default::default(),
        }
    }

    #[test]
    fn test_arc_angles_turn_and_wrap() {
        let arc = EntityRecord::new(
            "ARC",
            vec![
                GroupPair::new(8, "CUT"),
                GroupPair::real(10, 1.0),
                GroupPair::real(20, 0.0),
                GroupPair::real(40, 1.0),
                GroupPair::real(50, 300.0),
                GroupPair::real(51, 350.0),
            ],
        );
        let mut d = doc(vec![arc]);
        let decoded = decode_entities(&d).unwrap();
        let t = Rigid2::new(90f64.to_radians(), Vec2::new(1.0, 0.0));
        let summary = rewrite_entities(&mut d, &decoded, &t);
        assert_eq!(summary.transformed, 1);
        let arc = &d.entities[0];
        assert_eq!(arc.value(8), Some("CUT"));
        assert_relative_eq!(arc.real(10).unwrap(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(arc.real(20).unwrap(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(arc.real(50).unwrap(), 30.0, epsilon = 1e-9);
        assert_relative_eq!(arc.real(51).unwrap(), 80.0, epsilon = 1e-9);
    }

    #[test]
    fn test_mirrored_circle_moves_with_world() {
        let circle = EntityRecord::new(
            "CIRCLE",
            vec![
                GroupPair::real(10, -4.0),
                GroupPair::real(20, 1.0),
                GroupPair::real(40, 0.5),
                GroupPair::real(210, 0.0),
                GroupPair::real(220, 0.0),
                GroupPair::real(230, -1.0),
            ],
        );
        let mut d = doc(vec![circle]);
        let decoded = decode_entities(&d).unwrap();
        // world center is (4, 1); rotate a quarter turn and shift
        let t = Rigid2::new(90f64.to_radians(), Vec2::new(10.0, 0.0));
        rewrite_entities(&mut d, &decoded, &t);
        let after = decode_entities(&d).unwrap();
        let center = after[0].segments(64)[0].bbox();
        let world = t.apply_point(&Point2::new(4.0, 1.0));
        assert_relative_eq!((center.min.x + center.max.x) / 2.0, world.x, epsilon = 1e-9);
        assert_relative_eq!((center.min.y + center.max.y) / 2.0, world.y, epsilon = 1e-9);
    }

    #[test]
    fn test_mirrored_arc_ends_move_with_world() {
        let arc = EntityRecord::new(
            "ARC",
            vec![
                GroupPair::real(10, -4.0),
                GroupPair::real(20, 1.0),
                GroupPair::real(40, 1.0),
                GroupPair::real(50, 0.0),
                GroupPair::real(51, 90.0),
                GroupPair::real(210, 0.0),
                GroupPair::real(220, 0.0),
                GroupPair::real(230, -1.0),
            ],
        );
        // OCS x runs along world -x
        let world_end = |record: &EntityRecord, code: i32| {
            let (cx, cy) = (record.real(10).unwrap(), record.real(20).unwrap());
            let (r, a) = (record.real(40).unwrap(), record.real(code).unwrap().to_radians());
            Point2::new(-(cx + r * a.cos()), cy + r * a.sin())
        };
        let start = world_end(&arc, 50);
        let end = world_end(&arc, 51);
        assert_relative_eq!(start.x, 3.0, epsilon = 1e-9);
        assert_relative_eq!(end.y, 2.0, epsilon = 1e-9);

        let mut d = doc(vec![arc]);
        let decoded = decode_entities(&d).unwrap();
        let t = Rigid2::new(90f64.to_radians(), Vec2::new(10.0, 0.0));
        let summary = rewrite_entities(&mut d, &decoded, &t);
        assert_eq!(summary.transformed, 1);

        let arc = &d.entities[0];
        assert_eq!(arc.real(230), Some(-1.0));
        for (code, before) in [(50, start), (51, end)] {
            let moved = world_end(arc, code);
            let expected = t.apply_point(&before);
            assert_relative_eq!(moved.x, expected.x, epsilon = 1e-9);
            assert_relative_eq!(moved.y, expected.y, epsilon = 1e-9);
        }
        // the sweep keeps its size
        let sweep = normalize_degrees(arc.real(51).unwrap() - arc.real(50).unwrap());
        assert_relative_eq!(sweep, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unsupported_passes_through() {
        let text = EntityRecord::new(
            "TEXT",
            vec![
                GroupPair::new(5, "1F"),
                GroupPair::real(10, 2.0),
                GroupPair::real(20, 2.0),
            ],
        );
        let mut d = doc(vec![text.clone()]);
        let decoded = decode_entities(&d).unwrap();
        let summary = rewrite_entities(&mut d, &decoded, &Rigid2::rotation(1.0));
        assert_eq!(summary.transformed, 0);
        assert_eq!(summary.passed_through, vec!["TEXT (handle 1F)".to_string()]);
        assert_eq!(d.entities[0], text);
    }
}
