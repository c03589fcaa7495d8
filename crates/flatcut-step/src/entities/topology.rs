//! Topology instances: solids, shells, faces, bounds, loops, edges, and
//! vertices. These functions only decode references; the reader turns them
//! into geometry.

use super::geometry::parse_cartesian_point;
use super::{expect_type, EntityArgs};
use crate::error::Result;
use crate::parser::StepFile;
use flatcut_math::Point3;

/// An EDGE_CURVE: two vertex ids, a curve id, and the curve's sense.
#[derive(Debug, Clone, Copy)]
pub struct EdgeCurveRef {
    /// Start vertex instance.
    pub start_vertex: u64,
    /// End vertex instance.
    pub end_vertex: u64,
    /// Curve instance.
    pub curve: u64,
    /// Whether the curve runs from start to end.
    pub same_sense: bool,
}

/// Boundary of a face as written in the file.
#[derive(Debug, Clone)]
pub enum LoopRef {
    /// EDGE_LOOP: oriented edges as `(edge_curve, orientation)`.
    Edges(Vec<(u64, bool)>),
    /// POLY_LOOP: polygon corners.
    Poly(Vec<Point3>),
    /// VERTEX_LOOP: a single point, carries no area.
    Vertex,
}

/// A FACE_BOUND or FACE_OUTER_BOUND.
#[derive(Debug, Clone, Copy)]
pub struct BoundRef {
    /// Loop instance.
    pub loop_id: u64,
    /// When false the loop is traversed backwards.
    pub orientation: bool,
    /// Whether this is a FACE_OUTER_BOUND.
    pub is_outer: bool,
}

/// An ADVANCED_FACE or FACE_SURFACE.
#[derive(Debug, Clone)]
pub struct FaceRef {
    /// Face name.
    pub name: String,
    /// Bounds.
    pub bounds: Vec<BoundRef>,
    /// Surface instance.
    pub surface: u64,
    /// Whether the face normal agrees with the surface normal.
    pub same_sense: bool,
}

/// Decode a VERTEX_POINT into its position.
pub fn parse_vertex_point(file: &StepFile, id: u64) -> Result<Point3> {
    let entity = file.require(id)?;
    expect_type(entity, &["VERTEX_POINT"])?;
    parse_cartesian_point(file, entity.args().entity_ref(1)?)
}

/// Decode an EDGE_CURVE.
pub fn parse_edge_curve(file: &StepFile, id: u64) -> Result<EdgeCurveRef> {
    let entity = file.require(id)?;
    expect_type(entity, &["EDGE_CURVE"])?;
    let args = entity.args();
    Ok(EdgeCurveRef {
        start_vertex: args.entity_ref(1)?,
        end_vertex: args.entity_ref(2)?,
        curve: args.entity_ref(3)?,
        same_sense: args.boolean(4)?,
    })
}

/// Decode an ORIENTED_EDGE into `(edge_curve, orientation)`.
pub fn parse_oriented_edge(file: &StepFile, id: u64) -> Result<(u64, bool)> {
    let entity = file.require(id)?;
    expect_type(entity, &["ORIENTED_EDGE"])?;
    // (name, *, *, edge_element, orientation)
    let args = entity.args();
    Ok((args.entity_ref(3)?, args.boolean(4)?))
}

/// Decode any of the loop kinds.
pub fn parse_loop(file: &StepFile, id: u64) -> Result<LoopRef> {
    let entity = file.require(id)?;
    expect_type(entity, &["EDGE_LOOP", "POLY_LOOP", "VERTEX_LOOP"])?;
    let args = entity.args();
    match entity.type_name() {
        "EDGE_LOOP" => Ok(LoopRef::Edges(
            args.entity_ref_list(1)?
                .into_iter()
                .map(|oe| parse_oriented_edge(file, oe))
                .collect::<Result<_>>()?,
        )),
        "POLY_LOOP" => Ok(LoopRef::Poly(
            args.entity_ref_list(1)?
                .into_iter()
                .map(|p| parse_cartesian_point(file, p))
                .collect::<Result<_>>()?,
        )),
        _ => Ok(LoopRef::Vertex),
    }
}

/// Decode a face bound.
pub fn parse_face_bound(file: &StepFile, id: u64) -> Result<BoundRef> {
    let entity = file.require(id)?;
    expect_type(entity, &["FACE_OUTER_BOUND", "FACE_BOUND"])?;
    let args = entity.args();
    Ok(BoundRef {
        loop_id: args.entity_ref(1)?,
        orientation: args.boolean(2)?,
        is_outer: entity.type_name() == "FACE_OUTER_BOUND",
    })
}

/// Decode an ADVANCED_FACE or FACE_SURFACE.
pub fn parse_face(file: &StepFile, id: u64) -> Result<FaceRef> {
    let entity = file.require(id)?;
    expect_type(entity, &["ADVANCED_FACE", "FACE_SURFACE"])?;
    let args = entity.args();
    Ok(FaceRef {
        name: args.string(0).to_string(),
        bounds: args
            .entity_ref_list(1)?
            .into_iter()
            .map(|b| parse_face_bound(file, b))
            .collect::<Result<_>>()?,
        surface: args.entity_ref(2)?,
        same_sense: args.boolean(3)?,
    })
}

/// Face ids of a CLOSED_SHELL, OPEN_SHELL, or ORIENTED_CLOSED_SHELL.
pub fn parse_shell(file: &StepFile, id: u64) -> Result<Vec<u64>> {
    let entity = file.require(id)?;
    expect_type(
        entity,
        &["CLOSED_SHELL", "OPEN_SHELL", "ORIENTED_CLOSED_SHELL"],
    )?;
    let args = entity.args();
    if entity.type_name() == "ORIENTED_CLOSED_SHELL" {
        // (name, *, closed_shell_element, orientation)
        return parse_shell(file, args.entity_ref(2)?);
    }
    args.entity_ref_list(1)
}

/// A body found in the file: its name and the shells holding its faces.
#[derive(Debug, Clone)]
pub struct BodyRef {
    /// Instance id of the body.
    pub id: u64,
    /// Body name (may be empty).
    pub name: String,
    /// Shell instances. Voids of a BREP_WITH_VOIDS are not included.
    pub shells: Vec<u64>,
}

/// Every solid or surface-model body in the file, ordered by id.
pub fn find_bodies(file: &StepFile) -> Result<Vec<BodyRef>> {
    let mut bodies = Vec::new();
    for kind in ["MANIFOLD_SOLID_BREP", "BREP_WITH_VOIDS"] {
        for entity in file.entities_of_type(kind) {
            // BREP_WITH_VOIDS is also a MANIFOLD_SOLID_BREP subtype in complex form
            if kind == "BREP_WITH_VOIDS" && entity.has_record("MANIFOLD_SOLID_BREP") {
                continue;
            }
            let args = entity.args();
            bodies.push(BodyRef {
                id: entity.id,
                name: args.string(0).to_string(),
                shells: vec![args.entity_ref(1)?],
            });
        }
    }
    for entity in file.entities_of_type("SHELL_BASED_SURFACE_MODEL") {
        let args = entity.args();
        bodies.push(BodyRef {
            id: entity.id,
            name: args.string(0).to_string(),
            shells: args.entity_ref_list(1)?,
        });
    }
    bodies.sort_by_key(|b| b.id);
    Ok(bodies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn parse(data: &str) -> StepFile {
        let text = format!("ISO-10303-21;\nHEADER;\nENDSEC;\nDATA;\n{data}\nENDSEC;\nEND-ISO-10303-21;\n");
        Parser::parse(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_edge_references() {
        let file = parse(
            "#1 = CARTESIAN_POINT('', (1.0, 2.0, 3.0));\n#2 = VERTEX_POINT('', #1);\n#3 = EDGE_CURVE('', #2, #2, #9, .F.);\n#4 = ORIENTED_EDGE('', *, *, #3, .T.);\n#5 = EDGE_LOOP('', (#4));\n#6 = FACE_BOUND('', #5, .F.);",
        );
        assert_eq!(parse_vertex_point(&file, 2).unwrap(), Point3::new(1.0, 2.0, 3.0));
        let edge = parse_edge_curve(&file, 3).unwrap();
        assert_eq!((edge.start_vertex, edge.curve, edge.same_sense), (2, 9, false));
        let LoopRef::Edges(edges) = parse_loop(&file, 5).unwrap() else {
            panic!("expected edge loop");
        };
        assert_eq!(edges, vec![(3, true)]);
        let bound = parse_face_bound(&file, 6).unwrap();
        assert!(!bound.orientation && !bound.is_outer);
    }

    #[test]
    fn test_bodies_in_id_order() {
        let file = parse(
            "#1 = CLOSED_SHELL('', (#10));\n#2 = OPEN_SHELL('', (#11));\n#5 = SHELL_BASED_SURFACE_MODEL('sheet', (#2));\n#3 = MANIFOLD_SOLID_BREP('plate', #1);\n#4 = BREP_WITH_VOIDS('hollow', #1, (#2));",
        );
        let bodies = find_bodies(&file).unwrap();
        let names: Vec<&str> = bodies.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["plate", "hollow", "sheet"]);
        assert_eq!(parse_shell(&file, 1).unwrap(), vec![10]);
    }

    #[test]
    fn test_wrong_type_is_reported() {
        let file = parse("#1 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));");
        assert!(parse_face(&file, 1).is_err());
        assert!(parse_shell(&file, 1).is_err());
    }
}
