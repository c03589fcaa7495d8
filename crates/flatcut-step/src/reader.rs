//! STEP reader: turns the parsed instance graph into [`Solid`]s in
//! millimetres.

use std::collections::HashMap;
use std::path::Path;

use crate::entities::curves::edge_geometry;
use crate::entities::surfaces::parse_surface;
use crate::entities::topology::{
    find_bodies, parse_edge_curve, parse_face, parse_loop, parse_shell, parse_vertex_point,
    BodyRef, BoundRef, LoopRef,
};
use crate::entities::units::{length_unit, LengthUnit};
use crate::entities::EntityArgs;
use crate::error::{Result, StepError};
use crate::parser::{Parser, StepFile};

use flatcut_brep::{Edge, Face, FaceLoop, Solid};
use tracing::{debug, warn};

/// Segments per turn used to compare loop areas when a face has no
/// explicit outer bound.
const LOOP_AREA_SEGMENTS: usize = 64;

/// Everything the loader extracts from a file.
#[derive(Debug, Clone)]
pub struct StepModel {
    /// Bodies in file order, coordinates in millimetres.
    pub solids: Vec<Solid>,
    /// The file's declared length unit.
    pub unit: LengthUnit,
}

/// Read a STEP file from a path.
pub fn read_step(path: impl AsRef<Path>) -> Result<Vec<Solid>> {
    let data = std::fs::read(path)?;
    read_step_from_buffer(&data)
}

/// Read a STEP file from a byte buffer.
pub fn read_step_from_buffer(data: &[u8]) -> Result<Vec<Solid>> {
    Ok(read_model(data)?.solids)
}

/// Read a STEP file from a byte buffer, keeping the unit information.
pub fn read_model(data: &[u8]) -> Result<StepModel> {
    let file = Parser::parse(data)?;
    let unit = length_unit(&file);
    let mut reader = StepReader::new(&file);
    let solids = reader
        .read_all_solids()?
        .into_iter()
        .map(|s| if unit.mm == 1.0 { s } else { s.scaled(unit.mm) })
        .collect();
    Ok(StepModel { solids, unit })
}

/// Per-file conversion state.
struct StepReader<'a> {
    file: &'a StepFile,
    /// EDGE_CURVE id to its geometry, traversed start vertex to end vertex.
    edge_map: HashMap<u64, Edge>,
}

impl<'a> StepReader<'a> {
    fn new(file: &'a StepFile) -> Self {
        Self {
            file,
            edge_map: HashMap::new(),
        }
    }

    fn read_all_solids(&mut self) -> Result<Vec<Solid>> {
        let bodies = find_bodies(self.file)?;
        let fallback_name = self.product_name();

        let mut solids = Vec::new();
        for body in bodies {
            let solid = self.read_body(&body, &fallback_name)?;
            if solid.faces.is_empty() {
                warn!(body = body.id, "body has no usable faces, skipping");
                continue;
            }
            debug!(body = body.id, faces = solid.faces.len(), "read body");
            solids.push(solid);
        }

        if solids.is_empty() {
            return Err(StepError::NoSolids);
        }
        Ok(solids)
    }

    /// Name for unnamed bodies: the first PRODUCT, else the header's
    /// FILE_NAME stem.
    fn product_name(&self) -> String {
        let product = self.file.entities_of_type("PRODUCT").first().map(|p| {
            let args = p.args();
            // PRODUCT(id, name, description, contexts)
            let name = args.string(1);
            let name = if name.is_empty() { args.string(0) } else { name };
            name.to_string()
        });
        let file_name = || {
            let record = self.file.header_record("FILE_NAME")?;
            let name = record.args.first()?.as_string()?;
            let stem = Path::new(name).file_stem()?.to_str()?;
            Some(stem.to_string())
        };
        product
            .filter(|n| !n.is_empty())
            .or_else(file_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "solid".to_string())
    }

    fn read_body(&mut self, body: &BodyRef, fallback_name: &str) -> Result<Solid> {
        let mut faces = Vec::new();
        for &shell in &body.shells {
            for face_id in parse_shell(self.file, shell)? {
                if let Some(face) = self.read_face(face_id)? {
                    faces.push(face);
                }
            }
        }
        let name = if body.name.is_empty() {
            fallback_name
        } else {
            &body.name
        };
        Ok(Solid::new(name, faces))
    }

    fn read_face(&mut self, id: u64) -> Result<Option<Face>> {
        let face = parse_face(self.file, id)?;
        let surface = parse_surface(self.file, face.surface, face.same_sense)?;

        let mut outer: Option<FaceLoop> = None;
        let mut others: Vec<FaceLoop> = Vec::new();
        for bound in &face.bounds {
            let Some(face_loop) = self.read_bound(bound)? else {
                continue;
            };
            if bound.is_outer && outer.is_none() {
                outer = Some(face_loop);
            } else {
                others.push(face_loop);
            }
        }

        // no FACE_OUTER_BOUND: the loop enclosing the most area is the outer one
        let outer = match outer {
            Some(o) => o,
            None => {
                let Some(idx) = largest_loop(&others) else {
                    debug!(face = id, "face has no loops, skipping");
                    return Ok(None);
                };
                others.swap_remove(idx)
            }
        };

        Ok(Some(Face {
            surface,
            outer,
            inner: others,
        }))
    }

    fn read_bound(&mut self, bound: &BoundRef) -> Result<Option<FaceLoop>> {
        let edges: Vec<Edge> = match parse_loop(self.file, bound.loop_id)? {
            LoopRef::Vertex => return Ok(None),
            LoopRef::Poly(points) => {
                let n = points.len();
                (0..n)
                    .map(|i| Edge::line(points[i], points[(i + 1) % n]))
                    .collect()
            }
            LoopRef::Edges(oriented) => {
                let mut edges = Vec::with_capacity(oriented.len());
                for (edge_id, orientation) in oriented {
                    let edge = self.edge(edge_id)?;
                    edges.push(if orientation { edge } else { edge.reversed() });
                }
                edges
            }
        };

        let face_loop = if bound.orientation {
            FaceLoop::new(edges)
        } else {
            FaceLoop::new(edges.iter().rev().map(Edge::reversed).collect())
        };
        Ok(Some(face_loop))
    }

    fn edge(&mut self, id: u64) -> Result<Edge> {
        if let Some(edge) = self.edge_map.get(&id) {
            return Ok(edge.clone());
        }
        let curve = parse_edge_curve(self.file, id)?;
        let start = parse_vertex_point(self.file, curve.start_vertex)?;
        let end = parse_vertex_point(self.file, curve.end_vertex)?;
        let edge = edge_geometry(self.file, curve.curve, start, end, curve.same_sense)?;
        self.edge_map.insert(id, edge.clone());
        Ok(edge)
    }
}

fn largest_loop(loops: &[FaceLoop]) -> Option<usize> {
    loops
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            a.vector_area(LOOP_AREA_SEGMENTS)
                .norm()
                .total_cmp(&b.vector_area(LOOP_AREA_SEGMENTS).norm())
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use flatcut_brep::{Curve, SolidGeometry, Surface};
    use flatcut_math::Axis;

    const PLATE: &str = include_str!("../tests/fixtures/plate_with_hole.step");
    const PLATE_INCH: &str = include_str!("../tests/fixtures/plate_inch.step");

    #[test]
    fn test_read_plate_with_hole() {
        let solids = read_step_from_buffer(PLATE.as_bytes()).unwrap();
        assert_eq!(solids.len(), 1);
        let plate = &solids[0];
        assert_eq!(plate.name, "plate");

        // top, bottom, four sides, and the bore
        assert_eq!(plate.faces.len(), 7);
        let planar = plate.faces.iter().filter(|f| f.is_planar()).count();
        assert_eq!(planar, 6);

        let bb = plate.bounding_box();
        assert_relative_eq!(bb.extent(Axis::X), 100.0, epsilon = 1e-9);
        assert_relative_eq!(bb.extent(Axis::Y), 50.0, epsilon = 1e-9);
        assert_relative_eq!(bb.extent(Axis::Z), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_plate_top_face_has_circular_hole() {
        let solids = read_step_from_buffer(PLATE.as_bytes()).unwrap();
        let top = solids[0]
            .faces
            .iter()
            .find(|f| {
                matches!(f.surface, Surface::Plane { normal, .. } if normal.z > 0.99)
            })
            .unwrap();
        assert_eq!(top.outer.edges.len(), 4);
        assert_eq!(top.inner.len(), 1);
        let hole = &top.inner[0].edges[0];
        let Curve::Circle(c) = &hole.curve else {
            panic!("hole should be a circle");
        };
        assert_relative_eq!(c.radius, 10.0);
        assert!(hole.is_closed());
        // hole runs clockwise about the outward normal
        assert!(top.inner[0].vector_area(64).z < 0.0);
        assert!(top.outer.vector_area(64).z > 0.0);

        let expected = 100.0 * 50.0 - std::f64::consts::PI * 100.0;
        assert_relative_eq!(top.area(), expected, max_relative = 1e-3);
    }

    #[test]
    fn test_inch_file_is_scaled_to_mm() {
        let model = read_model(PLATE_INCH.as_bytes()).unwrap();
        assert_eq!(model.unit.name, "INCH");
        let bb = model.solids[0].bounding_box();
        assert_relative_eq!(bb.extent(Axis::X), 4.0 * 25.4, epsilon = 1e-9);
        assert_relative_eq!(bb.extent(Axis::Z), 0.125 * 25.4, epsilon = 1e-9);
    }

    #[test]
    fn test_no_solids() {
        let data = b"ISO-10303-21;\nHEADER;\nENDSEC;\nDATA;\n#1 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));\nENDSEC;\nEND-ISO-10303-21;\n";
        assert!(matches!(
            read_step_from_buffer(data),
            Err(StepError::NoSolids)
        ));
    }

    #[test]
    fn test_poly_loop_face_without_outer_bound() {
        let data = b"ISO-10303-21;\nHEADER;\nENDSEC;\nDATA;
#1 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));
#2 = CARTESIAN_POINT('', (4.0, 0.0, 0.0));
#3 = CARTESIAN_POINT('', (4.0, 4.0, 0.0));
#4 = CARTESIAN_POINT('', (0.0, 4.0, 0.0));
#5 = CARTESIAN_POINT('', (1.0, 1.0, 0.0));
#6 = CARTESIAN_POINT('', (1.0, 2.0, 0.0));
#7 = CARTESIAN_POINT('', (2.0, 2.0, 0.0));
#8 = POLY_LOOP('', (#5, #6, #7));
#9 = POLY_LOOP('', (#1, #2, #3, #4));
#10 = FACE_BOUND('', #8, .T.);
#11 = FACE_BOUND('', #9, .T.);
#12 = DIRECTION('', (0.0, 0.0, 1.0));
#13 = DIRECTION('', (1.0, 0.0, 0.0));
#14 = AXIS2_PLACEMENT_3D('', #1, #12, #13);
#15 = PLANE('', #14);
#16 = FACE_SURFACE('', (#10, #11), #15, .T.);
#17 = OPEN_SHELL('', (#16));
#18 = SHELL_BASED_SURFACE_MODEL('', (#17));
#19 = PRODUCT('P-1', 'gusset', '', (#20));
ENDSEC;
END-ISO-10303-21;
";
        let solids = read_step_from_buffer(data).unwrap();
        assert_eq!(solids[0].name, "gusset");
        let face = &solids[0].faces[0];
        assert_eq!(face.outer.edges.len(), 4);
        assert_eq!(face.inner.len(), 1);
    }

    #[test]
    fn test_loops_are_closed() {
        let solids = read_step_from_buffer(PLATE.as_bytes()).unwrap();
        let edges: usize = solids[0].faces.iter().map(|f| f.edges().count()).sum();
        for face in &solids[0].faces {
            for l in face.loops() {
                assert!(l.max_gap() < 1e-9, "open loop in {face:?}");
            }
        }
        assert!(edges > 0);
    }
}
