//! Typed geometry of the entities the rotator understands.
//!
//! Coordinates are read as stored. LINE, POINT, and ELLIPSE store world
//! coordinates; ARC, CIRCLE, and both polyline forms store object
//! coordinates, which for an extrusion of `(0, 0, -1)` have the X axis
//! mirrored. [`DecodedEntity::segments`] always returns world coordinates.

use crate::document::{DxfDocument, EntityRecord};
use crate::error::{DxfError, Result};
use flatcut_math::{Point2, Vec2};
use flatcut_outline::Segment;
use std::f64::consts::TAU;
use std::ops::Range;

/// POLYLINE flags (group 70) marking 3D polylines and meshes.
const POLYLINE_NON_PLANAR_FLAGS: i64 = 8 | 16 | 64;

/// A polyline vertex with the bulge of the segment that starts at it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Vertex position.
    pub point: Point2,
    /// `tan(sweep / 4)` of the following segment; 0 for a straight one.
    pub bulge: f64,
}

/// Geometry of a recognized entity, in its stored coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// LINE.
    Line {
        /// Start point.
        start: Point2,
        /// End point.
        end: Point2,
    },
    /// ARC, counter-clockwise from `start_deg` to `end_deg`.
    Arc {
        /// Center.
        center: Point2,
        /// Radius.
        radius: f64,
        /// Start angle, degrees.
        start_deg: f64,
        /// End angle, degrees.
        end_deg: f64,
    },
    /// CIRCLE.
    Circle {
        /// Center.
        center: Point2,
        /// Radius.
        radius: f64,
    },
    /// LWPOLYLINE or 2D POLYLINE.
    Polyline {
        /// Vertices in order.
        vertices: Vec<Vertex>,
        /// Whether the last vertex connects back to the first.
        closed: bool,
    },
    /// ELLIPSE (full or partial).
    Ellipse {
        /// Center.
        center: Point2,
        /// Major axis endpoint relative to the center.
        major: Vec2,
        /// Minor to major axis ratio.
        ratio: f64,
        /// Start parameter, radians.
        start_param: f64,
        /// End parameter, radians.
        end_param: f64,
    },
    /// POINT.
    Point(Point2),
}

/// One top-level entity of a drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEntity {
    /// Index of the entity's record in [`DxfDocument::entities`].
    pub index: usize,
    /// Records owned by this entity (a POLYLINE with its VERTEX and SEQEND
    /// records spans several).
    pub records: Range<usize>,
    /// Entity type name.
    pub kind: String,
    /// Description for messages.
    pub description: String,
    /// Geometry, or `None` when the type is not supported.
    pub geometry: Option<Geometry>,
    /// Whether object coordinates are X-mirrored.
    pub mirrored: bool,
}

impl DecodedEntity {
    /// Whether the rotator can transform this entity.
    pub fn is_supported(&self) -> bool {
        self.geometry.is_some()
    }

    /// World-space boundary segments. Ellipses are polygonized with
    /// `per_turn` pieces per full parameter turn.
    pub fn segments(&self, per_turn: usize) -> Vec<Segment> {
        let Some(geometry) = &self.geometry else {
            return Vec::new();
        };
        let world = |p: Point2| {
            if self.mirrored {
                Point2::new(-p.x, p.y)
            } else {
                p
            }
        };
        match geometry {
            Geometry::Line { start, end } => vec![Segment::line(*start, *end)],
            Geometry::Arc {
                center,
                radius,
                start_deg,
                end_deg,
            } => {
                let mut sweep = (end_deg - start_deg).rem_euclid(360.0).to_radians();
                if sweep == 0.0 {
                    sweep = TAU;
                }
                let start = start_deg.to_radians();
                if self.mirrored {
                    // counter-clockwise in the mirrored frame is clockwise in
                    // the world
                    let c = world(*center);
                    vec![Segment::arc(c, *radius, std::f64::consts::PI - start, -sweep)]
                } else {
                    vec![Segment::arc(*center, *radius, start, sweep)]
                }
            }
            Geometry::Circle { center, radius } => {
                vec![Segment::circle(world(*center), *radius)]
            }
            Geometry::Polyline { vertices, closed } => {
                let n = vertices.len();
                let count = if *closed { n } else { n.saturating_sub(1) };
                let sign = if self.mirrored { -1.0 } else { 1.0 };
                (0..count)
                    .filter_map(|i| {
                        let a = vertices[i];
                        let b = vertices[(i + 1) % n];
                        let (pa, pb) = (world(a.point), world(b.point));
                        if (pb - pa).norm() <= f64::EPSILON {
                            return None;
                        }
                        Some(Segment::from_bulge(pa, pb, a.bulge * sign))
                    })
                    .collect()
            }
            Geometry::Ellipse { .. } => {
                let pts = self.sample_ellipse(per_turn);
                pts.windows(2)
                    .filter(|w| (w[1] - w[0]).norm() > f64::EPSILON)
                    .map(|w| Segment::line(w[0], w[1]))
                    .collect()
            }
            Geometry::Point(_) => Vec::new(),
        }
    }

    /// World-space points representing the entity: segment samples, or the
    /// position of a POINT.
    pub fn sample_points(&self, per_turn: usize) -> Vec<Point2> {
        if let Some(Geometry::Point(p)) = &self.geometry {
            return vec![*p];
        }
        self.segments(per_turn)
            .iter()
            .flat_map(|s| s.sample(per_turn, 8))
            .collect()
    }

    fn sample_ellipse(&self, per_turn: usize) -> Vec<Point2> {
        let Some(Geometry::Ellipse {
            center,
            major,
            ratio,
            start_param,
            end_param,
        }) = &self.geometry
        else {
            return Vec::new();
        };
        let perp = Vec2::new(-major.y, major.x) * *ratio;
        // minor axis is extrusion × major
        let minor = if self.mirrored { -perp } else { perp };
        let mut span = (end_param - start_param).rem_euclid(TAU);
        if span <= 1e-12 {
            span = TAU;
        }
        let n = ((span / TAU) * per_turn.max(8) as f64).ceil().max(2.0) as usize;
        (0..=n)
            .map(|i| {
                let t = start_param + span * i as f64 / n as f64;
                center + major * t.cos() + minor * t.sin()
            })
            .collect()
    }
}

/// Decode every top-level entity of `doc`.
///
/// Unsupported types are returned with no geometry. Supported entities with
/// missing coordinates are an error.
pub fn decode_entities(doc: &DxfDocument) -> Result<Vec<DecodedEntity>> {
    let records = &doc.entities;
    let mut out = Vec::new();
    let mut i = 0;
    while i < records.len() {
        let record = &records[i];
        let mut end = i + 1;
        let geometry = match record.kind() {
            "LINE" => Some(Geometry::Line {
                start: point(record, 10)?,
                end: point(record, 11)?,
            }),
            "ARC" => Some(Geometry::Arc {
                center: point(record, 10)?,
                radius: real(record, 40)?,
                start_deg: real(record, 50)?,
                end_deg: real(record, 51)?,
            }),
            "CIRCLE" => Some(Geometry::Circle {
                center: point(record, 10)?,
                radius: real(record, 40)?,
            }),
            "LWPOLYLINE" => Some(Geometry::Polyline {
                vertices: lwpolyline_vertices(record)?,
                closed: record.int(70).unwrap_or(0) & 1 == 1,
            }),
            "POLYLINE" => {
                while end < records.len() && records[end].kind() == "VERTEX" {
                    end += 1;
                }
                if end < records.len() && records[end].kind() == "SEQEND" {
                    end += 1;
                }
                let flags = record.int(70).unwrap_or(0);
                if flags & POLYLINE_NON_PLANAR_FLAGS != 0 {
                    None
                } else {
                    let vertices = records[i + 1..end]
                        .iter()
                        .filter(|r| r.kind() == "VERTEX")
                        .map(|v| {
                            Ok(Vertex {
                                point: point(v, 10)?,
                                bulge: v.real(42).unwrap_or(0.0),
                            })
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Some(Geometry::Polyline {
                        vertices,
                        closed: flags & 1 == 1,
                    })
                }
            }
            "ELLIPSE" => Some(Geometry::Ellipse {
                center: point(record, 10)?,
                major: point(record, 11)?.coords,
                ratio: real(record, 40)?,
                start_param: record.real(41).unwrap_or(0.0),
                end_param: record.real(42).unwrap_or(TAU),
            }),
            "POINT" => Some(Geometry::Point(point(record, 10)?)),
            _ => None,
        };
        out.push(DecodedEntity {
            index: i,
            records: i..end,
            kind: record.kind().to_string(),
            description: record.describe(),
            geometry,
            mirrored: record.is_mirrored(),
        });
        i = end;
    }
    Ok(out)
}

fn real(record: &EntityRecord, code: i32) -> Result<f64> {
    record.real(code).ok_or_else(|| DxfError::InvalidValue {
        entity: record.describe(),
        code,
    })
}

fn point(record: &EntityRecord, code: i32) -> Result<Point2> {
    Ok(Point2::new(real(record, code)?, real(record, code + 10)?))
}

/// LWPOLYLINE vertices: each group 10 opens a vertex; 20 and 42 fill it.
fn lwpolyline_vertices(record: &EntityRecord) -> Result<Vec<Vertex>> {
    let invalid = |code| DxfError::InvalidValue {
        entity: record.describe(),
        code,
    };
    let mut vertices: Vec<Vertex> = Vec::new();
    for pair in record.pairs.iter().skip(1) {
        match pair.code {
            10 => vertices.push(Vertex {
                point: Point2::new(pair.as_f64().ok_or_else(|| invalid(10))?, 0.0),
                bulge: 0.0,
            }),
            20 => {
                let v = vertices.last_mut().ok_or_else(|| invalid(20))?;
                v.point.y = pair.as_f64().ok_or_else(|| invalid(20))?;
            }
            42 => {
                if let Some(v) = vertices.last_mut() {
                    v.bulge = pair.as_f64().ok_or_else(|| invalid(42))?;
                }
            }
            _ => {}
        }
    }
    Ok(vertices)
}
