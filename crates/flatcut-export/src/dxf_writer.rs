//! DXF R2000 output.
//!
//! Files carry the full R2000 skeleton (symbol tables, block records,
//! model and paper space blocks, root dictionary) with unique handles, so
//! CAD programs that check structure open them without repair.
//!
//! Builds a [`DxfDocument`] so the writer shares the reader's group-code
//! formatting. Loops become closed LWPOLYLINEs carrying arc bulges, or
//! separate LINE/ARC entities; a loop that is one full circle is always a
//! CIRCLE.

use crate::error::{ExportError, Result};
use crate::options::{ExportOptions, LoopStyle};
use flatcut_dxf::{DxfDocument, EntityRecord, GroupPair, LineEnding};
use flatcut_math::{normalize_degrees, Point2, Units};
use flatcut_outline::{Aabb2, Loop, Outline2D, Segment};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// `$INSUNITS` code for a unit.
fn insunits(units: Units) -> i64 {
    match units {
        Units::Inch => 1,
        Units::Mm => 4,
    }
}

/// Hex handle allocator. Handles start at 1; 0 means "no owner".
#[derive(Debug, Default)]
struct Handles(u32);

impl Handles {
    fn next(&mut self) -> String {
        self.0 += 1;
        format!("{:X}", self.0)
    }

    /// `$HANDSEED`: one past the last handle handed out.
    fn seed(&self) -> String {
        format!("{:X}", self.0 + 1)
    }
}

/// Build the DXF document for `outline`.
///
/// The file is a complete R2000 drawing: HEADER, CLASSES, TABLES (all nine
/// symbol tables), BLOCKS with the model and paper space blocks, ENTITIES,
/// and OBJECTS with the root dictionary.
pub fn dxf_document(outline: &Outline2D, opts: &ExportOptions) -> DxfDocument {
    let mut handles = Handles::default();
    let (symbols, spaces) = tables(&mut handles, &opts.dxf.layer);
    let block_defs = blocks(&mut handles, &spaces);

    let mut entities = EntityWriter {
        layer: &opts.dxf.layer,
        owner: &spaces[0],
        handles: &mut handles,
        records: Vec::new(),
    };
    for lp in outline.loops() {
        match (lp.as_circle(), opts.dxf.loop_style) {
            (Some((center, radius)), _) => entities.circle(center, radius),
            (None, LoopStyle::Polyline) => entities.lwpolyline(lp),
            (None, LoopStyle::Segments) => {
                for seg in &lp.segments {
                    entities.segment(seg);
                }
            }
        }
    }
    let records = entities.records;
    let tail = objects(&mut handles);

    let mut head = header(opts, &outline.bbox(), handles.seed());
    head.extend([
        GroupPair::new(0, "SECTION"),
        GroupPair::new(2, "CLASSES"),
        GroupPair::new(0, "ENDSEC"),
    ]);
    head.extend(symbols);
    head.extend(block_defs);
    head.extend([GroupPair::new(0, "SECTION"), GroupPair::new(2, "ENTITIES")]);
    DxfDocument {
        head,
        entities: records,
        tail,
        line_ending: LineEnding::Lf,
    }
}

/// Write `outline` as a DXF file.
pub fn write_dxf(outline: &Outline2D, path: &Path, opts: &ExportOptions) -> Result<()> {
    if outline.is_empty() {
        return Err(ExportError::EmptyOutline);
    }
    let doc = dxf_document(outline, opts);
    let io_err = |source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    doc.write_to(&mut writer).map_err(io_err)?;
    writer.flush().map_err(io_err)?;
    debug!(path = %path.display(), entities = doc.entities.len(), "wrote DXF");
    Ok(())
}

fn header(opts: &ExportOptions, bb: &Aabb2, handle_seed: String) -> Vec<GroupPair> {
    let (min, max) = if bb.is_valid() {
        (bb.min, bb.max)
    } else {
        (Point2::origin(), Point2::origin())
    };
    let mut head = vec![
        GroupPair::new(0, "SECTION"),
        GroupPair::new(2, "HEADER"),
        GroupPair::new(9, "$ACADVER"),
        GroupPair::new(1, "AC1015"),
        GroupPair::new(9, "$HANDSEED"),
        GroupPair::new(5, handle_seed),
        GroupPair::new(9, "$INSUNITS"),
        GroupPair::int(70, insunits(opts.units)),
        GroupPair::new(9, "$MEASUREMENT"),
        GroupPair::int(70, i64::from(opts.units == Units::Mm)),
    ];
    for (name, p) in [("$EXTMIN", min), ("$EXTMAX", max)] {
        head.extend([
            GroupPair::new(9, name),
            GroupPair::real(10, p.x),
            GroupPair::real(20, p.y),
            GroupPair::real(30, 0.0),
        ]);
    }
    head.push(GroupPair::new(0, "ENDSEC"));
    head
}

fn record_subclass(table: &str) -> &'static str {
    match table {
        "VPORT" => "AcDbViewportTableRecord",
        "LTYPE" => "AcDbLinetypeTableRecord",
        "LAYER" => "AcDbLayerTableRecord",
        "STYLE" => "AcDbTextStyleTableRecord",
        "VIEW" => "AcDbViewTableRecord",
        "UCS" => "AcDbUCSTableRecord",
        "APPID" => "AcDbRegAppTableRecord",
        "DIMSTYLE" => "AcDbDimStyleTableRecord",
        _ => "AcDbBlockTableRecord",
    }
}

/// One symbol table with its records. Returns the pairs and the record
/// handles in order.
fn table<const N: usize>(
    handles: &mut Handles,
    name: &str,
    records: [(&str, Vec<GroupPair>); N],
) -> (Vec<GroupPair>, [String; N]) {
    let owner = handles.next();
    let mut pairs = vec![
        GroupPair::new(0, "TABLE"),
        GroupPair::new(2, name),
        GroupPair::new(5, owner.as_str()),
        GroupPair::new(330, "0"),
        GroupPair::new(100, "AcDbSymbolTable"),
        GroupPair::int(70, N as i64),
    ];
    // DIMSTYLE carries its own subclass and handle code
    let handle_code = if name == "DIMSTYLE" {
        pairs.push(GroupPair::new(100, "AcDbDimStyleTable"));
        105
    } else {
        5
    };
    let ids = records.map(|(entry, body)| {
        let id = handles.next();
        pairs.extend([
            GroupPair::new(0, name),
            GroupPair::new(handle_code, id.as_str()),
            GroupPair::new(330, owner.as_str()),
            GroupPair::new(100, "AcDbSymbolTableRecord"),
            GroupPair::new(100, record_subclass(name)),
            GroupPair::new(2, entry),
        ]);
        pairs.extend(body);
        id
    });
    pairs.push(GroupPair::new(0, "ENDTAB"));
    (pairs, ids)
}

fn linetype(description: &str) -> Vec<GroupPair> {
    vec![
        GroupPair::int(70, 0),
        GroupPair::new(3, description),
        GroupPair::int(72, 65),
        GroupPair::int(73, 0),
        GroupPair::real(40, 0.0),
    ]
}

fn layer() -> Vec<GroupPair> {
    vec![
        GroupPair::int(70, 0),
        GroupPair::int(62, 7),
        GroupPair::new(6, "Continuous"),
    ]
}

/// The TABLES section. Also returns the BLOCK_RECORD handles of model and
/// paper space.
fn tables(handles: &mut Handles, layer_name: &str) -> (Vec<GroupPair>, [String; 2]) {
    let mut pairs = vec![GroupPair::new(0, "SECTION"), GroupPair::new(2, "TABLES")];
    pairs.extend(table(handles, "VPORT", []).0);
    pairs.extend(
        table(
            handles,
            "LTYPE",
            [
                ("ByBlock", linetype("")),
                ("ByLayer", linetype("")),
                ("Continuous", linetype("Solid line")),
            ],
        )
        .0,
    );
    let layers = if layer_name == "0" {
        table(handles, "LAYER", [("0", layer())]).0
    } else {
        table(handles, "LAYER", [("0", layer()), (layer_name, layer())]).0
    };
    pairs.extend(layers);
    let style = vec![
        GroupPair::int(70, 0),
        GroupPair::real(40, 0.0),
        GroupPair::real(41, 1.0),
        GroupPair::real(50, 0.0),
        GroupPair::int(71, 0),
        GroupPair::real(42, 2.5),
        GroupPair::new(3, "txt"),
        GroupPair::new(4, ""),
    ];
    pairs.extend(table(handles, "STYLE", [("Standard", style)]).0);
    pairs.extend(table(handles, "VIEW", []).0);
    pairs.extend(table(handles, "UCS", []).0);
    pairs.extend(table(handles, "APPID", [("ACAD", vec![GroupPair::int(70, 0)])]).0);
    pairs.extend(table(handles, "DIMSTYLE", [("Standard", vec![GroupPair::int(70, 0)])]).0);
    let (block_records, spaces) = table(
        handles,
        "BLOCK_RECORD",
        [("*Model_Space", Vec::new()), ("*Paper_Space", Vec::new())],
    );
    pairs.extend(block_records);
    pairs.push(GroupPair::new(0, "ENDSEC"));
    (pairs, spaces)
}

fn blocks(handles: &mut Handles, spaces: &[String; 2]) -> Vec<GroupPair> {
    let mut pairs = vec![GroupPair::new(0, "SECTION"), GroupPair::new(2, "BLOCKS")];
    for (name, owner) in ["*Model_Space", "*Paper_Space"].into_iter().zip(spaces) {
        let paper = name == "*Paper_Space";
        for (kind, subclass) in [("BLOCK", "AcDbBlockBegin"), ("ENDBLK", "AcDbBlockEnd")] {
            pairs.extend([
                GroupPair::new(0, kind),
                GroupPair::new(5, handles.next()),
                GroupPair::new(330, owner.as_str()),
                GroupPair::new(100, "AcDbEntity"),
            ]);
            if paper {
                pairs.push(GroupPair::int(67, 1));
            }
            pairs.extend([GroupPair::new(8, "0"), GroupPair::new(100, subclass)]);
            if kind == "BLOCK" {
                pairs.extend([
                    GroupPair::new(2, name),
                    GroupPair::int(70, 0),
                    GroupPair::real(10, 0.0),
                    GroupPair::real(20, 0.0),
                    GroupPair::real(30, 0.0),
                    GroupPair::new(3, name),
                    GroupPair::new(1, ""),
                ]);
            }
        }
    }
    pairs.push(GroupPair::new(0, "ENDSEC"));
    pairs
}

/// ENTITIES terminator, the OBJECTS section, and EOF.
fn objects(handles: &mut Handles) -> Vec<GroupPair> {
    let root = handles.next();
    let groups = handles.next();
    vec![
        GroupPair::new(0, "ENDSEC"),
        GroupPair::new(0, "SECTION"),
        GroupPair::new(2, "OBJECTS"),
        GroupPair::new(0, "DICTIONARY"),
        GroupPair::new(5, root.as_str()),
        GroupPair::new(330, "0"),
        GroupPair::new(100, "AcDbDictionary"),
        GroupPair::int(281, 1),
        GroupPair::new(3, "ACAD_GROUP"),
        GroupPair::new(350, groups.as_str()),
        GroupPair::new(0, "DICTIONARY"),
        GroupPair::new(5, groups),
        GroupPair::new(330, root),
        GroupPair::new(100, "AcDbDictionary"),
        GroupPair::int(281, 1),
        GroupPair::new(0, "ENDSEC"),
        GroupPair::new(0, "EOF"),
    ]
}

struct EntityWriter<'a> {
    layer: &'a str,
    owner: &'a str,
    handles: &'a mut Handles,
    records: Vec<EntityRecord>,
}

impl EntityWriter<'_> {
    fn push(&mut self, kind: &str, subclass: &str, body: Vec<GroupPair>) {
        let mut groups = vec![
            GroupPair::new(5, self.handles.next()),
            GroupPair::new(330, self.owner),
            GroupPair::new(100, "AcDbEntity"),
            GroupPair::new(8, self.layer),
            GroupPair::new(100, subclass),
        ];
        groups.extend(body);
        self.records.push(EntityRecord::new(kind, groups));
    }

    fn circle(&mut self, center: Point2, radius: f64) {
        self.push(
            "CIRCLE",
            "AcDbCircle",
            vec![
                GroupPair::real(10, center.x),
                GroupPair::real(20, center.y),
                GroupPair::real(30, 0.0),
                GroupPair::real(40, radius),
            ],
        );
    }

    fn lwpolyline(&mut self, lp: &Loop) {
        let mut body = vec![
            GroupPair::int(90, lp.segments.len() as i64),
            GroupPair::int(70, 1),
        ];
        for seg in &lp.segments {
            let p = seg.start();
            body.push(GroupPair::real(10, p.x));
            body.push(GroupPair::real(20, p.y));
            let bulge = seg.bulge();
            if bulge != 0.0 {
                body.push(GroupPair::real(42, bulge));
            }
        }
        self.push("LWPOLYLINE", "AcDbPolyline", body);
    }

    fn segment(&mut self, seg: &Segment) {
        match *seg {
            Segment::Line { start, end } => self.push(
                "LINE",
                "AcDbLine",
                vec![
                    GroupPair::real(10, start.x),
                    GroupPair::real(20, start.y),
                    GroupPair::real(30, 0.0),
                    GroupPair::real(11, end.x),
                    GroupPair::real(21, end.y),
                    GroupPair::real(31, 0.0),
                ],
            ),
            Segment::Arc { center, radius, .. } if seg.is_full_circle() => {
                self.circle(center, radius)
            }
            Segment::Arc {
                center,
                radius,
                start_angle,
                sweep,
            } => {
                // DXF arcs always run counter-clockwise
                let (from, to) = if sweep >= 0.0 {
                    (start_angle, start_angle + sweep)
                } else {
                    (start_angle + sweep, start_angle)
                };
                let mut body = vec![
                    GroupPair::real(10, center.x),
                    GroupPair::real(20, center.y),
                    GroupPair::real(30, 0.0),
                    GroupPair::real(40, radius),
                    GroupPair::new(100, "AcDbArc"),
                ];
                body.push(GroupPair::real(50, normalize_degrees(from.to_degrees())));
                body.push(GroupPair::real(51, normalize_degrees(to.to_degrees())));
                self.push("ARC", "AcDbCircle", body);
            }
        }
    }
}
