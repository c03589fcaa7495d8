//! A DXF drawing split around its ENTITIES section.

use crate::codes::{format_real, parse_pairs, write_pairs, GroupPair, LineEnding};
use crate::error::{DxfError, Result};
use flatcut_math::Point2;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::warn;

/// One entity: its type pair (`0 / TYPE`) followed by all of its groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRecord {
    /// All pairs, type pair first.
    pub pairs: Vec<GroupPair>,
}

impl EntityRecord {
    /// Build a record of type `kind` with the given groups.
    pub fn new(kind: &str, groups: Vec<GroupPair>) -> Self {
        let mut pairs = Vec::with_capacity(groups.len() + 1);
        pairs.push(GroupPair::new(0, kind));
        pairs.extend(groups);
        Self { pairs }
    }

    /// Entity type name (`LINE`, `ARC`, ...).
    pub fn kind(&self) -> &str {
        self.pairs.first().map_or("", |p| p.value.trim())
    }

    /// First value of `code`.
    pub fn value(&self, code: i32) -> Option<&str> {
        self.pairs
            .iter()
            .skip(1)
            .find(|p| p.code == code)
            .map(|p| p.value.as_str())
    }

    /// First value of `code` as a number.
    pub fn real(&self, code: i32) -> Option<f64> {
        self.pairs
            .iter()
            .skip(1)
            .find(|p| p.code == code)
            .and_then(GroupPair::as_f64)
    }

    /// First value of `code` as an integer.
    pub fn int(&self, code: i32) -> Option<i64> {
        self.pairs
            .iter()
            .skip(1)
            .find(|p| p.code == code)
            .and_then(GroupPair::as_i64)
    }

    /// Overwrite the first value of `code`. Returns false when absent.
    pub fn set_real(&mut self, code: i32, value: f64) -> bool {
        match self.pairs.iter_mut().skip(1).find(|p| p.code == code) {
            Some(pair) => {
                pair.value = format_real(value);
                true
            }
            None => false,
        }
    }

    /// Entity handle (group 5).
    pub fn handle(&self) -> Option<&str> {
        self.value(5).map(str::trim)
    }

    /// Z component of the extrusion direction (group 230, default 1).
    pub fn extrusion_z(&self) -> f64 {
        self.real(230).unwrap_or(1.0)
    }

    /// Whether the entity's object coordinate system is mirrored
    /// (extrusion `(0, 0, -1)`).
    pub fn is_mirrored(&self) -> bool {
        self.extrusion_z() < 0.0
    }

    /// Short description for messages, e.g. `TEXT (handle 2A)`.
    pub fn describe(&self) -> String {
        match self.handle() {
            Some(h) => format!("{} (handle {h})", self.kind()),
            None => self.kind().to_string(),
        }
    }
}

/// A parsed DXF file: everything before the entity list, the entities, and
/// everything after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DxfDocument {
    /// Pairs up to and including `2 / ENTITIES`.
    pub head: Vec<GroupPair>,
    /// Entity records in file order.
    pub entities: Vec<EntityRecord>,
    /// Pairs from the ENTITIES `0 / ENDSEC` to the end.
    pub tail: Vec<GroupPair>,
    /// Terminator to write with.
    pub line_ending: LineEnding,
}

impl DxfDocument {
    /// Parse DXF text.
    pub fn parse(text: &str) -> Result<Self> {
        let pairs = parse_pairs(text)?;
        let start = pairs
            .windows(2)
            .position(|w| w[0].is(0, "SECTION") && w[1].is(2, "ENTITIES"))
            .map(|i| i + 2)
            .ok_or(DxfError::MissingEntities)?;
        let end = pairs[start..]
            .iter()
            .position(|p| p.is(0, "ENDSEC"))
            .map(|i| start + i)
            .ok_or(DxfError::Parse {
                line: 0,
                message: "ENTITIES section is not terminated".into(),
            })?;

        let mut entities: Vec<EntityRecord> = Vec::new();
        for pair in &pairs[start..end] {
            if pair.code == 0 {
                entities.push(EntityRecord {
                    pairs: vec![pair.clone()],
                });
            } else if let Some(current) = entities.last_mut() {
                current.pairs.push(pair.clone());
            } else {
                return Err(DxfError::Parse {
                    line: 0,
                    message: format!("group {} before the first entity", pair.code),
                });
            }
        }

        Ok(Self {
            head: pairs[..start].to_vec(),
            entities,
            tail: pairs[end..].to_vec(),
            line_ending: LineEnding::detect(text),
        })
    }

    /// Read and parse a DXF file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| DxfError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), "DXF is not UTF-8, decoding lossily");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        Self::parse(&text)
    }

    /// All pairs in file order.
    pub fn pairs(&self) -> impl Iterator<Item = &GroupPair> {
        self.head
            .iter()
            .chain(self.entities.iter().flat_map(|e| e.pairs.iter()))
            .chain(self.tail.iter())
    }

    /// Serialize to a writer.
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        let pairs: Vec<GroupPair> = self.pairs().cloned().collect();
        write_pairs(out, &pairs, self.line_ending)
    }

    /// Serialize to a string.
    pub fn to_text(&self) -> String {
        let mut buf = Vec::new();
        // writing to a Vec cannot fail
        let _ = self.write_to(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Write the document to `path`.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let io_err = |source| DxfError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = fs::File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer).map_err(io_err)?;
        writer.flush().map_err(io_err)
    }

    fn header_range(&self, name: &str) -> Option<std::ops::Range<usize>> {
        let start = self
            .head
            .iter()
            .position(|p| p.code == 9 && p.value.trim() == name)?
            + 1;
        let len = self.head[start..]
            .iter()
            .position(|p| p.code == 9 || p.code == 0)
            .unwrap_or(self.head.len() - start);
        Some(start..start + len)
    }

    /// Value of a header variable's group (e.g. `$INSUNITS`, 70).
    pub fn header_value(&self, name: &str, code: i32) -> Option<&str> {
        let range = self.header_range(name)?;
        self.head[range]
            .iter()
            .find(|p| p.code == code)
            .map(|p| p.value.as_str())
    }

    /// XY of a point header variable such as `$EXTMIN`.
    pub fn header_point(&self, name: &str) -> Option<Point2> {
        let x = self.header_value(name, 10)?.trim().parse().ok()?;
        let y = self.header_value(name, 20)?.trim().parse().ok()?;
        Some(Point2::new(x, y))
    }

    /// Overwrite the XY of a point header variable. Returns false when the
    /// variable is not present.
    pub fn set_header_point(&mut self, name: &str, p: &Point2) -> bool {
        let Some(range) = self.header_range(name) else {
            return false;
        };
        for pair in &mut self.head[range] {
            match pair.code {
                10 => pair.value = format_real(p.x),
                20 => pair.value = format_real(p.y),
                _ => {}
            }
        }
        true
    }
}
