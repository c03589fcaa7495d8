#![warn(missing_docs)]

//! DXF support for the flatcut pipeline.
//!
//! Reads ASCII DXF into a [`DxfDocument`] that keeps every group pair of the
//! original file, interprets the common 2D entities as outline segments, and
//! rewrites their coordinates under a rigid transform. [`rotate_document`]
//! ties these together: it turns a drawing so its bounding box has the least
//! area and parks the box at the origin.
//!
//! ```
//! use flatcut_dxf::{rotate_document, DxfDocument, RotatorSettings};
//!
//! let text = "  0\nSECTION\n  2\nENTITIES\n  0\nCIRCLE\n 10\n5.0\n 20\n5.0\n 40\n2.0\n  0\nENDSEC\n  0\nEOF\n";
//! let mut doc = DxfDocument::parse(text).unwrap();
//! let report = rotate_document(&mut doc, &RotatorSettings::default()).unwrap();
//! assert!((report.result.width - 4.0).abs() < 1e-9);
//! assert_eq!(doc.entities[0].real(10), Some(2.0));
//! ```

mod codes;
mod document;
mod drawing;
mod entity;
mod error;
mod rewrite;
mod rotator;

pub use codes::{format_real, parse_pairs, write_pairs, GroupPair, LineEnding};
pub use document::{DxfDocument, EntityRecord};
pub use drawing::{build_outline, chain_loops, DrawingOutline};
pub use entity::{decode_entities, DecodedEntity, Geometry, Vertex};
pub use error::{DxfError, Result};
pub use rewrite::{rewrite_entities, RewriteSummary};
pub use rotator::{rotate_document, RotationReport, RotatorSettings, UnsupportedPolicy};
