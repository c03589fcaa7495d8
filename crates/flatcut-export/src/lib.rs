#![warn(missing_docs)]

//! Drawing output for flat part outlines.
//!
//! Each writer takes an [`Outline2D`] that is already rotated, placed, and
//! scaled into the output units, and produces one file:
//!
//! - DXF R2000 with true arcs, as bulged LWPOLYLINEs or LINE/ARC entities
//! - SVG sized in real units
//! - a one-page PDF drawing with dimensions and a title block
//!
//! ```
//! use flatcut_export::{svg_document, ExportOptions};
//! use flatcut_math::Point2;
//! use flatcut_outline::{Loop, Outline2D};
//!
//! let square = Loop::polygon(&[
//!     Point2::new(0.0, 0.0),
//!     Point2::new(2.0, 0.0),
//!     Point2::new(2.0, 2.0),
//!     Point2::new(0.0, 2.0),
//! ]);
//! let outline = Outline2D { outer: square, holes: Vec::new() };
//! let svg = svg_document(&outline, &ExportOptions::default());
//! assert!(svg.contains(r#"width="2.000000in""#));
//! ```

mod dxf_writer;
mod error;
mod options;
mod pdf_writer;
mod svg_reader;
mod svg_writer;

pub use dxf_writer::{dxf_document, write_dxf};
pub use error::{ExportError, Result};
pub use options::{
    DxfOptions, ExportOptions, ExportTarget, LoopStyle, PageSize, PdfOptions, PdfScale,
    SvgOptions, POINTS_PER_MM,
};
pub use pdf_writer::{length_label, page_layout, pdf_bytes, write_pdf, PageLayout};
pub use svg_reader::{parse_svg, read_svg, SvgDrawing};
pub use svg_writer::{svg_document, write_svg};

use flatcut_outline::Outline2D;
use std::path::Path;

/// Write `outline` to `path` in the given format.
pub fn export(
    outline: &Outline2D,
    target: ExportTarget,
    path: &Path,
    opts: &ExportOptions,
) -> Result<()> {
    match target {
        ExportTarget::Dxf => write_dxf(outline, path, opts),
        ExportTarget::Svg => write_svg(outline, path, opts),
        ExportTarget::Pdf => write_pdf(outline, path, opts),
    }
}
