//! Export targets and per-format options.

use flatcut_math::Units;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportTarget {
    /// AutoCAD DXF (R2000).
    Dxf,
    /// Scalable Vector Graphics.
    Svg,
    /// Single-page PDF drawing.
    Pdf,
}

impl ExportTarget {
    /// Every target, in output order.
    pub const ALL: [ExportTarget; 3] = [ExportTarget::Dxf, ExportTarget::Svg, ExportTarget::Pdf];

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ExportTarget::Dxf => "dxf",
            ExportTarget::Svg => "svg",
            ExportTarget::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ExportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dxf" => Ok(ExportTarget::Dxf),
            "svg" => Ok(ExportTarget::Svg),
            "pdf" => Ok(ExportTarget::Pdf),
            other => Err(format!("unknown format '{other}' (expected dxf, svg, or pdf)")),
        }
    }
}

/// How DXF loops are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopStyle {
    /// One closed LWPOLYLINE with bulges per loop; full circles as CIRCLE.
    #[default]
    Polyline,
    /// Separate LINE, ARC, and CIRCLE entities.
    Segments,
}

/// DXF options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DxfOptions {
    /// Layer for all cut geometry.
    pub layer: String,
    /// Entity style.
    pub loop_style: LoopStyle,
}

impl Default for DxfOptions {
    fn default() -> Self {
        Self {
            layer: "CUT".into(),
            loop_style: LoopStyle::Polyline,
        }
    }
}

/// SVG options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvgOptions {
    /// Stroke color.
    pub stroke: String,
    /// Stroke width in output units.
    pub stroke_width: f64,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            stroke: "black".into(),
            stroke_width: 0.01,
        }
    }
}

/// PDF page size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    /// US Letter, 8.5 x 11 in.
    #[default]
    Letter,
    /// ISO A4, 210 x 297 mm.
    A4,
    /// US Tabloid, 11 x 17 in.
    Tabloid,
    /// Any size, in millimetres.
    Custom {
        /// Page width.
        width_mm: f64,
        /// Page height.
        height_mm: f64,
    },
}

/// PDF points per millimetre.
pub const POINTS_PER_MM: f64 = 72.0 / 25.4;

impl PageSize {
    /// Width and height in PDF points.
    pub fn points(self) -> (f64, f64) {
        match self {
            PageSize::Letter => (612.0, 792.0),
            PageSize::A4 => (210.0 * POINTS_PER_MM, 297.0 * POINTS_PER_MM),
            PageSize::Tabloid => (792.0, 1224.0),
            PageSize::Custom {
                width_mm,
                height_mm,
            } => (width_mm * POINTS_PER_MM, height_mm * POINTS_PER_MM),
        }
    }
}

impl FromStr for PageSize {
    type Err = String;

    /// `letter`, `a4`, `tabloid`, or `<width>x<height>` in millimetres.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "letter" => return Ok(PageSize::Letter),
            "a4" => return Ok(PageSize::A4),
            "tabloid" => return Ok(PageSize::Tabloid),
            _ => {}
        }
        let (w, h) = lower
            .split_once('x')
            .ok_or_else(|| format!("unknown page size '{s}'"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| *v > 0.0 && v.is_finite())
                .ok_or_else(|| format!("invalid page dimension '{v}'"))
        };
        Ok(PageSize::Custom {
            width_mm: parse(w)?,
            height_mm: parse(h)?,
        })
    }
}

/// PDF drawing scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfScale {
    /// Fill the drawing area.
    #[default]
    Fit,
    /// Full size (1:1).
    Actual,
}

/// PDF options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfOptions {
    /// Page size.
    pub page: PageSize,
    /// Page margin, millimetres.
    pub margin_mm: f64,
    /// Drawing scale.
    pub scale: PdfScale,
    /// Draw the title block (part name, thickness, bounding box).
    pub title_block: bool,
    /// Draw width and height dimension lines.
    pub dimensions: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            page: PageSize::Letter,
            margin_mm: 19.05,
            scale: PdfScale::Fit,
            title_block: true,
            dimensions: true,
        }
    }
}

/// Everything an exporter needs besides the outline.
///
/// The outline handed to the exporters is already in `units`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExportOptions {
    /// Output length unit.
    pub units: Units,
    /// Part name for titles.
    pub part_name: String,
    /// Material thickness in `units`.
    pub thickness: Option<f64>,
    /// DXF options.
    pub dxf: DxfOptions,
    /// SVG options.
    pub svg: SvgOptions,
    /// PDF options.
    pub pdf: PdfOptions,
}
