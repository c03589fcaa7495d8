//! Single-page PDF drawings.
//!
//! The page carries the outline (arcs as cubic Béziers), width and height
//! dimension lines, and a title block with the part name, thickness, and
//! bounding box. The file is plain PDF 1.4 with an uncompressed content
//! stream and the two standard Helvetica fonts, so no font data is embedded.

use crate::error::{ExportError, Result};
use crate::options::{ExportOptions, PdfScale, POINTS_PER_MM};
use flatcut_math::{Point2, Units};
use flatcut_outline::{Aabb2, Outline2D, Segment};
use std::f64::consts::FRAC_PI_2;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Title block height, points.
const TITLE_BLOCK_HEIGHT: f64 = 90.0;
/// Gap between the title block and the drawing area, points.
const TITLE_BLOCK_GAP: f64 = 18.0;
/// Room kept for the height label on the right, points.
const DIM_ROOM_RIGHT: f64 = 40.0;
/// Room kept for the width label below, points.
const DIM_ROOM_BELOW: f64 = 30.0;
/// Distance from the part to a dimension line, points.
const DIM_OFFSET: f64 = 12.0;
/// Arrowhead length, points.
const ARROW: f64 = 4.0;

/// Where the drawing lands on the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    /// Page size, points.
    pub page: (f64, f64),
    /// Points per output unit.
    pub scale: f64,
    /// Page position of the bounding box's lower-left corner.
    pub origin: (f64, f64),
    /// Whether the part fits the drawing area at this scale.
    pub fits: bool,
}

/// Place `bbox` on the page described by `opts`.
pub fn page_layout(bbox: &Aabb2, opts: &ExportOptions) -> PageLayout {
    let pdf = &opts.pdf;
    let (pw, ph) = pdf.page.points();
    let margin = pdf.margin_mm * POINTS_PER_MM;
    let bottom = if pdf.title_block {
        margin + TITLE_BLOCK_HEIGHT + TITLE_BLOCK_GAP
    } else {
        margin
    };
    let area_w = (pw - 2.0 * margin).max(1.0);
    let area_h = (ph - bottom - margin).max(1.0);
    let (room_w, room_h) = if pdf.dimensions {
        (DIM_ROOM_RIGHT, DIM_ROOM_BELOW)
    } else {
        (0.0, 0.0)
    };
    let usable_w = (area_w - room_w).max(1.0);
    let usable_h = (area_h - room_h).max(1.0);
    let (bw, bh) = (bbox.width().max(f64::EPSILON), bbox.height().max(f64::EPSILON));

    let scale = match pdf.scale {
        PdfScale::Fit => (usable_w / bw).min(usable_h / bh),
        PdfScale::Actual => POINTS_PER_MM * opts.units.mm_per_unit(),
    };
    let fits = bw * scale <= usable_w + 1e-9 && bh * scale <= usable_h + 1e-9;
    PageLayout {
        page: (pw, ph),
        scale,
        origin: (
            margin + (area_w - bw * scale) / 2.0,
            bottom + (area_h - bh * scale) / 2.0,
        ),
        fits,
    }
}

/// Render `outline` as PDF bytes.
pub fn pdf_bytes(outline: &Outline2D, opts: &ExportOptions) -> Vec<u8> {
    let bbox = outline.bbox();
    let layout = page_layout(&bbox, opts);
    if !layout.fits {
        warn!(
            part = %opts.part_name,
            "part does not fit the page at full size; drawing is clipped"
        );
    }
    let mut content = Content::default();
    content.outline(outline, &bbox, &layout);
    if opts.pdf.dimensions {
        content.dimensions(&bbox, &layout, opts.units);
    }
    if opts.pdf.title_block {
        content.title_block(&bbox, &layout, opts);
    }
    assemble(&content.ops, &layout, &opts.part_name)
}

/// Write `outline` as a PDF file.
pub fn write_pdf(outline: &Outline2D, path: &Path, opts: &ExportOptions) -> Result<()> {
    if outline.is_empty() {
        return Err(ExportError::EmptyOutline);
    }
    fs::write(path, pdf_bytes(outline, opts)).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "wrote PDF");
    Ok(())
}

/// Text for a length label.
pub fn length_label(value: f64, units: Units) -> String {
    match units {
        Units::Inch => format!("{value:.3}\""),
        Units::Mm => format!("{value:.2} mm"),
    }
}

/// Escape a PDF literal string. Characters outside ASCII become `?`.
fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Approximate Helvetica text width, points.
fn text_width(s: &str, size: f64) -> f64 {
    s.chars().count() as f64 * size * 0.5
}

#[derive(Default)]
struct Content {
    ops: String,
}

impl Content {
    fn op(&mut self, line: std::fmt::Arguments<'_>) {
        let _ = self.ops.write_fmt(line);
        self.ops.push('\n');
    }

    fn line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) {
        self.op(format_args!("{x0:.3} {y0:.3} m {x1:.3} {y1:.3} l S"));
    }

    fn text(&mut self, font: &str, size: f64, x: f64, y: f64, s: &str) {
        self.op(format_args!(
            "BT /{font} {size} Tf {x:.3} {y:.3} Td ({}) Tj ET",
            escape_text(s)
        ));
    }

    fn outline(&mut self, outline: &Outline2D, bbox: &Aabb2, layout: &PageLayout) {
        let map = |p: Point2| {
            (
                layout.origin.0 + (p.x - bbox.min.x) * layout.scale,
                layout.origin.1 + (p.y - bbox.min.y) * layout.scale,
            )
        };
        self.op(format_args!("0 G 0.5 w"));
        for lp in outline.loops() {
            let Some(first) = lp.segments.first() else {
                continue;
            };
            let (x, y) = map(first.start());
            self.op(format_args!("{x:.3} {y:.3} m"));
            for seg in &lp.segments {
                match *seg {
                    Segment::Line { end, .. } => {
                        let (x, y) = map(end);
                        self.op(format_args!("{x:.3} {y:.3} l"));
                    }
                    Segment::Arc {
                        center,
                        radius,
                        start_angle,
                        sweep,
                    } => {
                        for [p1, p2, p3] in arc_beziers(center, radius, start_angle, sweep) {
                            let (x1, y1) = map(p1);
                            let (x2, y2) = map(p2);
                            let (x3, y3) = map(p3);
                            self.op(format_args!(
                                "{x1:.3} {y1:.3} {x2:.3} {y2:.3} {x3:.3} {y3:.3} c"
                            ));
                        }
                    }
                }
            }
            self.op(format_args!("h"));
        }
        self.op(format_args!("S"));
    }

    fn dimensions(&mut self, bbox: &Aabb2, layout: &PageLayout, units: Units) {
        let (ox, oy) = layout.origin;
        let w = bbox.width() * layout.scale;
        let h = bbox.height() * layout.scale;
        self.op(format_args!("0.3 G 0.3 g 0.4 w"));

        // width, below the part
        let dy = oy - DIM_OFFSET;
        self.line(ox, dy, ox + w, dy);
        self.line(ox, dy, ox + ARROW, dy + ARROW / 2.0);
        self.line(ox, dy, ox + ARROW, dy - ARROW / 2.0);
        self.line(ox + w, dy, ox + w - ARROW, dy + ARROW / 2.0);
        self.line(ox + w, dy, ox + w - ARROW, dy - ARROW / 2.0);
        self.op(format_args!("[1 2] 0 d"));
        self.line(ox, oy, ox, dy - 4.0);
        self.line(ox + w, oy, ox + w, dy - 4.0);
        self.op(format_args!("[] 0 d"));
        let label = length_label(bbox.width(), units);
        self.text("F1", 8.0, ox + (w - text_width(&label, 8.0)) / 2.0, dy - 12.0, &label);

        // height, right of the part
        let dx = ox + w + DIM_OFFSET;
        self.line(dx, oy, dx, oy + h);
        self.line(dx, oy, dx - ARROW / 2.0, oy + ARROW);
        self.line(dx, oy, dx + ARROW / 2.0, oy + ARROW);
        self.line(dx, oy + h, dx - ARROW / 2.0, oy + h - ARROW);
        self.line(dx, oy + h, dx + ARROW / 2.0, oy + h - ARROW);
        self.op(format_args!("[1 2] 0 d"));
        self.line(ox + w, oy, dx + 4.0, oy);
        self.line(ox + w, oy + h, dx + 4.0, oy + h);
        self.op(format_args!("[] 0 d"));
        let label = length_label(bbox.height(), units);
        let ty = oy + (h - text_width(&label, 8.0)) / 2.0;
        self.op(format_args!(
            "BT /F1 8 Tf 0 1 -1 0 {:.3} {ty:.3} Tm ({}) Tj ET",
            dx + 12.0,
            escape_text(&label)
        ));
    }

    fn title_block(&mut self, bbox: &Aabb2, layout: &PageLayout, opts: &ExportOptions) {
        let margin = opts.pdf.margin_mm * POINTS_PER_MM;
        let (pw, _) = layout.page;
        let (x, y) = (margin, margin);
        let w = pw - 2.0 * margin;
        let mid = y + TITLE_BLOCK_HEIGHT / 2.0;
        self.op(format_args!("0 G 0 g 1 w"));
        self.op(format_args!(
            "{x:.3} {y:.3} {w:.3} {TITLE_BLOCK_HEIGHT:.3} re S"
        ));
        self.op(format_args!("0.5 w"));
        self.line(x, mid, x + w, mid);

        let name = if opts.part_name.is_empty() {
            "Untitled"
        } else {
            opts.part_name.as_str()
        };
        self.text("F2", 14.0, x + 10.0, mid + 14.0, name);
        let thickness = opts
            .thickness
            .map(|t| format!("Thickness: {}", length_label(t, opts.units)))
            .unwrap_or_else(|| "Thickness: -".to_string());
        self.text("F1", 11.0, x + 10.0, y + 16.0, &thickness);
        let size = format!(
            "Bounding Box: {} x {}",
            length_label(bbox.width(), opts.units),
            length_label(bbox.height(), opts.units)
        );
        self.text("F1", 11.0, x + w / 2.0, y + 16.0, &size);
    }
}

/// Cubic Bézier control points for an arc, one curve per quarter turn or
/// less. Each entry is `[control1, control2, end]`.
fn arc_beziers(center: Point2, radius: f64, start: f64, sweep: f64) -> Vec<[Point2; 3]> {
    let pieces = (sweep.abs() / FRAC_PI_2 - 1e-9).ceil().max(1.0) as usize;
    let step = sweep / pieces as f64;
    let k = 4.0 / 3.0 * (step / 4.0).tan();
    let at = |a: f64| Point2::new(center.x + radius * a.cos(), center.y + radius * a.sin());
    (0..pieces)
        .map(|i| {
            let a0 = start + step * i as f64;
            let a1 = a0 + step;
            let p0 = at(a0);
            let p3 = at(a1);
            let c1 = Point2::new(p0.x - k * radius * a0.sin(), p0.y + k * radius * a0.cos());
            let c2 = Point2::new(p3.x + k * radius * a1.sin(), p3.y - k * radius * a1.cos());
            [c1, c2, p3]
        })
        .collect()
}

/// Wrap a content stream into a one-page document.
fn assemble(content: &str, layout: &PageLayout, title: &str) -> Vec<u8> {
    let (pw, ph) = layout.page;
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {pw:.2} {ph:.2}] \
             /Resources << /Font << /F1 5 0 R /F2 6 0 R >> >> /Contents 4 0 R >>"
        ),
        format!(
            "<< /Length {} >>\nstream\n{content}endstream",
            content.len()
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
            .to_string(),
        format!(
            "<< /Title ({}) /Producer (flatcut {}) >>",
            escape_text(title),
            env!("CARGO_PKG_VERSION")
        ),
    ];

    let mut out: Vec<u8> = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }
    let xref = out.len();
    let mut table = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in &offsets {
        let _ = writeln!(table, "{offset:010} 00000 n ");
    }
    let _ = write!(
        table,
        "trailer\n<< /Size {} /Root 1 0 R /Info 7 0 R >>\nstartxref\n{xref}\n%%EOF\n",
        objects.len() + 1
    );
    out.extend_from_slice(table.as_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{PageSize, PdfOptions};
    use approx::assert_relative_eq;
    use flatcut_outline::Loop;

    fn disc(radius: f64) -> Outline2D {
        Outline2D {
            outer: Loop::new(vec![Segment::circle(Point2::new(0.0, 0.0), radius)]),
            holes: Vec::new(),
        }
    }

    fn bare() -> ExportOptions {
        ExportOptions {
            pdf: PdfOptions {
                title_block: false,
                dimensions: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let bytes = pdf_bytes(&disc(1.0), &ExportOptions::default());
        let text = String::from_utf8_lossy(&bytes).into_owned();
        assert!(bytes.starts_with(b"%PDF-1.4\n"));
        assert!(text.ends_with("%%EOF\n"));

        let start = text.rfind("startxref\n").unwrap() + "startxref\n".len();
        let xref: usize = text[start..].lines().next().unwrap().parse().unwrap();
        assert!(bytes[xref..].starts_with(b"xref\n0 8\n"));
        let table = String::from_utf8_lossy(&bytes[xref..]).into_owned();
        let entries: Vec<&str> = table.lines().skip(3).take(7).collect();
        for (i, entry) in entries.iter().enumerate() {
            let offset: usize = entry[..10].parse().unwrap();
            let header = format!("{} 0 obj\n", i + 1);
            assert!(bytes[offset..].starts_with(header.as_bytes()), "object {}", i + 1);
        }
    }

    #[test]
    fn test_circle_is_four_curves() {
        let bytes = pdf_bytes(&disc(1.0), &bare());
        let text = String::from_utf8_lossy(&bytes);
        assert_eq!(text.lines().filter(|l| l.ends_with(" c")).count(), 4);
        assert!(!text.contains(" Tj "));
    }

    #[test]
    fn test_bezier_midpoint_stays_on_circle() {
        let curves = arc_beziers(Point2::new(0.0, 0.0), 2.0, 0.0, FRAC_PI_2);
        assert_eq!(curves.len(), 1);
        let [c1, c2, p3] = curves[0];
        let p0 = Point2::new(2.0, 0.0);
        // cubic at t = 0.5
        let mid = Point2::new(
            0.125 * p0.x + 0.375 * c1.x + 0.375 * c2.x + 0.125 * p3.x,
            0.125 * p0.y + 0.375 * c1.y + 0.375 * c2.y + 0.125 * p3.y,
        );
        assert_relative_eq!(mid.coords.norm(), 2.0, epsilon = 1e-3);
        assert_relative_eq!(p3.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fit_and_actual_scale() {
        let bbox = Aabb2 {
            min: Point2::new(0.0, 0.0),
            max: Point2::new(2.0, 1.0),
        };
        let mut opts = bare();
        opts.pdf.scale = PdfScale::Actual;
        let layout = page_layout(&bbox, &opts);
        assert_relative_eq!(layout.scale, 72.0, epsilon = 1e-9);
        assert!(layout.fits);

        opts.units = Units::Mm;
        let layout = page_layout(&bbox, &opts);
        assert_relative_eq!(layout.scale, POINTS_PER_MM, epsilon = 1e-9);

        opts.pdf.scale = PdfScale::Fit;
        opts.pdf.page = PageSize::Letter;
        let layout = page_layout(&bbox, &opts);
        let usable_w = 612.0 - 2.0 * 19.05 * POINTS_PER_MM;
        assert_relative_eq!(layout.scale, usable_w / 2.0, epsilon = 1e-6);
        // centered horizontally
        assert_relative_eq!(layout.origin.0 + 2.0 * layout.scale / 2.0, 306.0, epsilon = 1e-6);
    }

    #[test]
    fn test_labels_and_escaping() {
        assert_eq!(length_label(1.5, Units::Inch), "1.500\"");
        assert_eq!(length_label(12.346, Units::Mm), "12.35 mm");
        assert_eq!(escape_text("a(b)\\ø"), "a\\(b\\)\\\\?");

        let opts = ExportOptions {
            part_name: "Gusset (left)".into(),
            thickness: Some(0.125),
            ..Default::default()
        };
        let text = String::from_utf8_lossy(&pdf_bytes(&disc(1.0), &opts)).into_owned();
        assert!(text.contains("(Gusset \\(left\\)) Tj"));
        assert!(text.contains("(Thickness: 0.125\") Tj"));
        assert!(text.contains("(Bounding Box: 2.000\" x 2.000\") Tj"));
    }
}
