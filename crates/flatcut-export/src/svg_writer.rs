//! SVG output.
//!
//! The drawing is shifted so its bounding box starts at the origin and
//! flipped into SVG's downward Y. Document width and height carry the unit
//! suffix, and the view box uses the same numbers, so one user unit is one
//! output unit.

use crate::error::{ExportError, Result};
use crate::options::ExportOptions;
use flatcut_math::Point2;
use flatcut_outline::{Loop, Outline2D, Segment};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Maps outline coordinates into the SVG frame.
#[derive(Debug, Clone, Copy)]
struct Frame {
    min: Point2,
    height: f64,
}

impl Frame {
    fn map(&self, p: &Point2) -> (f64, f64) {
        (p.x - self.min.x, self.height - (p.y - self.min.y))
    }
}

/// Render `outline` as an SVG document.
pub fn svg_document(outline: &Outline2D, opts: &ExportOptions) -> String {
    let bb = outline.bbox();
    let (width, height, min) = if bb.is_valid() {
        (bb.width(), bb.height(), bb.min)
    } else {
        (0.0, 0.0, Point2::origin())
    };
    let frame = Frame { min, height };
    let unit = opts.units.suffix();

    let mut svg = String::new();
    let _ = writeln!(svg, r#"<?xml version="1.0" encoding="utf-8"?>"#);
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width:.6}{unit}" height="{height:.6}{unit}" viewBox="0 0 {width:.6} {height:.6}">"#
    );
    if !opts.part_name.is_empty() {
        let _ = writeln!(svg, "<title>{}</title>", escape(&opts.part_name));
    }
    let _ = writeln!(
        svg,
        r#"<g fill="none" stroke="{}" stroke-width="{}" fill-rule="evenodd">"#,
        escape(&opts.svg.stroke),
        opts.svg.stroke_width
    );
    for lp in outline.loops() {
        match lp.as_circle() {
            Some((center, radius)) => {
                let (cx, cy) = frame.map(&center);
                let _ = writeln!(svg, r#"<circle cx="{cx:.6}" cy="{cy:.6}" r="{radius:.6}"/>"#);
            }
            None => {
                let _ = writeln!(svg, r#"<path d="{}"/>"#, path_data(lp, &frame));
            }
        }
    }
    svg.push_str("</g>\n</svg>\n");
    svg
}

/// Write `outline` as an SVG file.
pub fn write_svg(outline: &Outline2D, path: &Path, opts: &ExportOptions) -> Result<()> {
    if outline.is_empty() {
        return Err(ExportError::EmptyOutline);
    }
    fs::write(path, svg_document(outline, opts)).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "wrote SVG");
    Ok(())
}

fn path_data(lp: &Loop, frame: &Frame) -> String {
    let mut d = String::new();
    let Some(first) = lp.segments.first() else {
        return d;
    };
    let (x, y) = frame.map(&first.start());
    let _ = write!(d, "M {x:.6},{y:.6}");
    for seg in &lp.segments {
        match *seg {
            Segment::Line { end, .. } => {
                let (x, y) = frame.map(&end);
                let _ = write!(d, " L {x:.6},{y:.6}");
            }
            Segment::Arc { radius, sweep, .. } => {
                // an SVG arc cannot close on itself
                let pieces = if seg.is_full_circle() { 2 } else { 1 };
                let part = sweep / pieces as f64;
                let large = u8::from(part.abs() > std::f64::consts::PI);
                // Y is flipped, so counter-clockwise becomes SVG's negative sweep
                let flag = u8::from(part < 0.0);
                for i in 1..=pieces {
                    let (x, y) = frame.map(&seg.point_at(i as f64 / pieces as f64));
                    let _ = write!(d, " A {radius:.6},{radius:.6} 0 {large},{flag} {x:.6},{y:.6}");
                }
            }
        }
    }
    d.push_str(" Z");
    d
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
