//! Reading outlines back from SVG.
//!
//! Understands the subset [`svg_document`](crate::svg_document) writes:
//! `<circle>` elements and `<path>` data made of absolute `M`, `L`, `A`, and
//! `Z` commands. Used for checking exports and for the `inspect` command.

use crate::error::{ExportError, Result};
use flatcut_math::{Point2, Tolerance, Units, Vec2};
use flatcut_outline::{Loop, Outline2D, Segment};
use std::fs;
use std::path::Path;

/// An outline read from an SVG file.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgDrawing {
    /// Outline in SVG user units, Y pointing up.
    pub outline: Outline2D,
    /// View box width.
    pub width: f64,
    /// View box height.
    pub height: f64,
    /// Unit of the `width` attribute, when it has a known suffix.
    pub units: Option<Units>,
}

/// Read an SVG file.
pub fn read_svg(path: &Path, tolerance: f64) -> Result<SvgDrawing> {
    let text = fs::read_to_string(path).map_err(|source| ExportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_svg(&text, tolerance)
}

/// Parse SVG text. `tolerance` closes loops and matches endpoints.
pub fn parse_svg(text: &str, tolerance: f64) -> Result<SvgDrawing> {
    let svg_tag = tag_at(text, "<svg").ok_or_else(|| ExportError::Parse("no <svg> element".into()))?;
    let width_attr = extract_attr_str(svg_tag, "width");
    let units = width_attr.and_then(|w| {
        let suffix = w.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == '-');
        suffix.parse::<Units>().ok()
    });
    let (width, height) = match extract_attr_str(svg_tag, "viewBox") {
        Some(vb) => {
            let nums = numbers(vb)?;
            match nums.as_slice() {
                [_, _, w, h] => (*w, *h),
                _ => return Err(ExportError::Parse(format!("bad viewBox '{vb}'"))),
            }
        }
        None => (
            width_attr.map(leading_number).unwrap_or(0.0),
            extract_attr_str(svg_tag, "height")
                .map(leading_number)
                .unwrap_or(0.0),
        ),
    };

    let mut loops = Vec::new();
    let mut search_pos = 0;
    while let Some(found) = text[search_pos..].find("<circle") {
        let start = search_pos + found;
        let tag = tag_at(&text[start..], "<circle").unwrap_or_default();
        let (Some(cx), Some(cy), Some(r)) = (
            extract_attr_f64(tag, "cx"),
            extract_attr_f64(tag, "cy"),
            extract_attr_f64(tag, "r"),
        ) else {
            return Err(ExportError::Parse(format!("incomplete circle '{tag}'")));
        };
        loops.push(Loop::new(vec![Segment::circle(Point2::new(cx, height - cy), r)]));
        search_pos = start + tag.len().max(1);
    }

    search_pos = 0;
    while let Some(found) = text[search_pos..].find("<path") {
        let start = search_pos + found;
        let tag = tag_at(&text[start..], "<path").unwrap_or_default();
        if let Some(d) = extract_attr_str(tag, "d") {
            loops.extend(path_loops(d, height, tolerance)?);
        }
        search_pos = start + tag.len().max(1);
    }

    let outline = Outline2D::from_loops(loops, &Tolerance::linear(tolerance))?;
    Ok(SvgDrawing {
        outline,
        width,
        height,
        units,
    })
}

/// The tag starting at the front of `text`, up to its closing `>`.
fn tag_at<'a>(text: &'a str, open: &str) -> Option<&'a str> {
    let start = text.find(open)?;
    let end = text[start..].find('>')?;
    Some(&text[start..=start + end])
}

fn extract_attr_str<'a>(tag: &'a str, attr: &str) -> Option<&'a str> {
    let pattern = format!(" {attr}=\"");
    let start = tag.find(&pattern)? + pattern.len();
    let end = tag[start..].find('"')?;
    Some(&tag[start..start + end])
}

fn extract_attr_f64(tag: &str, attr: &str) -> Option<f64> {
    extract_attr_str(tag, attr).and_then(|s| s.trim().parse().ok())
}

fn leading_number(s: &str) -> f64 {
    let end = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(s.len());
    s[..end].parse().unwrap_or(0.0)
}

fn numbers(s: &str) -> Result<Vec<f64>> {
    s.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<f64>()
                .map_err(|_| ExportError::Parse(format!("bad number '{t}'")))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Command(char),
    Number(f64),
}

fn tokenize(d: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut number = String::new();
    let flush = |number: &mut String, tokens: &mut Vec<Token>| -> Result<()> {
        if !number.is_empty() {
            let v = number
                .parse::<f64>()
                .map_err(|_| ExportError::Parse(format!("bad number '{number}' in path")))?;
            tokens.push(Token::Number(v));
            number.clear();
        }
        Ok(())
    };
    for c in d.chars() {
        match c {
            'e' | 'E' if !number.is_empty() => number.push(c),
            c if c.is_ascii_alphabetic() => {
                flush(&mut number, &mut tokens)?;
                tokens.push(Token::Command(c));
            }
            '-' | '+' if !number.is_empty() && !number.ends_with(['e', 'E']) => {
                flush(&mut number, &mut tokens)?;
                number.push(c);
            }
            c if c.is_ascii_digit() || c == '.' || c == '-' || c == '+' => number.push(c),
            _ => flush(&mut number, &mut tokens)?,
        }
    }
    flush(&mut number, &mut tokens)?;
    Ok(tokens)
}

struct PathBuilder {
    loops: Vec<Loop>,
    current: Vec<Segment>,
    start: Point2,
    at: Point2,
    tolerance: f64,
}

impl PathBuilder {
    fn close(&mut self) {
        if (self.at - self.start).norm() > self.tolerance {
            self.current.push(Segment::line(self.at, self.start));
        }
        self.at = self.start;
        if !self.current.is_empty() {
            self.loops.push(Loop::new(std::mem::take(&mut self.current)));
        }
    }

    fn arc_to(&mut self, radius: f64, large: bool, sweep_flag: bool, to: Point2) {
        let chord: Vec2 = to - self.at;
        let len = chord.norm();
        if len <= self.tolerance {
            return;
        }
        let radius = radius.abs().max(len / 2.0);
        let ccw = !sweep_flag;
        let h = (radius * radius - len * len / 4.0).max(0.0).sqrt();
        let left = Vec2::new(-chord.y, chord.x) / len;
        let side = if ccw != large { 1.0 } else { -1.0 };
        let center = self.at + chord * 0.5 + left * (h * side);
        self.current.push(Segment::arc_through(self.at, to, center, ccw));
        self.at = to;
    }
}

fn path_loops(d: &str, height: f64, tolerance: f64) -> Result<Vec<Loop>> {
    let tokens = tokenize(d)?;
    let mut b = PathBuilder {
        loops: Vec::new(),
        current: Vec::new(),
        start: Point2::origin(),
        at: Point2::origin(),
        tolerance,
    };
    let mut i = 0;
    let take = |count: usize, i: &mut usize| -> Result<Vec<f64>> {
        let args: Vec<f64> = tokens
            .get(*i..*i + count)
            .ok_or_else(|| ExportError::Parse("path ends inside a command".into()))?
            .iter()
            .map(|t| match t {
                Token::Number(v) => Ok(*v),
                Token::Command(c) => Err(ExportError::Parse(format!("unexpected '{c}' in path"))),
            })
            .collect::<Result<_>>()?;
        *i += count;
        Ok(args)
    };
    let flip = |x: f64, y: f64| Point2::new(x, height - y);

    while i < tokens.len() {
        let Token::Command(cmd) = tokens[i] else {
            return Err(ExportError::Parse("path data must start with a command".into()));
        };
        i += 1;
        match cmd {
            'M' => {
                if !b.current.is_empty() {
                    b.close();
                }
                let a = take(2, &mut i)?;
                b.start = flip(a[0], a[1]);
                b.at = b.start;
            }
            'L' => {
                let a = take(2, &mut i)?;
                let to = flip(a[0], a[1]);
                if (to - b.at).norm() > tolerance {
                    b.current.push(Segment::line(b.at, to));
                    b.at = to;
                }
            }
            'A' => {
                let a = take(7, &mut i)?;
                b.arc_to(a[0], a[3] != 0.0, a[4] != 0.0, flip(a[5], a[6]));
            }
            'Z' | 'z' => b.close(),
            other => {
                return Err(ExportError::Parse(format!(
                    "unsupported path command '{other}'"
                )))
            }
        }
    }
    if !b.current.is_empty() {
        b.close();
    }
    Ok(b.loops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tokenize_compact_numbers() {
        let tokens = tokenize("M1,-2L3.5-4e-1Z").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Command('M'),
                Token::Number(1.0),
                Token::Number(-2.0),
                Token::Command('L'),
                Token::Number(3.5),
                Token::Number(-0.4),
                Token::Command('Z'),
            ]
        );
    }

    #[test]
    fn test_semicircle_arc_center() {
        // from (0,0) to (2,0) counter-clockwise in model space: the arc dips below
        let loops = path_loops("M 0,1 A 1,1 0 0,0 2,1 Z", 1.0, 1e-6).unwrap();
        assert_eq!(loops.len(), 1);
        let Segment::Arc { center, sweep, .. } = loops[0].segments[0] else {
            panic!("expected an arc");
        };
        assert_relative_eq!(center.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(center.y, 0.0, epsilon = 1e-9);
        assert!(sweep > 0.0);
        assert_relative_eq!(loops[0].segments[0].point_at(0.5).y, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_units_and_view_box() {
        let text = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10mm" height="4mm" viewBox="0 0 10 4"><path d="M 0,0 L 10,0 L 10,4 L 0,4 Z"/></svg>"#;
        let drawing = parse_svg(text, 1e-6).unwrap();
        assert_eq!(drawing.units, Some(Units::Mm));
        assert_eq!((drawing.width, drawing.height), (10.0, 4.0));
        assert_relative_eq!(drawing.outline.area(), 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_relative_commands_rejected() {
        let text = r#"<svg width="1in" height="1in" viewBox="0 0 1 1"><path d="m 0,0 l 1,0 z"/></svg>"#;
        assert!(matches!(parse_svg(text, 1e-6), Err(ExportError::Parse(_))));
    }
}
