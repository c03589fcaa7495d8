//! ASCII DXF group-code pairs.
//!
//! A DXF file is a flat sequence of `(code, value)` pairs, each written as
//! two lines. Values are kept as the original text so that anything the
//! rewriter does not touch is written back byte for byte.

use crate::error::{DxfError, Result};
use std::io::{self, Write};

/// One group code and its raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPair {
    /// Group code.
    pub code: i32,
    /// Value text, without the line terminator.
    pub value: String,
}

impl GroupPair {
    /// Pair with a text value.
    pub fn new(code: i32, value: impl Into<String>) -> Self {
        Self {
            code,
            value: value.into(),
        }
    }

    /// Pair with a real value.
    pub fn real(code: i32, value: f64) -> Self {
        Self::new(code, format_real(value))
    }

    /// Pair with an integer value.
    pub fn int(code: i32, value: i64) -> Self {
        Self::new(code, value.to_string())
    }

    /// The value as a number.
    pub fn as_f64(&self) -> Option<f64> {
        self.value.trim().parse().ok().filter(|v: &f64| v.is_finite())
    }

    /// The value as an integer.
    pub fn as_i64(&self) -> Option<i64> {
        self.value.trim().parse().ok()
    }

    /// Whether this pair is `code` with a value equal to `value` (ignoring
    /// surrounding whitespace).
    pub fn is(&self, code: i32, value: &str) -> bool {
        self.code == code && self.value.trim() == value
    }
}

/// Line terminator used when writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    /// The terminator found on the first line of `text`.
    pub fn detect(text: &str) -> Self {
        match text.find('\n') {
            Some(i) if i > 0 && text.as_bytes()[i - 1] == b'\r' => LineEnding::CrLf,
            _ => LineEnding::Lf,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Split ASCII DXF text into pairs. Reading stops after `0 / EOF`.
pub fn parse_pairs(text: &str) -> Result<Vec<GroupPair>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.starts_with("AutoCAD Binary DXF") {
        return Err(DxfError::Parse {
            line: 1,
            message: "binary DXF is not supported".into(),
        });
    }

    let mut lines = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .enumerate();
    let mut pairs = Vec::new();
    while let Some((index, code_line)) = lines.next() {
        let code_line = code_line.trim();
        if code_line.is_empty() {
            // blank lines between pairs are tolerated, trailing ones common
            continue;
        }
        let code: i32 = code_line.parse().map_err(|_| DxfError::Parse {
            line: index + 1,
            message: format!("expected a group code, found '{code_line}'"),
        })?;
        let Some((_, value)) = lines.next() else {
            return Err(DxfError::Parse {
                line: index + 1,
                message: format!("group code {code} has no value"),
            });
        };
        let pair = GroupPair::new(code, value);
        let eof = pair.is(0, "EOF");
        pairs.push(pair);
        if eof {
            break;
        }
    }
    Ok(pairs)
}

/// Write pairs in ASCII DXF form.
pub fn write_pairs<W: Write>(out: &mut W, pairs: &[GroupPair], ending: LineEnding) -> io::Result<()> {
    let nl = ending.as_str();
    for pair in pairs {
        write!(out, "{:>3}{nl}{}{nl}", pair.code, pair.value)?;
    }
    Ok(())
}

/// Format a real for a DXF value: up to 10 decimals, trailing zeros
/// trimmed, always with a decimal point.
pub fn format_real(value: f64) -> String {
    let mut s = format!("{value:.10}");
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').len();
        s.truncate(trimmed);
        if s.ends_with('.') {
            s.push('0');
        }
    }
    if s == "-0.0" {
        s = "0.0".into();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crlf_and_lf_alike() {
        let lf = "  0\nSECTION\n  2\nENTITIES\n  0\nENDSEC\n  0\nEOF\n";
        let crlf = lf.replace('\n', "\r\n");
        let a = parse_pairs(lf).unwrap();
        let b = parse_pairs(&crlf).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
        assert!(a[1].is(2, "ENTITIES"));
        assert_eq!(LineEnding::detect(&crlf), LineEnding::CrLf);
        assert_eq!(LineEnding::detect(lf), LineEnding::Lf);
    }

    #[test]
    fn test_values_keep_their_text() {
        let pairs = parse_pairs("  8\n Layer 1 \n 10\n  12.50\n").unwrap();
        assert_eq!(pairs[0].value, " Layer 1 ");
        assert_eq!(pairs[1].as_f64(), Some(12.5));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_pairs("abc\nLINE\n"),
            Err(DxfError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            parse_pairs("  0\nLINE\n 10"),
            Err(DxfError::Parse { line: 3, .. })
        ));
    }

    #[test]
    fn test_stops_at_eof() {
        let pairs = parse_pairs("  0\nEOF\ngarbage after the end\n").unwrap();
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn test_format_real() {
        assert_eq!(format_real(30.0), "30.0");
        assert_eq!(format_real(0.125), "0.125");
        assert_eq!(format_real(-0.0), "0.0");
        assert_eq!(format_real(1.0 / 3.0), "0.3333333333");
        assert_eq!(format_real(-1e-12), "0.0");
    }

    #[test]
    fn test_write_round_trip() {
        let pairs = vec![GroupPair::new(0, "LINE"), GroupPair::real(10, 2.5)];
        let mut buf = Vec::new();
        write_pairs(&mut buf, &pairs, LineEnding::CrLf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "  0\r\nLINE\r\n 10\r\n2.5\r\n");
        assert_eq!(parse_pairs(&text).unwrap(), pairs);
    }
}
