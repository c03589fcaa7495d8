//! DXF Rotator: turn an existing drawing to its smallest bounding box.

use crate::config::Config;
use crate::convert::output_dir;
use crate::error::{ConvertError, Result};
use flatcut_dxf::{rotate_document, DxfDocument, RotationReport};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of [`rotate_dxf`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rotation {
    /// Rotated drawing.
    pub output: PathBuf,
    /// What was done to it.
    pub report: RotationReport,
}

/// Whether `path` is the output of an earlier run.
pub fn already_rotated(path: &Path, suffix: &str) -> bool {
    path.file_stem()
        .map(|s| s.to_string_lossy().ends_with(suffix))
        .unwrap_or(false)
}

/// Where the rotated copy of `input` is written.
pub fn rotated_path(input: &Path, config: &Config) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "drawing".to_string());
    output_dir(input, config).join(format!("{stem}{}.dxf", config.rotator.suffix))
}

/// Rotate one DXF file and write the result next to it (or into the
/// configured output directory). The input is never modified.
pub fn rotate_dxf(path: &Path, config: &Config) -> Result<Rotation> {
    let dxf_err = |source| ConvertError::Dxf {
        path: path.to_path_buf(),
        source,
    };
    let mut doc = DxfDocument::read(path).map_err(dxf_err)?;
    let report = rotate_document(&mut doc, &config.rotator_settings()).map_err(dxf_err)?;

    for entity in &report.passed_through {
        warn!(file = %path.display(), entity = %entity, "entity copied without rotation");
    }
    if report.hull_fallback {
        warn!(
            file = %path.display(),
            "no closed outline found; rotated by the hull of all geometry"
        );
    }

    let output = rotated_path(path, config);
    doc.write(&output).map_err(|source| ConvertError::DxfWrite {
        path: output.clone(),
        source,
    })?;
    info!(
        file = %output.display(),
        angle_deg = report.result.angle_degrees(),
        width = report.result.width,
        height = report.result.height,
        "rotated drawing"
    );
    Ok(Rotation { output, report })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotated_names() {
        let config = Config::default();
        assert!(already_rotated(Path::new("/d/bracket_rotated.dxf"), "_rotated"));
        assert!(!already_rotated(Path::new("/d/bracket.dxf"), "_rotated"));
        assert!(!already_rotated(Path::new("/d/rotated_bracket.dxf"), "_rotated"));
        assert_eq!(
            rotated_path(Path::new("/d/bracket.dxf"), &config),
            PathBuf::from("/d/bracket_rotated.dxf")
        );
        assert_eq!(
            rotated_path(Path::new("/d/Bracket Left.DXF"), &config),
            PathBuf::from("/d/Bracket Left_rotated.dxf")
        );
    }
}
