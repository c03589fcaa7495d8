//! STEP to flat pattern: load, flatten, rotate, export.

use crate::config::Config;
use crate::error::{ConvertError, Result};
use flatcut_brep::{Solid, SolidGeometry};
use flatcut_export::export;
use flatcut_flatten::{flatten, AxisReason};
use flatcut_math::{Axis, Units};
use flatcut_outline::{optimize, Outline2D};
use flatcut_step::{read_model, StepError};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What the pipeline found out about a part.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartSummary {
    /// Part name used in drawings (the file stem).
    pub name: String,
    /// Body name from the STEP file.
    pub solid: String,
    /// Bodies in the file.
    pub solids: usize,
    /// Declared length unit of the file.
    pub source_unit: String,
    /// Extrusion axis.
    pub axis: Axis,
    /// Why the axis was chosen.
    pub axis_reason: AxisReason,
    /// Output unit.
    pub units: Units,
    /// Thickness in output units.
    pub thickness: f64,
    /// Bounding box width after rotation, output units.
    pub width: f64,
    /// Bounding box height after rotation, output units.
    pub height: f64,
    /// Applied rotation, degrees.
    pub angle_deg: f64,
    /// Holes in the outline.
    pub holes: usize,
    /// Boundary segments.
    pub segments: usize,
    /// Arc segments among them.
    pub arcs: usize,
}

impl PartSummary {
    /// One-line description for logs and reports.
    pub fn describe(&self) -> String {
        format!(
            "{} axis, {:.3} x {:.3} {} (thickness {:.3}), rotated {:.2} deg, {} holes",
            self.axis,
            self.width,
            self.height,
            self.units,
            self.thickness,
            self.angle_deg,
            self.holes
        )
    }
}

/// A part ready to export: outline rotated, parked at the origin, and in
/// output units.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatPart {
    /// Facts about the part.
    pub summary: PartSummary,
    /// Final outline.
    pub outline: Outline2D,
}

/// Outcome of [`convert_step`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    /// Facts about the part.
    pub summary: PartSummary,
    /// Files written, in format order.
    pub outputs: Vec<PathBuf>,
}

/// Stem used for output files: the input stem with spaces replaced.
pub fn output_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().replace(' ', "_"))
        .unwrap_or_else(|| "part".to_string())
}

/// Directory outputs for `input` go to.
pub fn output_dir(input: &Path, config: &Config) -> PathBuf {
    match &config.output_dir {
        Some(dir) => dir.clone(),
        None => input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    }
}

/// Load, flatten, and rotate a STEP file without writing anything.
pub fn prepare_step(path: &Path, config: &Config) -> Result<FlatPart> {
    let step_err = |source| ConvertError::Step {
        path: path.to_path_buf(),
        source,
    };
    let data = fs::read(path).map_err(|e| step_err(e.into()))?;
    let model = read_model(&data).map_err(step_err)?;
    let solid = largest_solid(&model.solids).ok_or_else(|| step_err(StepError::NoSolids))?;
    if model.solids.len() > 1 {
        warn!(
            file = %path.display(),
            solids = model.solids.len(),
            chosen = solid.name(),
            "file has several bodies; flattening the largest"
        );
    }

    let (choice, profile) = flatten(solid, &config.projection)?;
    info!(
        file = %path.display(),
        axis = %choice.axis,
        reason = %choice.reason,
        thickness_mm = choice.thickness,
        "extrusion axis"
    );
    let best = optimize(&profile.outline, &config.optimizer)?;

    let factor = config.units.from_mm();
    let outline = best.outline.scaled(factor);
    let summary = PartSummary {
        name: output_stem(path),
        solid: solid.name().to_string(),
        solids: model.solids.len(),
        source_unit: model.unit.name.clone(),
        axis: choice.axis,
        axis_reason: choice.reason,
        units: config.units,
        thickness: profile.thickness * factor,
        width: best.result.width * factor,
        height: best.result.height * factor,
        angle_deg: best.result.angle_degrees(),
        holes: outline.holes.len(),
        segments: outline.segment_count(),
        arcs: outline.arc_count(),
    };
    debug!(summary = %summary.describe(), "prepared part");
    Ok(FlatPart { summary, outline })
}

/// Files [`convert_step`] writes for `input`, one per configured format.
pub fn output_paths(input: &Path, config: &Config) -> Vec<PathBuf> {
    let dir = output_dir(input, config);
    let stem = output_stem(input);
    config
        .formats
        .iter()
        .map(|target| dir.join(format!("{stem}.{}", target.extension())))
        .collect()
}

/// Convert a STEP file into every configured format.
pub fn convert_step(path: &Path, config: &Config) -> Result<Conversion> {
    let part = prepare_step(path, config)?;
    let opts = config.export_options(&part.summary.name, Some(part.summary.thickness));

    let mut outputs = Vec::with_capacity(config.formats.len());
    for (&target, out) in config.formats.iter().zip(output_paths(path, config)) {
        export(&part.outline, target, &out, &opts)?;
        info!(file = %out.display(), format = %target, "exported");
        outputs.push(out);
    }
    Ok(Conversion {
        summary: part.summary,
        outputs,
    })
}

/// The body with the largest bounding box volume.
fn largest_solid(solids: &[Solid]) -> Option<&Solid> {
    solids
        .iter()
        .map(|s| (s.bounding_box().volume(), s))
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, s)| s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatcut_brep::{extrude, ProfileLoop};
    use flatcut_math::Point2;

    #[test]
    fn test_output_names() {
        assert_eq!(output_stem(Path::new("/parts/Side Panel v2.step")), "Side_Panel_v2");
        let config = Config::default();
        assert_eq!(
            output_dir(Path::new("/parts/a.step"), &config),
            PathBuf::from("/parts")
        );
        assert_eq!(output_dir(Path::new("a.step"), &config), PathBuf::from(""));
        let config = Config {
            output_dir: Some("/out".into()),
            ..Default::default()
        };
        assert_eq!(output_dir(Path::new("/parts/a.step"), &config), PathBuf::from("/out"));
        assert_eq!(
            output_paths(Path::new("/parts/a b.STEP"), &config),
            vec![
                PathBuf::from("/out/a_b.dxf"),
                "/out/a_b.svg".into(),
                "/out/a_b.pdf".into()
            ]
        );
    }

    #[test]
    fn test_largest_solid() {
        let small = extrude(
            "washer",
            Axis::Z,
            &ProfileLoop::circle(Point2::origin(), 5.0),
            &[],
            1.0,
        );
        let big = extrude(
            "plate",
            Axis::Z,
            &ProfileLoop::rectangle(Point2::origin(), 50.0, 20.0),
            &[],
            3.0,
        );
        let solids = vec![small, big];
        assert_eq!(largest_solid(&solids).unwrap().name(), "plate");
        assert!(largest_solid(&[]).is_none());
    }
}
