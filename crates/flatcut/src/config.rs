//! Run configuration.
//!
//! Every field has a default, so an empty TOML file is a valid
//! configuration:
//!
//! ```toml
//! units = "mm"
//! formats = ["dxf", "pdf"]
//! threads = 4
//!
//! [projection]
//! tolerance = 0.0001
//!
//! [pdf]
//! page = "a4"
//! scale = "actual"
//!
//! [rotator]
//! unsupported = "reject"
//! ```

use flatcut_dxf::{RotatorSettings, UnsupportedPolicy};
use flatcut_export::{DxfOptions, ExportOptions, ExportTarget, PageSize, PdfOptions, SvgOptions};
use flatcut_flatten::ProjectionSettings;
use flatcut_math::Units;
use flatcut_outline::OptimizerSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fatal configuration problems, reported before any file is processed.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        /// Config file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`Config`].
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// No output format selected.
    #[error("no output formats selected")]
    NoFormats,

    /// The output directory is unusable.
    #[error("invalid output directory {}: {reason}", path.display())]
    OutputDir {
        /// The directory.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// A numeric or textual setting is out of range.
    #[error("invalid setting {field}: {reason}")]
    Invalid {
        /// Dotted field name, e.g. `projection.tolerance`.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// DXF Rotator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotatorConfig {
    /// Unsupported entity policy.
    pub unsupported: UnsupportedPolicy,
    /// Appended to the file stem of rotated drawings.
    pub suffix: String,
    /// Endpoint matching tolerance in drawing units.
    pub tolerance: f64,
}

impl Default for RotatorConfig {
    fn default() -> Self {
        Self {
            unsupported: UnsupportedPolicy::Warn,
            suffix: "_rotated".into(),
            tolerance: 1e-4,
        }
    }
}

/// Everything a run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output length unit for STEP conversions.
    pub units: Units,
    /// Formats written per STEP input.
    pub formats: Vec<ExportTarget>,
    /// Output directory; next to each input when unset.
    pub output_dir: Option<PathBuf>,
    /// Worker threads; 0 picks one per core.
    pub threads: usize,
    /// Axis detection and projection.
    pub projection: ProjectionSettings,
    /// Rotation search.
    pub optimizer: OptimizerSettings,
    /// DXF output.
    pub dxf: DxfOptions,
    /// SVG output.
    pub svg: SvgOptions,
    /// PDF output.
    pub pdf: PdfOptions,
    /// DXF Rotator.
    pub rotator: RotatorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            units: Units::Inch,
            formats: ExportTarget::ALL.to_vec(),
            output_dir: None,
            threads: 0,
            projection: ProjectionSettings::default(),
            optimizer: OptimizerSettings::default(),
            dxf: DxfOptions::default(),
            svg: SvgOptions::default(),
            pdf: PdfOptions::default(),
            rotator: RotatorConfig::default(),
        }
    }
}

impl Config {
    /// Parse TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check the conditions that make a whole run pointless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.formats.is_empty() {
            return Err(ConfigError::NoFormats);
        }
        if let Some(dir) = &self.output_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(ConfigError::OutputDir {
                    path: dir.clone(),
                    reason: "not a directory".into(),
                });
            }
        }

        let p = &self.projection;
        positive("projection.tolerance", p.tolerance)?;
        positive("projection.chord_tolerance", p.chord_tolerance)?;
        if !(0.0..1.0).contains(&p.axis_tolerance) {
            return Err(invalid("projection.axis_tolerance", "must be in [0, 1)"));
        }
        if !(p.angular_tolerance_deg > 0.0 && p.angular_tolerance_deg < 45.0) {
            return Err(invalid(
                "projection.angular_tolerance_deg",
                "must be between 0 and 45 degrees",
            ));
        }

        if self.optimizer.sweep_steps == 0 {
            return Err(invalid("optimizer.sweep_steps", "must be at least 1"));
        }
        if self.optimizer.arc_samples < 8 {
            return Err(invalid("optimizer.arc_samples", "must be at least 8"));
        }

        if self.dxf.layer.trim().is_empty() {
            return Err(invalid("dxf.layer", "must not be empty"));
        }
        positive("svg.stroke_width", self.svg.stroke_width)?;
        if !(self.pdf.margin_mm >= 0.0 && self.pdf.margin_mm.is_finite()) {
            return Err(invalid("pdf.margin_mm", "must be zero or more"));
        }
        if let PageSize::Custom {
            width_mm,
            height_mm,
        } = self.pdf.page
        {
            positive("pdf.page.width_mm", width_mm)?;
            positive("pdf.page.height_mm", height_mm)?;
        }

        positive("rotator.tolerance", self.rotator.tolerance)?;
        if self.rotator.suffix.is_empty() {
            return Err(invalid("rotator.suffix", "must not be empty"));
        }
        Ok(())
    }

    /// Exporter options for one part.
    pub fn export_options(&self, part_name: &str, thickness: Option<f64>) -> ExportOptions {
        ExportOptions {
            units: self.units,
            part_name: part_name.to_string(),
            thickness,
            dxf: self.dxf.clone(),
            svg: self.svg.clone(),
            pdf: self.pdf.clone(),
        }
    }

    /// Rotator settings.
    pub fn rotator_settings(&self) -> RotatorSettings {
        RotatorSettings {
            tolerance: self.rotator.tolerance,
            unsupported: self.rotator.unsupported,
            optimizer: self.optimizer,
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be a positive number, got {value}"),
        })
    }
}
