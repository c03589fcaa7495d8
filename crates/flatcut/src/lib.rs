#![warn(missing_docs)]

//! Flat patterns for laser cutting.
//!
//! Two pipelines share one rotation search:
//!
//! - **STEP conversion**: load a solid, find the axis it was extruded along,
//!   project the profile to a 2D outline with true arcs, rotate it to the
//!   smallest bounding box, and write DXF, SVG, and PDF drawings.
//! - **DXF Rotator**: rotate an existing drawing the same way while keeping
//!   every entity type and attribute.
//!
//! [`run_batch`] runs either pipeline over many files in parallel and
//! reports each file separately.
//!
//! ```no_run
//! use flatcut::{run_batch, CancellationToken, Config};
//! use std::path::PathBuf;
//!
//! let config = Config::load("flatcut.toml")?;
//! let inputs = vec![PathBuf::from("bracket.step"), PathBuf::from("panel.dxf")];
//! let report = run_batch(&inputs, &config, &CancellationToken::new())?;
//! println!("{}", report.to_json()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod rotate;

pub use batch::{
    run_batch, run_batch_with, BatchReport, CancellationToken, FileOutcome, FileReport, InputKind,
    Reporter,
};
pub use config::{Config, ConfigError, RotatorConfig};
pub use convert::{
    convert_step, output_paths, prepare_step, Conversion, FlatPart, PartSummary,
};
pub use error::{ConvertError, ErrorKind, Result};
pub use rotate::{already_rotated, rotate_dxf, rotated_path, Rotation};

pub use flatcut_dxf::UnsupportedPolicy;
pub use flatcut_export::ExportTarget;
pub use flatcut_math::Units;
