//! Export error type.

use flatcut_dxf::DxfError;
use flatcut_outline::OutlineError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from writing (or reading back) an exported drawing.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The output file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Output path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A drawing could not be read back.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Input path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// DXF reading or writing failed.
    #[error(transparent)]
    Dxf(#[from] DxfError),

    /// An SVG drawing could not be read.
    #[error("SVG parse error: {0}")]
    Parse(String),

    /// Geometry read back from a drawing does not form an outline.
    #[error(transparent)]
    Outline(#[from] OutlineError),

    /// Nothing to draw.
    #[error("outline is empty")]
    EmptyOutline,
}

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;
