//! Error types for DXF reading and rewriting.

use flatcut_outline::OutlineError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from reading, interpreting, or rewriting a DXF drawing.
#[derive(Error, Debug)]
pub enum DxfError {
    /// I/O error on a DXF file.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The group-code stream is malformed.
    #[error("DXF parse error at line {line}: {message}")]
    Parse {
        /// Line number (1-indexed).
        line: usize,
        /// Error message.
        message: String,
    },

    /// The drawing has no ENTITIES section.
    #[error("DXF has no ENTITIES section")]
    MissingEntities,

    /// A group value needed for geometry is missing or not a number.
    #[error("{entity}: group {code} is missing or invalid")]
    InvalidValue {
        /// Entity description (type and handle).
        entity: String,
        /// Group code.
        code: i32,
    },

    /// An entity the rewriter cannot transform, under the reject policy.
    #[error("unsupported entity {0}")]
    UnsupportedEntity(String),

    /// Nothing in the drawing has geometry.
    #[error("no geometry found in DXF")]
    NoGeometry,

    /// The rotation search failed.
    #[error(transparent)]
    Outline(#[from] OutlineError),
}

/// Result type for DXF operations.
pub type Result<T> = std::result::Result<T, DxfError>;
