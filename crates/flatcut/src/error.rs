//! Per-file conversion errors and their reporting kinds.

use flatcut_dxf::DxfError;
use flatcut_export::ExportError;
use flatcut_flatten::FlattenError;
use flatcut_outline::OutlineError;
use flatcut_step::StepError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a failed file, for batch summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The input could not be read or parsed.
    Load,
    /// No extrusion axis could be chosen.
    AmbiguousAxis,
    /// The projected profile is not a valid outline.
    DegenerateProjection,
    /// A DXF entity cannot be transformed under the reject policy.
    UnsupportedEntity,
    /// An output file could not be written.
    ExportWrite,
    /// The rotation search found nothing to work with.
    OptimizerConvergence,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Load => "Load",
            ErrorKind::AmbiguousAxis => "AmbiguousAxis",
            ErrorKind::DegenerateProjection => "DegenerateProjection",
            ErrorKind::UnsupportedEntity => "UnsupportedEntity",
            ErrorKind::ExportWrite => "ExportWrite",
            ErrorKind::OptimizerConvergence => "OptimizerConvergence",
        })
    }
}

/// Why one input file failed.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// STEP loading failed.
    #[error("cannot load {}: {source}", path.display())]
    Step {
        /// Input file.
        path: PathBuf,
        /// Loader error.
        #[source]
        source: StepError,
    },

    /// The input has an extension the pipeline does not handle.
    #[error("{} is not a STEP or DXF file", path.display())]
    UnknownInput {
        /// Input file.
        path: PathBuf,
    },

    /// Axis detection or projection failed.
    #[error(transparent)]
    Flatten(#[from] FlattenError),

    /// The rotation search failed.
    #[error(transparent)]
    Optimizer(#[from] OutlineError),

    /// A DXF input could not be read or rotated.
    #[error("{}: {source}", path.display())]
    Dxf {
        /// Input file.
        path: PathBuf,
        /// DXF error.
        #[source]
        source: DxfError,
    },

    /// A rotated DXF could not be written.
    #[error("cannot write {}: {source}", path.display())]
    DxfWrite {
        /// Output file.
        path: PathBuf,
        /// DXF error.
        #[source]
        source: DxfError,
    },

    /// An exporter failed.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Another input of the same batch writes, or is, this output file.
    #[error("output {} clashes with {}", path.display(), other.display())]
    OutputConflict {
        /// Output file.
        path: PathBuf,
        /// The input that claimed it first.
        other: PathBuf,
    },
}

impl ConvertError {
    /// Reporting kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::Step { .. } | ConvertError::UnknownInput { .. } => ErrorKind::Load,
            ConvertError::Flatten(FlattenError::AmbiguousAxis { .. }) => ErrorKind::AmbiguousAxis,
            ConvertError::Flatten(_) => ErrorKind::DegenerateProjection,
            ConvertError::Optimizer(_) => ErrorKind::OptimizerConvergence,
            ConvertError::Dxf { source, .. } => match source {
                DxfError::UnsupportedEntity(_) => ErrorKind::UnsupportedEntity,
                DxfError::NoGeometry | DxfError::Outline(_) => ErrorKind::OptimizerConvergence,
                _ => ErrorKind::Load,
            },
            ConvertError::DxfWrite { .. }
            | ConvertError::Export(_)
            | ConvertError::OutputConflict { .. } => ErrorKind::ExportWrite,
        }
    }
}

/// Result type for per-file conversions.
pub type Result<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;
    use flatcut_math::Axis;

    #[test]
    fn test_kinds() {
        let ambiguous = ConvertError::from(FlattenError::AmbiguousAxis {
            reason: "cube".into(),
        });
        assert_eq!(ambiguous.kind(), ErrorKind::AmbiguousAxis);

        let degenerate = ConvertError::from(FlattenError::DegenerateProjection {
            axis: Axis::Z,
            source: OutlineError::ZeroArea,
        });
        assert_eq!(degenerate.kind(), ErrorKind::DegenerateProjection);

        let rejected = ConvertError::Dxf {
            path: "a.dxf".into(),
            source: DxfError::UnsupportedEntity("INSERT".into()),
        };
        assert_eq!(rejected.kind(), ErrorKind::UnsupportedEntity);
        assert_eq!(rejected.to_string(), "a.dxf: unsupported entity INSERT");

        let empty = ConvertError::Dxf {
            path: "a.dxf".into(),
            source: DxfError::NoGeometry,
        };
        assert_eq!(empty.kind(), ErrorKind::OptimizerConvergence);

        let missing = ConvertError::Step {
            path: "p.step".into(),
            source: StepError::NoSolids,
        };
        assert_eq!(missing.kind(), ErrorKind::Load);
        assert_eq!(ErrorKind::ExportWrite.to_string(), "ExportWrite");

        let clash = ConvertError::OutputConflict {
            path: "out/part.dxf".into(),
            other: "part.step".into(),
        };
        assert_eq!(clash.kind(), ErrorKind::ExportWrite);
        assert_eq!(
            clash.to_string(),
            "output out/part.dxf clashes with part.step"
        );
    }
}
