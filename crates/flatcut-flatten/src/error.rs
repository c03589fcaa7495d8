//! Error types for axis detection and projection.

use flatcut_math::Axis;
use flatcut_outline::OutlineError;
use thiserror::Error;

/// Errors from flattening a solid.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlattenError {
    /// No principal axis stands out as the extrusion direction.
    #[error("cannot choose an extrusion axis: {reason}")]
    AmbiguousAxis {
        /// Why the choice failed.
        reason: String,
    },

    /// No planar face is orthogonal to the chosen axis.
    #[error("no planar face orthogonal to {axis}")]
    NoProfileFace {
        /// The axis.
        axis: Axis,
    },

    /// The projected profile is not a valid outline.
    #[error("degenerate projection along {axis}: {source}")]
    DegenerateProjection {
        /// The axis.
        axis: Axis,
        /// What was wrong with the outline.
        #[source]
        source: OutlineError,
    },
}

/// Result type for flattening.
pub type Result<T> = std::result::Result<T, FlattenError>;
