//! Error types for outline construction and optimization.

use thiserror::Error;

/// Errors from building or optimizing an outline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OutlineError {
    /// No loops, or only empty ones.
    #[error("outline is empty")]
    Empty,

    /// A loop's segments do not meet end to start.
    #[error("loop {index} is open (gap {gap:.3e})")]
    OpenLoop {
        /// Loop index in input order.
        index: usize,
        /// Largest gap found.
        gap: f64,
    },

    /// The outer boundary encloses no area.
    #[error("outline has zero area")]
    ZeroArea,

    /// A hole is not inside the outer boundary.
    #[error("loop {index} lies outside the outer boundary")]
    HoleOutside {
        /// Loop index in input order.
        index: usize,
    },

    /// A loop crosses itself.
    #[error("loop {index} intersects itself")]
    SelfIntersection {
        /// Loop index in input order.
        index: usize,
    },

    /// The optimizer found no usable rotation.
    #[error("rotation search failed: {0}")]
    Convergence(String),
}

/// Result type for outline operations.
pub type Result<T> = std::result::Result<T, OutlineError>;
