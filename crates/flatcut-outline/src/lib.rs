#![warn(missing_docs)]

//! Planar part outlines and the minimum-area rotation search.
//!
//! An [`Outline2D`] is one counter-clockwise boundary plus clockwise holes,
//! each a closed run of line and arc [`Segment`]s. [`optimize`] picks the
//! rotation whose axis-aligned bounding box has the least area and returns
//! the rotated outline parked at the origin.
//!
//! # Example
//!
//! ```
//! use flatcut_math::{Point2, Tolerance};
//! use flatcut_outline::{optimize, Loop, OptimizerSettings, Outline2D};
//!
//! let square = Loop::polygon(&[
//!     Point2::new(0.0, 0.0),
//!     Point2::new(2.0, 0.0),
//!     Point2::new(2.0, 2.0),
//!     Point2::new(0.0, 2.0),
//! ]);
//! let outline = Outline2D::from_loops(vec![square], &Tolerance::DEFAULT).unwrap();
//! let best = optimize(&outline, &OptimizerSettings::default()).unwrap();
//! assert!((best.result.area - 4.0).abs() < 1e-9);
//! ```

mod bbox;
mod error;
mod hull;
mod optimizer;
mod outline;
mod segment;

pub use bbox::Aabb2;
pub use error::{OutlineError, Result};
pub use hull::convex_hull;
pub use optimizer::{
    canonical_angle, optimize, optimize_points, rotated_bbox, rotated_points_bbox, Optimized,
    OptimizerSettings, RotationResult,
};
pub use outline::{point_in_polygon, Loop, Outline2D};
pub use segment::Segment;
