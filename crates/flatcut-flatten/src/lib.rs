#![warn(missing_docs)]

//! Flattening of extruded solids.
//!
//! [`detect_axis`] decides which principal axis a part was extruded along;
//! [`project`] turns the profile face orthogonal to that axis into an
//! [`Outline2D`](flatcut_outline::Outline2D), keeping in-plane circles as
//! true arcs.
//!
//! ```
//! use flatcut_brep::{extrude, ProfileLoop};
//! use flatcut_flatten::{flatten, ProjectionSettings};
//! use flatcut_math::{Axis, Point2};
//!
//! let plate = extrude(
//!     "plate",
//!     Axis::Y,
//!     &ProfileLoop::rectangle(Point2::origin(), 80.0, 30.0),
//!     &[ProfileLoop::circle(Point2::new(20.0, 15.0), 4.0)],
//!     2.0,
//! );
//! let (choice, profile) = flatten(&plate, &ProjectionSettings::default()).unwrap();
//! assert_eq!(choice.axis, Axis::Y);
//! assert_eq!(profile.outline.holes.len(), 1);
//! ```

mod axis;
mod error;
mod projector;
mod settings;

pub use axis::{detect_axis, evaluate_axis, parallel_faces, AxisCandidate, AxisChoice, AxisReason};
pub use error::{FlattenError, Result};
pub use projector::{flatten, project, project_edge, project_face, FlatProfile};
pub use settings::ProjectionSettings;
