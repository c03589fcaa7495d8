#![warn(missing_docs)]

//! Boundary representation for the flatcut pipeline.
//!
//! A deliberately small B-rep: a [`Solid`] owns [`Face`]s, each bounded by
//! [`FaceLoop`]s of oriented [`Edge`]s. Planar faces carry their outward
//! normal; circular edges keep their exact center, radius, and sense so the
//! projector can emit true arcs. Everything downstream of the loader talks
//! to bodies through the [`SolidGeometry`] trait.

mod curve;
mod face;
mod prism;
mod solid;

pub use curve::{CircleArc, Curve, Edge};
pub use face::{Face, FaceLoop, Surface};
pub use prism::{extrude, ProfileEdge, ProfileLoop};
pub use solid::{Aabb3, Solid, SolidGeometry};
