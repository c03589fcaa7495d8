#![warn(missing_docs)]

//! STEP (ISO 10303-21) loader for flat-pattern extraction.
//!
//! Reads AP203/AP214 files into [`flatcut_brep::Solid`]s with every
//! coordinate in millimetres, whatever length unit the file declares.
//! Lines and circles are kept exact; ellipses, B-splines, and polylines
//! are sampled and trimmed to their vertices.
//!
//! # Example
//!
//! ```no_run
//! use flatcut_step::read_step;
//!
//! let solids = read_step("bracket.step").unwrap();
//! println!("{} bodies, {} faces", solids.len(), solids[0].faces.len());
//! ```

mod entities;
mod error;
mod lexer;
mod parser;
mod reader;

pub use entities::units::LengthUnit;
pub use error::{Result, StepError};
pub use parser::{Parser, Record, StepEntity, StepFile, StepValue};
pub use reader::{read_model, read_step, read_step_from_buffer, StepModel};
