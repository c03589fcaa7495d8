//! Face surfaces. Only planes are decoded; every other surface kind is kept
//! by name so axis detection can count it as non-planar.

use super::geometry::parse_axis_placement;
use super::EntityArgs;
use crate::error::Result;
use crate::parser::StepFile;
use flatcut_brep::Surface;
use flatcut_math::Dir3;

/// Decode the surface of a face. `same_sense` is the face's orientation
/// flag: when false the plane normal is flipped so it points out of the
/// material.
pub fn parse_surface(file: &StepFile, id: u64, same_sense: bool) -> Result<Surface> {
    let entity = file.require(id)?;
    match entity.type_name() {
        "PLANE" => {
            let placement = parse_axis_placement(file, entity.args().entity_ref(1)?)?;
            let z = placement.z_axis().into_inner();
            let normal = if same_sense { z } else { -z };
            Ok(Surface::Plane {
                origin: placement.location,
                normal: Dir3::new_unchecked(normal),
            })
        }
        other => Ok(Surface::Other(other.to_string())),
    }
}
