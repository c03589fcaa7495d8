//! Points, directions, and placements.

use super::{expect_type, EntityArgs};
use crate::error::{Result, StepError};
use crate::parser::StepFile;
use flatcut_math::{Dir3, Point3, Vec3};

/// Decode a CARTESIAN_POINT. Two-dimensional points get `z = 0`.
pub fn parse_cartesian_point(file: &StepFile, id: u64) -> Result<Point3> {
    let entity = file.require(id)?;
    expect_type(entity, &["CARTESIAN_POINT"])?;
    let c = entity.args().real_list(1)?;
    match c.as_slice() {
        [x, y, z, ..] => Ok(Point3::new(*x, *y, *z)),
        [x, y] => Ok(Point3::new(*x, *y, 0.0)),
        _ => Err(StepError::InvalidGeometry(format!(
            "CARTESIAN_POINT #{id} has {} coordinates",
            c.len()
        ))),
    }
}

/// Decode a DIRECTION into a unit vector.
pub fn parse_direction(file: &StepFile, id: u64) -> Result<Dir3> {
    let entity = file.require(id)?;
    expect_type(entity, &["DIRECTION"])?;
    let c = entity.args().real_list(1)?;
    let v = match c.as_slice() {
        [x, y, z, ..] => Vec3::new(*x, *y, *z),
        [x, y] => Vec3::new(*x, *y, 0.0),
        _ => {
            return Err(StepError::InvalidGeometry(format!(
                "DIRECTION #{id} has {} components",
                c.len()
            )))
        }
    };
    if v.norm() < 1e-15 {
        return Err(StepError::InvalidGeometry(format!(
            "DIRECTION #{id} has zero length"
        )));
    }
    Ok(Dir3::new_normalize(v))
}

/// A local coordinate frame.
#[derive(Debug, Clone)]
pub struct AxisPlacement {
    /// Origin.
    pub location: Point3,
    /// Local Z direction, if given.
    pub axis: Option<Dir3>,
    /// Local X direction, if given.
    pub ref_direction: Option<Dir3>,
}

impl AxisPlacement {
    /// Local Z, defaulting to world +Z.
    pub fn z_axis(&self) -> Dir3 {
        self.axis.unwrap_or_else(Vec3::z_axis)
    }

    /// Local X, made orthogonal to Z. Falls back to an arbitrary
    /// perpendicular when unset or parallel to Z.
    pub fn x_axis(&self) -> Dir3 {
        let z = self.z_axis().into_inner();
        let candidate = self.ref_direction.map(|d| d.into_inner()).unwrap_or_else(|| {
            if z.x.abs() < 0.9 {
                Vec3::x()
            } else {
                Vec3::y()
            }
        });
        let ortho = candidate - z * candidate.dot(&z);
        if ortho.norm() < 1e-12 {
            let fallback = if z.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
            Dir3::new_normalize(fallback - z * fallback.dot(&z))
        } else {
            Dir3::new_normalize(ortho)
        }
    }

    /// Local Y = Z × X.
    pub fn y_axis(&self) -> Dir3 {
        Dir3::new_normalize(self.z_axis().cross(&self.x_axis()))
    }
}

/// Decode AXIS2_PLACEMENT_3D, AXIS1_PLACEMENT, or AXIS2_PLACEMENT_2D.
pub fn parse_axis_placement(file: &StepFile, id: u64) -> Result<AxisPlacement> {
    let entity = file.require(id)?;
    expect_type(
        entity,
        &["AXIS2_PLACEMENT_3D", "AXIS1_PLACEMENT", "AXIS2_PLACEMENT_2D"],
    )?;
    let args = entity.args();
    let location = parse_cartesian_point(file, args.entity_ref(1)?)?;

    let (axis, ref_direction) = match entity.type_name() {
        "AXIS2_PLACEMENT_3D" => (
            args.optional_ref(2)?
                .map(|d| parse_direction(file, d))
                .transpose()?,
            args.optional_ref(3)?
                .map(|d| parse_direction(file, d))
                .transpose()?,
        ),
        "AXIS1_PLACEMENT" => (
            args.optional_ref(2)?
                .map(|d| parse_direction(file, d))
                .transpose()?,
            None,
        ),
        _ => (
            None,
            args.optional_ref(2)?
                .map(|d| parse_direction(file, d))
                .transpose()?,
        ),
    };

    Ok(AxisPlacement {
        location,
        axis,
        ref_direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use approx::assert_relative_eq;

    fn parse(data: &str) -> StepFile {
        let text = format!("ISO-10303-21;\nHEADER;\nENDSEC;\nDATA;\n{data}\nENDSEC;\nEND-ISO-10303-21;\n");
        Parser::parse(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_point_and_direction() {
        let file = parse(
            "#1 = CARTESIAN_POINT('', (1.0, 2.0, 3.0));\n#2 = DIRECTION('', (0.0, 0.0, 2.0));",
        );
        assert_relative_eq!(parse_cartesian_point(&file, 1).unwrap(), Point3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(parse_direction(&file, 2).unwrap().z, 1.0);
        assert!(matches!(
            parse_direction(&file, 1),
            Err(StepError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_placement_frame() {
        let file = parse(
            "#1 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));\n#2 = DIRECTION('', (0.0, 0.0, 1.0));\n#3 = DIRECTION('', (1.0, 1.0, 0.0));\n#4 = AXIS2_PLACEMENT_3D('', #1, #2, #3);\n#5 = AXIS2_PLACEMENT_3D('', #1, $, $);",
        );
        let p = parse_axis_placement(&file, 4).unwrap();
        assert_relative_eq!(p.x_axis().x, 0.5_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(p.y_axis().cross(&p.x_axis()).z, -1.0, epsilon = 1e-12);

        let default = parse_axis_placement(&file, 5).unwrap();
        assert_relative_eq!(default.z_axis().z, 1.0);
        assert_relative_eq!(default.x_axis().x, 1.0);
    }

    #[test]
    fn test_zero_direction_is_rejected() {
        let file = parse("#1 = DIRECTION('', (0.0, 0.0, 0.0));");
        assert!(matches!(
            parse_direction(&file, 1),
            Err(StepError::InvalidGeometry(_))
        ));
    }
}
