//! Length unit of the geometric context.
//!
//! Coordinates in a STEP file are expressed in the length unit named by
//! GLOBAL_UNIT_ASSIGNED_CONTEXT. The loader scales everything to
//! millimetres using the factor found here.

use super::EntityArgs;
use crate::parser::{StepEntity, StepFile};
use tracing::{debug, warn};

/// The declared length unit and its size in millimetres.
#[derive(Debug, Clone, PartialEq)]
pub struct LengthUnit {
    /// Unit name as written (`MILLI METRE`, `INCH`, ...).
    pub name: String,
    /// Millimetres per unit.
    pub mm: f64,
}

impl Default for LengthUnit {
    fn default() -> Self {
        Self {
            name: "MILLI METRE".into(),
            mm: 1.0,
        }
    }
}

/// Find the file's length unit. Falls back to millimetres when no context
/// declares one or the declaration cannot be understood.
pub fn length_unit(file: &StepFile) -> LengthUnit {
    for context in file.entities_of_type("GLOBAL_UNIT_ASSIGNED_CONTEXT") {
        let Some(args) = context.record_args("GLOBAL_UNIT_ASSIGNED_CONTEXT") else {
            continue;
        };
        let Ok(units) = args.entity_ref_list(0) else {
            continue;
        };
        for unit in units.iter().filter_map(|id| file.get(*id)) {
            if !is_length_unit(unit) {
                continue;
            }
            match resolve(file, unit, 0) {
                Some(found) => {
                    debug!(unit = %found.name, mm = found.mm, "length unit");
                    return found;
                }
                None => {
                    warn!(entity = unit.id, "unrecognized length unit, assuming millimetres");
                    return LengthUnit::default();
                }
            }
        }
    }
    LengthUnit::default()
}

fn is_length_unit(unit: &StepEntity) -> bool {
    unit.has_record("LENGTH_UNIT")
        || (unit.type_name() == "SI_UNIT"
            && unit.args().enumeration(2).is_ok_and(|n| n == "METRE"))
}

fn resolve(file: &StepFile, unit: &StepEntity, depth: usize) -> Option<LengthUnit> {
    // conversion chains are short in practice; stop runaway references
    if depth > 8 {
        return None;
    }

    if let Some(si) = unit.record_args("SI_UNIT") {
        // complex form is SI_UNIT(prefix, name); simple form adds a leading dimensions arg
        let (prefix, name) = if unit.is_complex() {
            (si.value(0).ok(), si.enumeration(1).ok())
        } else {
            (si.value(1).ok(), si.enumeration(2).ok())
        };
        if name != Some("METRE") {
            return None;
        }
        let prefix = prefix.and_then(|p| p.as_enum());
        let mm = match prefix {
            None => 1000.0,
            Some("KILO") => 1.0e6,
            Some("HECTO") => 1.0e5,
            Some("DECA") => 1.0e4,
            Some("DECI") => 100.0,
            Some("CENTI") => 10.0,
            Some("MILLI") => 1.0,
            Some("MICRO") => 1.0e-3,
            Some("NANO") => 1.0e-6,
            Some(_) => return None,
        };
        let name = match prefix {
            Some(p) => format!("{p} METRE"),
            None => "METRE".to_string(),
        };
        return Some(LengthUnit { name, mm });
    }

    let conversion = unit.record_args("CONVERSION_BASED_UNIT")?;
    let name = conversion.string(0).to_ascii_uppercase();
    match name.as_str() {
        "INCH" => {
            return Some(LengthUnit { name, mm: 25.4 });
        }
        "FOOT" => {
            return Some(LengthUnit { name, mm: 304.8 });
        }
        _ => {}
    }

    // generic conversion: value × size of the base unit
    let measure = file.get(conversion.entity_ref(1).ok()?)?;
    let measure_args = measure
        .record_args("MEASURE_WITH_UNIT")
        .or_else(|| measure.record_args("LENGTH_MEASURE_WITH_UNIT"))?;
    let value = measure_args.real(0).ok()?;
    let base = file.get(measure_args.entity_ref(1).ok()?)?;
    let base = resolve(file, base, depth + 1)?;
    Some(LengthUnit {
        name,
        mm: value * base.mm,
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

    fn context(unit: &str) -> String {
        format!(
            "{unit}\n#20 = ( GEOMETRIC_REPRESENTATION_CONTEXT(3) GLOBAL_UNIT_ASSIGNED_CONTEXT((#10, #11)) REPRESENTATION_CONTEXT('', '') );\n#11 = ( NAMED_UNIT(*) PLANE_ANGLE_UNIT() SI_UNIT($, .RADIAN.) );"
        )
    }

    #[test]
    fn test_millimetre() {
        let file = parse(&context(
            "#10 = ( LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI., .METRE.) );",
        ));
        assert_relative_eq!(length_unit(&file).mm, 1.0);
    }

    #[test]
    fn test_metre_and_centimetre() {
        let file = parse(&context("#10 = ( LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT($, .METRE.) );"));
        assert_relative_eq!(length_unit(&file).mm, 1000.0);
        let file = parse(&context(
            "#10 = ( LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.CENTI., .METRE.) );",
        ));
        assert_relative_eq!(length_unit(&file).mm, 10.0);
    }

    #[test]
    fn test_inch_conversion() {
        let file = parse(&context(
            "#10 = ( CONVERSION_BASED_UNIT('INCH', #12) LENGTH_UNIT() NAMED_UNIT(#13) );\n#12 = LENGTH_MEASURE_WITH_UNIT(LENGTH_MEASURE(25.4), #14);\n#13 = DIMENSIONAL_EXPONENTS(1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);\n#14 = ( LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI., .METRE.) );",
        ));
        let unit = length_unit(&file);
        assert_eq!(unit.name, "INCH");
        assert_relative_eq!(unit.mm, 25.4);
    }

    #[test]
    fn test_custom_conversion_uses_base_unit() {
        let file = parse(&context(
            "#10 = ( CONVERSION_BASED_UNIT('THOU', #12) LENGTH_UNIT() NAMED_UNIT(#13) );\n#12 = LENGTH_MEASURE_WITH_UNIT(LENGTH_MEASURE(0.0254), #14);\n#13 = DIMENSIONAL_EXPONENTS(1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);\n#14 = ( LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI., .METRE.) );",
        ));
        assert_relative_eq!(length_unit(&file).mm, 0.0254);
    }

    #[test]
    fn test_missing_context_defaults_to_mm() {
        let file = parse("#1 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));");
        assert_eq!(length_unit(&file), LengthUnit::default());
    }
}
