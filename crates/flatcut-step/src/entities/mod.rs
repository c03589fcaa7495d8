//! Decoding of AP203/AP214 instances into B-rep values.
//!
//! Each submodule handles one family: placements and points, edge curves,
//! surfaces, topology, and units. All of them read parameters through
//! [`Args`], which turns positional access into typed results with errors
//! that name the offending instance.

pub mod curves;
pub mod geometry;
pub mod surfaces;
pub mod topology;
pub mod units;

use crate::error::{Result, StepError};
use crate::parser::{Record, StepEntity, StepValue};

/// Typed positional access to one record's parameters.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    /// Owning instance id (for errors).
    pub id: u64,
    /// Record type name (for errors).
    pub type_name: &'a str,
    /// Parameters.
    pub values: &'a [StepValue],
}

impl<'a> Args<'a> {
    fn err(&self, idx: usize, what: &str) -> StepError {
        StepError::Malformed {
            entity_id: self.id,
            type_name: self.type_name.to_string(),
            message: format!("expected {what} at parameter {idx}"),
        }
    }

    /// Raw parameter.
    pub fn value(&self, idx: usize) -> Result<&'a StepValue> {
        self.values.get(idx).ok_or_else(|| self.err(idx, "a value"))
    }

    /// Real parameter.
    pub fn real(&self, idx: usize) -> Result<f64> {
        self.value(idx)?.as_real().ok_or_else(|| self.err(idx, "a real"))
    }

    /// Integer parameter.
    pub fn integer(&self, idx: usize) -> Result<i64> {
        self.value(idx)?
            .as_integer()
            .ok_or_else(|| self.err(idx, "an integer"))
    }

    /// String parameter (missing or `$` reads as empty).
    pub fn string(&self, idx: usize) -> &'a str {
        self.values
            .get(idx)
            .and_then(|v| v.as_string())
            .unwrap_or("")
    }

    /// Boolean enumeration parameter.
    pub fn boolean(&self, idx: usize) -> Result<bool> {
        self.value(idx)?
            .as_bool()
            .ok_or_else(|| self.err(idx, "a boolean"))
    }

    /// Enumeration parameter.
    pub fn enumeration(&self, idx: usize) -> Result<&'a str> {
        self.value(idx)?
            .as_enum()
            .ok_or_else(|| self.err(idx, "an enumeration"))
    }

    /// Entity reference parameter.
    pub fn entity_ref(&self, idx: usize) -> Result<u64> {
        self.value(idx)?
            .as_entity_ref()
            .ok_or_else(|| self.err(idx, "an entity reference"))
    }

    /// Optional entity reference (`$` reads as `None`).
    pub fn optional_ref(&self, idx: usize) -> Result<Option<u64>> {
        match self.values.get(idx) {
            None | Some(StepValue::Null) => Ok(None),
            Some(_) => self.entity_ref(idx).map(Some),
        }
    }

    /// Aggregate parameter.
    pub fn list(&self, idx: usize) -> Result<&'a [StepValue]> {
        self.value(idx)?
            .as_list()
            .ok_or_else(|| self.err(idx, "a list"))
    }

    /// Aggregate of reals.
    pub fn real_list(&self, idx: usize) -> Result<Vec<f64>> {
        self.list(idx)?
            .iter()
            .map(|v| v.as_real().ok_or_else(|| self.err(idx, "a list of reals")))
            .collect()
    }

    /// Aggregate of integers.
    pub fn integer_list(&self, idx: usize) -> Result<Vec<i64>> {
        self.list(idx)?
            .iter()
            .map(|v| {
                v.as_integer()
                    .ok_or_else(|| self.err(idx, "a list of integers"))
            })
            .collect()
    }

    /// Aggregate of entity references.
    pub fn entity_ref_list(&self, idx: usize) -> Result<Vec<u64>> {
        self.list(idx)?
            .iter()
            .map(|v| {
                v.as_entity_ref()
                    .ok_or_else(|| self.err(idx, "a list of entity references"))
            })
            .collect()
    }
}

/// Parameter access on parsed instances.
pub trait EntityArgs {
    /// Parameters of the first (for simple instances: only) record.
    fn args(&self) -> Args<'_>;

    /// Parameters of a named record of a complex instance.
    fn record_args(&self, name: &str) -> Option<Args<'_>>;
}

impl EntityArgs for StepEntity {
    fn args(&self) -> Args<'_> {
        match self.records.first() {
            Some(r) => record_view(self.id, r),
            None => Args {
                id: self.id,
                type_name: "",
                values: &[],
            },
        }
    }

    fn record_args(&self, name: &str) -> Option<Args<'_>> {
        self.record(name).map(|r| record_view(self.id, r))
    }
}

fn record_view(id: u64, record: &Record) -> Args<'_> {
    Args {
        id,
        type_name: &record.name,
        values: &record.args,
    }
}

/// Fail with a type mismatch unless `entity` is one of `expected`.
pub fn expect_type(entity: &StepEntity, expected: &[&str]) -> Result<()> {
    if expected.contains(&entity.type_name()) {
        Ok(())
    } else {
        Err(StepError::type_mismatch(
            entity.id,
            expected.join(" | "),
            entity.type_name(),
        ))
    }
}
