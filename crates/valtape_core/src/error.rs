//! Typed failures reported by the tape engine.
//!
//! Public functions return `anyhow::Result`; the variants below are the ones
//! an embedding layer may want to tell apart, via `Error::downcast_ref`.

use crate::registry::OpaqueFamily;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TapeError {
    #[error("{family} function {id} ({name}): forward failed: {reason}")]
    ForwardFailed {
        family: OpaqueFamily,
        id: usize,
        name: String,
        reason: String,
    },
    #[error("{family} function {id} ({name}): rev_depend failed: {reason}")]
    RevDependFailed {
        family: OpaqueFamily,
        id: usize,
        name: String,
        reason: String,
    },
    #[error("{family} function {id} ({name}): for_type failed: {reason}")]
    ForTypeFailed {
        family: OpaqueFamily,
        id: usize,
        name: String,
        reason: String,
    },
    #[error("{family} function {id} has been deleted")]
    DeletedFunction { family: OpaqueFamily, id: usize },
    #[error("{family} function {id} is not registered")]
    UnknownFunction { family: OpaqueFamily, id: usize },
    #[error("discrete function {id} is not registered")]
    UnknownDiscrete { id: usize },
    #[error(
        "{family} function {id} ({name}): rev_depend for result {result} marks inputs \
         that the combined query for the same call omits"
    )]
    RevDependUnderApproximation {
        family: OpaqueFamily,
        id: usize,
        name: String,
        result: usize,
    },
    #[error("value vector has length {actual}, the tape needs {expected}")]
    ValueLength { expected: usize, actual: usize },
    #[error("dynamic vector {which} has length {len}, index {index} is out of range")]
    VectorIndex { which: usize, index: f64, len: usize },
    #[error("unknown tape option \"{0}\"")]
    UnknownOption(String),
    #[error("tape option {name} expects \"true\" or \"false\", got \"{value}\"")]
    InvalidOptionValue { name: String, value: String },
    #[error("registry still holds {live} live function(s)")]
    RegistryInUse { live: usize },
}
