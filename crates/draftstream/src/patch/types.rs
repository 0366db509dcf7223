//! Operation and error types.

use serde_json::Value;
use thiserror::Error;

pub use crate::pointer::Path;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// The parent of the target path does not exist.
    #[error("PARENT_NOT_FOUND")]
    ParentNotFound,
    /// `remove`/`replace` targeted a key or index that is not present.
    #[error("NOT_FOUND")]
    NotFound,
    /// An array segment is not a valid index, or is out of bounds.
    #[error("INVALID_INDEX")]
    InvalidIndex,
    /// The parent exists but is a scalar, or the operation cannot apply to it.
    #[error("INVALID_TARGET")]
    InvalidTarget,
    /// The value's shape conflicts with the declared kind for its section.
    #[error("SCHEMA_MISMATCH: /{0}")]
    SchemaMismatch(String),
}

/// A single path-addressed mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Add { path: Path, value: Value },
    Remove { path: Path },
    Replace { path: Path, value: Value },
}

impl Op {
    pub fn op_name(&self) -> &'static str {
        match self {
            Op::Add { .. } => "add",
            Op::Remove { .. } => "remove",
            Op::Replace { .. } => "replace",
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Op::Add { path, .. } => path,
            Op::Remove { path } => path,
            Op::Replace { path, .. } => path,
        }
    }

    /// The carried value, for the operations that have one.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Op::Add { value, .. } | Op::Replace { value, .. } => Some(value),
            Op::Remove { .. } => None,
        }
    }
}
