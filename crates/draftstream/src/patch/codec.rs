//! JSON encoding of operations.
//!
//! The wire shape is `{"op": "add"|"remove"|"replace", "path": "...",
//! "value": ...}` with `value` absent on `remove`.

use serde_json::{json, Value};
use thiserror::Error;

use crate::pointer::{format_pointer, parse_pointer};

use super::types::Op;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OpDecodeError {
    #[error("operation must be an object")]
    NotAnObject,
    #[error("missing 'op' field")]
    MissingOp,
    #[error("unknown op: {0}")]
    UnknownOp(String),
    #[error("'path' must be a string")]
    BadPath,
    #[error("{0} requires 'value'")]
    MissingValue(&'static str),
}

/// Decode an operation from its JSON form.
pub fn op_from_json(v: &Value) -> Result<Op, OpDecodeError> {
    let obj = v.as_object().ok_or(OpDecodeError::NotAnObject)?;
    let op_str = obj
        .get("op")
        .and_then(|v| v.as_str())
        .ok_or(OpDecodeError::MissingOp)?;
    let path = parse_pointer(
        obj.get("path")
            .and_then(|v| v.as_str())
            .ok_or(OpDecodeError::BadPath)?,
    );
    match op_str {
        "add" => {
            let value = obj
                .get("value")
                .cloned()
                .ok_or(OpDecodeError::MissingValue("add"))?;
            Ok(Op::Add { path, value })
        }
        "remove" => Ok(Op::Remove { path }),
        "replace" => {
            let value = obj
                .get("value")
                .cloned()
                .ok_or(OpDecodeError::MissingValue("replace"))?;
            Ok(Op::Replace { path, value })
        }
        other => Err(OpDecodeError::UnknownOp(other.to_string())),
    }
}

/// Encode an operation to its JSON form.
pub fn op_to_json(op: &Op) -> Value {
    match op {
        Op::Add { path, value } => json!({
            "op": "add",
            "path": format_pointer(path),
            "value": value,
        }),
        Op::Remove { path } => json!({
            "op": "remove",
            "path": format_pointer(path),
        }),
        Op::Replace { path, value } => json!({
            "op": "replace",
            "path": format_pointer(path),
            "value": value,
        }),
    }
}
