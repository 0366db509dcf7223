//! Path-addressed document operations.
//!
//! The streaming protocol carries three operations (`add`, `remove`,
//! `replace`), each targeting a slash-delimited path. Application is pure:
//! the applier never mutates its input, and a failed operation reports why
//! so the caller can skip it and keep going.

pub mod apply;
pub mod codec;
pub mod types;

pub use apply::apply_op;
pub use codec::{op_from_json, op_to_json, OpDecodeError};
pub use types::{ApplyError, Op};
