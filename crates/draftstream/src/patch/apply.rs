//! Pure application of one operation to a document.

use serde_json::Value;

use crate::pointer;
use crate::schema::SectionRules;

use super::types::{ApplyError, Op};

/// Apply `op` to `doc`, returning the resulting document.
///
/// The input is never mutated; an `Err` means "skip this operation" and
/// carries the reason. Given the same `(doc, op)` this always produces a
/// structurally equal result, which is what makes it safe to call
/// speculatively on every chunk.
pub fn apply_op(
    doc: &Value,
    op: &Op,
    rules: Option<&SectionRules>,
) -> Result<Value, ApplyError> {
    if let Some(rules) = rules {
        rules.check(op)?;
    }
    let mut next = doc.clone();
    match op {
        Op::Add { path, value } => add(&mut next, path, value.clone())?,
        Op::Remove { path } => remove(&mut next, path)?,
        Op::Replace { path, value } => replace(&mut next, path, value.clone())?,
    }
    Ok(next)
}

/// Resolve the parent of `path` mutably, plus the leaf segment.
fn parent_and_leaf<'a, 'p>(
    doc: &'a mut Value,
    path: &'p [String],
) -> Result<(&'a mut Value, &'p str), ApplyError> {
    let (parent_path, leaf) = path.split_at(path.len() - 1);
    let parent =
        pointer::get_mut(doc, parent_path).ok_or(ApplyError::ParentNotFound)?;
    Ok((parent, &leaf[0]))
}

fn array_index(segment: &str, len: usize, allow_end: bool) -> Result<usize, ApplyError> {
    if segment == "-" {
        if allow_end {
            return Ok(len);
        }
        return Err(ApplyError::InvalidIndex);
    }
    if !pointer::is_valid_index(segment) {
        return Err(ApplyError::InvalidIndex);
    }
    let idx: usize = segment.parse().map_err(|_| ApplyError::InvalidIndex)?;
    let bound = if allow_end { len + 1 } else { len };
    if idx >= bound {
        return Err(ApplyError::InvalidIndex);
    }
    Ok(idx)
}

fn add(doc: &mut Value, path: &[String], value: Value) -> Result<(), ApplyError> {
    if path.is_empty() {
        *doc = value;
        return Ok(());
    }
    let (parent, leaf) = parent_and_leaf(doc, path)?;
    match parent {
        Value::Object(map) => {
            // Upsert: add on an existing key overwrites.
            map.insert(leaf.to_string(), value);
            Ok(())
        }
        Value::Array(arr) => {
            let idx = array_index(leaf, arr.len(), true)?;
            arr.insert(idx, value);
            Ok(())
        }
        _ => Err(ApplyError::InvalidTarget),
    }
}

fn remove(doc: &mut Value, path: &[String]) -> Result<(), ApplyError> {
    if path.is_empty() {
        return Err(ApplyError::InvalidTarget);
    }
    let (parent, leaf) = parent_and_leaf(doc, path)?;
    match parent {
        Value::Object(map) => match map.shift_remove(leaf) {
            Some(_) => Ok(()),
            None => Err(ApplyError::NotFound),
        },
        Value::Array(arr) => {
            let idx = array_index(leaf, arr.len(), false)?;
            arr.remove(idx);
            Ok(())
        }
        _ => Err(ApplyError::InvalidTarget),
    }
}

fn replace(doc: &mut Value, path: &[String], value: Value) -> Result<(), ApplyError> {
    if path.is_empty() {
        *doc = value;
        return Ok(());
    }
    let (parent, leaf) = parent_and_leaf(doc, path)?;
    match parent {
        Value::Object(map) => match map.get_mut(leaf) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(ApplyError::NotFound),
        },
        Value::Array(arr) => {
            let idx = array_index(leaf, arr.len(), false)?;
            arr[idx] = value;
            Ok(())
        }
        _ => Err(ApplyError::InvalidTarget),
    }
}
