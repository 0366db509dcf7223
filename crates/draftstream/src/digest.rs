//! Deterministic content digest of an operation.
//!
//! The digest is a function of the full operation content (op kind, path,
//! and value), so byte-identical operations redelivered by the producer
//! collapse to the same ledger key. Object keys are mixed in sorted order,
//! making the digest independent of key insertion order.
//!
//! Algorithm: djb2-style 32-bit mixing chain with per-type discriminator
//! constants, rendered base-36.

use serde_json::{Map, Value};

use crate::patch::types::Op;

const START_STATE: i32 = 5381;

const NULL_CONST: i32 = 982_452_847_u32 as i32;
const TRUE_CONST: i32 = 982_453_247_u32 as i32;
const FALSE_CONST: i32 = 982_454_243_u32 as i32;
const ARRAY_CONST: i32 = 982_452_259_u32 as i32;
const STRING_CONST: i32 = 982_453_601_u32 as i32;
const OBJECT_CONST: i32 = 982_454_533_u32 as i32;
const ABSENT_CONST: i32 = 982_454_837_u32 as i32;

/// `state = (state << 5) + state + num`, wrapping.
fn update_num(state: i32, num: i32) -> i32 {
    state.wrapping_shl(5).wrapping_add(state).wrapping_add(num)
}

fn update_str(mut state: i32, s: &str) -> i32 {
    state = update_num(state, STRING_CONST);
    state = update_num(state, s.chars().count() as i32);
    for c in s.chars() {
        state = update_num(state, c as i32);
    }
    state
}

fn update_value(state: i32, value: &Value) -> i32 {
    match value {
        Value::Null => update_num(state, NULL_CONST),
        Value::Bool(b) => update_num(state, if *b { TRUE_CONST } else { FALSE_CONST }),
        Value::Number(n) => {
            // Mix the exact decimal rendering so 1, 1.0 and 1e0 stay distinct
            // exactly when their wire forms were distinct.
            update_str(state, &n.to_string())
        }
        Value::String(s) => update_str(state, s),
        Value::Array(arr) => {
            let mut state = update_num(state, ARRAY_CONST);
            for v in arr {
                state = update_value(state, v);
            }
            state
        }
        Value::Object(map) => update_object(state, map),
    }
}

fn update_object(state: i32, map: &Map<String, Value>) -> i32 {
    let mut state = update_num(state, OBJECT_CONST);
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    for key in keys {
        state = update_str(state, key);
        state = update_value(state, &map[key]);
    }
    state
}

/// Digest an operation into a short base-36 string.
pub fn op_digest(op: &Op) -> String {
    let mut state = update_str(START_STATE, op.op_name());
    for segment in op.path() {
        state = update_str(state, segment);
    }
    state = match op.value() {
        Some(value) => update_value(state, value),
        None => update_num(state, ABSENT_CONST),
    };
    radix_36(state as u32 as u64)
}

/// Encode in base-36 lowercase.
fn radix_36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::parse_pointer;
    use serde_json::json;

    fn add(path: &str, value: Value) -> Op {
        Op::Add { path: parse_pointer(path), value }
    }

    #[test]
    fn identical_operations_share_a_digest() {
        assert_eq!(
            op_digest(&add("/title", json!("Fractions"))),
            op_digest(&add("/title", json!("Fractions")))
        );
    }

    #[test]
    fn digest_depends_on_op_kind_path_and_value() {
        let base = add("/title", json!("A"));
        assert_ne!(op_digest(&base), op_digest(&add("/title", json!("B"))));
        assert_ne!(op_digest(&base), op_digest(&add("/name", json!("A"))));
        assert_ne!(
            op_digest(&base),
            op_digest(&Op::Replace { path: parse_pointer("/title"), value: json!("A") })
        );
        assert_ne!(
            op_digest(&Op::Remove { path: parse_pointer("/title") }),
            op_digest(&base)
        );
    }

    #[test]
    fn digest_ignores_object_key_order() {
        let v1 = json!({"a": 1, "b": 2});
        let v2 = json!({"b": 2, "a": 1});
        assert_eq!(op_digest(&add("/x", v1)), op_digest(&add("/x", v2)));
    }

    #[test]
    fn path_segmentation_is_unambiguous() {
        // ["ab"] and ["a", "b"] must not collide.
        let one = Op::Remove { path: vec!["ab".to_string()] };
        let two = Op::Remove { path: vec!["a".to_string(), "b".to_string()] };
        assert_ne!(op_digest(&one), op_digest(&two));
    }

    #[test]
    fn digest_is_printable_base36() {
        let d = op_digest(&add("/title", json!("x")));
        assert!(!d.is_empty());
        assert!(d.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
