//! Slash-delimited document paths (RFC 6901 escaping).
//!
//! A path addresses a location in a nested document: each segment is either
//! an object key or a non-negative array index, with `-` standing for the
//! position one past the end of an array. Whether a segment is treated as a
//! key or an index is decided by the container it lands on, not at parse
//! time.

use serde_json::Value;

/// A parsed path: one string per segment, escapes resolved.
pub type Path = Vec<String>;

/// Unescape a single path segment (`~1` → `/`, `~0` → `~`).
pub fn unescape(segment: &str) -> String {
    if !segment.contains('~') {
        return segment.to_string();
    }
    // ~1 must be resolved before ~0
    segment.replace("~1", "/").replace("~0", "~")
}

/// Escape a single path segment (`~` → `~0`, `/` → `~1`).
pub fn escape(segment: &str) -> String {
    if !segment.contains('/') && !segment.contains('~') {
        return segment.to_string();
    }
    segment.replace('~', "~0").replace('/', "~1")
}

/// Parse a pointer string into segments.
///
/// The empty string is the root path. A leading `/` is accepted but not
/// required; model producers are inconsistent about it.
pub fn parse_pointer(pointer: &str) -> Path {
    if pointer.is_empty() {
        return Vec::new();
    }
    let body = pointer.strip_prefix('/').unwrap_or(pointer);
    body.split('/').map(unescape).collect()
}

/// Format segments back into a pointer string. The root path formats as `""`.
pub fn format_pointer(path: &[String]) -> String {
    let mut out = String::new();
    for segment in path {
        out.push('/');
        out.push_str(&escape(segment));
    }
    out
}

/// Whether a segment is a valid array index: ASCII digits, no leading zero
/// (except `"0"` itself).
pub fn is_valid_index(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    if bytes.is_empty() {
        return false;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return false;
    }
    bytes.iter().all(|b| b.is_ascii_digit())
}

/// Navigate to the value at `path`, if it exists.
pub fn get<'a>(doc: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(arr) => {
                if segment == "-" || !is_valid_index(segment) {
                    return None;
                }
                arr.get(segment.parse::<usize>().ok()?)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Mutable navigation to the value at `path`, if it exists.
pub fn get_mut<'a>(doc: &'a mut Value, path: &[String]) -> Option<&'a mut Value> {
    let mut current = doc;
    for segment in path {
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(arr) => {
                if segment == "-" || !is_valid_index(segment) {
                    return None;
                }
                arr.get_mut(segment.parse::<usize>().ok()?)?
            }
            _ => return None,
        };
    }
    Some(current)
}
