//! Best-effort completion of truncated JSON text.
//!
//! A producer that emits a JSON record token by token is routinely caught
//! mid-value: an unterminated string, an open object or array, a dangling
//! `"key":` with no value yet. [`complete_json`] closes those structures with
//! the smallest syntactically valid continuation so the prefix can be parsed
//! and inspected. The repaired text is validated with a strict parse before
//! being returned; input that is malformed rather than merely truncated
//! yields `None`.
//!
//! Repair policy:
//!
//! - an unterminated *value* string is closed (`"ma` becomes `"ma"`),
//!   discarding any trailing incomplete escape sequence;
//! - an unterminated *key* string, or a key with no value yet, is dropped
//!   together with the comma that introduced it;
//! - a partial `true`/`false`/`null` is completed, a number is trimmed back
//!   to its longest valid prefix;
//! - open objects and arrays are closed in nesting order.

use serde_json::Value;

// ── Walker state ──────────────────────────────────────────────────────────

/// What the walker expects next, outside of any in-progress token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    /// A value must follow: top level, after `:`, or after `,` in an array.
    Value,
    /// First slot of an array: a value or `]`.
    ValueOrEnd,
    /// A key must follow (after `,` in an object).
    Key,
    /// First slot of an object: a key or `}`.
    KeyOrEnd,
    /// After a key string.
    Colon,
    /// After a complete value inside a container.
    CommaOrEnd,
    /// A complete top-level value has been consumed.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    KeyString,
    ValueString,
    Number,
    Literal,
}

/// Escape progress inside a string token: byte offset of the `\` and how many
/// characters of the sequence are still owed (`u8::MAX` right after the `\`,
/// before the escape letter itself has been seen).
type EscapeState = Option<(usize, u8)>;

fn after_value(stack: &[char]) -> Expect {
    if stack.is_empty() {
        Expect::Done
    } else {
        Expect::CommaOrEnd
    }
}

// ── Completion ────────────────────────────────────────────────────────────

/// Complete a truncated JSON text, returning the repaired string.
///
/// Returns `None` when the input is malformed (not a prefix of well-formed
/// JSON) or when the repaired text still fails a strict parse.
pub fn complete_json(text: &str) -> Option<String> {
    let mut stack: Vec<char> = Vec::new();
    let mut expect = Expect::Value;
    // (kind, start byte) of the scalar token currently being consumed.
    let mut token: Option<(TokenKind, usize)> = None;
    let mut esc: EscapeState = None;
    // Start byte of the most recently begun object key, for dropping a
    // dangling `"key":` at end of input.
    let mut last_key_start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        if let Some((kind, start)) = token {
            match kind {
                TokenKind::KeyString | TokenKind::ValueString => {
                    if let Some((esc_start, owed)) = esc {
                        esc = match owed {
                            u8::MAX if c == 'u' => Some((esc_start, 4)),
                            u8::MAX => None,
                            1 => None,
                            n => Some((esc_start, n - 1)),
                        };
                    } else if c == '\\' {
                        esc = Some((i, u8::MAX));
                    } else if c == '"' {
                        token = None;
                        expect = match kind {
                            TokenKind::KeyString => Expect::Colon,
                            _ => after_value(&stack),
                        };
                    }
                    continue;
                }
                TokenKind::Number => {
                    if c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E') {
                        continue;
                    }
                    token = None;
                    expect = after_value(&stack);
                }
                TokenKind::Literal => {
                    if c.is_ascii_alphabetic() {
                        continue;
                    }
                    let word = &text[start..i];
                    if !matches!(word, "true" | "false" | "null") {
                        return None;
                    }
                    token = None;
                    expect = after_value(&stack);
                }
            }
        }

        // Structural characters, outside any token.
        match c {
            c if c.is_whitespace() => {}
            '{' if matches!(expect, Expect::Value | Expect::ValueOrEnd) => {
                stack.push('}');
                expect = Expect::KeyOrEnd;
            }
            '[' if matches!(expect, Expect::Value | Expect::ValueOrEnd) => {
                stack.push(']');
                expect = Expect::ValueOrEnd;
            }
            '"' => match expect {
                Expect::Value | Expect::ValueOrEnd => {
                    token = Some((TokenKind::ValueString, i));
                }
                Expect::Key | Expect::KeyOrEnd => {
                    token = Some((TokenKind::KeyString, i));
                    last_key_start = Some(i);
                }
                _ => return None,
            },
            ':' if expect == Expect::Colon => expect = Expect::Value,
            ',' if expect == Expect::CommaOrEnd => {
                expect = if stack.last() == Some(&'}') {
                    Expect::Key
                } else {
                    Expect::Value
                };
            }
            '}' if stack.last() == Some(&'}')
                && matches!(expect, Expect::KeyOrEnd | Expect::CommaOrEnd) =>
            {
                stack.pop();
                expect = after_value(&stack);
            }
            ']' if stack.last() == Some(&']')
                && matches!(expect, Expect::ValueOrEnd | Expect::CommaOrEnd) =>
            {
                stack.pop();
                expect = after_value(&stack);
            }
            '0'..='9' | '-' if matches!(expect, Expect::Value | Expect::ValueOrEnd) => {
                token = Some((TokenKind::Number, i));
            }
            c if c.is_ascii_alphabetic()
                && matches!(expect, Expect::Value | Expect::ValueOrEnd) =>
            {
                token = Some((TokenKind::Literal, i));
            }
            _ => return None,
        }
    }

    // End of input: resolve the trailing token, then the dangling expectation,
    // then close whatever containers remain open.
    let mut cut = text.len();
    let mut suffix = String::new();

    if let Some((kind, start)) = token {
        match kind {
            TokenKind::ValueString => {
                if let Some((esc_start, _)) = esc {
                    cut = esc_start;
                }
                suffix.push('"');
                expect = after_value(&stack);
            }
            TokenKind::KeyString => {
                // A partial key carries no usable information; drop it.
                cut = start;
            }
            TokenKind::Number => {
                let trimmed = text[start..]
                    .trim_end_matches(|c: char| matches!(c, '+' | '-' | '.' | 'e' | 'E'));
                if trimmed.is_empty() {
                    cut = start;
                } else {
                    cut = start + trimmed.len();
                    expect = after_value(&stack);
                }
            }
            TokenKind::Literal => {
                let word = &text[start..];
                let completed = ["true", "false", "null"]
                    .into_iter()
                    .find(|kw| kw.starts_with(word));
                match completed {
                    Some(kw) => {
                        cut = start;
                        suffix.push_str(kw);
                        expect = after_value(&stack);
                    }
                    None => return None,
                }
            }
        }
    }

    let mut repaired = String::with_capacity(cut + suffix.len() + stack.len() + 8);
    repaired.push_str(&text[..cut]);
    repaired.push_str(&suffix);

    match expect {
        // `"key"` with no colon yet, or `"key":` with no value yet: drop the
        // key (and the comma that introduced it).
        Expect::Colon => {
            if let Some(ks) = last_key_start {
                repaired.truncate(ks.min(repaired.len()));
            }
            strip_dangling_comma(&mut repaired);
        }
        Expect::Value if stack.last() == Some(&'}') => {
            if let Some(ks) = last_key_start {
                repaired.truncate(ks.min(repaired.len()));
            }
            strip_dangling_comma(&mut repaired);
        }
        // `[1,` drops the comma rather than inventing an element.
        Expect::Value if stack.last() == Some(&']') => {
            strip_dangling_comma(&mut repaired);
        }
        Expect::Key | Expect::KeyOrEnd => strip_dangling_comma(&mut repaired),
        _ => {}
    }

    for closer in stack.iter().rev() {
        repaired.push(*closer);
    }

    match serde_json::from_str::<Value>(&repaired) {
        Ok(_) => Some(repaired),
        Err(_) => None,
    }
}

/// Parse a truncated JSON text directly into a value.
pub fn parse_lenient(text: &str) -> Option<Value> {
    let repaired = complete_json(text)?;
    serde_json::from_str(&repaired).ok()
}

fn strip_dangling_comma(s: &mut String) {
    while s.ends_with(|c: char| c.is_whitespace()) {
        s.pop();
    }
    if s.ends_with(',') {
        s.pop();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn complete_input_passes_through() {
        assert_eq!(
            complete_json(r#"{"a": 1, "b": [true, null]}"#).as_deref(),
            Some(r#"{"a": 1, "b": [true, null]}"#)
        );
    }

    #[test]
    fn unterminated_value_string_is_closed() {
        assert_eq!(
            parse_lenient(r#"{"subject": "ma"#),
            Some(json!({"subject": "ma"}))
        );
    }

    #[test]
    fn dangling_key_is_dropped() {
        assert_eq!(parse_lenient(r#"{"a": 1, "b"#), Some(json!({"a": 1})));
        assert_eq!(parse_lenient(r#"{"a": 1, "b""#), Some(json!({"a": 1})));
        assert_eq!(parse_lenient(r#"{"a": 1, "b":"#), Some(json!({"a": 1})));
        assert_eq!(parse_lenient(r#"{"a"#), Some(json!({})));
    }

    #[test]
    fn open_containers_are_closed_in_order() {
        assert_eq!(
            parse_lenient(r#"{"a": {"b": [1, 2"#),
            Some(json!({"a": {"b": [1, 2]}}))
        );
        assert_eq!(parse_lenient("["), Some(json!([])));
        assert_eq!(parse_lenient("{"), Some(json!({})));
    }

    #[test]
    fn trailing_comma_is_dropped() {
        assert_eq!(parse_lenient(r#"[1, 2,"#), Some(json!([1, 2])));
        assert_eq!(parse_lenient(r#"{"a": 1,"#), Some(json!({"a": 1})));
    }

    #[test]
    fn partial_literal_is_completed() {
        assert_eq!(parse_lenient(r#"{"ok": tru"#), Some(json!({"ok": true})));
        assert_eq!(parse_lenient(r#"{"ok": f"#), Some(json!({"ok": false})));
        assert_eq!(parse_lenient(r#"[nul"#), Some(json!([null])));
    }

    #[test]
    fn partial_number_is_trimmed() {
        assert_eq!(parse_lenient(r#"{"n": 12."#), Some(json!({"n": 12})));
        assert_eq!(parse_lenient(r#"{"n": 1e"#), Some(json!({"n": 1})));
        // A bare sign carries no value; the key is dropped with it.
        assert_eq!(parse_lenient(r#"{"n": -"#), Some(json!({})));
    }

    #[test]
    fn incomplete_escape_is_discarded() {
        assert_eq!(parse_lenient(r#"{"s": "ab\"#), Some(json!({"s": "ab"})));
        assert_eq!(parse_lenient(r#"{"s": "ab\u00"#), Some(json!({"s": "ab"})));
    }

    #[test]
    fn completed_escape_is_kept() {
        assert_eq!(
            parse_lenient(r#"{"s": "a\"b"#),
            Some(json!({"s": "a\"b"}))
        );
        assert_eq!(
            parse_lenient(r#"{"s": "aA"#),
            Some(json!({"s": "aA"}))
        );
    }

    #[test]
    fn sentinel_style_control_chars_do_not_confuse_strings() {
        // An unterminated string may contain arbitrary payload text.
        let text = "{\"s\": \"a/b~c";
        assert_eq!(parse_lenient(text), Some(json!({"s": "a/b~c"})));
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert_eq!(complete_json("{,"), None);
        assert_eq!(complete_json("{\"a\" 1}"), None);
        assert_eq!(complete_json("[1 2]"), None);
        assert_eq!(complete_json("{\"ok\": trux"), None);
        assert_eq!(complete_json(""), None);
        assert_eq!(complete_json("   "), None);
        assert_eq!(complete_json("}{"), None);
    }

    #[test]
    fn garbage_after_complete_value_is_rejected() {
        assert_eq!(complete_json(r#"{"a": 1} {"#), None);
    }

    #[test]
    fn every_prefix_of_a_record_repairs_or_fails_cleanly() {
        let record = r#"{"type":"patch","reasoning":"add the subject","operation":{"op":"add","path":"/subject","value":"maths"},"status":"complete"}"#;
        for end in 1..=record.len() {
            if !record.is_char_boundary(end) {
                continue;
            }
            let prefix = &record[..end];
            if let Some(repaired) = complete_json(prefix) {
                let value: Value = serde_json::from_str(&repaired)
                    .expect("repaired prefix must strict-parse");
                assert!(value.is_object(), "prefix {prefix:?} repaired to non-object");
            }
        }
        // The full record must survive untouched.
        assert_eq!(complete_json(record).as_deref(), Some(record));
    }
}
