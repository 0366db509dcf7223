//! Section-local shape validation.
//!
//! A document's top-level sections may have heterogeneous shapes, so there is
//! no global schema. A [`SectionRules`] instead binds individual section
//! names to an expected [`ValueKind`], and the applier consults the rule only
//! when an operation writes the section root itself. Writes below a section
//! root are constrained by the document's actual structure, not by rules.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::patch::types::{ApplyError, Op};

/// The JSON shape a section is declared to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Object,
    Array,
    String,
    Number,
    Boolean,
    Null,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Object => "object",
            ValueKind::Array => "array",
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Null => "null",
        }
    }

    /// Whether a value matches this kind.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueKind::Object => value.is_object(),
            ValueKind::Array => value.is_array(),
            ValueKind::String => value.is_string(),
            ValueKind::Number => value.is_number(),
            ValueKind::Boolean => value.is_boolean(),
            ValueKind::Null => value.is_null(),
        }
    }
}

/// Declared kinds for top-level sections.
#[derive(Debug, Clone, Default)]
pub struct SectionRules {
    kinds: BTreeMap<String, ValueKind>,
}

impl SectionRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the expected kind of a top-level section.
    pub fn require(mut self, section: impl Into<String>, kind: ValueKind) -> Self {
        self.kinds.insert(section.into(), kind);
        self
    }

    pub fn kind_of(&self, section: &str) -> Option<ValueKind> {
        self.kinds.get(section).copied()
    }

    /// Validate an operation against the rules.
    ///
    /// Only a write landing on a declared section root is checked; everything
    /// else passes.
    pub fn check(&self, op: &Op) -> Result<(), ApplyError> {
        let (value, path) = match op.value() {
            Some(v) => (v, op.path()),
            None => return Ok(()),
        };
        if path.len() != 1 {
            return Ok(());
        }
        match self.kinds.get(&path[0]) {
            Some(kind) if !kind.matches(value) => {
                Err(ApplyError::SchemaMismatch(path[0].clone()))
            }
            _ => Ok(()),
        }
    }
}
