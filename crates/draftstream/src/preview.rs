//! Speculative preview composition.
//!
//! The preview layers the newest in-flight partial operation on top of a
//! copy of the canonical document, for rendering only. It is derived state:
//! recomputed on demand from the current canonical snapshot plus the single
//! newest partial, never from a replay of prior partials, and it is never
//! hashed into the ledger or committed back.

use serde_json::Value;

use crate::patch::apply::apply_op;
use crate::patch::types::Op;
use crate::schema::SectionRules;

/// Compose a preview document.
///
/// If the partial operation does not apply cleanly, the preview is exactly
/// the canonical document.
pub fn compose_preview(
    canonical: &Value,
    partial: Option<&Op>,
    rules: Option<&SectionRules>,
) -> Value {
    match partial {
        Some(op) => {
            apply_op(canonical, op, rules).unwrap_or_else(|_| canonical.clone())
        }
        None => canonical.clone(),
    }
}
