//! Record envelopes and the complete/partial classifier.
//!
//! Every framed record is a JSON object with a `type` discriminator. The
//! protocol recognizes patch, comment, and correlation records; anything
//! else is ignored rather than rejected, so a producer can add record kinds
//! without breaking older consumers.
//!
//! Classification is re-derived from parseability; the producer's `status`
//! flag is advisory only, since boundary records are routinely mis-flagged.
//! A record that fails a strict parse gets one lenient repair attempt; if
//! that also fails it is discarded and logged, never raised: a truncated
//! record near the end of the stream is expected, not exceptional.

use serde_json::Value;

use draftstream_lenient_json::complete_json;

use crate::patch::codec::op_from_json;
use crate::patch::types::Op;

/// Completion state the producer claims for a patch record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredStatus {
    Complete,
    Partial,
}

/// A decoded record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordEnvelope {
    /// A change operation with optional free-form rationale.
    Patch {
        reasoning: Option<String>,
        operation: Op,
        status: Option<DeclaredStatus>,
    },
    /// Human-readable narration; carries no document state.
    Comment { text: String },
    /// Correlates this stream with an upstream request.
    Correlation { id: String },
    /// Recognized as a record, but of an unknown kind.
    Ignored,
}

/// Outcome of classifying one candidate record.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Strict-parsed and structurally sound.
    Valid(RecordEnvelope),
    /// Truncated, but a lenient repair produced a usable envelope.
    Partial(RecordEnvelope),
    /// Neither parse succeeded; the record is dropped.
    Discard,
}

/// Classify a candidate record's raw text.
pub fn classify_record(text: &str) -> Classification {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        if let Some(envelope) = decode_envelope(&value) {
            return Classification::Valid(envelope);
        }
        tracing::debug!(len = text.len(), "well-formed record with unusable envelope, discarded");
        return Classification::Discard;
    }
    if let Some(repaired) = complete_json(text) {
        if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
            match decode_envelope(&value) {
                // An unknown kind in a truncated record is usually a cut-off
                // discriminator, not a real record; nothing to preview.
                Some(RecordEnvelope::Ignored) | None => {}
                Some(envelope) => return Classification::Partial(envelope),
            }
        }
    }
    tracing::debug!(len = text.len(), "unparseable record discarded");
    Classification::Discard
}

/// Decode a parsed record into an envelope.
///
/// `None` means the record is unusable (not an object, no discriminator, or
/// a patch with an undecodable operation). Unknown discriminators decode to
/// [`RecordEnvelope::Ignored`].
fn decode_envelope(value: &Value) -> Option<RecordEnvelope> {
    let obj = value.as_object()?;
    let kind = obj.get("type").and_then(|v| v.as_str())?;
    match kind {
        "patch" => {
            let operation = op_from_json(obj.get("operation")?).ok()?;
            let reasoning = obj
                .get("reasoning")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            let status = match obj.get("status").and_then(|v| v.as_str()) {
                Some("complete") => Some(DeclaredStatus::Complete),
                Some("partial") => Some(DeclaredStatus::Partial),
                _ => None,
            };
            Some(RecordEnvelope::Patch { reasoning, operation, status })
        }
        "comment" => {
            let text = obj.get("comment").and_then(|v| v.as_str())?.to_string();
            Some(RecordEnvelope::Comment { text })
        }
        "correlation" => {
            let id = obj.get("id").and_then(|v| v.as_str())?.to_string();
            Some(RecordEnvelope::Correlation { id })
        }
        _ => Some(RecordEnvelope::Ignored),
    }
}
