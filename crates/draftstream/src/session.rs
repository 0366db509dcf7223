//! One streaming session: the scan → classify → apply/preview loop.
//!
//! A [`StreamSession`] owns the scanner, the document manager, and the
//! newest partial operation. Chunks are processed strictly in order; each
//! chunk's effects on canonical state and preview are complete before the
//! next chunk is accepted. Canonical state only ever advances through the
//! manager's apply/dedup path; nothing speculative is promoted, not on
//! completion and not on abort.

use serde_json::Value;
use thiserror::Error;

use crate::manager::{ApplyOutcome, DocumentManager};
use crate::patch::types::Op;
use crate::preview::compose_preview;
use crate::record::{classify_record, Classification, RecordEnvelope};
use crate::scan::{RecordScanner, ScanError, ScannerOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingFirstRecord,
    Streaming,
    Ended,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    /// A chunk arrived after `finish` or `abort`.
    #[error("SESSION_ENDED")]
    SessionEnded,
}

/// Monotonic per-session counters, for diagnostics only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub records_valid: u64,
    pub records_partial: u64,
    pub records_discarded: u64,
    pub patches_applied: u64,
    pub patches_deduplicated: u64,
    pub patches_skipped: u64,
}

pub struct StreamSession {
    scanner: RecordScanner,
    manager: DocumentManager,
    partial: Option<Op>,
    correlation_id: Option<String>,
    last_narration: Option<String>,
    state: SessionState,
    stats: SessionStats,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSession {
    pub fn new() -> Self {
        Self::with_parts(DocumentManager::new(), ScannerOptions::default())
    }

    pub fn with_parts(manager: DocumentManager, options: ScannerOptions) -> Self {
        Self {
            scanner: RecordScanner::new(options),
            manager,
            partial: None,
            correlation_id: None,
            last_narration: None,
            state: SessionState::AwaitingFirstRecord,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn manager(&self) -> &DocumentManager {
        &self.manager
    }

    /// Mutable manager access, for listener registration.
    pub fn manager_mut(&mut self) -> &mut DocumentManager {
        &mut self.manager
    }

    /// The canonical document as last committed.
    pub fn document(&self) -> &Value {
        self.manager.document()
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn last_narration(&self) -> Option<&str> {
        self.last_narration.as_deref()
    }

    /// Compose the current preview: canonical plus the newest partial.
    ///
    /// Pull-only and recomputed per call; composing never touches canonical
    /// state or the ledger.
    pub fn preview_document(&self) -> Value {
        compose_preview(
            self.manager.document(),
            self.partial.as_ref(),
            self.manager.rules(),
        )
    }

    /// Feed the next chunk of stream text.
    ///
    /// Complete records are applied to canonical state; the trailing
    /// unframed fragment is classified leniently and retained as the newest
    /// partial for preview. The only hard failure is scanner
    /// desynchronization.
    pub fn push_chunk(&mut self, chunk: &str) -> Result<(), SessionError> {
        if self.state == SessionState::Ended {
            return Err(SessionError::SessionEnded);
        }
        let records = self.scanner.push(chunk)?;
        if self.state == SessionState::AwaitingFirstRecord
            && (!records.is_empty() || !self.scanner.fragment().trim().is_empty())
        {
            self.state = SessionState::Streaming;
        }

        for record in &records {
            match classify_record(record) {
                Classification::Valid(envelope) => {
                    self.stats.records_valid += 1;
                    // A completed record supersedes any in-flight partial.
                    self.partial = None;
                    self.handle_envelope(envelope);
                }
                Classification::Partial(envelope) => {
                    self.stats.records_partial += 1;
                    if let RecordEnvelope::Patch { operation, reasoning, .. } = envelope {
                        if let Some(text) = reasoning {
                            self.last_narration = Some(text);
                        }
                        self.partial = Some(operation);
                    }
                }
                Classification::Discard => {
                    self.stats.records_discarded += 1;
                }
            }
        }

        // The unframed tail drives the preview. It is re-derived on every
        // chunk; an unusable tail leaves the preview canonical-only.
        let fragment = self.scanner.fragment();
        if !fragment.trim().is_empty() {
            self.partial = match classify_record(fragment) {
                Classification::Valid(RecordEnvelope::Patch { operation, .. })
                | Classification::Partial(RecordEnvelope::Patch { operation, .. }) => {
                    Some(operation)
                }
                _ => None,
            };
        }
        Ok(())
    }

    /// End the stream normally.
    ///
    /// Any outstanding partial is discarded, never promoted. When the
    /// producer supplies a confirmed final document it is installed through
    /// the iteration gate, so a stale final cannot clobber newer state.
    pub fn finish(&mut self, final_document: Option<Value>, iteration: Option<u64>) {
        self.partial = None;
        if let Some(document) = final_document {
            if document != *self.manager.document() {
                self.manager.replace_document(document, iteration);
            }
        }
        self.state = SessionState::Ended;
    }

    /// Abort the stream: canonical state stays exactly as last committed.
    pub fn abort(&mut self) {
        self.partial = None;
        self.state = SessionState::Ended;
        tracing::debug!("stream session aborted, canonical state frozen");
    }

    fn handle_envelope(&mut self, envelope: RecordEnvelope) {
        match envelope {
            RecordEnvelope::Patch { reasoning, operation, .. } => {
                if let Some(text) = reasoning {
                    self.last_narration = Some(text);
                }
                match self.manager.apply_valid_patch(&operation) {
                    ApplyOutcome::Applied => self.stats.patches_applied += 1,
                    ApplyOutcome::Duplicate => self.stats.patches_deduplicated += 1,
                    ApplyOutcome::Skipped => self.stats.patches_skipped += 1,
                }
            }
            RecordEnvelope::Comment { text } => {
                self.last_narration = Some(text);
            }
            RecordEnvelope::Correlation { id } => {
                self.correlation_id = Some(id);
            }
            RecordEnvelope::Ignored => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::DEFAULT_SENTINEL;
    use serde_json::json;

    const RS: char = DEFAULT_SENTINEL;

    fn patch_record(op: &str, path: &str, value: &Value) -> String {
        format!(
            r#"{{"type":"patch","reasoning":"r","operation":{{"op":"{op}","path":"{path}","value":{value}}},"status":"complete"}}"#
        )
    }

    #[test]
    fn state_machine_advances_through_the_session() {
        let mut s = StreamSession::new();
        assert_eq!(s.state(), SessionState::AwaitingFirstRecord);
        s.push_chunk(&format!("{}{RS}", patch_record("add", "/t", &json!(1))))
            .unwrap();
        assert_eq!(s.state(), SessionState::Streaming);
        s.finish(None, None);
        assert_eq!(s.state(), SessionState::Ended);
        assert_eq!(s.push_chunk("x"), Err(SessionError::SessionEnded));
    }

    #[test]
    fn comment_correlation_and_unknown_records_do_not_disturb_state() {
        let mut s = StreamSession::new();
        let stream = format!(
            "{}{RS}{}{RS}{}{RS}{}{RS}",
            r#"{"type":"correlation","id":"req-7"}"#,
            r#"{"type":"comment","comment":"working on the title"}"#,
            r#"{"type":"future-kind","x":1}"#,
            patch_record("add", "/title", &json!("A")),
        );
        s.push_chunk(&stream).unwrap();
        assert_eq!(s.document(), &json!({"title": "A"}));
        assert_eq!(s.correlation_id(), Some("req-7"));
        // Patch reasoning supersedes the earlier comment.
        assert_eq!(s.last_narration(), Some("r"));
        assert_eq!(s.stats().records_valid, 4);
    }

    #[test]
    fn garbage_records_are_counted_and_skipped() {
        let mut s = StreamSession::new();
        let stream = format!(
            "###{RS}{}{RS}",
            patch_record("add", "/title", &json!("A"))
        );
        s.push_chunk(&stream).unwrap();
        assert_eq!(s.document(), &json!({"title": "A"}));
        assert_eq!(s.stats().records_discarded, 1);
    }

    #[test]
    fn desynchronization_is_a_hard_error() {
        let mut s = StreamSession::with_parts(
            DocumentManager::new(),
            ScannerOptions { sentinel: DEFAULT_SENTINEL, max_buffer: 8 },
        );
        let err = s.push_chunk(r#"{"type":"patch","operation"#).unwrap_err();
        assert!(matches!(err, SessionError::Scan(ScanError::Desynchronized { .. })));
    }

    #[test]
    fn unframed_but_parseable_fragment_previews_without_committing() {
        let mut s = StreamSession::new();
        // Complete record text, but its delimiter has not arrived.
        s.push_chunk(&patch_record("add", "/title", &json!("A"))).unwrap();
        assert_eq!(s.document(), &json!({}));
        assert_eq!(s.preview_document(), json!({"title": "A"}));
        // The delimiter lands: the same record commits exactly once.
        s.push_chunk(&RS.to_string()).unwrap();
        assert_eq!(s.document(), &json!({"title": "A"}));
        assert_eq!(s.stats().patches_applied, 1);
    }
}
