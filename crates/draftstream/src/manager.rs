//! Canonical document ownership.
//!
//! The [`DocumentManager`] owns the canonical document, its iteration
//! counter, and the idempotency ledger. Every mutation passes through it:
//! individual operations go through digest → dedup → pure apply → commit,
//! whole-document replacements through the iteration gate. Accepted
//! mutations are announced to subscribers synchronously, in registration
//! order, before the mutating call returns.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::digest::op_digest;
use crate::ledger::Ledger;
use crate::patch::apply::apply_op;
use crate::patch::types::Op;
use crate::pointer::format_pointer;
use crate::schema::SectionRules;

/// Payload of a change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateEvent {
    pub document: Value,
    pub iteration: Option<u64>,
}

/// Read-only snapshot of canonical state.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub document: Value,
    pub iteration: Option<u64>,
}

/// Outcome of [`DocumentManager::apply_valid_patch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The operation mutated canonical state and was recorded in the ledger.
    Applied,
    /// The operation's digest was already in the ledger; nothing changed.
    Duplicate,
    /// The operation could not be applied (missing parent, bad index, shape
    /// mismatch); canonical state is unchanged and processing continues.
    Skipped,
}

type Listener = Box<dyn FnMut(UpdateEvent) + Send + Sync>;

pub struct DocumentManager {
    document: Value,
    iteration: Option<u64>,
    ledger: Ledger,
    rules: Option<SectionRules>,
    next_listener_id: u64,
    listeners: BTreeMap<u64, Listener>,
}

impl Default for DocumentManager {
    fn default() -> Self {
        Self::with_document(Value::Object(Map::new()))
    }
}

impl DocumentManager {
    /// A manager over an empty object document.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: Value) -> Self {
        Self {
            document,
            iteration: None,
            ledger: Ledger::new(),
            rules: None,
            next_listener_id: 1,
            listeners: BTreeMap::new(),
        }
    }

    pub fn with_rules(mut self, rules: SectionRules) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn iteration(&self) -> Option<u64> {
        self.iteration
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            document: self.document.clone(),
            iteration: self.iteration,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn rules(&self) -> Option<&SectionRules> {
        self.rules.as_ref()
    }

    /// Register a change listener; returns a handle for deregistration.
    pub fn on_update<F>(&mut self, listener: F) -> u64
    where
        F: FnMut(UpdateEvent) + Send + Sync + 'static,
    {
        let id = self.next_listener_id;
        self.next_listener_id = self.next_listener_id.saturating_add(1);
        self.listeners.insert(id, Box::new(listener));
        id
    }

    pub fn off_update(&mut self, listener_id: u64) -> bool {
        self.listeners.remove(&listener_id).is_some()
    }

    /// Apply one complete operation to canonical state.
    ///
    /// Operations are gated by the ledger, not by iteration: a digest seen
    /// before is a no-op, an inapplicable operation is skipped and logged,
    /// and only a successful application commits, records, and notifies.
    pub fn apply_valid_patch(&mut self, op: &Op) -> ApplyOutcome {
        let digest = op_digest(op);
        if self.ledger.has_applied(&digest) {
            tracing::debug!(
                op = op.op_name(),
                path = %format_pointer(op.path()),
                "operation already applied, deduplicated"
            );
            return ApplyOutcome::Duplicate;
        }
        match apply_op(&self.document, op, self.rules.as_ref()) {
            Ok(next) => {
                self.document = next;
                self.ledger.mark_applied(digest, op.clone());
                self.emit_update();
                ApplyOutcome::Applied
            }
            Err(err) => {
                tracing::debug!(
                    op = op.op_name(),
                    path = %format_pointer(op.path()),
                    %err,
                    "operation not applicable, skipped"
                );
                ApplyOutcome::Skipped
            }
        }
    }

    /// Replace the whole canonical document, if the iteration is not stale.
    ///
    /// Accepted when `iteration` is `None`, the current iteration is `None`,
    /// or `iteration` is strictly greater than the current one. A stale
    /// replacement is ignored and reported `false`.
    pub fn replace_document(&mut self, document: Value, iteration: Option<u64>) -> bool {
        let accept = match (iteration, self.iteration) {
            (None, _) | (_, None) => true,
            (Some(incoming), Some(current)) => incoming > current,
        };
        if !accept {
            tracing::debug!(
                incoming = ?iteration,
                current = ?self.iteration,
                "stale whole-document replacement ignored"
            );
            return false;
        }
        self.document = document;
        if iteration.is_some() {
            self.iteration = iteration;
        }
        self.emit_update();
        true
    }

    fn emit_update(&mut self) {
        let event = UpdateEvent {
            document: self.document.clone(),
            iteration: self.iteration,
        };
        for listener in self.listeners.values_mut() {
            listener(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::parse_pointer;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn add(path: &str, value: Value) -> Op {
        Op::Add { path: parse_pointer(path), value }
    }

    #[test]
    fn apply_commits_and_records() {
        let mut mgr = DocumentManager::new();
        assert_eq!(
            mgr.apply_valid_patch(&add("/title", json!("A"))),
            ApplyOutcome::Applied
        );
        assert_eq!(mgr.document(), &json!({"title": "A"}));
        assert_eq!(mgr.ledger().len(), 1);
    }

    #[test]
    fn duplicate_application_is_a_noop() {
        let mut mgr = DocumentManager::new();
        let op = add("/title", json!("A"));
        assert_eq!(mgr.apply_valid_patch(&op), ApplyOutcome::Applied);
        assert_eq!(mgr.apply_valid_patch(&op), ApplyOutcome::Duplicate);
        assert_eq!(mgr.document(), &json!({"title": "A"}));
        assert_eq!(mgr.ledger().len(), 1);
    }

    #[test]
    fn inapplicable_operation_is_skipped_without_aborting() {
        let mut mgr = DocumentManager::new();
        assert_eq!(
            mgr.apply_valid_patch(&add("/a/b/c", json!(1))),
            ApplyOutcome::Skipped
        );
        assert_eq!(
            mgr.apply_valid_patch(&add("/title", json!("ok"))),
            ApplyOutcome::Applied
        );
        assert_eq!(mgr.document(), &json!({"title": "ok"}));
    }

    #[test]
    fn later_operation_wins_within_a_sequence() {
        let mut mgr = DocumentManager::new();
        mgr.apply_valid_patch(&add("/title", json!("A")));
        mgr.apply_valid_patch(&Op::Replace {
            path: parse_pointer("/title"),
            value: json!("B"),
        });
        assert_eq!(mgr.document()["title"], json!("B"));
    }

    #[test]
    fn replacement_is_iteration_gated() {
        let mut mgr = DocumentManager::new();
        assert!(mgr.replace_document(json!({"v": "x"}), Some(5)));
        assert_eq!(mgr.iteration(), Some(5));
        // Same iteration: first writer wins.
        assert!(!mgr.replace_document(json!({"v": "y"}), Some(5)));
        assert_eq!(mgr.document(), &json!({"v": "x"}));
        assert!(!mgr.replace_document(json!({"v": "y"}), Some(4)));
        assert!(mgr.replace_document(json!({"v": "z"}), Some(6)));
        assert_eq!(mgr.iteration(), Some(6));
        // Undefined iteration always replaces, without regressing the counter.
        assert!(mgr.replace_document(json!({"v": "w"}), None));
        assert_eq!(mgr.iteration(), Some(6));
    }

    #[test]
    fn snapshot_reflects_committed_state() {
        let mut mgr = DocumentManager::new();
        mgr.replace_document(json!({"title": "A"}), Some(2));
        let snap = mgr.snapshot();
        assert_eq!(snap.document, json!({"title": "A"}));
        assert_eq!(snap.iteration, Some(2));
    }

    #[test]
    fn listeners_fire_in_order_and_deregister() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut mgr = DocumentManager::new();
        let s1 = Arc::clone(&seen);
        let first = mgr.on_update(move |ev| {
            s1.lock().unwrap().push(("first", ev.document.clone()));
        });
        let s2 = Arc::clone(&seen);
        mgr.on_update(move |ev| {
            s2.lock().unwrap().push(("second", ev.document.clone()));
        });

        mgr.apply_valid_patch(&add("/title", json!("A")));
        {
            let log = seen.lock().unwrap();
            assert_eq!(log.len(), 2);
            assert_eq!(log[0].0, "first");
            assert_eq!(log[1].0, "second");
            assert_eq!(log[0].1, json!({"title": "A"}));
        }

        assert!(mgr.off_update(first));
        assert!(!mgr.off_update(first));
        mgr.apply_valid_patch(&add("/x", json!(1)));
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[test]
    fn skipped_and_duplicate_operations_do_not_notify() {
        let seen = Arc::new(Mutex::new(0u32));
        let mut mgr = DocumentManager::new();
        let s = Arc::clone(&seen);
        mgr.on_update(move |_| *s.lock().unwrap() += 1);

        let op = add("/title", json!("A"));
        mgr.apply_valid_patch(&op);
        mgr.apply_valid_patch(&op);
        mgr.apply_valid_patch(&add("/a/b", json!(1)));
        mgr.replace_document(json!({}), Some(1));
        mgr.replace_document(json!({}), Some(1));
        assert_eq!(*seen.lock().unwrap(), 2);
    }
}
