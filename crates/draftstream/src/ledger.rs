//! Session-scoped idempotency ledger.
//!
//! A content-addressed record of every operation that has been applied to
//! canonical state. Membership is the sole idempotency guard: a redelivered
//! operation whose digest is present collapses to a no-op. Entries are never
//! removed within a session; the ledger drops with its owning manager.

use indexmap::IndexMap;

use crate::patch::types::Op;

/// One applied-patch record.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedPatch {
    pub digest: String,
    pub operation: Op,
}

/// Insertion-ordered set of applied operations, keyed by digest.
#[derive(Debug, Default)]
pub struct Ledger {
    applied: IndexMap<String, Op>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_applied(&self, digest: &str) -> bool {
        self.applied.contains_key(digest)
    }

    /// Record an operation as applied. Returns `false` if the digest was
    /// already present.
    pub fn mark_applied(&mut self, digest: String, operation: Op) -> bool {
        self.applied.insert(digest, operation).is_none()
    }

    pub fn len(&self) -> usize {
        self.applied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }

    /// Applied-patch records in application order.
    pub fn records(&self) -> impl Iterator<Item = AppliedPatch> + '_ {
        self.applied.iter().map(|(digest, operation)| AppliedPatch {
            digest: digest.clone(),
            operation: operation.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::op_digest;
    use crate::pointer::parse_pointer;
    use serde_json::json;

    fn op(path: &str) -> Op {
        Op::Add { path: parse_pointer(path), value: json!(1) }
    }

    #[test]
    fn membership_tracks_marked_digests() {
        let mut ledger = Ledger::new();
        let a = op("/a");
        let d = op_digest(&a);
        assert!(!ledger.has_applied(&d));
        assert!(ledger.mark_applied(d.clone(), a.clone()));
        assert!(ledger.has_applied(&d));
        // Re-marking the same digest reports the duplicate.
        assert!(!ledger.mark_applied(d, a));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn records_preserve_application_order() {
        let mut ledger = Ledger::new();
        for path in ["/b", "/a", "/c"] {
            let o = op(path);
            ledger.mark_applied(op_digest(&o), o);
        }
        let paths: Vec<String> = ledger
            .records()
            .map(|r| r.operation.path()[0].clone())
            .collect();
        assert_eq!(paths, vec!["b", "a", "c"]);
    }
}
