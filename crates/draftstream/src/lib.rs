//! draftstream — incremental reconstruction of a structured document from a
//! streamed sequence of patch records.
//!
//! A language model emits a sentinel-delimited stream of JSON records that
//! describe edits to a nested document. This crate scans the stream into
//! candidate records, classifies each as complete or still-arriving, applies
//! complete patches exactly once to a canonical document, and composes a
//! speculative preview from the newest in-flight partial without ever letting
//! it touch canonical state.

pub mod digest;
pub mod ledger;
pub mod manager;
pub mod patch;
pub mod pointer;
pub mod preview;
pub mod record;
pub mod scan;
pub mod schema;
pub mod session;
