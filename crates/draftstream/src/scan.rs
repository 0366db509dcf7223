//! Sentinel-delimited record scanning over an append-only chunk stream.
//!
//! Chunks arrive with arbitrary boundaries; the scanner appends them to a
//! carry-over buffer and splits out complete records on a reserved sentinel
//! character. A sentinel inside an open JSON string literal is payload, not
//! framing, so the scanner tracks string and escape state while it walks.
//! Each byte is examined once; the trailing unframed fragment stays buffered
//! for the next chunk.
//!
//! If the buffer outgrows its cap without a sentinel, the stream's framing
//! contract is broken and further interpretation is unsafe; that is the one
//! condition surfaced as a hard error.

use thiserror::Error;

/// Default sentinel: ASCII record separator.
pub const DEFAULT_SENTINEL: char = '\u{1e}';

const DEFAULT_MAX_BUFFER: usize = 1 << 20;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// No sentinel within the buffer cap: the stream is desynchronized.
    #[error("STREAM_DESYNCHRONIZED: {buffered} bytes buffered, limit {limit}")]
    Desynchronized { buffered: usize, limit: usize },
}

#[derive(Debug, Clone)]
pub struct ScannerOptions {
    pub sentinel: char,
    pub max_buffer: usize,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL,
            max_buffer: DEFAULT_MAX_BUFFER,
        }
    }
}

#[derive(Debug)]
pub struct RecordScanner {
    opts: ScannerOptions,
    buf: String,
    /// Byte offset up to which `buf` has been examined.
    scan_pos: usize,
    in_string: bool,
    escaped: bool,
    desynced: bool,
}

impl Default for RecordScanner {
    fn default() -> Self {
        Self::new(ScannerOptions::default())
    }
}

impl RecordScanner {
    pub fn new(opts: ScannerOptions) -> Self {
        Self {
            opts,
            buf: String::new(),
            scan_pos: 0,
            in_string: false,
            escaped: false,
            desynced: false,
        }
    }

    /// Append a chunk and return the complete records it finished.
    ///
    /// Records are trimmed; empty segments (leading sentinel, doubled
    /// sentinels) are dropped.
    pub fn push(&mut self, chunk: &str) -> Result<Vec<String>, ScanError> {
        if self.desynced {
            return Err(ScanError::Desynchronized {
                buffered: self.buf.len(),
                limit: self.opts.max_buffer,
            });
        }
        self.buf.push_str(chunk);

        let mut records = Vec::new();
        // Byte offset where the record currently being assembled starts.
        let mut record_start = 0usize;
        for (i, c) in self.buf[self.scan_pos..].char_indices() {
            let at = self.scan_pos + i;
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == '"' {
                    self.in_string = false;
                }
            } else if c == self.opts.sentinel {
                let record = self.buf[record_start..at].trim();
                if !record.is_empty() {
                    records.push(record.to_string());
                }
                record_start = at + c.len_utf8();
            } else if c == '"' {
                self.in_string = true;
            }
        }

        self.buf.drain(..record_start);
        self.scan_pos = self.buf.len();

        if self.buf.len() > self.opts.max_buffer {
            self.desynced = true;
            tracing::warn!(
                buffered = self.buf.len(),
                limit = self.opts.max_buffer,
                "no record delimiter within buffer cap, stream desynchronized"
            );
            return Err(ScanError::Desynchronized {
                buffered: self.buf.len(),
                limit: self.opts.max_buffer,
            });
        }
        Ok(records)
    }

    /// The trailing unframed fragment, still waiting for its delimiter.
    pub fn fragment(&self) -> &str {
        self.buf.trim_start()
    }

    /// Whether the scanner has hit the desynchronization condition.
    pub fn is_desynchronized(&self) -> bool {
        self.desynced
    }
}
