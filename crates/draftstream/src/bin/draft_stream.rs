//! `draft-stream` — reconstruct a document from a patch record stream.
//!
//! Usage:
//!   draft-stream ['<initial-document-json>']
//!
//! The record stream is read from stdin. The optional first argument seeds
//! the canonical document; it defaults to an empty object. The final
//! canonical document is printed to stdout. Diagnostics go to stderr,
//! filtered by `RUST_LOG`.

use std::io::{self, Read, Write};

use serde_json::Value;

use draftstream::manager::DocumentManager;
use draftstream::scan::ScannerOptions;
use draftstream::session::StreamSession;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let manager = match args.get(1) {
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(doc) => DocumentManager::with_document(doc),
            Err(e) => {
                eprintln!("initial document is not valid JSON: {e}");
                std::process::exit(1);
            }
        },
        None => DocumentManager::new(),
    };

    let mut buf = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut buf) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let mut session = StreamSession::with_parts(manager, ScannerOptions::default());
    if let Err(e) = session.push_chunk(&buf) {
        eprintln!("{e}");
        std::process::exit(1);
    }
    session.finish(None, None);

    match serde_json::to_string_pretty(session.document()) {
        Ok(rendered) => {
            let mut stdout = io::stdout();
            let _ = stdout.write_all(rendered.as_bytes());
            let _ = stdout.write_all(b"\n");
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
