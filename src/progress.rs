//! Verb progress reporting.
//!
//! Batch progress is emitted on **stderr** so stdout stays parseable: the
//! verb contract reserves stdout for results and the terminal
//! `(processed, errors)` line.

use std::io::Write;

/// A single progress event for a batched verb run.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// Batch `n` of `total` started, carrying `items` work items.
    Batch {
        verb: String,
        n: u64,
        total: u64,
        items: u64,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-readable progress on stderr: `crawl asthme  batch 2/5 (10 items)`.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let ProgressEvent::Batch {
            verb,
            n,
            total,
            items,
        } = event;
        let line = format!("{}  batch {}/{} ({} items)\n", verb, n, total, items);
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
    }
}

/// No-op reporter for tests.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}
