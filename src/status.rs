//! # Status — Shared Sieve Progress
//!
//! Thread-safe progress tracking shared between the chunk workers and the
//! caller. Workers add each processed segment's span with a lock-free
//! atomic; the percent readout is derived on demand. When status printing
//! is enabled, `\r<N>%` is written to stdout whenever the integer percent
//! grows, with a `fetch_max` race deciding which worker prints. Reporting
//! is best effort: under contention a percent step may be skipped, never
//! repeated out of order by the same reader.

use std::io::{self, Write};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

pub struct SieveStatus {
    /// Total interval length, stop - start + 1.
    total: u64,
    /// Sum of processed segment spans (may overshoot `total`).
    processed: AtomicU64,
    /// Last printed integer percent, -1 before the first report.
    last_printed: AtomicI64,
    print: bool,
}

impl SieveStatus {
    pub fn new(start: u64, stop: u64, print: bool) -> Arc<Self> {
        debug_assert!(stop >= start);
        let status = Arc::new(SieveStatus {
            total: stop - start + 1,
            processed: AtomicU64::new(0),
            last_printed: AtomicI64::new(-1),
            print,
        });
        status.report(0);
        status
    }

    /// Record one processed segment of `span` numbers.
    pub fn segment_done(&self, span: u64) {
        let acc = self.processed.fetch_add(span, Ordering::Relaxed) + span;
        self.report(acc);
    }

    /// Force the readout to 100% once all workers have joined.
    pub fn finish(&self) {
        self.processed.fetch_max(self.total, Ordering::Relaxed);
        self.report(self.total);
    }

    /// Completion percent in [0, 100].
    pub fn percent(&self) -> f64 {
        let acc = self.processed.load(Ordering::Relaxed);
        (acc as f64 / self.total as f64 * 100.0).min(100.0)
    }

    fn report(&self, acc: u64) {
        let pct = ((acc as u128 * 100) / self.total as u128).min(100) as i64;
        let prev = self.last_printed.fetch_max(pct, Ordering::Relaxed);
        if pct > prev && self.print {
            // stream errors are the caller's terminal problem, not ours
            let mut out = io::stdout();
            let _ = write!(out, "\r{}%", pct);
            let _ = out.flush();
        }
    }
}
