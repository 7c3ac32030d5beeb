//! Operator-facing failure counters
//!
//! Runtime engine errors are absorbed at the orchestrator boundary and
//! never reach the command sink, so recurring failures would otherwise be
//! invisible. The counters here make them observable without changing
//! user-visible behavior.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared failure and throughput counters
#[derive(Debug, Default)]
pub struct Diagnostics {
    keyword_errors: AtomicU64,
    dictation_errors: AtomicU64,
    misaligned_results: AtomicU64,
    sink_errors: AtomicU64,
    turns_completed: AtomicU64,
    turns_forwarded: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    /// Keyword engine faults during listening
    pub keyword_errors: u64,
    /// Terminal dictation failures (network, no speech, timeout)
    pub dictation_errors: u64,
    /// Dictation results discarded for misaligned transcript/confidence lists
    pub misaligned_results: u64,
    /// Well-formed results the command sink failed to accept
    pub sink_errors: u64,
    /// Dictation turns that reached a terminal outcome
    pub turns_completed: u64,
    /// Turns whose transcripts were forwarded to the sink
    pub turns_forwarded: u64,
}

impl Diagnostics {
    /// Create a new shared counter set
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn record_keyword_error(&self) {
        self.keyword_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dictation_error(&self) {
        self.dictation_errors.fetch_add(1, Ordering::Relaxed);
        self.turns_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_misaligned(&self) {
        self.misaligned_results.fetch_add(1, Ordering::Relaxed);
        self.turns_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sink_error(&self) {
        self.sink_errors.fetch_add(1, Ordering::Relaxed);
        self.turns_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_forwarded(&self) {
        self.turns_forwarded.fetch_add(1, Ordering::Relaxed);
        self.turns_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    #[must_use]
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            keyword_errors: self.keyword_errors.load(Ordering::Relaxed),
            dictation_errors: self.dictation_errors.load(Ordering::Relaxed),
            misaligned_results: self.misaligned_results.load(Ordering::Relaxed),
            sink_errors: self.sink_errors.load(Ordering::Relaxed),
            turns_completed: self.turns_completed.load(Ordering::Relaxed),
            turns_forwarded: self.turns_forwarded.load(Ordering::Relaxed),
        }
    }

    /// Log the counters, typically at shutdown
    pub fn report(&self) {
        let s = self.snapshot();
        tracing::info!(
            turns_completed = s.turns_completed,
            turns_forwarded = s.turns_forwarded,
            keyword_errors = s.keyword_errors,
            dictation_errors = s.dictation_errors,
            misaligned_results = s.misaligned_results,
            sink_errors = s.sink_errors,
            "session diagnostics"
        );
    }
}
