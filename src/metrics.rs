use crate::router::Capability;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing question-answering activity since startup.
#[derive(Default)]
pub struct QaMetrics {
    questions_answered: AtomicU64,
    summary_routes: AtomicU64,
    vector_routes: AtomicU64,
    chunks_indexed: AtomicU64,
    failures: AtomicU64,
}

impl QaMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully answered question.
    pub fn record_answer(&self, capability: Capability, chunk_count: u64) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(chunk_count, Ordering::Relaxed);
        let route = match capability {
            Capability::Summary => &self.summary_routes,
            Capability::Vector => &self.vector_routes,
        };
        route.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that ended in an error.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
            summary_routes: self.summary_routes.load(Ordering::Relaxed),
            vector_routes: self.vector_routes.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of the counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Questions that produced an answer.
    pub questions_answered: u64,
    /// Answers produced by the summary path.
    pub summary_routes: u64,
    /// Answers produced by the vector path.
    pub vector_routes: u64,
    /// Chunks built across all answered questions.
    pub chunks_indexed: u64,
    /// Requests that failed after input validation.
    pub failures: u64,
}
