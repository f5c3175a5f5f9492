//! Process-wide counters for diagnostics and plan assembly.
//!
//! Increments are silent. [`Metrics::flush`] logs every counter in one
//! `info!` event; the CLI calls it before exiting.

use std::sync::atomic::{AtomicU64, Ordering};

pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    runs_started: AtomicU64,
    runs_finished: AtomicU64,
    stages_reported: AtomicU64,
    unknown_stages: AtomicU64,
    recommendations_assembled: AtomicU64,
    duplicates_dropped: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub runs_started: u64,
    pub runs_finished: u64,
    pub stages_reported: u64,
    pub unknown_stages: u64,
    pub recommendations_assembled: u64,
    pub duplicates_dropped: u64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            runs_started: AtomicU64::new(0),
            runs_finished: AtomicU64::new(0),
            stages_reported: AtomicU64::new(0),
            unknown_stages: AtomicU64::new(0),
            recommendations_assembled: AtomicU64::new(0),
            duplicates_dropped: AtomicU64::new(0),
        }
    }

    pub fn inc_runs_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_started", "counter incremented");
    }

    pub fn inc_runs_finished(&self) {
        self.runs_finished.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_finished", "counter incremented");
    }

    pub fn inc_stages_reported(&self) {
        self.stages_reported.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "stages_reported", "counter incremented");
    }

    pub fn inc_unknown_stages(&self) {
        self.unknown_stages.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "unknown_stages", "counter incremented");
    }

    /// Add a whole plan's worth of recommendations and dropped duplicates.
    pub fn add_assembled(&self, recommendations: usize, duplicates: usize) {
        self.recommendations_assembled
            .fetch_add(recommendations as u64, Ordering::Relaxed);
        self.duplicates_dropped
            .fetch_add(duplicates as u64, Ordering::Relaxed);
        tracing::trace!(
            metric = "recommendations_assembled",
            recommendations,
            duplicates,
            "counter incremented"
        );
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_finished: self.runs_finished.load(Ordering::Relaxed),
            stages_reported: self.stages_reported.load(Ordering::Relaxed),
            unknown_stages: self.unknown_stages.load(Ordering::Relaxed),
            recommendations_assembled: self.recommendations_assembled.load(Ordering::Relaxed),
            duplicates_dropped: self.duplicates_dropped.load(Ordering::Relaxed),
        }
    }

    /// Log all counters as a single event.
    pub fn flush(&self) {
        let s = self.snapshot();
        tracing::info!(
            metric = "flush",
            runs_started = s.runs_started,
            runs_finished = s.runs_finished,
            stages_reported = s.stages_reported,
            unknown_stages = s.unknown_stages,
            recommendations_assembled = s.recommendations_assembled,
            duplicates_dropped = s.duplicates_dropped,
        );
    }

    /// Zero every counter (tests).
    pub fn reset(&self) {
        for counter in [
            &self.runs_started,
            &self.runs_finished,
            &self.stages_reported,
            &self.unknown_stages,
            &self.recommendations_assembled,
            &self.duplicates_dropped,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
