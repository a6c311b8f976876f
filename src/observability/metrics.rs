//! Metrics registry
//!
//! - Counters only, monotonic, reset on process start
//! - Relaxed atomics; exact values are not needed across threads

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one process
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    exports_completed: AtomicU64,
    exports_aborted: AtomicU64,
    entities_exported: AtomicU64,
    imports_completed: AtomicU64,
    imports_failed: AtomicU64,
    entities_imported: AtomicU64,
    writes_admitted: AtomicU64,
    writes_rejected: AtomicU64,
    mode_transitions: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_export_completed(&self, entities: u64) {
        self.exports_completed.fetch_add(1, Ordering::Relaxed);
        self.entities_exported.fetch_add(entities, Ordering::Relaxed);
    }

    pub fn increment_exports_aborted(&self) {
        self.exports_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_import_completed(&self, entities: u64) {
        self.imports_completed.fetch_add(1, Ordering::Relaxed);
        self.entities_imported.fetch_add(entities, Ordering::Relaxed);
    }

    /// A failed import still counts the prefix it committed
    pub fn record_import_failed(&self, committed: u64) {
        self.imports_failed.fetch_add(1, Ordering::Relaxed);
        self.entities_imported.fetch_add(committed, Ordering::Relaxed);
    }

    pub fn increment_writes_admitted(&self) {
        self.writes_admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_writes_rejected(&self) {
        self.writes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_mode_transitions(&self) {
        self.mode_transitions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            exports_completed: self.exports_completed.load(Ordering::Relaxed),
            exports_aborted: self.exports_aborted.load(Ordering::Relaxed),
            entities_exported: self.entities_exported.load(Ordering::Relaxed),
            imports_completed: self.imports_completed.load(Ordering::Relaxed),
            imports_failed: self.imports_failed.load(Ordering::Relaxed),
            entities_imported: self.entities_imported.load(Ordering::Relaxed),
            writes_admitted: self.writes_admitted.load(Ordering::Relaxed),
            writes_rejected: self.writes_rejected.load(Ordering::Relaxed),
            mode_transitions: self.mode_transitions.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub exports_completed: u64,
    pub exports_aborted: u64,
    pub entities_exported: u64,
    pub imports_completed: u64,
    pub imports_failed: u64,
    pub entities_imported: u64,
    pub writes_admitted: u64,
    pub writes_rejected: u64,
    pub mode_transitions: u64,
}
