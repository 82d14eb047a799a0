//! Lightweight counters exposed through the metrics endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Tracks how much work the relay has forwarded since boot.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    files_uploaded: AtomicU64,
    imports_started: AtomicU64,
    queries_answered: AtomicU64,
}

impl RelayMetrics {
    /// Records one file that finished the upload pipeline.
    pub fn record_upload(&self) {
        self.files_uploaded.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one store import handed off to the remote service.
    pub fn record_import(&self) {
        self.imports_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one grounded query answered.
    pub fn record_query(&self) {
        self.queries_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a serializable copy of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_uploaded: self.files_uploaded.load(Ordering::Relaxed),
            imports_started: self.imports_started.load(Ordering::Relaxed),
            queries_answered: self.queries_answered.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the relay counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Files that completed upload and processing.
    pub files_uploaded: u64,
    /// Store imports started on the remote service.
    pub imports_started: u64,
    /// Grounded queries answered.
    pub queries_answered: u64,
}
