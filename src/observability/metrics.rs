//! Metrics registry
//!
//! - Counters only
//! - Monotonic increase
//! - Thread-safe but lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters shared by the caches and the registry.
///
/// All counters use Relaxed ordering; a snapshot is not a consistent cut
/// across counters, only each value is exact.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Row-mappers compiled, whether or not the result was retained
    compilations: AtomicU64,
    /// Lookups served by an already compiled row-mapper
    compile_reuse: AtomicU64,
    /// Compilations discarded after losing an insert race
    races_discarded: AtomicU64,
    /// Result cache hits
    result_cache_hits: AtomicU64,
    /// Result cache misses
    result_cache_misses: AtomicU64,
    /// Stale entries removed from a result cache
    result_cache_evictions: AtomicU64,
    /// Inserts skipped because a result cache was full
    result_cache_skipped: AtomicU64,
    /// Rows materialized into targets
    rows_materialized: AtomicU64,
    /// Column binding and cast failures
    binding_failures: AtomicU64,
    /// Processors created by the registry
    processors_created: AtomicU64,
    /// Processors flushed from the registry
    processors_flushed: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Compilation cache

    pub fn increment_compilations(&self) {
        self.compilations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_compile_reuse(&self) {
        self.compile_reuse.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_races_discarded(&self) {
        self.races_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Row-mappers compiled so far
    pub fn compilations(&self) -> u64 {
        self.compilations.load(Ordering::Relaxed)
    }

    // Result cache

    pub fn increment_result_cache_hits(&self) {
        self.result_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_result_cache_misses(&self) {
        self.result_cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_result_cache_evictions(&self) {
        self.result_cache_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_result_cache_evictions(&self, count: u64) {
        self.result_cache_evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_result_cache_skipped(&self) {
        self.result_cache_skipped.fetch_add(1, Ordering::Relaxed);
    }

    // Materialization

    pub fn add_rows_materialized(&self, rows: u64) {
        self.rows_materialized.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn increment_binding_failures(&self) {
        self.binding_failures.fetch_add(1, Ordering::Relaxed);
    }

    // Processor registry

    pub fn increment_processors_created(&self) {
        self.processors_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_processors_flushed(&self) {
        self.processors_flushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Current snapshot of all metrics as JSON
    pub fn to_json(&self) -> String {
        // Serializing plain u64 fields cannot fail
        serde_json::to_string(&self.snapshot()).unwrap_or_default()
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            compilations: self.compilations.load(Ordering::Relaxed),
            compile_reuse: self.compile_reuse.load(Ordering::Relaxed),
            races_discarded: self.races_discarded.load(Ordering::Relaxed),
            result_cache_hits: self.result_cache_hits.load(Ordering::Relaxed),
            result_cache_misses: self.result_cache_misses.load(Ordering::Relaxed),
            result_cache_evictions: self.result_cache_evictions.load(Ordering::Relaxed),
            result_cache_skipped: self.result_cache_skipped.load(Ordering::Relaxed),
            rows_materialized: self.rows_materialized.load(Ordering::Relaxed),
            binding_failures: self.binding_failures.load(Ordering::Relaxed),
            processors_created: self.processors_created.load(Ordering::Relaxed),
            processors_flushed: self.processors_flushed.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub compilations: u64,
    pub compile_reuse: u64,
    pub races_discarded: u64,
    pub result_cache_hits: u64,
    pub result_cache_misses: u64,
    pub result_cache_evictions: u64,
    pub result_cache_skipped: u64,
    pub rows_materialized: u64,
    pub binding_failures: u64,
    pub processors_created: u64,
    pub processors_flushed: u64,
}
