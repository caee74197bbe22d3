//! Gateway Metrics Collection
//!
//! Lock-free counters for the request lifecycle. Shared by every clone of a
//! gateway and safe to read while calls are in flight.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

use crate::types::ErrorKind;

// =============================================================================
// Metrics Collector
// =============================================================================

pub struct GatewayMetrics {
    started: Instant,
    queries: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    /// Every outbound send, first attempts and retries alike
    network_attempts: AtomicU64,
    retries: AtomicU64,
    successes: AtomicU64,
    /// Indexed by `ErrorKind::index`
    failures: [AtomicU64; 7],
}

/// Point-in-time snapshot
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub uptime_ms: u64,
    pub queries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub hit_rate: f64,
    pub network_attempts: u64,
    pub retries: u64,
    pub successes: u64,
    /// Failure counts keyed by error code; kinds never seen are omitted
    pub failures: BTreeMap<&'static str, u64>,
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            queries: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            network_attempts: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    pub fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an outbound send; `attempt` is 1-based
    pub fn record_attempt(&self, attempt: u32) {
        self.network_attempts.fetch_add(1, Ordering::Relaxed);
        if attempt > 1 {
            self.retries.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, kind: ErrorKind) {
        self.failures[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn failures_of(&self, kind: ErrorKind) -> u64 {
        self.failures[kind.index()].load(Ordering::Relaxed)
    }

    pub fn network_attempts(&self) -> u64 {
        self.network_attempts.load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> MetricsSummary {
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let lookups = cache_hits + cache_misses;
        let hit_rate = if lookups > 0 {
            cache_hits as f64 / lookups as f64
        } else {
            0.0
        };

        let failures = ErrorKind::ALL
            .iter()
            .filter_map(|kind| {
                let count = self.failures_of(*kind);
                (count > 0).then_some((kind.code(), count))
            })
            .collect();

        MetricsSummary {
            uptime_ms: self.started.elapsed().as_millis() as u64,
            queries: self.queries.load(Ordering::Relaxed),
            cache_hits,
            cache_misses,
            hit_rate,
            network_attempts: self.network_attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures,
        }
    }
}

impl MetricsSummary {
    pub fn total_failures(&self) -> u64 {
        self.failures.values().sum()
    }
}
