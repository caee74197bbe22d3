use console::style;

use crate::gateway::{CacheStats, MetricsSummary};
use crate::types::ClassifiedError;

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        eprintln!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn info(&self, message: &str) {
        eprintln!("{} {}", style("ℹ").blue(), message);
    }

    pub fn section(&self, message: &str) {
        eprintln!("\n{}", style(message).bold());
        eprintln!("{}", "─".repeat(40));
    }

    /// Code, suggested status and attempts for a gateway failure
    pub fn classified(&self, err: &ClassifiedError) {
        eprintln!(
            "  {} {}  {} {}  {} {}",
            style("code").dim(),
            err.kind.code(),
            style("status").dim(),
            err.kind.status_hint(),
            style("attempts").dim(),
            err.metadata.attempt_count
        );
        if let Some(retry_after) = err.metadata.retry_after {
            eprintln!("  {} {}s", style("retry after").dim(), retry_after.as_secs());
        }
    }

    /// Cache and request counters, written to stderr so stdout stays JSON
    pub fn stats(&self, cache: &CacheStats, metrics: &MetricsSummary) {
        self.section("Gateway");
        eprintln!(
            "  cache     {}/{} entries, ttl {}ms",
            cache.size, cache.max_entries, cache.ttl_ms
        );
        eprintln!(
            "  lookups   {} hits, {} misses ({:.0}% hit rate)",
            metrics.cache_hits,
            metrics.cache_misses,
            metrics.hit_rate * 100.0
        );
        eprintln!(
            "  network   {} attempts, {} retries",
            metrics.network_attempts, metrics.retries
        );
        for (code, count) in &metrics.failures {
            eprintln!("  {}  {}", style(code).yellow(), count);
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
