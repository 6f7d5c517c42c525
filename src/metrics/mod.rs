//! Basic metrics instrumentation for tracking performance.
//!
//! Provides counters for upstream fetches, cache decisions and inbound requests.

use crate::error::FetchErrorKind;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Metrics collector shared by the client, the cache and the server.
#[derive(Debug, Clone)]
pub struct Metrics {
    /// Total number of upstream fetches attempted
    fetches_total: Arc<AtomicU64>,

    /// Total duration of all upstream fetches in milliseconds
    fetch_duration_total_ms: Arc<AtomicU64>,

    /// Failed fetches, by kind
    network_errors_total: Arc<AtomicU64>,
    upstream_errors_total: Arc<AtomicU64>,
    parse_errors_total: Arc<AtomicU64>,

    /// Reads served from the cache without a fetch
    cache_hits_total: Arc<AtomicU64>,

    /// Reads that served a previous value because the refresh failed
    stale_served_total: Arc<AtomicU64>,

    /// Inbound HTTP requests handled
    requests_total: Arc<AtomicU64>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            fetches_total: Arc::new(AtomicU64::new(0)),
            fetch_duration_total_ms: Arc::new(AtomicU64::new(0)),
            network_errors_total: Arc::new(AtomicU64::new(0)),
            upstream_errors_total: Arc::new(AtomicU64::new(0)),
            parse_errors_total: Arc::new(AtomicU64::new(0)),
            cache_hits_total: Arc::new(AtomicU64::new(0)),
            stale_served_total: Arc::new(AtomicU64::new(0)),
            requests_total: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record an upstream fetch with duration.
    pub fn record_fetch(&self, duration: Duration) {
        self.fetches_total.fetch_add(1, Ordering::Relaxed);
        self.fetch_duration_total_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    /// Record a failed fetch that was swallowed by the cache.
    pub fn record_fetch_error(&self, kind: FetchErrorKind) {
        let counter = match kind {
            FetchErrorKind::Network => &self.network_errors_total,
            FetchErrorKind::Upstream => &self.upstream_errors_total,
            FetchErrorKind::Parse => &self.parse_errors_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_served(&self) {
        self.stale_served_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total upstream fetches.
    pub fn fetches_total(&self) -> u64 {
        self.fetches_total.load(Ordering::Relaxed)
    }

    /// Get total failed fetches across all kinds.
    pub fn fetch_errors_total(&self) -> u64 {
        self.network_errors_total.load(Ordering::Relaxed)
            + self.upstream_errors_total.load(Ordering::Relaxed)
            + self.parse_errors_total.load(Ordering::Relaxed)
    }

    /// Get failed fetches of one kind.
    pub fn fetch_errors(&self, kind: FetchErrorKind) -> u64 {
        match kind {
            FetchErrorKind::Network => self.network_errors_total.load(Ordering::Relaxed),
            FetchErrorKind::Upstream => self.upstream_errors_total.load(Ordering::Relaxed),
            FetchErrorKind::Parse => self.parse_errors_total.load(Ordering::Relaxed),
        }
    }

    /// Get average fetch duration in milliseconds.
    pub fn fetch_duration_avg_ms(&self) -> f64 {
        let total = self.fetch_duration_total_ms.load(Ordering::Relaxed);
        let count = self.fetches_total.load(Ordering::Relaxed);
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    pub fn cache_hits_total(&self) -> u64 {
        self.cache_hits_total.load(Ordering::Relaxed)
    }

    pub fn stale_served_total(&self) -> u64 {
        self.stale_served_total.load(Ordering::Relaxed)
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Get a summary of all metrics.
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            fetches_total: self.fetches_total(),
            fetch_errors_total: self.fetch_errors_total(),
            network_errors_total: self.fetch_errors(FetchErrorKind::Network),
            upstream_errors_total: self.fetch_errors(FetchErrorKind::Upstream),
            parse_errors_total: self.fetch_errors(FetchErrorKind::Parse),
            fetch_duration_avg_ms: self.fetch_duration_avg_ms(),
            cache_hits_total: self.cache_hits_total(),
            stale_served_total: self.stale_served_total(),
            requests_total: self.requests_total(),
        }
    }
}

/// A snapshot of metrics values.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub fetches_total: u64,
    pub fetch_errors_total: u64,
    pub network_errors_total: u64,
    pub upstream_errors_total: u64,
    pub parse_errors_total: u64,
    pub fetch_duration_avg_ms: f64,
    pub cache_hits_total: u64,
    pub stale_served_total: u64,
    pub requests_total: u64,
}

/// Helper for timing upstream fetches.
pub struct FetchTimer {
    start: Instant,
    metrics: Metrics,
}

impl FetchTimer {
    /// Start timing a fetch.
    pub fn new(metrics: Metrics) -> Self {
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    /// Complete the timing and record the duration.
    pub fn complete(self) {
        self.metrics.record_fetch(self.start.elapsed());
    }
}
