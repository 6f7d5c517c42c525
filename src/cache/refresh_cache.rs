//! Single-entry price cache with a time-to-live refresh policy.
//!
//! The cache holds the last successfully fetched quote and the instant it was
//! observed. A read within the TTL is served from memory; an older (or missing)
//! entry triggers one upstream fetch. A failed fetch leaves the entry as it was,
//! so the last good value keeps being served.

use crate::cache::clock::Clock;
use crate::client::PriceFetcher;
use crate::metrics::Metrics;
use crate::models::Quote;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// The cached quote and when it was fetched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheEntry {
    pub value: f64,
    pub observed_at: Instant,
}

impl CacheEntry {
    /// Age of the entry at `now`. An instant before `observed_at` counts as zero.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.observed_at)
    }

    /// An entry exactly `ttl` old is still fresh.
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        self.age(now) > ttl
    }
}

/// Reporting view of the cache's two states.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheState {
    /// No fetch has ever succeeded
    Empty,
    /// Holds a value of some age
    Warm { value: f64, age: Duration },
}

/// How a read was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Entry was within the TTL, no fetch
    Hit,
    /// Fetch succeeded and replaced the entry
    Refreshed,
    /// Fetch failed, previous value served
    Stale,
    /// Fetch failed and nothing was ever cached
    Empty,
}

/// Result of a cache read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lookup {
    pub quote: Quote,
    pub outcome: LookupOutcome,
}

/// Price cache with TTL refresh and serve-stale-on-failure.
///
/// Refreshes are serialized by an async mutex held across the upstream fetch,
/// so concurrent readers of an expired entry cause a single fetch. The entry
/// itself is published behind a separate lock that is never held across an
/// await, so fresh reads and [`RefreshCache::state`] never wait on a refresh.
/// Clones share the same entry.
#[derive(Clone)]
pub struct RefreshCache {
    entry: Arc<RwLock<Option<CacheEntry>>>,
    refresh: Arc<Mutex<()>>,
    fetcher: Arc<dyn PriceFetcher>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    metrics: Metrics,
}

impl RefreshCache {
    /// Create an empty cache.
    pub fn new(
        fetcher: Arc<dyn PriceFetcher>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        metrics: Metrics,
    ) -> Self {
        Self {
            entry: Arc::new(RwLock::new(None)),
            refresh: Arc::new(Mutex::new(())),
            fetcher,
            clock,
            ttl,
            metrics,
        }
    }

    /// Get the current price as of `now`, refreshing it if the entry is older than the TTL.
    pub async fn get_price(&self, now: Instant) -> Quote {
        self.lookup(now).await.quote
    }

    /// Get the current price using the injected clock.
    pub async fn current_price(&self) -> Quote {
        self.get_price(self.clock.now()).await
    }

    /// Like [`RefreshCache::lookup`], using the injected clock.
    pub async fn lookup_now(&self) -> Lookup {
        self.lookup(self.clock.now()).await
    }

    /// Read the cache as of `now` and report how the read was served.
    pub async fn lookup(&self, now: Instant) -> Lookup {
        if let Some(hit) = self.fresh(now) {
            return hit;
        }

        let _refresh = self.refresh.lock().await;

        // Another reader may have refreshed while this one waited
        if let Some(hit) = self.fresh(now) {
            return hit;
        }

        match self.fetcher.fetch().await {
            Ok(value) => {
                tracing::debug!(price = value, "Cache refreshed");
                self.publish(Some(CacheEntry {
                    value,
                    observed_at: now,
                }));
                Lookup {
                    quote: Some(value),
                    outcome: LookupOutcome::Refreshed,
                }
            }
            Err(e) => {
                let kind = e.kind();
                self.metrics.record_fetch_error(kind);

                match self.snapshot() {
                    Some(previous) => {
                        self.metrics.record_stale_served();
                        tracing::warn!(
                            kind = %kind,
                            error = %e,
                            age_secs = previous.age(now).as_secs(),
                            "Price refresh failed, serving previous value"
                        );
                        Lookup {
                            quote: Some(previous.value),
                            outcome: LookupOutcome::Stale,
                        }
                    }
                    None => {
                        tracing::warn!(
                            kind = %kind,
                            error = %e,
                            "Price refresh failed, no value cached yet"
                        );
                        Lookup {
                            quote: None,
                            outcome: LookupOutcome::Empty,
                        }
                    }
                }
            }
        }
    }

    /// A hit if the published entry is within the TTL at `now`.
    fn fresh(&self, now: Instant) -> Option<Lookup> {
        let current = self.snapshot()?;
        if current.is_expired(now, self.ttl) {
            return None;
        }
        self.metrics.record_cache_hit();
        Some(Lookup {
            quote: Some(current.value),
            outcome: LookupOutcome::Hit,
        })
    }

    fn publish(&self, entry: Option<CacheEntry>) {
        match self.entry.write() {
            Ok(mut current) => *current = entry,
            Err(poisoned) => *poisoned.into_inner() = entry,
        }
    }

    /// Drop the cached entry so the next read fetches.
    pub fn invalidate(&self) {
        self.publish(None);
    }

    /// Current entry, if any. Does not wait for an in-flight refresh.
    pub fn snapshot(&self) -> Option<CacheEntry> {
        match self.entry.read() {
            Ok(current) => *current,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// State of the cache as of `now`.
    pub fn state(&self, now: Instant) -> CacheState {
        match self.snapshot() {
            Some(entry) => CacheState::Warm {
                value: entry.value,
                age: entry.age(now),
            },
            None => CacheState::Empty,
        }
    }

    /// State of the cache using the injected clock.
    pub fn state_now(&self) -> CacheState {
        self.state(self.clock.now())
    }

    /// Get the TTL duration for this cache.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl std::fmt::Debug for RefreshCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
