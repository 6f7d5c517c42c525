//! Caching for the gold price service.
//!
//! This module provides the single-entry refresh cache with a TTL policy and
//! serve-stale-on-failure semantics, plus the clocks it can be driven by.

pub mod clock;
pub mod refresh_cache;

pub use clock::{Clock, ManualClock, SystemClock};
pub use refresh_cache::{CacheEntry, CacheState, Lookup, LookupOutcome, RefreshCache};
