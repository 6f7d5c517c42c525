//! Gold Price Service - serves a briefly cached gold (XAU/USD) quote over HTTP.
//!
//! A single upstream provider is polled on demand. The last good quote is kept
//! in a TTL cache and served while fresh; when a refresh fails the previous
//! value keeps being served.
//!
//! # Architecture
//!
//! - **models**: Quote and response types
//! - **error**: Custom error types for precise error handling
//! - **config**: Configuration management from environment variables
//! - **client**: HTTP clients for the upstream quote and daily candles
//! - **cache**: TTL refresh cache and clocks
//! - **history**: Bounded per-day history of observed quotes
//! - **analytics**: Range, rolling mean, normalization and the volatility report
//! - **metrics**: Counters for fetches, cache decisions and requests
//! - **server**: HTTP server and handlers

pub mod analytics;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod metrics;
pub mod models;
pub mod server;

pub use cache::{Clock, ManualClock, RefreshCache, SystemClock};
pub use analytics::{DailyCandle, VolatilityReport};
pub use client::{
    AsyncChartClient, AsyncPriceClient, CandleFetcher, ChartClient, PriceClient, PriceFetcher,
    Provider,
};
pub use config::Config;
pub use error::{ConfigError, FetchError, FetchErrorKind};
pub use history::{HistorySummary, PriceHistory};
pub use metrics::{FetchTimer, Metrics, MetricsSummary};
pub use models::{PricePoint, PriceResponse, Quote};
pub use server::AppState;
