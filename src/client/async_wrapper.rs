//! Async wrappers around the synchronous clients.
//!
//! This module provides async interfaces to the synchronous clients by using
//! `tokio::task::spawn_blocking` to run the HTTP call on a dedicated thread pool,
//! preventing blocking of the async runtime.

use crate::analytics::DailyCandle;
use crate::client::{ChartClient, PriceClient};
use crate::error::{FetchError, FetchResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Source of a single price quote.
///
/// One call performs at most one upstream request and never retries.
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    async fn fetch(&self) -> FetchResult<f64>;
}

/// Async wrapper around synchronous PriceClient.
#[derive(Clone)]
pub struct AsyncPriceClient {
    client: Arc<PriceClient>,
}

impl AsyncPriceClient {
    pub fn new(client: PriceClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

#[async_trait]
impl PriceFetcher for AsyncPriceClient {
    async fn fetch(&self) -> FetchResult<f64> {
        let client = self.client.clone();

        tokio::task::spawn_blocking(move || client.fetch_price())
            .await
            .map_err(|e| FetchError::Network(format!("Task join error: {}", e)))?
    }
}

/// Source of daily OHLC candles.
#[async_trait]
pub trait CandleFetcher: Send + Sync {
    async fn fetch_candles(&self, days: u32) -> FetchResult<Vec<DailyCandle>>;
}

/// Async wrapper around synchronous ChartClient.
#[derive(Clone)]
pub struct AsyncChartClient {
    client: Arc<ChartClient>,
}

impl AsyncChartClient {
    pub fn new(client: ChartClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

#[async_trait]
impl CandleFetcher for AsyncChartClient {
    async fn fetch_candles(&self, days: u32) -> FetchResult<Vec<DailyCandle>> {
        let client = self.client.clone();

        tokio::task::spawn_blocking(move || client.fetch_candles(days))
            .await
            .map_err(|e| FetchError::Network(format!("Task join error: {}", e)))?
    }
}
